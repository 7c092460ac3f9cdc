// Interactive terminal chat: the text and simulated-voice input surface.

use std::io::Write;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::dictation::Dictation;
use crate::render::{render_message, LOADING_INDICATOR};
use crate::turn::{TurnController, TurnOutcome};

pub const VOICE_COMMAND: &str = "/voice";
pub const QUIT_COMMAND: &str = "/quit";

/// Ctrl-C presses, handed to whichever step of the session is currently waiting.
pub struct Interrupts {
    rx: mpsc::UnboundedReceiver<()>,
}

impl Interrupts {
    /// Routes every Ctrl-C into this receiver. SIGINT then no longer ends the process by
    /// itself, so every waiting step of the session must select on `recv`.
    pub fn ctrl_c() -> Self {
        let (tx, interrupts) = Self::channel();
        tokio::spawn(async move {
            while tokio::signal::ctrl_c().await.is_ok() {
                if tx.send(()).is_err() {
                    break;
                }
            }
        });
        interrupts
    }

    pub fn channel() -> (mpsc::UnboundedSender<()>, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (tx, Self { rx })
    }

    /// Resolves on the next press. Never resolves once the source is gone.
    pub async fn recv(&mut self) {
        if self.rx.recv().await.is_none() {
            std::future::pending::<()>().await;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceOutcome {
    Submitted(TurnOutcome),
    /// Listening stopped before anything worth sending was heard.
    NothingHeard,
    /// Ctrl-C arrived after listening, while the request was settling or in flight.
    Interrupted,
}

/// Submits one input and prints whatever the turn appended.
pub async fn run_turn<W: Write>(controller: &TurnController, input: &str, out: &mut W) -> Result<TurnOutcome> {
    let seen = controller.len();
    if !input.trim().is_empty() {
        writeln!(out, "{}", LOADING_INDICATOR)?;
        out.flush()?;
    }
    let outcome = controller.submit(input).await;
    debug!(?outcome, "Turn finished");
    for message in controller.messages_since(seen) {
        writeln!(out, "{}", render_message(&message))?;
    }
    Ok(outcome)
}

/// Reveals the dictation character by character, then submits it.
/// Ctrl-C while listening stops early and sends what was heard, if long enough.
/// Ctrl-C after that abandons the request.
pub async fn run_voice_turn<W: Write>(
    controller: &TurnController,
    mut dictation: Dictation,
    settle: Duration,
    out: &mut W,
    interrupts: &mut Interrupts,
) -> Result<VoiceOutcome> {
    let cancel = dictation.cancel_handle();

    write!(out, "正在倾听... ")?;
    out.flush()?;
    loop {
        tokio::select! {
            next = dictation.next_char() => match next {
                Some(c) => {
                    write!(out, "{}", c)?;
                    out.flush()?;
                }
                None => break,
            },
            _ = interrupts.recv() => cancel.cancel(),
        }
    }
    writeln!(out)?;

    let complete = dictation.is_complete();
    if !complete {
        info!(heard = dictation.revealed(), "Listening stopped early");
    }
    let Some(utterance) = dictation.into_submission() else {
        return Ok(VoiceOutcome::NothingHeard);
    };

    let submit = async {
        if complete {
            tokio::time::sleep(settle).await;
        }
        run_turn(controller, &utterance, out).await
    };
    tokio::select! {
        outcome = submit => Ok(VoiceOutcome::Submitted(outcome?)),
        _ = interrupts.recv() => {
            info!("Ctrl-C received, abandoning voice request");
            Ok(VoiceOutcome::Interrupted)
        }
    }
}

/// Reads lines until EOF, `/quit`, or Ctrl-C.
pub async fn run_chat<R, W>(
    controller: &TurnController,
    input: R,
    out: &mut W,
    voice: impl Fn() -> Dictation,
    settle: Duration,
    interrupts: &mut Interrupts,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    info!("Starting chat session...");
    for message in controller.transcript() {
        writeln!(out, "{}", render_message(&message))?;
    }

    let mut lines = input.lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line.context("Failed to read input")?,
            _ = interrupts.recv() => {
                info!("Ctrl-C received, ending chat");
                break;
            }
        };
        let Some(line) = line else { break };

        match line.trim() {
            QUIT_COMMAND => break,
            VOICE_COMMAND => {
                if run_voice_turn(controller, voice(), settle, out, interrupts).await? == VoiceOutcome::Interrupted {
                    break;
                }
            }
            _ => {
                tokio::select! {
                    outcome = run_turn(controller, &line, out) => {
                        outcome?;
                    }
                    _ = interrupts.recv() => {
                        info!("Ctrl-C received, abandoning request and ending chat");
                        break;
                    }
                }
            }
        }
    }
    info!("Chat session finished.");
    Ok(())
}
