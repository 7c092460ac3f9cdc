use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, error, info};

use crate::constants;
use crate::conversation::{ConversationStore, Message};
use crate::gateway::{AssistantGateway, FailureKind};
use crate::interpreter::interpret;
use crate::location::Location;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    Blank,
    Busy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOutcome {
    /// Nothing was appended.
    Ignored(IgnoreReason),
    Completed,
    /// The turn ended with a diagnostic assistant message.
    Failed(FailureKind),
}

/// Clears the busy flag however the turn ends.
struct PendingGuard<'a>(&'a AtomicBool);

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Drives one user turn at a time through the gateway and into the transcript.
pub struct TurnController {
    gateway: Arc<dyn AssistantGateway>,
    location: Option<Location>,
    store: Mutex<ConversationStore>,
    busy: AtomicBool,
}

impl TurnController {
    pub fn new(gateway: Arc<dyn AssistantGateway>, location: Option<Location>) -> Self {
        Self::with_store(gateway, location, ConversationStore::new())
    }

    pub fn with_store(
        gateway: Arc<dyn AssistantGateway>,
        location: Option<Location>,
        store: ConversationStore,
    ) -> Self {
        Self {
            gateway,
            location,
            store: Mutex::new(store),
            busy: AtomicBool::new(false),
        }
    }

    pub fn is_pending(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    pub fn len(&self) -> usize {
        self.store().len()
    }

    pub fn is_empty(&self) -> bool {
        self.store().is_empty()
    }

    pub fn transcript(&self) -> Vec<Message> {
        self.store().messages().to_vec()
    }

    pub fn messages_since(&self, seen: usize) -> Vec<Message> {
        self.store().since(seen).to_vec()
    }

    fn store(&self) -> MutexGuard<'_, ConversationStore> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn append(&self, message: Message) {
        self.store().append(message);
    }

    /// Runs one turn. Blank input and submissions made while a turn is in flight are dropped.
    pub async fn submit(&self, raw_input: &str) -> TurnOutcome {
        let prompt = raw_input.trim();
        if prompt.is_empty() {
            return TurnOutcome::Ignored(IgnoreReason::Blank);
        }
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Turn already in flight, dropping submission");
            return TurnOutcome::Ignored(IgnoreReason::Busy);
        }
        let _pending = PendingGuard(&self.busy);

        self.append(Message::user(prompt));
        info!(chars = prompt.chars().count(), "Submitting turn");

        match self.gateway.send(prompt, self.location).await {
            Ok(reply) => {
                self.append(interpret(reply));
                TurnOutcome::Completed
            }
            Err(e) => {
                error!(error = %e, "Turn failed");
                let kind = e.kind();
                let text = match kind {
                    FailureKind::Configuration => constants::CONFIGURATION_ERROR_TEXT,
                    FailureKind::Remote => constants::REMOTE_ERROR_TEXT,
                };
                self.append(Message::assistant(text));
                TurnOutcome::Failed(kind)
            }
        }
    }
}
