//! Simulated voice input: reveals an utterance one character per tick until it
//! is exhausted or cancelled.

use std::collections::VecDeque;
use std::time::Duration;

use futures::Stream;
use tokio_util::sync::CancellationToken;

use crate::constants;

pub struct Dictation {
    remaining: VecDeque<char>,
    revealed: String,
    tick: Duration,
    cancel: CancellationToken,
}

impl Dictation {
    pub fn new(utterance: &str, tick: Duration) -> Self {
        Self {
            remaining: utterance.chars().collect(),
            revealed: String::new(),
            tick,
            cancel: CancellationToken::new(),
        }
    }

    pub fn demo() -> Self {
        Self::new(
            constants::DEMO_UTTERANCE,
            Duration::from_millis(constants::DICTATION_TICK_MS),
        )
    }

    /// Cancelling stops emission at once, even mid-tick. Unrevealed characters are discarded.
    pub fn cancel_handle(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn revealed(&self) -> &str {
        &self.revealed
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// All characters were revealed without a cancel.
    pub fn is_complete(&self) -> bool {
        self.remaining.is_empty() && !self.cancel.is_cancelled()
    }

    pub async fn next_char(&mut self) -> Option<char> {
        let next = *self.remaining.front()?;
        let cancel = self.cancel.clone();
        let cancelled = tokio::select! {
            biased;
            _ = cancel.cancelled() => true,
            _ = tokio::time::sleep(self.tick) => false,
        };
        if cancelled {
            self.remaining.clear();
            return None;
        }
        self.remaining.pop_front();
        self.revealed.push(next);
        Some(next)
    }

    pub fn into_stream(self) -> impl Stream<Item = char> {
        futures::stream::unfold(self, |mut dictation| async move {
            dictation.next_char().await.map(|c| (c, dictation))
        })
    }

    /// Text to submit once dictation ends: the whole utterance when it finished,
    /// or what was revealed when stopped early, provided it is longer than one character.
    pub fn into_submission(self) -> Option<String> {
        if self.is_complete() || self.revealed.chars().count() > 1 {
            Some(self.revealed)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test(start_paused = true)]
    async fn test_reveals_every_character_in_order() {
        let dictation = Dictation::new("黄焖鸡", Duration::from_millis(60));
        let chars: Vec<char> = dictation.into_stream().collect().await;
        assert_eq!(chars, ['黄', '焖', '鸡']);
    }

    #[tokio::test(start_paused = true)]
    async fn test_one_character_per_tick() {
        let mut dictation = Dictation::new("ab", Duration::from_millis(60));
        let start = tokio::time::Instant::now();
        assert_eq!(dictation.next_char().await, Some('a'));
        let first = start.elapsed();
        assert!(first >= Duration::from_millis(60) && first < Duration::from_millis(120));
        assert_eq!(dictation.next_char().await, Some('b'));
        assert!(start.elapsed() >= Duration::from_millis(120));
        assert_eq!(dictation.next_char().await, None);
        assert!(dictation.is_complete());
        assert_eq!(dictation.into_submission().as_deref(), Some("ab"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_halts_emission() {
        let mut dictation = Dictation::new("帮我点一份", Duration::from_millis(60));
        assert_eq!(dictation.next_char().await, Some('帮'));
        assert_eq!(dictation.next_char().await, Some('我'));

        dictation.cancel_handle().cancel();
        assert_eq!(dictation.next_char().await, None);
        assert_eq!(dictation.next_char().await, None);
        assert!(dictation.is_cancelled());
        assert!(!dictation.is_complete());
        assert_eq!(dictation.revealed(), "帮我");
        assert_eq!(dictation.into_submission().as_deref(), Some("帮我"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_interrupts_pending_tick() {
        let mut dictation = Dictation::new("abc", Duration::from_secs(3600));
        let token = dictation.cancel_handle();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            token.cancel();
        });
        let start = tokio::time::Instant::now();
        assert_eq!(dictation.next_char().await, None);
        assert!(start.elapsed() < Duration::from_secs(1));
        assert_eq!(dictation.revealed(), "");
    }

    #[tokio::test(start_paused = true)]
    async fn test_short_early_stop_submits_nothing() {
        let mut dictation = Dictation::new("abc", Duration::from_millis(10));
        dictation.next_char().await;
        dictation.cancel_handle().cancel();
        assert_eq!(dictation.into_submission(), None);
    }

    #[test]
    fn test_demo_utterance() {
        let dictation = Dictation::demo();
        assert_eq!(dictation.revealed(), "");
        assert!(!dictation.is_complete());
    }
}
