//! Bounded conversation memory for one chat session
//!
//! Two views over the same exchanges:
//!
//! - the full transcript, opening with a greeting that answers no request,
//!   rendered as `Human:`/`Bot:` lines for query refinement;
//! - a sliding window of the most recent turns handed to the answer model.
//!
//! Both change only through [`ConversationMemory::record`], which appends a
//! completed (user, assistant) pair.

use std::collections::VecDeque;

use crate::types::{Role, TranscriptEntry, Turn};

/// Default cap on structured history turns (five exchanges)
pub const DEFAULT_MAX_TURNS: usize = 10;

#[derive(Debug, Clone)]
struct Exchange {
    request: String,
    response: String,
}

/// Per-session conversation memory
#[derive(Debug, Clone)]
pub struct ConversationMemory {
    greeting: String,
    exchanges: Vec<Exchange>,
    window: VecDeque<Turn>,
    max_turns: usize,
}

impl ConversationMemory {
    /// Create an empty memory seeded with `greeting`
    pub fn new(greeting: impl Into<String>, max_turns: usize) -> Self {
        Self {
            greeting: greeting.into(),
            exchanges: Vec::new(),
            window: VecDeque::with_capacity(max_turns + 2),
            max_turns,
        }
    }

    /// Append one completed exchange and slide the window
    pub fn record(&mut self, user_text: impl Into<String>, assistant_text: impl Into<String>) {
        let exchange = Exchange {
            request: user_text.into(),
            response: assistant_text.into(),
        };

        self.window.push_back(Turn::user(exchange.request.clone()));
        self.window.push_back(Turn::assistant(exchange.response.clone()));
        self.exchanges.push(exchange);
        self.evict();
    }

    /// Drop the oldest turns past the cap. A window must not open on an
    /// assistant turn, so an orphaned reply is dropped as well.
    fn evict(&mut self) {
        while self.window.len() > self.max_turns {
            self.window.pop_front();
        }
        if self
            .window
            .front()
            .is_some_and(|t| t.role() == Role::Assistant)
        {
            self.window.pop_front();
        }
    }

    /// Conversation log for the refiner: one `Human:`/`Bot:` pair per exchange
    ///
    /// The greeting is never paired with a request and never appears here.
    pub fn as_plain_text(&self) -> String {
        let mut out = String::new();
        for exchange in &self.exchanges {
            out.push_str("Human: ");
            out.push_str(&exchange.request);
            out.push('\n');
            out.push_str("Bot: ");
            out.push_str(&exchange.response);
            out.push('\n');
        }
        out
    }

    /// Most recent turns, oldest first, at most the configured cap
    pub fn as_structured_history(&self) -> Vec<Turn> {
        self.window.iter().cloned().collect()
    }

    /// Display transcript: greeting, then user/bot lines per exchange
    pub fn transcript(&self) -> Vec<TranscriptEntry> {
        let mut entries = Vec::with_capacity(1 + self.exchanges.len() * 2);
        entries.push(TranscriptEntry::Bot(self.greeting.clone()));
        for exchange in &self.exchanges {
            entries.push(TranscriptEntry::User(exchange.request.clone()));
            entries.push(TranscriptEntry::Bot(exchange.response.clone()));
        }
        entries
    }

    pub fn greeting(&self) -> &str {
        &self.greeting
    }

    /// Number of turns in the structured window
    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    /// Completed exchanges since the session started
    pub fn exchange_count(&self) -> usize {
        self.exchanges.len()
    }

    /// Forget everything except the greeting
    pub fn clear(&mut self) {
        self.exchanges.clear();
        self.window.clear();
    }
}

impl Default for ConversationMemory {
    fn default() -> Self {
        Self::new("How can I assist you?", DEFAULT_MAX_TURNS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(n: usize) -> ConversationMemory {
        let mut memory = ConversationMemory::default();
        for i in 0..n {
            memory.record(format!("q{}", i), format!("a{}", i));
        }
        memory
    }

    #[test]
    fn test_new_memory_is_empty() {
        let memory = ConversationMemory::default();
        assert!(memory.is_empty());
        assert_eq!(memory.as_plain_text(), "");
        assert_eq!(
            memory.transcript(),
            vec![TranscriptEntry::Bot("How can I assist you?".to_string())]
        );
    }

    #[test]
    fn test_plain_text_pairs_requests_with_their_responses() {
        let mut memory = ConversationMemory::default();
        memory.record("What is the refund policy?", "30 days.");
        memory.record("And after that?", "Store credit.");

        assert_eq!(
            memory.as_plain_text(),
            "Human: What is the refund policy?\nBot: 30 days.\nHuman: And after that?\nBot: Store credit.\n"
        );
        assert!(!memory.as_plain_text().contains("How can I assist you?"));
    }

    #[test]
    fn test_plain_text_is_idempotent() {
        let memory = filled(3);
        assert_eq!(memory.as_plain_text(), memory.as_plain_text());
    }

    #[test]
    fn test_window_never_exceeds_cap() {
        let mut memory = ConversationMemory::default();
        for i in 0..20 {
            memory.record(format!("q{}", i), format!("a{}", i));
            assert!(memory.len() <= DEFAULT_MAX_TURNS);
        }
    }

    #[test]
    fn test_eleventh_query_evicts_oldest() {
        let mut memory = filled(5);
        assert_eq!(memory.len(), 10);

        memory.record("q5", "a5");

        let history = memory.as_structured_history();
        assert_eq!(history.len(), 10);
        assert_eq!(history[0], Turn::user("q1"));
        assert_eq!(history[9], Turn::assistant("a5"));
        // the transcript keeps everything
        assert_eq!(memory.exchange_count(), 6);
        assert!(memory.as_plain_text().starts_with("Human: q0\n"));
    }

    #[test]
    fn test_window_is_chronological_and_alternating() {
        let history = filled(7).as_structured_history();
        for (i, turn) in history.iter().enumerate() {
            let expected = if i % 2 == 0 { Role::User } else { Role::Assistant };
            assert_eq!(turn.role(), expected);
        }
        assert_eq!(history.last().unwrap().text(), "a6");
    }

    #[test]
    fn test_odd_cap_keeps_window_starting_on_user() {
        let mut memory = ConversationMemory::new("hi", 5);
        for i in 0..4 {
            memory.record(format!("q{}", i), format!("a{}", i));
        }
        let history = memory.as_structured_history();
        assert_eq!(history[0].role(), Role::User);
        assert!(history.len() <= 5);
        assert_eq!(history.len(), 4);
    }

    #[test]
    fn test_transcript_order() {
        let mut memory = ConversationMemory::new("Hello!", 10);
        memory.record("q0", "a0");

        let transcript = memory.transcript();
        assert_eq!(transcript.len(), 3);
        assert_eq!(transcript[0], TranscriptEntry::Bot("Hello!".to_string()));
        assert!(transcript[1].is_user());
        assert_eq!(transcript[2].text(), "a0");
    }

    #[test]
    fn test_clear_keeps_greeting() {
        let mut memory = filled(3);
        memory.clear();
        assert!(memory.is_empty());
        assert_eq!(memory.exchange_count(), 0);
        assert_eq!(memory.transcript().len(), 1);
    }
}
