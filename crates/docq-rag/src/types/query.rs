//! Chat request shape

use serde::{Deserialize, Serialize};

/// A question about the uploaded documents, with optional prior turns so the
/// generator can follow the conversation. Each history entry is a
/// `[user, assistant]` pair, oldest first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub question: String,
    #[serde(default)]
    pub chat_history: Vec<(String, String)>,
    /// Overrides the configured result count when set
    #[serde(default)]
    pub top_k: Option<usize>,
}

impl ChatRequest {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            chat_history: Vec::new(),
            top_k: None,
        }
    }

    pub fn with_history(mut self, history: Vec<(String, String)>) -> Self {
        self.chat_history = history;
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = Some(top_k);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_and_top_k_are_optional_on_the_wire() {
        let request: ChatRequest = serde_json::from_str(r#"{"question": "who?"}"#).unwrap();
        assert_eq!(request.question, "who?");
        assert!(request.chat_history.is_empty());
        assert!(request.top_k.is_none());
    }

    #[test]
    fn history_deserializes_from_pair_arrays() {
        let raw = r#"{
            "question": "and then?",
            "chat_history": [["first question", "first answer"]],
            "top_k": 2
        }"#;
        let request: ChatRequest = serde_json::from_str(raw).unwrap();
        assert_eq!(request.chat_history.len(), 1);
        assert_eq!(request.chat_history[0].0, "first question");
        assert_eq!(request.chat_history[0].1, "first answer");
        assert_eq!(request.top_k, Some(2));
    }

    #[test]
    fn builder_round_trip() {
        let request = ChatRequest::new("q")
            .with_history(vec![("a".into(), "b".into())])
            .with_top_k(7);
        assert_eq!(request.top_k, Some(7));
        assert_eq!(request.chat_history.len(), 1);
    }
}
