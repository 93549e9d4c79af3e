use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An inbound natural-language legal question.
///
/// Immutable once constructed; a session id is generated when the caller
/// does not supply one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Uuid>,
    pub session_id: String,
}

impl Question {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            user_id: None,
            session_id: generate_session_id(),
        }
    }

    pub fn with_user(mut self, user_id: Uuid) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = session_id.into();
        self
    }
}

/// Generates a session id in the form `session_<epoch-ms>_<rand 0-999>`.
pub fn generate_session_id() -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let suffix: u16 = rand::thread_rng().gen_range(0..1000);
    format!("session_{}_{}", millis, suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_question_defaults_to_generated_session() {
        let question = Question::new("合同违约怎么办");
        assert!(question.session_id.starts_with("session_"));
        assert!(question.user_id.is_none());
    }

    #[test]
    fn test_session_id_format() {
        let id = generate_session_id();
        let parts: Vec<&str> = id.split('_').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "session");
        assert!(parts[1].parse::<i64>().is_ok());
        let suffix: u16 = parts[2].parse().unwrap();
        assert!(suffix < 1000);
    }

    #[test]
    fn test_with_session_keeps_caller_session() {
        let question = Question::new("test").with_session("session_123_4");
        assert_eq!(question.session_id, "session_123_4");
    }
}
