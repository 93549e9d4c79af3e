use serde::{Deserialize, Serialize};

use super::Message;

/// Parameters for one backend generation call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub messages: Vec<Message>,
    pub temperature: f32,
    pub max_tokens: u32,
    #[serde(default)]
    pub stream: bool,
}

impl GenerationRequest {
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            temperature: 0.7,
            max_tokens: 2000,
            stream: false,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn streaming(mut self) -> Self {
        self.stream = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_defaults() {
        let request = GenerationRequest::new(vec![Message::user("问题")]);
        assert_eq!(request.temperature, 0.7);
        assert_eq!(request.max_tokens, 2000);
        assert!(!request.stream);
    }

    #[test]
    fn test_streaming_flag() {
        let request = GenerationRequest::new(vec![]).streaming();
        assert!(request.stream);
    }
}
