//! Generation request/response types shared with the backend client

mod answer;
mod backend;
mod message;
mod prompt;
mod request;

pub use answer::{GeneratedAnswer, GenerationStatus};
pub use backend::GenerationBackend;

#[cfg(test)]
pub use backend::mock::MockGenerationBackend;
pub use message::{Message, MessageRole};
pub use prompt::build_system_prompt;
pub use request::GenerationRequest;
