//! Infrastructure layer - external service implementations

pub mod llm;
pub mod logging;
pub mod store;
