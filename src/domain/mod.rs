pub mod error;
pub mod generation;
pub mod knowledge;
pub mod pipeline;
pub mod question;

pub use error::DomainError;
