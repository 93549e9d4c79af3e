//! Retrieval-augmented legal question answering.
//!
//! The pipeline classifies a question, extracts legal entities from it,
//! assembles a retrieval context from a [`domain::knowledge::LegalStore`],
//! generates an answer through a [`domain::generation::GenerationBackend`]
//! (synchronously or as a stream of deltas), discovers related laws and
//! cases, reconciles the citations the generator produced, scores the
//! result and persists a QA record.

pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use domain::pipeline::{QaPipeline, QaResponse, StreamEvent};
pub use domain::question::Question;
pub use domain::DomainError;
