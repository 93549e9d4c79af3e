use async_trait::async_trait;
use std::fmt::Debug;
use tokio::sync::mpsc;

use super::GeneratedAnswer;

/// The generative text backend as the pipeline sees it.
///
/// Both modes return a final answer string and never fail in a way the
/// caller can observe: transport and backend errors are translated into
/// apology text by the implementation. Streaming deltas are pushed, in
/// arrival order, through the provided channel; the channel is closed
/// when generation ends.
#[async_trait]
pub trait GenerationBackend: Send + Sync + Debug {
    async fn complete(&self, question: &str, context: &str) -> GeneratedAnswer;

    async fn complete_streaming(
        &self,
        question: &str,
        context: &str,
        deltas: mpsc::UnboundedSender<String>,
    ) -> GeneratedAnswer;
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use crate::domain::generation::GenerationStatus;

    /// Scripted backend for orchestrator tests.
    #[derive(Debug)]
    pub struct MockGenerationBackend {
        answer: String,
        status: GenerationStatus,
        chunks: Vec<String>,
        /// When set, the streamed "complete" return value differs from
        /// the concatenated chunks.
        trailing_answer: Option<String>,
    }

    impl MockGenerationBackend {
        pub fn new(answer: impl Into<String>) -> Self {
            let answer = answer.into();
            Self {
                chunks: answer.chars().map(|c| c.to_string()).collect(),
                answer,
                status: GenerationStatus::Completed,
                trailing_answer: None,
            }
        }

        pub fn with_chunks(mut self, chunks: Vec<&str>) -> Self {
            self.chunks = chunks.into_iter().map(str::to_string).collect();
            self
        }

        pub fn with_status(mut self, status: GenerationStatus) -> Self {
            self.status = status;
            self
        }

        pub fn with_trailing_answer(mut self, answer: impl Into<String>) -> Self {
            self.trailing_answer = Some(answer.into());
            self
        }
    }

    #[async_trait]
    impl GenerationBackend for MockGenerationBackend {
        async fn complete(&self, _question: &str, _context: &str) -> GeneratedAnswer {
            GeneratedAnswer {
                text: self.answer.clone(),
                status: self.status,
            }
        }

        async fn complete_streaming(
            &self,
            _question: &str,
            _context: &str,
            deltas: mpsc::UnboundedSender<String>,
        ) -> GeneratedAnswer {
            for chunk in &self.chunks {
                let _ = deltas.send(chunk.clone());
            }
            let text = self
                .trailing_answer
                .clone()
                .unwrap_or_else(|| self.chunks.concat());
            GeneratedAnswer {
                text,
                status: self.status,
            }
        }
    }
}
