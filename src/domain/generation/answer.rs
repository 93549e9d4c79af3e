use serde::{Deserialize, Serialize};

/// How a generation call terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationStatus {
    /// The backend produced an answer and finished normally.
    Completed,
    /// The backend reported a terminal error; the text is an apology.
    BackendError,
    /// Every retry attempt failed; the text is an apology.
    RetriesExhausted,
}

/// The final answer text together with its termination flag.
///
/// Failure is never surfaced as an error: a failed generation is a
/// low-quality answer, not a pipeline failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedAnswer {
    pub text: String,
    pub status: GenerationStatus,
}

impl GeneratedAnswer {
    pub fn completed(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            status: GenerationStatus::Completed,
        }
    }

    pub fn backend_error(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            status: GenerationStatus::BackendError,
        }
    }

    pub fn retries_exhausted(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            status: GenerationStatus::RetriesExhausted,
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.status != GenerationStatus::Completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_degraded_flag() {
        assert!(!GeneratedAnswer::completed("ok").is_degraded());
        assert!(GeneratedAnswer::backend_error("apology").is_degraded());
        assert!(GeneratedAnswer::retries_exhausted("apology").is_degraded());
    }
}
