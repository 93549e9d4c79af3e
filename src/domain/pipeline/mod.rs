//! The question-answering pipeline: retrieval context assembly, related
//! resource lookup, citation reconciliation, confidence scoring and the
//! orchestrator that sequences them around the generation backend.

mod confidence;
mod context;
mod events;
mod orchestrator;
mod reconciler;
mod related;

pub use confidence::evaluate_confidence;
pub use context::assemble_context;
pub use events::{ArticlePayload, CasePayload, StreamEvent};
pub use orchestrator::{QaPipeline, QaResponse};
pub use reconciler::{extract_cited_articles, reconcile_citations};
pub use related::{find_related_cases, find_related_laws};
