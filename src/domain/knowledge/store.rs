use async_trait::async_trait;
use std::fmt::Debug;
use uuid::Uuid;

use super::{KnowledgeEntry, LegalArticle, LegalCase, LegalConcept, QaRecord};
use crate::domain::DomainError;

/// The relational store the pipeline consumes.
///
/// Free-text searches return ranked results; `articles_by_title` only
/// returns currently-valid articles. All implementations must tolerate
/// concurrent use by independent pipeline executions.
#[async_trait]
pub trait LegalStore: Send + Sync + Debug {
    /// Top-N knowledge-base entries matching the query, ranked by their
    /// stored quality score.
    async fn search_knowledge(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<KnowledgeEntry>, DomainError>;

    /// Free-text search over law articles (title or content).
    async fn search_articles(&self, keyword: &str) -> Result<Vec<LegalArticle>, DomainError>;

    /// Valid articles whose title contains the given law name.
    async fn articles_by_title(&self, title: &str) -> Result<Vec<LegalArticle>, DomainError>;

    /// Exact concept lookup by name.
    async fn concept_by_name(&self, name: &str) -> Result<Option<LegalConcept>, DomainError>;

    /// Free-text search over cases.
    async fn search_cases(&self, keyword: &str) -> Result<Vec<LegalCase>, DomainError>;

    /// Cases of a given type (the question-category label).
    async fn cases_by_type(&self, case_type: &str) -> Result<Vec<LegalCase>, DomainError>;

    /// Persists a QA record (insert or replace by id).
    async fn save_record(&self, record: QaRecord) -> Result<QaRecord, DomainError>;

    /// Looks up a QA record by id.
    async fn record_by_id(&self, id: &Uuid) -> Result<Option<QaRecord>, DomainError>;
}
