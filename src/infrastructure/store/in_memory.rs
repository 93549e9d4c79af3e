//! In-memory legal store implementation

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::knowledge::{
    KnowledgeEntry, LegalArticle, LegalCase, LegalConcept, LegalStore, QaRecord,
};
use crate::domain::DomainError;

/// In-memory implementation of [`LegalStore`].
///
/// Searches are substring containment over the relevant text fields,
/// which is enough to drive the pipeline and its tests.
#[derive(Debug, Default)]
pub struct InMemoryLegalStore {
    knowledge: RwLock<Vec<KnowledgeEntry>>,
    articles: RwLock<Vec<LegalArticle>>,
    cases: RwLock<Vec<LegalCase>>,
    concepts: RwLock<Vec<LegalConcept>>,
    records: RwLock<HashMap<Uuid, QaRecord>>,
}

impl InMemoryLegalStore {
    pub fn new() -> Self {
        Self::default()
    }

    // Seeding builders take `mut self` before the store is shared, so
    // they can reach the data without locking.

    pub fn with_knowledge(mut self, entries: Vec<KnowledgeEntry>) -> Self {
        self.knowledge.get_mut().extend(entries);
        self
    }

    pub fn with_articles(mut self, articles: Vec<LegalArticle>) -> Self {
        self.articles.get_mut().extend(articles);
        self
    }

    pub fn with_cases(mut self, cases: Vec<LegalCase>) -> Self {
        self.cases.get_mut().extend(cases);
        self
    }

    pub fn with_concepts(mut self, concepts: Vec<LegalConcept>) -> Self {
        self.concepts.get_mut().extend(concepts);
        self
    }
}

#[async_trait]
impl LegalStore for InMemoryLegalStore {
    async fn search_knowledge(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<KnowledgeEntry>, DomainError> {
        let knowledge = self.knowledge.read().await;
        let mut matched: Vec<KnowledgeEntry> = knowledge
            .iter()
            .filter(|entry| entry.question.contains(query) || query.contains(&entry.question))
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.score.total_cmp(&a.score));
        matched.truncate(limit);
        Ok(matched)
    }

    async fn search_articles(&self, keyword: &str) -> Result<Vec<LegalArticle>, DomainError> {
        let articles = self.articles.read().await;
        Ok(articles
            .iter()
            .filter(|article| {
                article.title.contains(keyword) || article.content.contains(keyword)
            })
            .cloned()
            .collect())
    }

    async fn articles_by_title(&self, title: &str) -> Result<Vec<LegalArticle>, DomainError> {
        let articles = self.articles.read().await;
        Ok(articles
            .iter()
            .filter(|article| article.is_valid && article.title.contains(title))
            .cloned()
            .collect())
    }

    async fn concept_by_name(&self, name: &str) -> Result<Option<LegalConcept>, DomainError> {
        let concepts = self.concepts.read().await;
        Ok(concepts.iter().find(|concept| concept.name == name).cloned())
    }

    async fn search_cases(&self, keyword: &str) -> Result<Vec<LegalCase>, DomainError> {
        let cases = self.cases.read().await;
        Ok(cases
            .iter()
            .filter(|case| {
                case.title.contains(keyword)
                    || case.dispute_point.contains(keyword)
                    || case.judgment_result.contains(keyword)
            })
            .cloned()
            .collect())
    }

    async fn cases_by_type(&self, case_type: &str) -> Result<Vec<LegalCase>, DomainError> {
        let cases = self.cases.read().await;
        Ok(cases
            .iter()
            .filter(|case| case.case_type == case_type)
            .cloned()
            .collect())
    }

    async fn save_record(&self, record: QaRecord) -> Result<QaRecord, DomainError> {
        let mut records = self.records.write().await;
        records.insert(record.id, record.clone());
        Ok(record)
    }

    async fn record_by_id(&self, id: &Uuid) -> Result<Option<QaRecord>, DomainError> {
        let records = self.records.read().await;
        Ok(records.get(id).cloned())
    }
}
