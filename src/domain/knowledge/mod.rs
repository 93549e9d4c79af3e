//! Store-backed record kinds and the store interface the pipeline consumes

mod entity;
mod store;

pub use entity::{
    clean_article_number, KnowledgeEntry, LegalArticle, LegalCase, LegalConcept, QaRecord,
};
pub use store::LegalStore;
