//! Question input, classification and entity extraction

mod category;
mod entity;
mod extractor;

pub use category::QuestionCategory;
pub use entity::{generate_session_id, Question};
pub use extractor::{extract_entities, EntityBundle};
