use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::question::QuestionCategory;

/// A curated knowledge-base entry (question/answer pair with a stored
/// quality score used for ranking).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeEntry {
    pub id: Uuid,
    pub question: String,
    pub answer: String,
    pub score: f32,
}

impl KnowledgeEntry {
    pub fn new(question: impl Into<String>, answer: impl Into<String>, score: f32) -> Self {
        Self {
            id: Uuid::new_v4(),
            question: question.into(),
            answer: answer.into(),
            score,
        }
    }
}

/// A single article of a statute.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegalArticle {
    pub id: Uuid,
    pub title: String,
    pub article_number: String,
    pub content: String,
    pub is_valid: bool,
}

impl LegalArticle {
    pub fn new(
        title: impl Into<String>,
        article_number: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            article_number: article_number.into(),
            content: content.into(),
            is_valid: true,
        }
    }

    pub fn invalidated(mut self) -> Self {
        self.is_valid = false;
        self
    }

    /// Article number with formatting characters removed, so a stored
    /// "第五百七十七条" and a bare "577" compare on equal footing.
    pub fn clean_number(&self) -> String {
        clean_article_number(&self.article_number)
    }

    /// Canonical display label: title + 第 + cleaned number + 条.
    pub fn display_name(&self) -> String {
        let number = self.clean_number();
        if number.is_empty() {
            return self.title.clone();
        }
        format!("{}第{}条", self.title, number)
    }
}

/// Strips 第/条 and whitespace from an article number. The stored column
/// is inconsistent about whether it already carries those characters.
pub fn clean_article_number(raw: &str) -> String {
    raw.chars()
        .filter(|c| *c != '第' && *c != '条' && !c.is_whitespace())
        .collect()
}

/// A decided legal case.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegalCase {
    pub id: Uuid,
    pub title: String,
    pub court_name: String,
    pub judge_date: Option<NaiveDate>,
    pub case_type: String,
    pub dispute_point: String,
    pub judgment_result: String,
}

impl LegalCase {
    pub fn new(title: impl Into<String>, case_type: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            court_name: String::new(),
            judge_date: None,
            case_type: case_type.into(),
            dispute_point: String::new(),
            judgment_result: String::new(),
        }
    }

    pub fn with_court(mut self, court_name: impl Into<String>) -> Self {
        self.court_name = court_name.into();
        self
    }

    pub fn with_dispute_point(mut self, dispute_point: impl Into<String>) -> Self {
        self.dispute_point = dispute_point.into();
        self
    }

    pub fn with_judgment(mut self, judgment_result: impl Into<String>) -> Self {
        self.judgment_result = judgment_result.into();
        self
    }
}

/// A named legal concept with its definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegalConcept {
    pub id: Uuid,
    pub name: String,
    pub definition: String,
}

impl LegalConcept {
    pub fn new(name: impl Into<String>, definition: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            definition: definition.into(),
        }
    }
}

/// The persisted question/answer record, created once per question at the
/// end of the pipeline. Entities and related-resource labels are stored
/// serialized; feedback and favorite flags start unset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QaRecord {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub question: String,
    pub answer: String,
    pub category: QuestionCategory,
    pub confidence: f64,
    /// Serialized EntityBundle.
    pub entities: String,
    /// Serialized list of related-law display names.
    pub related_laws: String,
    /// Serialized list of related-case titles.
    pub related_cases: String,
    pub session_id: String,
    pub is_feedback: bool,
    pub feedback_type: Option<String>,
    pub is_favorite: bool,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_article_number() {
        assert_eq!(clean_article_number("第577条"), "577");
        assert_eq!(clean_article_number(" 五百七十七 "), "五百七十七");
        assert_eq!(clean_article_number("577"), "577");
    }

    #[test]
    fn test_display_name() {
        let article = LegalArticle::new("民法典", "第577条", "...");
        assert_eq!(article.display_name(), "民法典第577条");
    }

    #[test]
    fn test_display_name_without_number() {
        let article = LegalArticle::new("民法典", "", "...");
        assert_eq!(article.display_name(), "民法典");
    }
}
