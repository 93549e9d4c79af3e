use chrono::NaiveDate;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::knowledge::{LegalArticle, LegalCase};
use crate::domain::question::{EntityBundle, QuestionCategory};

/// Article fields pushed to the caller on the streaming surface. The
/// article number is cleaned so the client never renders 第第577条条.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ArticlePayload {
    pub id: Uuid,
    pub title: String,
    pub article_number: String,
    pub content: String,
}

impl From<&LegalArticle> for ArticlePayload {
    fn from(article: &LegalArticle) -> Self {
        Self {
            id: article.id,
            title: article.title.clone(),
            article_number: article.clean_number(),
            content: article.content.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CasePayload {
    pub id: Uuid,
    pub title: String,
    pub court_name: String,
    pub judge_date: Option<NaiveDate>,
    pub case_type: String,
    pub dispute_point: String,
    pub judgment_result: String,
}

impl From<&LegalCase> for CasePayload {
    fn from(case: &LegalCase) -> Self {
        Self {
            id: case.id,
            title: case.title.clone(),
            court_name: case.court_name.clone(),
            judge_date: case.judge_date,
            case_type: case.case_type.clone(),
            dispute_point: case.dispute_point.clone(),
            judgment_result: case.judgment_result.clone(),
        }
    }
}

/// Ordered, finite, non-restartable event sequence produced by the
/// streaming pipeline. The transport layer owns the wire encoding.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Emitted first, before any retrieval work.
    Start {
        #[serde(rename = "sessionId")]
        session_id: String,
    },
    /// Pre-generation related laws/cases/entities.
    Related {
        #[serde(rename = "relatedLaws")]
        related_laws: Vec<ArticlePayload>,
        #[serde(rename = "relatedCases")]
        related_cases: Vec<CasePayload>,
        entities: EntityBundle,
    },
    /// One answer fragment, forwarded in arrival order.
    Delta { content: String },
    /// Final metadata after persistence; related laws are the
    /// reconciled, post-generation list.
    Metadata {
        id: Uuid,
        category: QuestionCategory,
        confidence: f64,
        #[serde(rename = "sessionId")]
        session_id: String,
        #[serde(rename = "relatedLaws")]
        related_laws: Vec<ArticlePayload>,
        #[serde(rename = "relatedCases")]
        related_cases: Vec<CasePayload>,
        entities: EntityBundle,
    },
    /// Normal terminal event.
    End,
    /// Terminal event for failures before generation began.
    Error { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_article_payload_cleans_number() {
        let article = LegalArticle::new("民法典", "第577条", "内容");
        let payload = ArticlePayload::from(&article);
        assert_eq!(payload.article_number, "577");
    }

    #[test]
    fn test_event_serialization_tags() {
        let event = StreamEvent::Start {
            session_id: "session_1_2".into(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"start\""));
        assert!(json.contains("\"sessionId\":\"session_1_2\""));
    }
}
