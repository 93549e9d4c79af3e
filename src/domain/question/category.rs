use serde::{Deserialize, Serialize};

/// Fixed taxonomy of question categories.
///
/// Labels are the Chinese strings persisted with each QA record and used
/// by the case-type fallback search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuestionCategory {
    #[serde(rename = "法条查询")]
    StatuteLookup,
    #[serde(rename = "概念定义")]
    Definition,
    #[serde(rename = "程序咨询")]
    Procedure,
    #[serde(rename = "案例分析")]
    CaseAnalysis,
    #[serde(rename = "法律咨询")]
    Consultation,
    #[serde(rename = "其他")]
    Other,
}

const DEFINITION_KEYWORDS: &[&str] = &["是什么", "定义", "概念", "含义", "什么意思"];
const PROCEDURE_KEYWORDS: &[&str] = &["怎么", "如何", "流程", "程序", "步骤", "怎么办"];
const CASE_KEYWORDS: &[&str] = &["案例", "判例", "判决", "判刑", "量刑"];
const CONSULTATION_KEYWORDS: &[&str] = &["可以", "能否", "是否", "需要", "应该", "必须"];

impl QuestionCategory {
    /// Classifies a question by ordered keyword rules.
    ///
    /// Rules are evaluated in fixed priority order and the first match
    /// wins; categories are not mutually exclusive in surface form, so
    /// the order is load-bearing (a statute lookup may also contain
    /// "是否").
    pub fn classify(question: &str) -> Self {
        if question.contains('第') && (question.contains('条') || question.contains('款')) {
            return Self::StatuteLookup;
        }
        if contains_any(question, DEFINITION_KEYWORDS) {
            return Self::Definition;
        }
        if contains_any(question, PROCEDURE_KEYWORDS) {
            return Self::Procedure;
        }
        if contains_any(question, CASE_KEYWORDS) {
            return Self::CaseAnalysis;
        }
        if contains_any(question, CONSULTATION_KEYWORDS) {
            return Self::Consultation;
        }
        Self::Other
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::StatuteLookup => "法条查询",
            Self::Definition => "概念定义",
            Self::Procedure => "程序咨询",
            Self::CaseAnalysis => "案例分析",
            Self::Consultation => "法律咨询",
            Self::Other => "其他",
        }
    }
}

fn contains_any(text: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|kw| text.contains(kw))
}
