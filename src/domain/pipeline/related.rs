use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use tracing::debug;
use uuid::Uuid;

use crate::domain::knowledge::{LegalArticle, LegalCase, LegalStore};
use crate::domain::question::{EntityBundle, QuestionCategory};
use crate::domain::DomainError;

pub const RELATED_LAW_CAP: usize = 5;
pub const RELATED_CASE_CAP: usize = 3;

/// Generic "<word>法/条例/规定/办法" pattern used when entity extraction
/// produced no law names.
static LAW_KEYWORD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^，。！？、\s]{2,15}(?:法|条例|规定|办法)").unwrap());

/// Hand-curated fallback keywords covering common domains, matched
/// longest-first.
static COMMON_LAW_KEYWORDS: Lazy<Vec<&'static str>> = Lazy::new(|| {
    let mut keywords = vec![
        // 劳动相关
        "劳动合同法",
        "劳动合同",
        "劳动法",
        "劳动",
        "工资",
        "加班",
        "社保",
        "解除",
        "违约",
        "赔偿",
        "补偿",
        // 婚姻家庭相关
        "婚姻法",
        "婚姻",
        "离婚",
        "结婚",
        "抚养",
        "赡养",
        "继承",
        "遗嘱",
        "财产分割",
        // 合同相关
        "合同法",
        "合同",
        "协议",
        // 程序相关
        "仲裁",
        "诉讼",
        "起诉",
        "上诉",
        "申诉",
        // 其他
        "侵权",
        "责任",
        "权利",
        "义务",
        "公司",
        "企业",
        "员工",
        "用人单位",
    ];
    keywords.sort_by_key(|kw| std::cmp::Reverse(kw.chars().count()));
    keywords.dedup();
    keywords
});

/// Stop words stripped from the question before case-keyword tokenization.
const CASE_STOP_WORDS: &[&str] = &[
    "讲讲", "说说", "介绍", "讲解", "说明", "怎么", "如何", "什么", "的", "了", "吗", "呢",
];

/// Finds related law articles: first by extracted law names, then by a
/// secondary keyword pass over the raw question. Results are filtered to
/// currently-valid articles, de-duplicated, and capped.
pub async fn find_related_laws(
    store: &dyn LegalStore,
    question: &str,
    entities: &EntityBundle,
) -> Result<Vec<LegalArticle>, DomainError> {
    let mut laws: Vec<LegalArticle> = Vec::new();

    for law_name in &entities.laws {
        let found = store.search_articles(law_name).await?;
        debug!(law = %law_name, count = found.len(), "articles by extracted law name");
        laws.extend(found);
    }

    if laws.is_empty() {
        let keywords = law_keywords_from_question(question);
        debug!(?keywords, "secondary law keyword pass");
        for keyword in &keywords {
            let found = store.search_articles(keyword).await?;
            laws.extend(found);
            if laws.len() >= 10 {
                break;
            }
        }
    }

    let mut seen: HashSet<Uuid> = HashSet::new();
    let result: Vec<LegalArticle> = laws
        .into_iter()
        .filter(|article| article.is_valid)
        .filter(|article| seen.insert(article.id))
        .take(RELATED_LAW_CAP)
        .collect();
    debug!(count = result.len(), "related laws");
    Ok(result)
}

fn law_keywords_from_question(question: &str) -> Vec<String> {
    let mut keywords: Vec<String> = Vec::new();
    for matched in LAW_KEYWORD_RE.find_iter(question) {
        let keyword = matched.as_str();
        if !keywords.iter().any(|existing| existing == keyword) {
            keywords.push(keyword.to_string());
        }
    }

    if keywords.is_empty() {
        for keyword in COMMON_LAW_KEYWORDS.iter() {
            if question.contains(keyword) && !keywords.iter().any(|existing| existing == keyword) {
                keywords.push(keyword.to_string());
            }
        }
    }

    keywords
}

/// Finds related cases by question keywords, falling back to the question
/// category when keyword search finds nothing.
pub async fn find_related_cases(
    store: &dyn LegalStore,
    question: &str,
    category: QuestionCategory,
) -> Result<Vec<LegalCase>, DomainError> {
    let mut cases: Vec<LegalCase> = Vec::new();

    let keywords = case_keywords_from_question(question);
    debug!(?keywords, "case search keywords");
    for keyword in &keywords {
        let found = store.search_cases(keyword).await?;
        cases.extend(found);
        if cases.len() >= 5 {
            break;
        }
    }

    if cases.is_empty() && category != QuestionCategory::Other {
        let by_type = store.cases_by_type(category.label()).await?;
        debug!(category = category.label(), count = by_type.len(), "cases by type");
        cases.extend(by_type);
    }

    let mut seen: HashSet<Uuid> = HashSet::new();
    let result: Vec<LegalCase> = cases
        .into_iter()
        .filter(|case| seen.insert(case.id))
        .take(RELATED_CASE_CAP)
        .collect();
    debug!(count = result.len(), "related cases");
    Ok(result)
}

/// Strips stop words, splits on punctuation and whitespace, and keeps
/// tokens of 2 to 10 characters, order-stable and de-duplicated.
fn case_keywords_from_question(question: &str) -> Vec<String> {
    let mut cleaned = question.to_string();
    for stop_word in CASE_STOP_WORDS {
        cleaned = cleaned.replace(stop_word, " ");
    }
    let cleaned: String = cleaned
        .chars()
        .map(|c| if matches!(c, '，' | '。' | '！' | '？' | '、') { ' ' } else { c })
        .collect();

    let mut keywords: Vec<String> = Vec::new();
    for token in cleaned.split_whitespace() {
        let len = token.chars().count();
        if (2..=10).contains(&len) && !keywords.iter().any(|existing| existing == token) {
            keywords.push(token.to_string());
        }
    }
    keywords
}
