use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use tracing::debug;
use uuid::Uuid;

use crate::domain::knowledge::{clean_article_number, LegalArticle, LegalStore};
use crate::domain::DomainError;

pub const CITATION_CAP: usize = 10;
pub const CITATION_FILL_TARGET: usize = 5;

/// 《法律名称》第XXX条, Chinese-numeral or digit article numbers.
static BRACKETED_CITATION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"《([^》]+)》第?([一二三四五六七八九十百千万\d]+)条").unwrap());

/// 法律名称第XXX条 without brackets; the law-suffix requirement keeps the
/// pattern from swallowing arbitrary prose.
static PLAIN_CITATION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([^，。！？、\s]{2,20}(?:法|条例|规定|办法))第?([一二三四五六七八九十百千万\d]+)条")
        .unwrap()
});

/// Extracts the law citations a generated answer actually made and
/// matches them back to store records. De-duplicated, capped at 10.
pub async fn extract_cited_articles(
    store: &dyn LegalStore,
    answer: &str,
) -> Result<Vec<LegalArticle>, DomainError> {
    let mut cited: Vec<LegalArticle> = Vec::new();
    let mut seen: HashSet<Uuid> = HashSet::new();

    if answer.is_empty() {
        return Ok(cited);
    }

    for pattern in [&*BRACKETED_CITATION_RE, &*PLAIN_CITATION_RE] {
        for capture in pattern.captures_iter(answer) {
            let law_title = &capture[1];
            let article_number = &capture[2];
            let candidates = store.articles_by_title(law_title).await?;
            for candidate in candidates {
                if article_number_matches(&candidate.article_number, article_number)
                    && seen.insert(candidate.id)
                {
                    cited.push(candidate);
                }
            }
        }
    }

    debug!(count = cited.len(), "citations extracted from answer");
    Ok(cited.into_iter().take(CITATION_CAP).collect())
}

/// Replaces the pre-generation related-law guess with the citations the
/// answer actually used; if the answer yielded fewer than 5 distinct
/// citations, the gap is filled from the pre-generation list in order.
pub async fn reconcile_citations(
    store: &dyn LegalStore,
    answer: &str,
    related_laws: &[LegalArticle],
) -> Result<Vec<LegalArticle>, DomainError> {
    let mut reconciled = extract_cited_articles(store, answer).await?;

    if reconciled.len() < CITATION_FILL_TARGET {
        let cited_ids: HashSet<Uuid> = reconciled.iter().map(|article| article.id).collect();
        let gap = CITATION_FILL_TARGET - reconciled.len();
        reconciled.extend(
            related_laws
                .iter()
                .filter(|law| !cited_ids.contains(&law.id))
                .take(gap)
                .cloned(),
        );
    }

    Ok(reconciled)
}

/// Tolerant article-number comparison: exact match after stripping
/// formatting characters, numeric equality for pure digits, then
/// substring containment in either direction as a last-resort fuzzy
/// match. The containment rule can false-positive on short numbers
/// ("5" inside "25"); kept for compatibility with stored data.
fn article_number_matches(stored: &str, extracted: &str) -> bool {
    let stored = clean_article_number(stored);
    let extracted = clean_article_number(extracted);
    if stored.is_empty() || extracted.is_empty() {
        return false;
    }

    if stored == extracted {
        return true;
    }

    let both_digits =
        stored.chars().all(|c| c.is_ascii_digit()) && extracted.chars().all(|c| c.is_ascii_digit());
    if both_digits {
        return stored == extracted;
    }

    stored.contains(extracted.as_str()) || extracted.contains(stored.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::store::InMemoryLegalStore;

    fn article(title: &str, number: &str) -> LegalArticle {
        LegalArticle::new(title, number, format!("{}第{}条内容", title, number))
    }

    #[test]
    fn test_number_match_exact_and_formatted() {
        assert!(article_number_matches("577", "577"));
        assert!(article_number_matches("第577条", "577"));
        assert!(!article_number_matches("577", "578"));
    }

    #[test]
    fn test_number_match_digits_are_strict() {
        // Pure digits compare numerically equal only; "5" must not match "25".
        assert!(!article_number_matches("25", "5"));
    }

    #[test]
    fn test_number_match_containment_fallback() {
        // Mixed numeral forms fall back to containment.
        assert!(article_number_matches("五百七十七之一", "五百七十七"));
        assert!(article_number_matches("第五百七十七条", "五百七十七"));
    }

    #[tokio::test]
    async fn test_bracketed_citation_extraction() {
        let store = InMemoryLegalStore::new()
            .with_articles(vec![article("民法典", "577"), article("民法典", "578")]);

        let cited = extract_cited_articles(&store, "依据《民法典》第577条，应当承担违约责任。")
            .await
            .unwrap();

        assert_eq!(cited.len(), 1);
        assert_eq!(cited[0].article_number, "577");
    }

    #[tokio::test]
    async fn test_plain_citation_extraction() {
        let store = InMemoryLegalStore::new().with_articles(vec![article("劳动合同法", "38")]);

        let cited = extract_cited_articles(&store, "根据劳动合同法第38条，劳动者可以解除合同。")
            .await
            .unwrap();

        assert_eq!(cited.len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_articles_never_cited() {
        let store = InMemoryLegalStore::new()
            .with_articles(vec![article("婚姻法", "32").invalidated()]);

        let cited = extract_cited_articles(&store, "《婚姻法》第32条已废止。").await.unwrap();
        assert!(cited.is_empty());
    }

    #[tokio::test]
    async fn test_citations_deduplicated_across_patterns() {
        // The same article cited with and without brackets must appear once.
        let store = InMemoryLegalStore::new().with_articles(vec![article("民法典", "577")]);

        let answer = "《民法典》第577条规定……民法典第577条还规定……";
        let cited = extract_cited_articles(&store, answer).await.unwrap();
        assert_eq!(cited.len(), 1);
    }

    #[tokio::test]
    async fn test_citation_cap() {
        let articles: Vec<LegalArticle> =
            (1..=15).map(|n| article("刑法", &n.to_string())).collect();
        let store = InMemoryLegalStore::new().with_articles(articles);

        let answer: String = (1..=15)
            .map(|n| format!("《刑法》第{}条。", n))
            .collect();
        let cited = extract_cited_articles(&store, &answer).await.unwrap();
        assert!(cited.len() <= CITATION_CAP);

        let ids: HashSet<Uuid> = cited.iter().map(|a| a.id).collect();
        assert_eq!(ids.len(), cited.len());
    }

    #[tokio::test]
    async fn test_reconcile_fills_gap_from_related_in_order() {
        let cited_article = article("民法典", "577");
        let related: Vec<LegalArticle> = vec![
            cited_article.clone(),
            article("民法典", "584"),
            article("合同法", "107"),
        ];
        let store = InMemoryLegalStore::new().with_articles(vec![cited_article.clone()]);

        let reconciled =
            reconcile_citations(&store, "《民法典》第577条……", &related).await.unwrap();

        // The cited article comes first, then the related list in order,
        // without duplicating the cited one.
        assert_eq!(reconciled.len(), 3);
        assert_eq!(reconciled[0].id, cited_article.id);
        assert_eq!(reconciled[1].article_number, "584");
        assert_eq!(reconciled[2].article_number, "107");
    }

    #[tokio::test]
    async fn test_reconcile_without_citations_uses_related() {
        let related = vec![article("劳动法", "36"), article("劳动法", "41")];
        let store = InMemoryLegalStore::new();

        let reconciled = reconcile_citations(&store, "一般性建议，无引用。", &related)
            .await
            .unwrap();
        assert_eq!(reconciled.len(), 2);
    }
}
