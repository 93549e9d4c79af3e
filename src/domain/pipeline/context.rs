use tracing::debug;

use crate::domain::knowledge::LegalStore;
use crate::domain::question::EntityBundle;
use crate::domain::DomainError;

/// Assembles the retrieval context blob passed to the generation backend.
///
/// Three independent sections, in insertion order: up to 3 knowledge-base
/// entries matching the question, up to 3 article excerpts per extracted
/// law name, and concept definitions for extracted concept names. An
/// empty result simply omits that section; it is never an error.
pub async fn assemble_context(
    store: &dyn LegalStore,
    question: &str,
    entities: &EntityBundle,
) -> Result<String, DomainError> {
    let mut context = String::new();

    let similar = store.search_knowledge(question, 3).await?;
    if !similar.is_empty() {
        context.push_str("相关问答：\n");
        for entry in &similar {
            context.push_str(&format!("Q: {}\nA: {}\n\n", entry.question, entry.answer));
        }
    }

    for law in &entities.laws {
        let articles = store.search_articles(law).await?;
        if !articles.is_empty() {
            context.push_str("相关法条：\n");
            for article in articles.iter().take(3) {
                context.push_str(&format!(
                    "{}第{}条：{}\n\n",
                    article.title, article.article_number, article.content
                ));
            }
        }
    }

    for concept in &entities.concepts {
        if let Some(found) = store.concept_by_name(concept).await? {
            context.push_str(&format!("概念定义：{} - {}\n\n", found.name, found.definition));
        }
    }

    debug!(context_len = context.len(), "assembled retrieval context");
    Ok(context)
}
