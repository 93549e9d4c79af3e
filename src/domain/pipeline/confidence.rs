use once_cell::sync::Lazy;
use regex::Regex;

use crate::domain::knowledge::{LegalArticle, LegalCase};
use crate::domain::question::EntityBundle;

static DIGIT_ARTICLE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"第\d+条").unwrap());

/// Computes the trust estimate for a generated answer as the sum of five
/// independently-capped sub-scores, clamped to [0, 1].
///
/// The five-way weighting keeps the score explainable and stable under
/// partial data: an unavailable collaborator degrades one term, not the
/// whole score.
pub fn evaluate_confidence(
    question: &str,
    answer: &str,
    context: &str,
    related_laws: &[LegalArticle],
    related_cases: &[LegalCase],
    entities: &EntityBundle,
) -> f64 {
    let score = answer_quality(question, answer)
        + legal_citation(answer, related_laws)
        + knowledge_match(context)
        + related_resources(related_laws, related_cases)
        + entity_recognition(entities);
    score.clamp(0.0, 1.0)
}

/// Answer quality, capped at 0.30. Length tiers, question-keyword
/// coverage, and structural markers; an answer under 20 characters is
/// penalized, so this term alone may go slightly negative.
fn answer_quality(question: &str, answer: &str) -> f64 {
    let mut score = 0.0;

    let answer_len = answer.chars().count();
    if answer_len > 500 {
        score += 0.15;
    } else if answer_len > 200 {
        score += 0.10;
    } else if answer_len > 100 {
        score += 0.05;
    } else if answer_len < 20 {
        score -= 0.05;
    }

    let keywords: Vec<&str> = split_on_punctuation(question);
    if !keywords.is_empty() {
        let matched = keywords.iter().filter(|kw| answer.contains(**kw)).count();
        score += matched as f64 / keywords.len() as f64 * 0.10;
    }

    let structured = answer.contains('\n')
        || answer.contains('。')
        || answer.contains("1.")
        || answer.contains("一、")
        || answer.contains('（')
        || answer.contains('(');
    if structured {
        score += 0.05;
    }

    score.min(0.30)
}

/// Legal citation, capped at 0.25. Bracketed titles, 第X条 phrasing, and
/// literal appearance of supplied related laws in the answer.
fn legal_citation(answer: &str, related_laws: &[LegalArticle]) -> f64 {
    let mut score = 0.0;

    if answer.contains('《') && answer.contains('》') {
        score += 0.10;
        let bracket_count = answer.chars().filter(|c| *c == '《').count();
        if bracket_count > 1 {
            score += 0.05;
        }
    }

    if answer.contains('第') && answer.contains('条') {
        score += 0.10;
        if DIGIT_ARTICLE_RE.is_match(answer) {
            score += 0.05;
        }
    }

    if !related_laws.is_empty() {
        let mut matched = 0usize;
        for law in related_laws {
            if answer.contains(law.title.as_str()) {
                matched += 1;
            }
            if answer.contains(&format!("第{}条", law.article_number)) {
                matched += 1;
            }
        }
        if matched > 0 {
            score += (0.05 * matched as f64).min(0.05);
        }
    }

    score.min(0.25)
}

/// Knowledge match, capped at 0.20. Rewards a non-empty retrieval
/// context, its length, and the presence of section markers.
fn knowledge_match(context: &str) -> f64 {
    let mut score: f64 = 0.0;

    if !context.trim().is_empty() {
        score += 0.10;

        let context_len = context.chars().count();
        if context_len > 500 {
            score += 0.10;
        } else if context_len > 200 {
            score += 0.05;
        }

        if context.contains("相关问答") || context.contains("相关法条") || context.contains("概念定义")
        {
            score += 0.05;
        }
    }

    score.min(0.20)
}

/// Related resources, capped at 0.15.
fn related_resources(related_laws: &[LegalArticle], related_cases: &[LegalCase]) -> f64 {
    let mut score: f64 = 0.0;

    if !related_laws.is_empty() {
        score += 0.08;
        if related_laws.len() > 2 {
            score += 0.02;
        }
    }

    if !related_cases.is_empty() {
        score += 0.07;
        if related_cases.len() > 1 {
            score += 0.03;
        }
    }

    score.min(0.15)
}

/// Entity recognition, capped at 0.10.
fn entity_recognition(entities: &EntityBundle) -> f64 {
    let mut score: f64 = 0.0;
    let total = entities.total();

    if total > 0 {
        score += 0.05;
        if total > 2 {
            score += 0.05;
        } else {
            score += 0.02;
        }
    }

    score.min(0.10)
}

/// Question tokens for keyword coverage: split on Chinese punctuation and
/// whitespace, keeping tokens longer than one character.
fn split_on_punctuation(question: &str) -> Vec<&str> {
    question
        .split(|c: char| matches!(c, '，' | '。' | '！' | '？' | '、') || c.is_whitespace())
        .filter(|token| token.chars().count() > 1)
        .collect()
}
