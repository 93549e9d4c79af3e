use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, error, info};
use uuid::Uuid;

use super::confidence::evaluate_confidence;
use super::context::assemble_context;
use super::events::{ArticlePayload, CasePayload, StreamEvent};
use super::reconciler::reconcile_citations;
use super::related::{find_related_cases, find_related_laws};
use crate::domain::generation::GenerationBackend;
use crate::domain::knowledge::{LegalArticle, LegalCase, LegalStore, QaRecord};
use crate::domain::question::{extract_entities, EntityBundle, Question, QuestionCategory};
use crate::domain::DomainError;

const PIPELINE_FAILED_MSG: &str = "failed to process question";
const EMPTY_STREAM_FALLBACK: &str = "抱歉，暂时无法生成答案，请稍后再试。";

/// The complete result of one pipeline execution.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QaResponse {
    pub id: Uuid,
    pub question: String,
    pub answer: String,
    pub category: QuestionCategory,
    pub confidence: f64,
    pub entities: EntityBundle,
    pub related_laws: Vec<LegalArticle>,
    pub related_cases: Vec<LegalCase>,
    pub session_id: String,
}

/// Sequences classification, extraction, retrieval, generation, citation
/// reconciliation, scoring and persistence.
///
/// Each execution is per-request-local; the store and the generation
/// backend are the only shared collaborators.
#[derive(Debug, Clone)]
pub struct QaPipeline {
    store: Arc<dyn LegalStore>,
    generator: Arc<dyn GenerationBackend>,
}

impl QaPipeline {
    pub fn new(store: Arc<dyn LegalStore>, generator: Arc<dyn GenerationBackend>) -> Self {
        Self { store, generator }
    }

    /// Synchronous variant: runs the full pipeline and returns the
    /// complete result. A degraded generation is not a failure; the
    /// apology text is scored and persisted like any other answer.
    pub async fn answer(&self, question: Question) -> Result<QaResponse, DomainError> {
        let started = Instant::now();
        info!(question = %question.text, session = %question.session_id, "processing question");

        let category = QuestionCategory::classify(&question.text);
        let entities = extract_entities(&question.text);
        debug!(category = category.label(), entity_count = entities.total(), "question analyzed");

        let context = self.pre_generation(
            assemble_context(self.store.as_ref(), &question.text, &entities).await,
        )?;

        let generated = self.generator.complete(&question.text, &context).await;
        debug!(
            status = ?generated.status,
            answer_len = generated.text.chars().count(),
            "generation finished"
        );

        let related_laws =
            find_related_laws(self.store.as_ref(), &question.text, &entities).await?;
        let related_cases =
            find_related_cases(self.store.as_ref(), &question.text, category).await?;

        let confidence = evaluate_confidence(
            &question.text,
            &generated.text,
            &context,
            &related_laws,
            &related_cases,
            &entities,
        );

        let record = self
            .persist(
                &question,
                &generated.text,
                category,
                confidence,
                &entities,
                &related_laws,
                &related_cases,
            )
            .await?;

        info!(
            id = %record.id,
            confidence,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "question processed"
        );

        Ok(QaResponse {
            id: record.id,
            question: question.text,
            answer: generated.text,
            category,
            confidence,
            entities,
            related_laws,
            related_cases,
            session_id: question.session_id,
        })
    }

    /// Streaming variant: emits `start`, `related`, one `delta` per
    /// answer fragment, `metadata` after persistence, and a terminal
    /// `end`/`error`. The related-law list in `metadata` is the
    /// post-generation reconciled list.
    pub async fn answer_stream(
        &self,
        question: Question,
        events: mpsc::UnboundedSender<StreamEvent>,
    ) -> Result<QaResponse, DomainError> {
        let started = Instant::now();
        info!(question = %question.text, session = %question.session_id, "processing question (stream)");

        let _ = events.send(StreamEvent::Start {
            session_id: question.session_id.clone(),
        });

        let category = QuestionCategory::classify(&question.text);
        let entities = extract_entities(&question.text);

        let prepared = async {
            let context =
                assemble_context(self.store.as_ref(), &question.text, &entities).await?;
            let related_laws =
                find_related_laws(self.store.as_ref(), &question.text, &entities).await?;
            let related_cases =
                find_related_cases(self.store.as_ref(), &question.text, category).await?;
            Ok::<_, DomainError>((context, related_laws, related_cases))
        }
        .await;

        let (context, related_laws, related_cases) = match prepared {
            Ok(prepared) => prepared,
            Err(cause) => {
                error!(%cause, "pipeline failed before generation");
                let _ = events.send(StreamEvent::Error {
                    message: PIPELINE_FAILED_MSG.to_string(),
                });
                return Err(DomainError::internal(PIPELINE_FAILED_MSG));
            }
        };

        let _ = events.send(StreamEvent::Related {
            related_laws: related_laws.iter().map(ArticlePayload::from).collect(),
            related_cases: related_cases.iter().map(CasePayload::from).collect(),
            entities: entities.clone(),
        });

        // Deltas are forwarded one-by-one, in arrival order; the
        // forwarder also rebuilds the answer so it can be reconciled
        // against the trailing value the client returns.
        let (delta_tx, mut delta_rx) = mpsc::unbounded_channel::<String>();
        let forward_events = events.clone();
        let forwarder = tokio::spawn(async move {
            let mut accumulated = String::new();
            while let Some(chunk) = delta_rx.recv().await {
                accumulated.push_str(&chunk);
                let _ = forward_events.send(StreamEvent::Delta { content: chunk });
            }
            accumulated
        });

        let generated = self
            .generator
            .complete_streaming(&question.text, &context, delta_tx)
            .await;
        let accumulated = forwarder.await.unwrap_or_default();

        // The longer value wins; a trailing "complete" answer may carry
        // content the callback never saw.
        let mut answer_text = if generated.text.chars().count() > accumulated.chars().count() {
            generated.text.clone()
        } else {
            accumulated
        };
        if answer_text.is_empty() {
            answer_text = EMPTY_STREAM_FALLBACK.to_string();
        }
        debug!(
            status = ?generated.status,
            answer_len = answer_text.chars().count(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "streamed generation finished"
        );

        let confidence = evaluate_confidence(
            &question.text,
            &answer_text,
            &context,
            &related_laws,
            &related_cases,
            &entities,
        );

        let persisted = self
            .persist(
                &question,
                &answer_text,
                category,
                confidence,
                &entities,
                &related_laws,
                &related_cases,
            )
            .await;
        let record = match persisted {
            Ok(record) => record,
            Err(cause) => {
                error!(%cause, "failed to persist QA record");
                let _ = events.send(StreamEvent::Error {
                    message: PIPELINE_FAILED_MSG.to_string(),
                });
                return Err(cause);
            }
        };

        let reconciled =
            match reconcile_citations(self.store.as_ref(), &answer_text, &related_laws).await {
                Ok(reconciled) => reconciled,
                Err(cause) => {
                    error!(%cause, "citation reconciliation failed");
                    let _ = events.send(StreamEvent::Error {
                        message: PIPELINE_FAILED_MSG.to_string(),
                    });
                    return Err(cause);
                }
            };

        let _ = events.send(StreamEvent::Metadata {
            id: record.id,
            category,
            confidence,
            session_id: question.session_id.clone(),
            related_laws: reconciled.iter().map(ArticlePayload::from).collect(),
            related_cases: related_cases.iter().map(CasePayload::from).collect(),
            entities: entities.clone(),
        });
        let _ = events.send(StreamEvent::End);

        info!(
            id = %record.id,
            confidence,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "question processed (stream)"
        );

        Ok(QaResponse {
            id: record.id,
            question: question.text,
            answer: answer_text,
            category,
            confidence,
            entities,
            related_laws: reconciled,
            related_cases,
            session_id: question.session_id,
        })
    }

    /// Marks a persisted record as having received feedback.
    pub async fn submit_feedback(
        &self,
        id: &Uuid,
        feedback_type: impl Into<String> + Send,
    ) -> Result<(), DomainError> {
        let mut record = self.require_record(id).await?;
        record.is_feedback = true;
        record.feedback_type = Some(feedback_type.into());
        self.store.save_record(record).await?;
        Ok(())
    }

    /// Flips the favorite flag and returns the new state.
    pub async fn toggle_favorite(&self, id: &Uuid) -> Result<bool, DomainError> {
        let mut record = self.require_record(id).await?;
        record.is_favorite = !record.is_favorite;
        let favorite = record.is_favorite;
        self.store.save_record(record).await?;
        Ok(favorite)
    }

    async fn require_record(&self, id: &Uuid) -> Result<QaRecord, DomainError> {
        self.store
            .record_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("QA record '{}' not found", id)))
    }

    fn pre_generation<T>(&self, result: Result<T, DomainError>) -> Result<T, DomainError> {
        result.map_err(|cause| {
            error!(%cause, "pipeline failed before generation");
            DomainError::internal(PIPELINE_FAILED_MSG)
        })
    }

    #[allow(clippy::too_many_arguments)]
    async fn persist(
        &self,
        question: &Question,
        answer: &str,
        category: QuestionCategory,
        confidence: f64,
        entities: &EntityBundle,
        related_laws: &[LegalArticle],
        related_cases: &[LegalCase],
    ) -> Result<QaRecord, DomainError> {
        let law_labels: Vec<String> = related_laws
            .iter()
            .map(LegalArticle::display_name)
            .collect();
        let case_titles: Vec<String> =
            related_cases.iter().map(|case| case.title.clone()).collect();

        let record = QaRecord {
            id: Uuid::new_v4(),
            user_id: question.user_id,
            question: question.text.clone(),
            answer: answer.to_string(),
            category,
            confidence,
            entities: serialize_column(entities)?,
            related_laws: serialize_column(&law_labels)?,
            related_cases: serialize_column(&case_titles)?,
            session_id: question.session_id.clone(),
            is_feedback: false,
            feedback_type: None,
            is_favorite: false,
            created_at: Utc::now(),
        };
        self.store.save_record(record).await
    }
}

fn serialize_column<T: Serialize>(value: &T) -> Result<String, DomainError> {
    serde_json::to_string(value)
        .map_err(|e| DomainError::internal(format!("failed to serialize column: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::generation::{GenerationStatus, MockGenerationBackend};
    use crate::domain::knowledge::KnowledgeEntry;
    use crate::infrastructure::store::InMemoryLegalStore;

    fn pipeline_with(
        store: InMemoryLegalStore,
        backend: MockGenerationBackend,
    ) -> (QaPipeline, Arc<InMemoryLegalStore>) {
        let store = Arc::new(store);
        let pipeline = QaPipeline::new(store.clone(), Arc::new(backend));
        (pipeline, store)
    }

    #[tokio::test]
    async fn test_sync_pipeline_persists_record() {
        let store = InMemoryLegalStore::new().with_knowledge(vec![KnowledgeEntry::new(
            "合同违约怎么办",
            "可以主张违约责任",
            0.9,
        )]);
        let backend =
            MockGenerationBackend::new("根据《民法典》第577条，违约方应当承担违约责任。");
        let (pipeline, store) = pipeline_with(store, backend);

        let response = pipeline
            .answer(Question::new("合同违约怎么办"))
            .await
            .unwrap();

        assert!((0.0..=1.0).contains(&response.confidence));
        assert_eq!(response.category, QuestionCategory::Procedure);

        let record = store.record_by_id(&response.id).await.unwrap().unwrap();
        assert_eq!(record.answer, response.answer);
        assert!(!record.is_feedback);
        assert!(!record.is_favorite);

        let entities: EntityBundle = serde_json::from_str(&record.entities).unwrap();
        assert_eq!(entities, response.entities);
    }

    #[tokio::test]
    async fn test_degraded_generation_still_persists() {
        let backend = MockGenerationBackend::new("抱歉，生成答案时出现错误，请稍后再试。")
            .with_status(GenerationStatus::RetriesExhausted);
        let (pipeline, store) = pipeline_with(InMemoryLegalStore::new(), backend);

        let response = pipeline.answer(Question::new("测试")).await.unwrap();
        assert!(store.record_by_id(&response.id).await.unwrap().is_some());
        assert!((0.0..=1.0).contains(&response.confidence));
    }

    #[tokio::test]
    async fn test_stream_event_order() {
        let backend =
            MockGenerationBackend::new("answer").with_chunks(vec!["an", "sw", "er"]);
        let (pipeline, _store) = pipeline_with(InMemoryLegalStore::new(), backend);

        let (tx, mut rx) = mpsc::unbounded_channel();
        let response = pipeline
            .answer_stream(Question::new("问题"), tx)
            .await
            .unwrap();
        assert_eq!(response.answer, "answer");

        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }

        assert!(matches!(events.first(), Some(StreamEvent::Start { .. })));
        assert!(matches!(events.get(1), Some(StreamEvent::Related { .. })));
        let deltas: Vec<String> = events
            .iter()
            .filter_map(|event| match event {
                StreamEvent::Delta { content } => Some(content.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(deltas, vec!["an", "sw", "er"]);
        assert!(matches!(
            events[events.len() - 2],
            StreamEvent::Metadata { .. }
        ));
        assert!(matches!(events.last(), Some(StreamEvent::End)));
    }

    #[tokio::test]
    async fn test_stream_deltas_concatenate_to_answer() {
        let backend = MockGenerationBackend::new("完整答案内容");
        let (pipeline, _store) = pipeline_with(InMemoryLegalStore::new(), backend);

        let (tx, mut rx) = mpsc::unbounded_channel();
        let response = pipeline
            .answer_stream(Question::new("问题"), tx)
            .await
            .unwrap();

        let mut concatenated = String::new();
        while let Ok(event) = rx.try_recv() {
            if let StreamEvent::Delta { content } = event {
                concatenated.push_str(&content);
            }
        }
        assert_eq!(concatenated, response.answer);
    }

    #[tokio::test]
    async fn test_longer_trailing_answer_wins() {
        let backend = MockGenerationBackend::new("部分")
            .with_chunks(vec!["部分"])
            .with_trailing_answer("部分之后还有更多内容");
        let (pipeline, _store) = pipeline_with(InMemoryLegalStore::new(), backend);

        let (tx, _rx) = mpsc::unbounded_channel();
        let response = pipeline
            .answer_stream(Question::new("问题"), tx)
            .await
            .unwrap();
        assert_eq!(response.answer, "部分之后还有更多内容");
    }

    #[tokio::test]
    async fn test_empty_stream_falls_back_to_apology() {
        let backend = MockGenerationBackend::new("").with_chunks(vec![]);
        let (pipeline, _store) = pipeline_with(InMemoryLegalStore::new(), backend);

        let (tx, _rx) = mpsc::unbounded_channel();
        let response = pipeline
            .answer_stream(Question::new("问题"), tx)
            .await
            .unwrap();
        assert_eq!(response.answer, EMPTY_STREAM_FALLBACK);
    }

    #[tokio::test]
    async fn test_metadata_carries_reconciled_laws() {
        use crate::domain::knowledge::LegalArticle;

        let cited = LegalArticle::new("民法典", "577", "违约责任条款");
        let store = InMemoryLegalStore::new().with_articles(vec![cited.clone()]);
        let backend = MockGenerationBackend::new("依据《民法典》第577条，应承担责任。");
        let (pipeline, _store) = pipeline_with(store, backend);

        let (tx, mut rx) = mpsc::unbounded_channel();
        pipeline
            .answer_stream(Question::new("你好"), tx)
            .await
            .unwrap();

        let mut metadata_laws = None;
        while let Ok(event) = rx.try_recv() {
            if let StreamEvent::Metadata { related_laws, .. } = event {
                metadata_laws = Some(related_laws);
            }
        }
        let metadata_laws = metadata_laws.expect("metadata event missing");
        assert!(metadata_laws.iter().any(|law| law.id == cited.id));
    }

    #[tokio::test]
    async fn test_feedback_and_favorite_toggles() {
        let backend = MockGenerationBackend::new("答案");
        let (pipeline, store) = pipeline_with(InMemoryLegalStore::new(), backend);

        let response = pipeline.answer(Question::new("问题")).await.unwrap();

        pipeline.submit_feedback(&response.id, "helpful").await.unwrap();
        let record = store.record_by_id(&response.id).await.unwrap().unwrap();
        assert!(record.is_feedback);
        assert_eq!(record.feedback_type.as_deref(), Some("helpful"));

        assert!(pipeline.toggle_favorite(&response.id).await.unwrap());
        assert!(!pipeline.toggle_favorite(&response.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_feedback_on_missing_record_is_not_found() {
        let backend = MockGenerationBackend::new("答案");
        let (pipeline, _store) = pipeline_with(InMemoryLegalStore::new(), backend);

        let missing = Uuid::new_v4();
        let result = pipeline.submit_feedback(&missing, "helpful").await;
        assert!(matches!(result, Err(DomainError::NotFound { .. })));
    }
}
