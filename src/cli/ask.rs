//! Ask command - runs one question through the pipeline

use std::sync::Arc;
use std::time::Duration;

use clap::Args;
use tokio::sync::mpsc;
use tracing::info;

use crate::config::AppConfig;
use crate::domain::knowledge::{KnowledgeEntry, LegalArticle, LegalConcept};
use crate::domain::pipeline::{QaPipeline, StreamEvent};
use crate::domain::question::Question;
use crate::infrastructure::llm::{GenerationClient, ReqwestTransport};
use crate::infrastructure::logging;
use crate::infrastructure::store::InMemoryLegalStore;

#[derive(Args)]
pub struct AskArgs {
    /// The question to answer
    pub question: String,

    /// Stream the answer incrementally instead of waiting for the full text
    #[arg(long)]
    pub stream: bool,

    /// Reuse an existing session id
    #[arg(long)]
    pub session: Option<String>,
}

pub async fn run(args: AskArgs) -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load().unwrap_or_default();
    logging::init_logging(&config.logging);

    let transport = ReqwestTransport::new(Duration::from_millis(config.generation.timeout_ms));
    let generator = GenerationClient::new(transport, config.generation.clone());
    let pipeline = QaPipeline::new(Arc::new(demo_store()), Arc::new(generator));

    let mut question = Question::new(&args.question);
    if let Some(session) = args.session {
        question = question.with_session(session);
    }

    if args.stream {
        ask_streaming(pipeline, question).await
    } else {
        ask_blocking(pipeline, question).await
    }
}

async fn ask_blocking(pipeline: QaPipeline, question: Question) -> anyhow::Result<()> {
    let response = pipeline.answer(question).await?;

    println!("{}", response.answer);
    println!();
    println!("分类：{}  置信度：{:.2}", response.category.label(), response.confidence);
    for law in &response.related_laws {
        println!("相关法条：{}", law.display_name());
    }
    for case in &response.related_cases {
        println!("相关案例：{}", case.title);
    }
    info!(id = %response.id, session = %response.session_id, "record saved");
    Ok(())
}

async fn ask_streaming(pipeline: QaPipeline, question: Question) -> anyhow::Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let task = tokio::spawn(async move { pipeline.answer_stream(question, tx).await });

    while let Some(event) = rx.recv().await {
        match event {
            StreamEvent::Start { session_id } => {
                info!(session = %session_id, "stream started");
            }
            StreamEvent::Delta { content } => {
                use std::io::Write;
                print!("{}", content);
                std::io::stdout().flush()?;
            }
            StreamEvent::Related { related_laws, .. } => {
                info!(laws = related_laws.len(), "related resources found");
            }
            StreamEvent::Metadata { category, confidence, related_laws, .. } => {
                println!();
                println!();
                println!("分类：{}  置信度：{:.2}", category.label(), confidence);
                for law in &related_laws {
                    println!("相关法条：{}第{}条", law.title, law.article_number);
                }
            }
            StreamEvent::End => break,
            StreamEvent::Error { message } => {
                anyhow::bail!("{}", message);
            }
        }
    }

    task.await??;
    Ok(())
}

/// A small built-in corpus so the pipeline has something to retrieve
/// when no external store is wired up.
fn demo_store() -> InMemoryLegalStore {
    InMemoryLegalStore::new()
        .with_articles(vec![
            LegalArticle::new(
                "民法典",
                "577",
                "当事人一方不履行合同义务或者履行合同义务不符合约定的，应当承担继续履行、采取补救措施或者赔偿损失等违约责任。",
            ),
            LegalArticle::new(
                "民法典",
                "1079",
                "夫妻一方要求离婚的，可以由有关组织进行调解或者直接向人民法院提起离婚诉讼。",
            ),
            LegalArticle::new(
                "劳动法",
                "44",
                "安排劳动者延长工作时间的，支付不低于工资的百分之一百五十的工资报酬。",
            ),
        ])
        .with_concepts(vec![
            LegalConcept::new("违约责任", "当事人不履行合同义务或者履行合同义务不符合约定时依法承担的民事责任。"),
            LegalConcept::new("诉讼时效", "权利人在法定期间内不行使权利即丧失请求法院保护的权利的制度。"),
        ])
        .with_knowledge(vec![
            KnowledgeEntry::new(
                "合同违约怎么办",
                "可以要求继续履行、采取补救措施或者赔偿损失，必要时向法院起诉。",
                0.9,
            ),
        ])
}
