use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use joe_assistant::{Assistant, ChatMessage, KnowledgeBase, OpenAIChatClient, Settings};
use joe_rag::RagConfig;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

/// Chat with Joe, grounded in your own text files.
#[derive(Debug, Parser)]
#[command(name = "joe", version)]
struct Cli {
    /// JSON settings file with API keys.
    #[arg(long, default_value = "joe-settings.json")]
    settings: PathBuf,

    /// Text files to add to the knowledge base before chatting.
    #[arg(short, long = "file")]
    files: Vec<PathBuf>,

    /// Ask a single question and exit instead of starting a session.
    question: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let cli = Cli::parse();
    let settings = Settings::load(&cli.settings).await?.with_env_overrides();
    let key = settings.openai_key().context("set openai_api_key or OPENAI_API_KEY")?.to_string();

    let knowledge = KnowledgeBase::from_settings(&settings, &RagConfig::default())?;
    if !cli.files.is_empty() {
        let report = knowledge.upload_files(&cli.files).await?;
        for (name, chunks) in &report.indexed {
            println!("added {name} ({chunks} chunks)");
        }
        for (name, error) in &report.failed {
            eprintln!("skipped {name}: {error}");
        }
    }

    let assistant = Assistant::new(knowledge, Arc::new(OpenAIChatClient::new(key)?));

    if let Some(question) = cli.question {
        println!("{}", assistant.reply(&[ChatMessage::user(question)]).await?);
        return Ok(());
    }

    let mut history = Vec::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match line.trim() {
            "" => continue,
            "/quit" => break,
            "/count" => {
                let knowledge = assistant.knowledge();
                println!("{} chunks ({})", knowledge.document_count().await?, knowledge.backend());
            }
            "/clear" => {
                assistant.knowledge().clear().await?;
                println!("knowledge base cleared");
            }
            text => {
                history.push(ChatMessage::user(text));
                match assistant.reply(&history).await {
                    Ok(reply) => {
                        println!("{reply}");
                        history.push(ChatMessage::assistant(reply));
                    }
                    Err(e) => {
                        history.pop();
                        eprintln!("error: {e}");
                    }
                }
            }
        }
    }
    Ok(())
}
