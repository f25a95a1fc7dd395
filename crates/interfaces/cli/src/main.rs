use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use uuid::Uuid;

use lendcore_config::AppConfig;
use lendcore_eligibility::{EligibilityRegistry, RegistryPaths};
use lendcore_llm::{
    EmbeddingProvider, GeminiEmbeddingProvider, GeminiGenerationProvider, GenerationProvider,
    OllamaEmbeddingProvider, OllamaGenerationProvider,
};
use lendcore_memory::ConversationManager;
use lendcore_observability::EventSink;
use lendcore_retrieval::EmbeddingSpaceRegistry;
use lendcore_runtime::Router;

/// Staff-facing digital lending assistant, run as an interactive terminal session.
#[derive(Debug, Parser)]
#[command(name = "lendcore", version, about = "Digital lending assistant")]
struct Cli {
    /// Path to the TOML config file. Missing file falls back to defaults.
    #[arg(long, default_value = "lendcore.toml")]
    config: PathBuf,

    /// User id to run this session as.
    #[arg(long, default_value = "staff-local")]
    user: String,
}

fn build_embedding_provider(config: &AppConfig) -> Arc<dyn EmbeddingProvider> {
    if config.providers.embedding_provider.eq_ignore_ascii_case("gemini") {
        Arc::new(GeminiEmbeddingProvider::new(
            config.providers.gemini_api_key.clone(),
            config.providers.gemini_embed_model.clone(),
            768,
        ))
    } else {
        Arc::new(OllamaEmbeddingProvider::new(
            config.providers.ollama_base_url.clone(),
            config.providers.ollama_embed_model.clone(),
            768,
        ))
    }
}

fn build_generation_provider(config: &AppConfig) -> Arc<dyn GenerationProvider> {
    if config.providers.generation_provider.eq_ignore_ascii_case("gemini") {
        Arc::new(GeminiGenerationProvider::new(
            config.providers.gemini_api_key.clone(),
            config.providers.gemini_generate_model.clone(),
        ))
    } else {
        Arc::new(OllamaGenerationProvider::new(
            config.providers.ollama_base_url.clone(),
            config.providers.ollama_generate_model.clone(),
        ))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load_from(&cli.config)?;

    let eligibility = EligibilityRegistry::load(RegistryPaths {
        checks_catalog: std::path::Path::new(&config.eligibility.checks_catalog_path),
        reason_rules: std::path::Path::new(&config.eligibility.reason_rules_path),
        reason_playbook: std::path::Path::new(&config.eligibility.reason_playbook_path),
        eligible_customers: std::path::Path::new(&config.eligibility.eligible_customers_path),
        reasons_file: std::path::Path::new(&config.eligibility.reasons_file_path),
    })
    .context("failed to load eligibility registry")?;

    let conversations = ConversationManager::open(config.memory.clone())
        .context("failed to open conversation manager")?;

    let embedding_registry = EmbeddingSpaceRegistry::from_config(&config.providers, &config.retrieval);

    let router = Router::new(
        Arc::new(eligibility),
        Arc::new(conversations),
        Arc::new(embedding_registry),
        build_embedding_provider(&config),
        build_generation_provider(&config),
        config.retrieval.clone(),
        config.memory.clone(),
        EventSink::new(".lendcore/events.jsonl"),
    );

    let conversation_id = Uuid::new_v4();
    println!("lendcore assistant ready. conversation: {conversation_id}. Ctrl-D to quit.");

    let stdin = io::stdin();
    loop {
        print!("> ");
        io::stdout().flush().ok();

        let mut line = String::new();
        let bytes_read = stdin.read_line(&mut line).context("failed to read stdin")?;
        if bytes_read == 0 {
            break;
        }
        let text = line.trim();
        if text.is_empty() {
            continue;
        }

        let request_id = Uuid::new_v4().to_string();
        match router.turn(&cli.user, conversation_id, text, &request_id).await {
            Ok(outcome) => {
                println!("{}", outcome.response);
                if let Some(sources) = &outcome.sources {
                    if !sources.is_empty() {
                        println!("sources: {}", sources.join(", "));
                    }
                }
            }
            Err(failure) => {
                eprintln!(
                    "error [{:?}] {} (request_id={})",
                    failure.error.kind, failure.error.message, failure.request_id
                );
            }
        }
    }

    Ok(())
}
