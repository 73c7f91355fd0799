mod cli;

use std::path::Path;
use std::sync::Arc;

use agent_platform_knowledge::{
    ContentType, DocumentInput, EmbeddingProvider, InMemoryVectorStore, KnowledgeConfig,
    KnowledgeContext, KnowledgeManager, OpenAIEmbeddingProvider, SeparatorChunker, VectorStore,
    augment_system_prompt,
};
use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use crate::cli::{ChunkArgs, ChunkOptions, CliArgs, Command, QueryArgs};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let args = CliArgs::parse();
    match args.command {
        Command::Chunk(args) => run_chunk(args).await,
        Command::Query(args) => run_query(args).await,
    }
}

/// Load settings from the environment and apply command-line chunk overrides.
fn load_config(options: &ChunkOptions) -> Result<KnowledgeConfig> {
    let mut config = KnowledgeConfig::from_env().context("invalid knowledge configuration")?;
    if let Some(size) = options.chunk_size {
        config.chunk.chunk_size = size;
    }
    if let Some(overlap) = options.chunk_overlap {
        config.chunk.chunk_overlap = overlap;
    }
    config.chunk.validate().context("invalid chunk settings")?;
    Ok(config)
}

async fn read_input(path: &Path) -> Result<DocumentInput> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read '{}'", path.display()))?;
    let title = path
        .file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());
    let content_type = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(ContentType::from_extension)
        .unwrap_or_default();

    Ok(DocumentInput::new(title, content)
        .with_content_type(content_type)
        .with_source(path.display().to_string()))
}

async fn run_chunk(args: ChunkArgs) -> Result<()> {
    let config = load_config(&args.options)?;
    let input = read_input(&args.file).await?;
    let chunks = SeparatorChunker::new(config.chunk.clone()).split_text(&input.content)?;

    println!(
        "{}: {} chunks (size {}, overlap {})",
        input.title,
        chunks.len(),
        config.chunk.chunk_size,
        config.chunk.chunk_overlap
    );
    for (index, chunk) in chunks.iter().enumerate() {
        println!("\n── chunk {index} ({} chars) ──", chunk.chars().count());
        println!("{chunk}");
    }
    Ok(())
}

async fn run_query(args: QueryArgs) -> Result<()> {
    let mut config = load_config(&args.options)?;
    if let Some(url) = args.database_url.clone() {
        config.database_url = Some(url);
    }
    let threshold = args.threshold.unwrap_or(config.context_threshold);
    let top_k = args.top_k.unwrap_or(config.context_top_k);

    let embedder = OpenAIEmbeddingProvider::from_config(&config.embedding)?
        .map(|provider| Arc::new(provider) as Arc<dyn EmbeddingProvider>);
    if embedder.is_none() {
        warn!("OPENAI_API_KEY is not set; documents will be stored without vectors");
    }

    let manager = KnowledgeManager::builder()
        .vector_store(vector_store(&config).await?)
        .maybe_embedding_provider(embedder)
        .config(config)
        .build()?;

    if args.reset {
        manager.delete_knowledge_base(&args.kb).await?;
    }

    for path in &args.files {
        let input = read_input(path).await?;
        let document = manager
            .add_document(&args.kb, input)
            .await
            .with_context(|| format!("failed to ingest '{}'", path.display()))?;
        info!(
            doc_id = %document.id,
            chunks = document.chunk_count,
            status = ?document.status,
            "ingested"
        );
    }

    let stats = manager.get_stats(&args.kb).await?;
    println!(
        "knowledge base '{}': {} documents, {} vectors",
        args.kb, stats.document_count, stats.chunk_count
    );

    if args.context {
        match prompt_context(&manager, &args.kb, &args.query, top_k).await? {
            Some(prompt) => println!("{prompt}"),
            None => println!("no context above threshold {}", manager.config().context_threshold),
        }
        return Ok(());
    }

    let results = manager.search(&args.kb, &args.query, top_k, threshold).await?;
    if results.is_empty() {
        println!("no results above threshold {threshold}");
    }
    for (rank, result) in results.iter().enumerate() {
        println!(
            "\n#{} score {:.4} (document {}, chunk {})",
            rank + 1,
            result.score,
            result.document_id,
            result.chunk.index
        );
        println!("{}", result.chunk.content);
    }
    Ok(())
}

/// The system-prompt block for one knowledge base, or `None` if nothing
/// clears the context threshold. Search errors are returned, not skipped.
async fn prompt_context(
    manager: &KnowledgeManager,
    kb_id: &str,
    query: &str,
    top_k: usize,
) -> agent_platform_knowledge::Result<Option<String>> {
    let context = manager.get_relevant_context(kb_id, query, top_k).await?;
    let contexts = if context.is_empty() {
        Vec::new()
    } else {
        vec![KnowledgeContext { knowledge_base_id: kb_id.to_string(), context }]
    };
    Ok(augment_system_prompt(None, &contexts))
}

async fn vector_store(config: &KnowledgeConfig) -> Result<Arc<dyn VectorStore>> {
    #[cfg(feature = "pgvector")]
    if let Some(url) = &config.database_url {
        let dimensions = config.embedding.dimensions;
        let store = agent_platform_knowledge::PgVectorStore::connect(url, dimensions)
            .await
            .context("failed to open pgvector store")?;
        info!(table = store.table(), "using pgvector store");
        return Ok(Arc::new(store));
    }

    #[cfg(not(feature = "pgvector"))]
    if config.database_url.is_some() {
        warn!("DATABASE_URL is set but pgvector support is not compiled in; using in-memory store");
    }

    Ok(Arc::new(InMemoryVectorStore::new()))
}
