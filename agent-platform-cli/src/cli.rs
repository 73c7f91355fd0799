use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Knowledge-base tooling for the agent platform.
///
/// Settings not given on the command line are read from the environment
/// (and a `.env` file in the working directory).
#[derive(Parser, Debug)]
#[command(
    name = "agent-platform",
    version,
    about = "Knowledge-base tooling for the agent platform"
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Split a file into chunks and print them
    Chunk(ChunkArgs),
    /// Ingest files into a knowledge base and query it
    Query(QueryArgs),
}

/// Overrides for the chunking settings.
#[derive(Args, Debug, Default)]
pub struct ChunkOptions {
    /// Maximum characters per chunk
    #[arg(long, env = "KNOWLEDGE_CHUNK_SIZE")]
    pub chunk_size: Option<usize>,

    /// Characters carried over between consecutive chunks
    #[arg(long, env = "KNOWLEDGE_CHUNK_OVERLAP")]
    pub chunk_overlap: Option<usize>,
}

#[derive(Args, Debug)]
pub struct ChunkArgs {
    /// File to chunk
    #[arg(long)]
    pub file: PathBuf,

    #[command(flatten)]
    pub options: ChunkOptions,
}

#[derive(Args, Debug)]
pub struct QueryArgs {
    /// Knowledge base ID
    #[arg(long)]
    pub kb: String,

    /// Files to ingest before querying (repeatable)
    #[arg(long = "file")]
    pub files: Vec<PathBuf>,

    /// The question to search for
    #[arg(long)]
    pub query: String,

    /// Maximum number of results (defaults to `KNOWLEDGE_CONTEXT_TOP_K`)
    #[arg(long)]
    pub top_k: Option<usize>,

    /// Minimum cosine similarity (defaults to `KNOWLEDGE_CONTEXT_THRESHOLD`)
    #[arg(long, conflicts_with = "context")]
    pub threshold: Option<f32>,

    /// Print the assembled prompt context instead of ranked results.
    /// Uses the configured context threshold.
    #[arg(long)]
    pub context: bool,

    /// PostgreSQL URL for the pgvector store (needs the `pgvector` feature)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Delete the knowledge base before ingesting
    #[arg(long)]
    pub reset: bool,

    #[command(flatten)]
    pub options: ChunkOptions,
}
