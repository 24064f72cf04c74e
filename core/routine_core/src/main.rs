use clap::Parser;
use routine_core::{
    shell::Shell,
    store::{KeyValueStore, MemoryStore, SqliteStore},
    summarizer::{GeminiSummarizer, OfflineSummarizer, Summarizer, DEFAULT_MODEL},
    Catalog, SystemClock, Tracker,
};
use std::{path::PathBuf, time::Duration};
use tokio::io::BufReader;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "routine_core", version)]
struct Args {
    /// SQLite database path.
    #[arg(long, default_value = "./data/routine.db")]
    db: PathBuf,

    /// Keep everything in memory (nothing is written to disk).
    #[arg(long, default_value_t = false)]
    ephemeral: bool,

    /// Directory for `export` backups.
    #[arg(long, default_value = "./data/exports")]
    export_dir: PathBuf,

    /// Generative Language API key. Without it, summaries use fallback text.
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Model used for reflections and reviews.
    #[arg(long, default_value = DEFAULT_MODEL)]
    model: String,

    /// Summarizer request timeout (seconds).
    #[arg(long, default_value_t = 30)]
    summarizer_timeout_seconds: u64,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "routine_core=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    if args.ephemeral {
        info!("store: in-memory (--ephemeral)");
        run_with_store(MemoryStore::new(), &args).await
    } else {
        info!("DB: {}", args.db.display());
        let store = SqliteStore::open(&args.db)?;
        run_with_store(store, &args).await
    }
}

async fn run_with_store<S: KeyValueStore>(store: S, args: &Args) -> anyhow::Result<()> {
    let tracker = Tracker::load(store, Catalog::builtin());

    match args.api_key.as_deref().filter(|k| !k.trim().is_empty()) {
        Some(key) => {
            let z = GeminiSummarizer::new(
                key.to_string(),
                args.model.clone(),
                Duration::from_secs(args.summarizer_timeout_seconds.max(1)),
            )?;
            info!("summarizer: {}", args.model);
            run_shell(tracker, z, args).await
        }
        None => {
            warn!("no API key; reflections and reviews will use fallback text");
            run_shell(tracker, OfflineSummarizer, args).await
        }
    }
}

async fn run_shell<S, Z>(tracker: Tracker<S>, summarizer: Z, args: &Args) -> anyhow::Result<()>
where
    S: KeyValueStore,
    Z: Summarizer + Clone + Send + Sync + 'static,
{
    let mut shell = Shell::new(tracker, summarizer, SystemClock, args.export_dir.clone());
    let stdin = BufReader::new(tokio::io::stdin());
    let mut stdout = std::io::stdout();
    shell.run(stdin, &mut stdout, shutdown_signal()).await?;
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutdown requested");
}
