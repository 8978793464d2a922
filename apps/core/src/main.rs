// CareerGPT terminal chat.

use anyhow::Context;
use careergpt_core::actors::supervisor::SupervisorHandle;
use careergpt_core::config::AppConfig;
use careergpt_core::error::AppError;
use careergpt_core::repl::run_chat;
use futures::future::join_all;
use std::io;
use std::path::{Path, PathBuf};
use tokio::io::BufReader;
use tracing::{info, warn};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_LOG_FILTER: &str = "careergpt_core=info,careergpt=info";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init_tracing()?;

    let config = AppConfig::from_env().context("failed to load configuration")?;
    info!(profile = ?config.profile, model = %config.llm.model, "CareerGPT starting");

    let supervisor = SupervisorHandle::new(&config);

    if let Some(dir) = &config.retrieval.knowledge_dir {
        ingest_knowledge_dir(&supervisor, dir).await?;
    }

    let stdin = BufReader::new(tokio::io::stdin());
    run_chat(&supervisor, &config.router.templates, stdin, &mut io::stdout()).await?;

    supervisor.shutdown().await?;
    info!("CareerGPT stopped");
    Ok(())
}

/// Logs go to stderr so they never interleave with the conversation on stdout.
/// `RUST_LOG` overrides the default filter, `CAREERGPT_LOG_FORMAT=json` switches
/// to structured output.
fn init_tracing() -> anyhow::Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let json_output = std::env::var("CAREERGPT_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let (json_layer, text_layer) = if json_output {
        (Some(fmt::layer().json().with_writer(io::stderr)), None)
    } else {
        (None, Some(fmt::layer().with_writer(io::stderr)))
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .try_init()
        .context("failed to initialise tracing")?;
    Ok(())
}

/// Feeds every `.txt` / `.md` file of `dir` to the knowledge base concurrently.
/// A file that fails to load is logged and skipped.
async fn ingest_knowledge_dir(supervisor: &SupervisorHandle, dir: &Path) -> anyhow::Result<()> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .with_context(|| format!("cannot read knowledge directory {}", dir.display()))?;

    let mut paths: Vec<PathBuf> = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let is_text = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| matches!(ext.to_ascii_lowercase().as_str(), "txt" | "md"))
            .unwrap_or(false);
        if is_text {
            paths.push(path);
        }
    }
    paths.sort();

    let loads = paths.iter().map(|path| async move {
        let source = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned());
        let content = tokio::fs::read_to_string(path).await?;
        Ok::<usize, AppError>(supervisor.ingest_content(content, source).await?)
    });

    let mut total = 0;
    for (path, result) in paths.iter().zip(join_all(loads).await) {
        match result {
            Ok(chunks) => total += chunks,
            Err(e) => warn!(path = %path.display(), error = %e, "skipping knowledge file"),
        }
    }

    info!(files = paths.len(), chunks = total, "knowledge base loaded");
    Ok(())
}
