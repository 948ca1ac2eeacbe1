//! Headless multi-namespace query binary.
//!
//! Reads one JSON query job from stdin, runs it, and writes the merged
//! results as JSON to stdout. All tracing/diagnostic output goes to stderr so
//! that stdout stays machine-readable.
//!
//! Configuration comes from `--config <path>`, else the default config file
//! if it exists, else defaults; `PINECONE_*` environment variables fill in
//! anything left unset.

use std::io::Read;
use std::path::PathBuf;

use anyhow::Context;
use conifer::job::QueryJob;
use conifer::{Client, ClientConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = load_config(config_path_arg()?)?;
    let client = Client::new(config).context("failed to create client")?;

    let mut input = String::new();
    std::io::stdin()
        .read_to_string(&mut input)
        .context("failed to read query job from stdin")?;
    let job = QueryJob::from_json(&input)?;

    let results = job.run(&client).await.map_err(|e| {
        tracing::error!(error = %e, "query job failed");
        anyhow::anyhow!("conifer-query failed: {e}")
    })?;

    println!("{}", serde_json::to_string_pretty(&results)?);
    Ok(())
}

/// Parse `--config <path>` from the command line.
fn config_path_arg() -> anyhow::Result<Option<PathBuf>> {
    let mut args = std::env::args().skip(1);
    let mut path = None;
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" | "-c" => {
                let value = args.next().context("--config requires a path")?;
                path = Some(PathBuf::from(value));
            }
            "--help" | "-h" => {
                eprintln!("usage: conifer-query [--config <path>] < job.json");
                std::process::exit(0);
            }
            other => anyhow::bail!("unknown argument `{other}`"),
        }
    }
    Ok(path)
}

fn load_config(explicit: Option<PathBuf>) -> anyhow::Result<ClientConfig> {
    let config = match explicit {
        Some(path) => ClientConfig::from_file(&path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => {
            let path = ClientConfig::default_config_path();
            if path.exists() {
                ClientConfig::from_file(&path)
                    .with_context(|| format!("failed to load config from {}", path.display()))?
            } else {
                tracing::debug!(path = %path.display(), "no config file, using defaults");
                ClientConfig::default()
            }
        }
    };
    Ok(config.with_env_overrides(|name| std::env::var(name).ok()))
}
