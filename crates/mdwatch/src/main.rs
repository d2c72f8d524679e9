//! Watch a text file and print a Markdown rewrite each time it grows.
//!
//! Reads the API key from the `OPENAI_API_KEY` environment variable (or a
//! `.env` file in the working directory). Stop with Ctrl-C.
//!
//! # Examples
//!
//! ```sh
//! # Watch input.txt next to the binary, regular-length output
//! mdwatch
//!
//! # Watch a specific file and ask for short summaries
//! mdwatch notes.txt --response_length summary
//!
//! # More log detail on stderr
//! RUST_LOG=mdwatch=debug mdwatch notes.txt
//! ```

use std::path::PathBuf;
use std::process;

use clap::Parser;
use mdwatch::prelude::*;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Convert text to Markdown style using an LLM, re-running as the file grows.
#[derive(Parser, Debug)]
#[command(name = "mdwatch", version)]
struct Cli {
    /// Path to the input text file [default: input.txt beside the binary]
    input_file: Option<PathBuf>,

    /// Response length
    #[arg(
        long = "response_length",
        alias = "response-length",
        value_enum,
        default_value_t = ResponseLength::Regular
    )]
    response_length: ResponseLength,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

async fn watch(cli: Cli) -> Result<(), WatchError> {
    let input_path = cli
        .input_file
        .unwrap_or_else(mdwatch::config::default_input_path);

    let config = WatchConfig::new(input_path)
        .with_response_length(cli.response_length)
        .with_env_overrides();

    let credentials = ApiCredentials::from_env()?;
    let client = CompletionClient::new(credentials, &config)?;

    let (stop_tx, stop_rx) = tokio::sync::watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, shutting down");
            let _ = stop_tx.send(true);
        }
    });

    Poller::new(&client, config)
        .with_event_handler(&LoggingHandler)
        .with_output(std::io::stdout())
        .with_backoff(AlignedToInterval::default())
        .run(stop_rx)
        .await
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing();
    tracing::debug!(?cli, "parsed CLI arguments");

    if let Err(e) = watch(cli).await {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
