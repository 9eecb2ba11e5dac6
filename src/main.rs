//! # briefbot CLI
//!
//! One subcommand per pipeline stage plus `run` for the whole pipeline,
//! so an external scheduler can either trigger a single daily run or drive
//! the stages as separate tasks with its own retry policy.
//!
//! ## Usage
//!
//! ```bash
//! briefbot --config ./config/briefbot.toml <command>
//! ```
//!
//! | Command | Description |
//! |---------|-------------|
//! | `briefbot run` | Fetch, index, answer, notify: the full daily run |
//! | `briefbot fetch --out report.txt` | Fetch the newest report, write its text |
//! | `briefbot index --input report.txt` | Rebuild the index from extracted text |
//! | `briefbot ask` | Answer the daily question and notify |
//! | `briefbot notify --text "..."` | Deliver an arbitrary message |
//!
//! A typical crontab line for the daily 07:00 run (no catch-up of missed
//! runs; a skipped day simply indexes the next day's report):
//!
//! ```text
//! 0 7 * * * briefbot --config /etc/briefbot/briefbot.toml run
//! ```

mod answer;
mod chunk;
mod config;
mod embedding;
mod error;
mod fetch;
mod generate;
mod index;
mod models;
mod notify;
mod pipeline;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Daily bulletin-report briefing pipeline.
#[derive(Parser)]
#[command(
    name = "briefbot",
    about = "Fetch the newest bulletin report, index it, answer the daily question, notify",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/briefbot.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline: fetch, index, answer, notify.
    Run,

    /// Fetch the newest report and write its extracted text.
    ///
    /// The output file is the hand-off to a separately scheduled `index`
    /// task; in a single `run` the text never touches disk.
    Fetch {
        /// Where to write the extracted text.
        #[arg(long)]
        out: PathBuf,
    },

    /// Rebuild the index from previously extracted text.
    ///
    /// The previous index stays readable until the new one is complete;
    /// the swap is a directory rename.
    Index {
        /// File containing the extracted report text.
        #[arg(long)]
        input: PathBuf,
    },

    /// Answer the daily question against the current index.
    Ask {
        /// Print the answer without delivering it to the webhook.
        #[arg(long)]
        no_notify: bool,
    },

    /// Deliver an arbitrary message to the webhook.
    Notify {
        /// Message text.
        #[arg(long)]
        text: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("briefbot=info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Run => {
            pipeline::run_pipeline(&cfg).await?;
        }
        Commands::Fetch { out } => {
            let report = fetch::fetch_latest_report(&cfg.board).await?;
            std::fs::write(&out, &report.text)?;
            println!("fetch");
            println!("  detail: {}", report.detail_url);
            println!("  attachment: {}", report.attachment_url);
            println!("  extracted chars: {}", report.text.chars().count());
            println!("  written: {}", out.display());
            println!("ok");
        }
        Commands::Index { input } => {
            let text = std::fs::read_to_string(&input)?;
            let report = models::Report {
                detail_url: String::new(),
                attachment_url: String::new(),
                text,
            };
            let summary = index::rebuild_index(&cfg, &report).await?;
            println!("index");
            println!("  chunks: {}", summary.chunk_count);
            println!("  model: {}", summary.embedding_model);
            println!("ok");
        }
        Commands::Ask { no_notify } => {
            let answer = answer::answer_daily_question(&cfg).await?;
            println!("answer");
            println!("  {}", answer.text.replace('\n', "\n  "));
            if !no_notify {
                notify::post_message(&cfg.notify, &answer::format_message(&answer)).await?;
                println!("notified");
            }
            println!("ok");
        }
        Commands::Notify { text } => {
            notify::post_message(&cfg.notify, &text).await?;
            println!("notified");
            println!("ok");
        }
    }

    Ok(())
}
