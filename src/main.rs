//! PhishGuard CLI - drives the scan core from a terminal

use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use clap::{Parser, Subcommand};
use serde::Serialize;

use phish_guard::api::{self, AppContext, ConfigUpdate};
use phish_guard::constants;
use phish_guard::logic::popup::{ActiveTab, TabProvider};
use phish_guard::logic::storage::{JsonFileStorage, StateStore};
use phish_guard::logic::worker::TabId;

#[derive(Parser)]
#[command(name = "phish-guard", version, about = "PhishGuard phishing scan client")]
struct Args {
    /// Directory holding storage.json (defaults to the local data dir)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check backend availability
    Health,
    /// Log in and store the session token
    Login {
        #[arg(long)]
        email: String,
        /// Falls back to PHISHGUARD_PASSWORD
        #[arg(long)]
        password: Option<String>,
    },
    /// Drop the stored session token
    Logout,
    /// Show extension state
    Status,
    /// Turn protection on
    Enable,
    /// Turn protection off
    Disable,
    /// Classify a URL
    ScanUrl { url: String },
    /// Classify email text read from a file ("-" for stdin)
    ScanEmail { file: PathBuf },
    /// Scan a page like the popup does: content first, URL as fallback
    ScanPage {
        url: String,
        /// Extracted page text ("-" for stdin)
        #[arg(long)]
        content: Option<PathBuf>,
    },
    /// Report whether a verdict was correct
    Feedback {
        scan_id: String,
        /// The verdict was wrong
        #[arg(long)]
        incorrect: bool,
        #[arg(long, default_value = "")]
        comment: String,
    },
    /// Local and backend statistics
    Stats,
    /// Show or change the API configuration
    Config {
        #[arg(long)]
        api_url: Option<String>,
        #[arg(long)]
        timeout_ms: Option<u64>,
        #[arg(long)]
        require_session: Option<bool>,
    },
}

/// Tab provider for a page given on the command line
struct CliTab {
    url: String,
    content: Option<String>,
}

#[async_trait]
impl TabProvider for CliTab {
    async fn active_tab(&self) -> Result<ActiveTab> {
        if self.url.is_empty() {
            return Err(anyhow!("no page given"));
        }
        Ok(ActiveTab { id: 1, url: self.url.clone() })
    }

    async fn page_content(&self, _tab_id: TabId) -> Result<Option<String>> {
        Ok(self.content.clone())
    }
}

fn read_input(path: &PathBuf) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read stdin")?;
        return Ok(buf);
    }
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    let args = Args::parse();

    let storage_path = match &args.data_dir {
        Some(dir) => dir.join("storage.json"),
        None => JsonFileStorage::default_path(),
    };
    log::debug!("{} v{} using {:?}", constants::APP_NAME, constants::APP_VERSION, storage_path);

    let tab = match &args.command {
        Command::ScanPage { url, content } => CliTab {
            url: url.clone(),
            content: content.as_ref().map(read_input).transpose()?,
        },
        _ => CliTab { url: String::new(), content: None },
    };

    let ctx = AppContext::new(StateStore::open(storage_path), Arc::new(tab))?;

    match args.command {
        Command::Health => print_json(&api::check_health(&ctx).await)?,
        Command::Login { email, password } => {
            let password = match password {
                Some(p) => p,
                None => std::env::var("PHISHGUARD_PASSWORD")
                    .context("--password or PHISHGUARD_PASSWORD is required")?,
            };
            let outcome = api::login(&ctx, &email, &password).await.map_err(anyhow::Error::msg)?;
            print_json(&outcome)?;
        }
        Command::Logout => print_json(&api::logout(&ctx).map_err(anyhow::Error::msg)?)?,
        Command::Status => print_json(&api::get_status(&ctx))?,
        Command::Enable => print_json(&api::set_enabled(&ctx, true).map_err(anyhow::Error::msg)?)?,
        Command::Disable => print_json(&api::set_enabled(&ctx, false).map_err(anyhow::Error::msg)?)?,
        Command::ScanUrl { url } => print_json(&api::scan_url(&ctx, &url).await)?,
        Command::ScanEmail { file } => {
            let content = read_input(&file)?;
            print_json(&api::scan_email(&ctx, &content).await)?;
        }
        Command::ScanPage { .. } => print_json(&api::scan_page(&ctx).await)?,
        Command::Feedback { scan_id, incorrect, comment } => {
            let ack = api::submit_feedback(&ctx, &scan_id, !incorrect, &comment)
                .await
                .map_err(anyhow::Error::msg)?;
            print_json(&ack)?;
        }
        Command::Stats => print_json(&api::get_statistics(&ctx).await)?,
        Command::Config { api_url, timeout_ms, require_session } => {
            if api_url.is_none() && timeout_ms.is_none() && require_session.is_none() {
                print_json(&api::get_config(&ctx))?;
            } else {
                let update = ConfigUpdate { api_url, timeout_ms, require_session };
                print_json(&api::update_config(&ctx, update).map_err(anyhow::Error::msg)?)?;
            }
        }
    }

    Ok(())
}
