//! Domos mailbox assistant binary.

mod config;
mod pipeline;
mod store;
mod tenants;

use anyhow::Context;
use clap::{Parser, Subcommand};
use config::DomosConfig;
use domos_llm::{CompletionProvider, LlmClient};
use domos_mail::{GmailClient, ReplySender, RetryPolicy};
use domos_triage::{GenerationSettings, TenantDirectory};
use pipeline::{Pipeline, RunOptions, Triager};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use store::ActionItemStore;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;

#[derive(Debug, Parser)]
#[command(name = "domos", version, about = "Property-management mailbox triage assistant")]
struct Cli {
    /// Config file (default: ~/.domos/config.toml).
    #[arg(long, global = true, env = "DOMOS_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Triage unread mail: reply, record action items, mark read (default).
    Run {
        /// Maximum number of unread messages to handle.
        #[arg(long)]
        limit: Option<usize>,
        /// Triage and log only; nothing is stored, sent or marked.
        #[arg(long)]
        dry_run: bool,
    },
    /// Triage a single message given on the command line and print the result.
    Triage {
        #[arg(long)]
        from: String,
        #[arg(long, default_value = "")]
        subject: String,
        body: String,
    },
    /// Print the recorded action items.
    Items,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("warning: failed to load .env: {e}");
        }
    }
    init_tracing()?;
    install_panic_hook();

    let cli = Cli::parse();
    let cfg = DomosConfig::load(cli.config).await?;

    let command = cli.command.unwrap_or(Command::Run {
        limit: None,
        dry_run: false,
    });

    match command {
        Command::Run { limit, dry_run } => run(&cfg, limit, dry_run).await,
        Command::Triage {
            from,
            subject,
            body,
        } => triage_one(&cfg, &from, &subject, &body).await,
        Command::Items => {
            let items = ActionItemStore::new(&cfg.storage.action_items_path)
                .load()
                .await?;
            println!("{}", serde_json::to_string_pretty(&items)?);
            Ok(())
        }
    }
}

async fn run(cfg: &DomosConfig, limit: Option<usize>, dry_run: bool) -> anyhow::Result<()> {
    let gmail = GmailClient::new(cfg.require_mailbox()?)
        .context("build gmail client")?
        .with_query(cfg.mailbox.query.clone());
    let sender = ReplySender::new(
        gmail.clone(),
        cfg.sender.from_address.clone(),
        cfg.sender.failure_log_path.clone(),
    )
    .with_policy(RetryPolicy {
        max_attempts: cfg.sender.max_attempts,
        delay: Duration::from_millis(cfg.sender.retry_delay_ms),
    });
    let store = ActionItemStore::new(&cfg.storage.action_items_path);
    let pipeline = Pipeline::new(gmail, sender, build_triager(cfg).await?, store);

    let summary = pipeline
        .run(RunOptions {
            limit: limit.or(cfg.mailbox.max_messages),
            dry_run,
            mark_processed: cfg.mailbox.mark_processed_as_read,
        })
        .await?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

async fn triage_one(cfg: &DomosConfig, from: &str, subject: &str, body: &str) -> anyhow::Result<()> {
    let triager = build_triager(cfg).await?;
    let sender = domos_mail::extract_email_address(from);
    let assessment = triager.assess(&sender, subject, body).await;
    let item = &assessment.extraction.item;

    let out = serde_json::json!({
        "tenant": assessment.tenant,
        "reply": {
            "text": assessment.reply.text,
            "source": assessment.reply.source.as_str(),
        },
        "action_item": item,
        "classification_source": assessment.extraction.source.as_str(),
        "cc": item.cc(),
        "actionable": item.is_actionable(),
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

async fn build_triager(cfg: &DomosConfig) -> anyhow::Result<Triager> {
    let api_key = cfg.api_key_for_model().unwrap_or_else(|| {
        tracing::warn!(model = %cfg.general.model, "no API key for model; replies and classification will use keyword rules");
        String::new()
    });
    let mut client = LlmClient::new(&api_key, &cfg.general.model);
    if let Some(endpoint) = cfg.llm.endpoint.as_deref() {
        client = client.with_endpoint(endpoint);
    }
    tracing::info!(
        model = %client.model(),
        provider = ?client.provider(),
        endpoint = %client.endpoint(),
        "completion provider configured"
    );
    let provider: Arc<dyn CompletionProvider> = Arc::new(client);

    let directory: Arc<dyn TenantDirectory> = match cfg.tenants.path.as_deref() {
        Some(path) => Arc::new(tenants::load_directory(path).await?),
        None => Arc::new(tenants::sample_directory()),
    };

    Ok(Triager::new(provider, directory).with_settings(
        GenerationSettings {
            max_tokens: cfg.llm.reply_max_tokens,
            temperature: cfg.llm.reply_temperature,
        },
        GenerationSettings {
            max_tokens: cfg.llm.classify_max_tokens,
            temperature: cfg.llm.classify_temperature,
        },
    ))
}

/// Log line shape, chosen with `DOMOS_LOG_FORMAT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LogFormat {
    Json,
    Pretty,
    Compact,
}

impl std::str::FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "json" => Ok(LogFormat::Json),
            "pretty" => Ok(LogFormat::Pretty),
            "compact" => Ok(LogFormat::Compact),
            other => Err(anyhow::anyhow!(
                "unsupported DOMOS_LOG_FORMAT={other:?}; expected one of: json, pretty, compact"
            )),
        }
    }
}

fn init_tracing() -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(
            "info,domos=debug,domos_app=debug,domos_mail=debug,domos_triage=debug,domos_llm=debug",
        )
    });
    let log_format: LogFormat = std::env::var("DOMOS_LOG_FORMAT")
        .unwrap_or_default()
        .parse()?;

    // Logs go to stderr; stdout is reserved for command output.
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_span_events(FmtSpan::NEW | FmtSpan::CLOSE)
        .with_target(true)
        .with_file(true)
        .with_line_number(true);
    match log_format {
        LogFormat::Json => builder
            .json()
            .flatten_event(true)
            .with_current_span(true)
            .with_span_list(true)
            .init(),
        LogFormat::Pretty => builder.pretty().init(),
        LogFormat::Compact => builder.compact().init(),
    }

    tracing::debug!(log_format = ?log_format, "tracing initialized");
    Ok(())
}

fn install_panic_hook() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let location = panic_info
            .location()
            .map(|loc| format!("{}:{}", loc.file(), loc.line()))
            .unwrap_or_else(|| "unknown".to_string());
        let payload = panic_payload_to_string(panic_info.payload());
        tracing::error!(
            panic_location = %location,
            panic_payload = %payload,
            "panic captured"
        );
        default_hook(panic_info);
    }));
}

fn panic_payload_to_string(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        return msg.to_string();
    }
    if let Some(msg) = payload.downcast_ref::<String>() {
        return msg.clone();
    }
    "non-string panic payload".to_string()
}
