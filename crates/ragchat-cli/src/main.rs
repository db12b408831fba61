//! `ragchat`: stream a RAG chat answer and reveal it at a steady pace.

mod render;

use clap::{Parser, Subcommand};
use ragchat_client::{ChatApi, ClientConfig, TurnStatus, TurnStreamer};
use ragchat_core::{PersistKey, StreamEvent};
use ragchat_reveal::{RevealRate, RevealStore, RevealSubscription};
use render::IncrementalPrinter;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ragchat", about = "Streaming client for a RAG chat service")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "ragchat.toml")]
    config: PathBuf,

    /// Server base URL (overrides config)
    #[arg(long)]
    base_url: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Stream an answer and render it as it is revealed
    Stream {
        /// Request path of the streaming endpoint
        #[arg(long)]
        path: String,
        /// JSON request body
        #[arg(long, default_value = "{}")]
        payload: String,
        #[arg(long)]
        conversation: String,
        #[arg(long)]
        message: String,
        /// Message field the answer is revealed under
        #[arg(long, default_value = "answer")]
        field: String,
    },
    /// Stream the hallucination check of an answer
    Hallucination {
        #[arg(long)]
        conversation: String,
        #[arg(long)]
        message: String,
    },
    /// Stop generation of one message, or of a whole conversation
    Stop {
        #[arg(long)]
        conversation: String,
        #[arg(long)]
        message: Option<String>,
    },
    /// Regenerate a message and print the server's record
    Retry {
        #[arg(long)]
        conversation: String,
        #[arg(long)]
        message: String,
    },
}

/// One streamed turn to render.
struct TurnRequest {
    path: String,
    payload: serde_json::Value,
    conversation: String,
    message: String,
    key: PersistKey,
    /// Ask the server to stop the message on Ctrl-C.
    stop_on_interrupt: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if cli.json_logs {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    let mut config = ClientConfig::load(&cli.config).await?;
    if let Some(base_url) = cli.base_url {
        config.base_url = base_url;
        config.validate()?;
    }
    let api = ChatApi::from_config(&config);
    let rate = config.reveal_rate();

    match cli.command {
        Commands::Stream {
            path,
            payload,
            conversation,
            message,
            field,
        } => {
            let payload: serde_json::Value = serde_json::from_str(&payload)
                .map_err(|e| anyhow::anyhow!("--payload is not valid JSON: {e}"))?;
            let key = PersistKey::for_field(&conversation, &message, &field);
            let request = TurnRequest {
                path,
                payload,
                conversation,
                message,
                key,
                stop_on_interrupt: true,
            };
            stream_turn(&api, rate, request).await?;
        }
        Commands::Hallucination {
            conversation,
            message,
        } => {
            let request = TurnRequest {
                path: ChatApi::hallucination_path(&conversation, &message),
                payload: serde_json::json!({}),
                key: PersistKey::for_field(&conversation, &message, "hallucination"),
                conversation,
                message,
                stop_on_interrupt: false,
            };
            stream_turn(&api, rate, request).await?;
        }
        Commands::Stop {
            conversation,
            message,
        } => {
            match message {
                Some(message) => api.stop_message(&conversation, &message).await?,
                None => api.stop_conversation(&conversation).await?,
            }
            eprintln!("Stop requested.");
        }
        Commands::Retry {
            conversation,
            message,
        } => {
            let record = api.retry_message(&conversation, &message).await?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
    }

    Ok(())
}

async fn stream_turn(api: &ChatApi, rate: RevealRate, request: TurnRequest) -> anyhow::Result<()> {
    let store = RevealStore::global();
    let streamer = TurnStreamer::new(api.client().clone(), store.clone());
    let mut sub = RevealSubscription::spawn(store.clone(), request.key.clone(), rate);
    let mut printer = IncrementalPrinter::new(std::io::stdout());

    info!(key = %request.key, path = %request.path, "Streaming turn");

    let turn = streamer.run_with(
        &request.path,
        &request.payload,
        &request.key,
        |event, _| {
            if let StreamEvent::Status { text } = event {
                eprintln!("[{text}]");
            }
        },
    );
    tokio::pin!(turn);

    let outcome = loop {
        tokio::select! {
            outcome = &mut turn => break outcome,
            changed = sub.changed() => {
                if changed {
                    printer.render(&sub.displayed())?;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                if streamer.client().abort_current() && request.stop_on_interrupt {
                    if let Err(e) = api.stop_message(&request.conversation, &request.message).await {
                        warn!(error = %e, "Server did not acknowledge stop");
                    }
                }
            }
        }
    };

    // Let the queued text finish animating; a second Ctrl-C skips ahead.
    loop {
        let settled = store
            .snapshot(&request.key)
            .map_or(true, |snap| snap.pending_chars == 0);
        if settled {
            break;
        }
        tokio::select! {
            changed = sub.changed() => {
                if !changed {
                    break;
                }
                printer.render(&sub.displayed())?;
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    match outcome.status {
        TurnStatus::Completed => {
            let fields = &outcome.fields;
            printer.render(fields.final_answer().unwrap_or(fields.answer_source()))?;
            printer.finish()?;
            if let Some(label) = outcome.fields.label() {
                eprintln!("label: {label}");
            }
            if let Some(reason) = outcome.fields.reason() {
                eprintln!("reason: {reason}");
            }
            if let Some(documents) = outcome.fields.documents() {
                eprintln!("{} source document(s)", documents.len());
            }
            Ok(())
        }
        TurnStatus::Cancelled => {
            printer.render(&store.displayed(&request.key).unwrap_or_default())?;
            printer.finish()?;
            eprintln!("[stopped]");
            Ok(())
        }
        TurnStatus::Failed(e) => {
            printer.finish()?;
            Err(e.into())
        }
    }
}
