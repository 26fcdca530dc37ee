//! Parley application binary - composition root.
//!
//! Ties together the workspace crates into a single executable:
//! 1. Parse CLI arguments and load configuration from TOML
//! 2. Initialize tracing and durable storage (SQLite)
//! 3. Build the HTTP support backend and the request orchestrator
//! 4. Seed the welcome message into an empty session
//! 5. Run the interactive chat loop on stdin
//!
//! Voice capture needs a real input device and is wired by platform front
//! ends through `parley-voice`; this shell covers the typed path.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};

use parley_chat::{
    AskOutcome, ChatError, HandoffState, HttpSupportBackend, RequestOrchestrator, TicketOutcome,
};
use parley_core::config::ParleyConfig;
use parley_core::types::{Message, Role};
use parley_storage::{Database, PreferenceStore, SessionStore};

mod cli;
use cli::CliArgs;

/// Bot message seeded once when the session starts empty.
const WELCOME_MESSAGE: &str =
    "👋 Welcome! I'm your customer support assistant. How can I help you today?";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Config.
    let config_file = args.resolve_config_path();
    let config = ParleyConfig::load_or_default(&config_file);

    // Tracing.
    let log_level = args.resolve_log_level(&config.general.log_level);
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .init();

    tracing::info!("Starting Parley v{}", env!("CARGO_PKG_VERSION"));

    // Storage.
    let data_dir = args.resolve_data_dir(&config.general.data_dir);
    std::fs::create_dir_all(&data_dir)?;
    let db_path = data_dir.join("parley.db");
    let db = Arc::new(Database::open(&db_path)?);
    tracing::info!(path = %db_path.display(), "SQLite database opened");

    let session = Arc::new(SessionStore::new(Arc::clone(&db)));
    let prefs = Arc::new(PreferenceStore::new(db));

    // Backend + orchestrator.
    let backend_url = args.resolve_backend_url(&config.backend.base_url);
    let backend = HttpSupportBackend::new(
        &backend_url,
        Duration::from_secs(config.backend.request_timeout_secs),
    )?;
    tracing::info!(url = %backend_url, "Support backend client ready");

    let orchestrator = Arc::new(RequestOrchestrator::new(
        backend,
        Arc::clone(&session),
        Arc::clone(&prefs),
    ));

    // Seed the welcome message once into an empty session.
    if session.is_empty() {
        session.append(&Message::bot(WELCOME_MESSAGE))?;
    }

    print_history(&session.load().messages);
    println!("(type a question, or /help for commands)");

    run_loop(orchestrator, session, prefs).await;
    Ok(())
}

/// Interactive chat loop over stdin lines.
async fn run_loop(
    orchestrator: Arc<RequestOrchestrator<HttpSupportBackend>>,
    session: Arc<SessionStore>,
    prefs: Arc<PreferenceStore>,
) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                tracing::error!(error = %e, "Failed to read input");
                break;
            }
        };
        let input = line.trim();

        match input.split_once(' ').unwrap_or((input, "")) {
            ("/quit", _) | ("/exit", _) => break,
            ("/help", _) => print_help(),
            ("/history", _) => print_history(&session.load().messages),
            ("/clear", _) => match session.clear() {
                Ok(()) => println!("(history cleared)"),
                Err(e) => println!("(could not clear history: {})", e),
            },
            ("/prefs", _) => {
                let p = prefs.snapshot();
                println!(
                    "(language: {}, dark mode: {}, onboarding complete: {})",
                    p.language, p.dark_mode, p.onboarding_complete
                );
            }
            ("/lang", code) if !code.trim().is_empty() => {
                match prefs.set_language(code.trim()) {
                    Ok(()) => println!("(reply language set to {})", code.trim()),
                    Err(e) => println!("(could not save preference: {})", e),
                }
            }
            ("/lang", _) => println!("(usage: /lang <code>)"),
            ("/dark", _) => {
                let enabled = !prefs.dark_mode();
                match prefs.set_dark_mode(enabled) {
                    Ok(()) => println!("(dark mode {})", if enabled { "on" } else { "off" }),
                    Err(e) => println!("(could not save preference: {})", e),
                }
            }
            ("/onboarded", _) => match prefs.set_onboarding_complete(true) {
                Ok(()) => println!("(onboarding marked complete)"),
                Err(e) => println!("(could not save preference: {})", e),
            },
            ("/ticket", rest) => submit_ticket(&orchestrator, rest).await,
            _ => ask(&orchestrator, &session, input).await,
        }
    }
}

/// Dispatch a typed question and print the reply.
async fn ask(
    orchestrator: &RequestOrchestrator<HttpSupportBackend>,
    session: &SessionStore,
    input: &str,
) {
    match orchestrator.ask(input).await {
        Ok(AskOutcome::Ignored) => {}
        Ok(outcome) => {
            if let Some(reply) = session.load().messages.last() {
                print_message(reply);
            }
            if outcome == AskOutcome::Escalated {
                println!("(to reach a human agent: /ticket <email> <issue>)");
            }
        }
        Err(ChatError::Busy) => println!("(still waiting for the previous reply)"),
        Err(e) => println!("(error: {})", e),
    }
}

/// Submit a handoff ticket from a `/ticket email issue...` line.
async fn submit_ticket(orchestrator: &RequestOrchestrator<HttpSupportBackend>, rest: &str) {
    if orchestrator.handoff().current() == HandoffState::Idle {
        println!("(no handoff in progress)");
        return;
    }

    let (email, issue) = rest.trim().split_once(' ').unwrap_or((rest.trim(), ""));
    match orchestrator.submit_ticket(email, issue).await {
        Ok(TicketOutcome::Submitted) => {
            if let Some(reply) = orchestrator.session().load().messages.last() {
                print_message(reply);
            }
        }
        Ok(TicketOutcome::Failed) => {
            if let Some(reply) = orchestrator.session().load().messages.last() {
                print_message(reply);
            }
            println!("(the form is still open; /ticket <email> <issue> to retry)");
        }
        Err(e) => println!("(ticket not sent: {})", e),
    }
}

fn print_history(messages: &[Message]) {
    for message in messages {
        print_message(message);
    }
}

fn print_message(message: &Message) {
    let who = match message.role {
        Role::User => "you",
        Role::Bot => "bot",
    };
    match message.audio_url {
        Some(ref url) => println!("[{}] {}: {} ({})", message.timestamp, who, message.text, url),
        None => println!("[{}] {}: {}", message.timestamp, who, message.text),
    }
}

fn print_help() {
    println!("commands:");
    println!("  /ticket <email> <issue>   submit a support ticket during a handoff");
    println!("  /history                  reprint the conversation");
    println!("  /clear                    clear the conversation history");
    println!("  /lang <code>              set the reply language");
    println!("  /dark                     toggle dark mode");
    println!("  /onboarded                mark onboarding as complete");
    println!("  /prefs                    show saved preferences");
    println!("  /quit                     exit");
}
