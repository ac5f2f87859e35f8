use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use colored::*;
use std::path::PathBuf;
use std::sync::Arc;

use cryptoguide_core::{
    suggestions_for, AnswerBackend, ChatMessage, Config, HttpBackend, Protocol,
    ProtocolSelection, QueryDispatcher, SubmitOutcome,
};

mod app;
mod handler;
mod logging;
mod tui;
mod ui;

use app::App;

#[derive(Parser)]
#[command(name = "cryptoguide")]
#[command(version, about = "Ask cited questions about DeFi protocols from your terminal")]
struct Cli {
    /// Backend base URL (overrides CRYPTOGUIDE_BACKEND_URL and the config file)
    #[arg(long, global = true)]
    backend_url: Option<String>,

    /// Write the chat screen's log here instead of the config directory
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the interactive chat (default)
    Chat {
        /// Protocol selected at start
        #[arg(short, long, value_parser = parse_protocol)]
        protocol: Option<Protocol>,
    },
    /// Ask one question and print the cited answer
    Ask {
        /// Your question
        question: String,
        /// Protocol to ask about
        #[arg(short, long, value_parser = parse_protocol)]
        protocol: Option<Protocol>,
        /// Compare the protocol with this one instead
        #[arg(short, long, value_parser = parse_protocol)]
        compare: Option<Protocol>,
    },
    /// Check whether the backend is up and its pipeline is ready
    Health,
    /// List the example questions for a protocol, or "compare"
    Suggest {
        #[arg(default_value = "compare")]
        mode: String,
    },
}

fn parse_protocol(value: &str) -> Result<Protocol, String> {
    Protocol::from_str(value).ok_or_else(|| {
        let known: Vec<&str> = Protocol::all().iter().map(|p| p.as_str()).collect();
        format!("unknown protocol '{}' (expected one of: {})", value, known.join(", "))
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load()?;

    match cli.command.unwrap_or(Commands::Chat { protocol: None }) {
        Commands::Chat { protocol } => {
            let log_path = match cli.log_file {
                Some(path) => path,
                None => logging::default_log_path()?,
            };
            logging::init_file(&log_path)?;
            let backend = build_backend(&config, cli.backend_url.as_deref())?;
            run_chat(backend, protocol.unwrap_or_else(|| config.default_protocol())).await?
        }
        Commands::Ask { question, protocol, compare } => {
            logging::init_stderr();
            let backend = build_backend(&config, cli.backend_url.as_deref())?;
            let selection =
                build_selection(protocol.unwrap_or_else(|| config.default_protocol()), compare)?;
            ask(backend, &question, &selection).await?
        }
        Commands::Health => {
            logging::init_stderr();
            let backend = build_backend(&config, cli.backend_url.as_deref())?;
            check_health(&backend).await?
        }
        Commands::Suggest { mode } => list_suggestions(&mode),
    }

    Ok(())
}

type Backend = (String, Arc<HttpBackend>);

fn build_backend(config: &Config, flag: Option<&str>) -> Result<Backend> {
    let url = config.resolve_backend_url(flag);
    let backend = HttpBackend::with_timeout(&url, config.request_timeout())?;
    Ok((url, Arc::new(backend)))
}

fn build_selection(protocol: Protocol, compare: Option<Protocol>) -> Result<ProtocolSelection> {
    let mut selection = ProtocolSelection::new(protocol);
    if let Some(other) = compare {
        selection.set_compare_protocol(other)?;
        selection.toggle_compare();
    }
    Ok(selection)
}

async fn run_chat((url, backend): Backend, protocol: Protocol) -> Result<()> {
    tui::install_panic_hook();
    let mut terminal = tui::init()?;

    let mut events = tui::EventHandler::new();
    let mut app = App::new(backend, url, protocol);
    app.attach(events.sender());

    let result = async {
        while !app.should_quit {
            terminal.draw(|frame| ui::render(&mut app, frame))?;
            let Some(event) = events.next().await else {
                break;
            };
            handler::handle_event(&mut app, event)?;
        }
        Ok::<(), anyhow::Error>(())
    }
    .await;

    tui::restore()?;
    result
}

fn print_answer(message: &ChatMessage) {
    if message.is_comparison {
        if let Some([a, b]) = message.protocols {
            println!(
                "{}\n",
                format!("⚖️  {} vs {}", a.display_name(), b.display_name()).bold().magenta()
            );
        }
    }
    println!("{}", message.content);

    if !message.sources.is_empty() {
        println!("\n{}", format!("Sources ({}):", message.sources.len()).bold().green());
        for (position, source) in message.sources.iter().enumerate() {
            let page = source
                .page
                .as_ref()
                .map(|p| format!(" p. {}", p))
                .unwrap_or_default();
            let protocol = source
                .protocol
                .as_ref()
                .map(|p| format!("{} ", p))
                .unwrap_or_default();
            println!(
                "  [{}] {}{}{}",
                source.display_id(position).to_string().bold(),
                protocol.magenta(),
                source.document_title().yellow(),
                page.dimmed()
            );
        }
    }

    if let Some(model) = message.metadata.model() {
        print!("\n{} {}", "Model:".dimmed(), model.dimmed());
        if let Some(cost) = message.metadata.formatted_cost() {
            print!("  {} {}", "Cost:".dimmed(), cost.dimmed());
        }
        println!();
    }
}

async fn ask((url, backend): Backend, question: &str, selection: &ProtocolSelection) -> Result<()> {
    let dispatcher = QueryDispatcher::new(backend);

    println!("🔎 Asking about {}...\n", selection.title().bold().cyan());

    match dispatcher.submit(question, selection).await {
        SubmitOutcome::Answered => {
            let conversation = dispatcher.store().snapshot();
            if let Some(answer) = conversation.messages().last() {
                print_answer(answer);
            }
            Ok(())
        }
        SubmitOutcome::Failed => {
            let conversation = dispatcher.store().snapshot();
            if let Some(message) = conversation.messages().last() {
                println!("{}", message.content.red());
            }
            bail!("backend at {} did not answer", url);
        }
        SubmitOutcome::Rejected(reason) => bail!("question not sent: {:?}", reason),
    }
}

async fn check_health((url, backend): &Backend) -> Result<()> {
    println!("{} {}", "Backend:".bold(), url.cyan());

    match backend.health().await {
        Ok(health) if health.is_ready() => {
            println!("{} {}", "✓".green().bold(), "online, pipeline ready".green());
            Ok(())
        }
        Ok(health) => {
            println!(
                "{} reachable, pipeline not ready (status: {})",
                "!".yellow().bold(),
                health.status.yellow()
            );
            bail!("backend pipeline is not ready")
        }
        Err(e) => {
            println!("{}: {}", "Error reaching backend".red(), e);
            println!("Make sure the backend is running, or pass {}", "--backend-url".bold());
            bail!("backend unreachable")
        }
    }
}

fn list_suggestions(mode: &str) {
    let key = mode.trim().to_lowercase();
    println!("\n{}", format!("💡 Example questions ({})", key).bold().blue());
    println!("{}", "=".repeat(40).dimmed());

    for (i, suggestion) in suggestions_for(&key).iter().enumerate() {
        println!(
            "{}. {} {}",
            (i + 1).to_string().bold().blue(),
            format!("[{}]", suggestion.category).magenta(),
            suggestion.text
        );
    }
}
