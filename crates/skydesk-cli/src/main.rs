use std::borrow::Cow::{self, Borrowed, Owned};

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::Validator;
use rustyline::{Context, Editor, Helper};

use skydesk_core::session::{
    ConversationSession, MessageRole, SessionSnapshot, SideActionState, display_guardrail_name,
};
use skydesk_interaction::{BackendConfig, ChatApiClient};

/// Seat rows offered by the cabin grid prompt.
const SEAT_ROWS: std::ops::RangeInclusive<u32> = 18..=23;
const SEAT_COLUMNS: [char; 6] = ['A', 'B', 'C', 'D', 'E', 'F'];

#[derive(Parser)]
#[command(name = "skydesk")]
#[command(about = "Skydesk - console client for a multi-agent airline support backend", long_about = None)]
struct Cli {
    /// Backend base URL (overrides config file and SKYDESK_BACKEND_URL)
    #[arg(long)]
    backend_url: Option<String>,
}

/// CLI helper for rustyline that provides completion, highlighting, and hints.
#[derive(Clone)]
struct CliHelper {
    commands: Vec<String>,
}

impl CliHelper {
    fn new() -> Self {
        Self {
            commands: vec![
                "/agents".to_string(),
                "/events".to_string(),
                "/guardrails".to_string(),
                "/context".to_string(),
            ],
        }
    }
}

impl Helper for CliHelper {}

impl Completer for CliHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let line = &line[..pos];

        if line.starts_with('/') {
            let candidates: Vec<Pair> = self
                .commands
                .iter()
                .filter(|cmd| cmd.starts_with(line))
                .map(|cmd| Pair {
                    display: cmd.clone(),
                    replacement: cmd.clone(),
                })
                .collect();
            Ok((0, candidates))
        } else {
            Ok((0, vec![]))
        }
    }
}

impl Highlighter for CliHelper {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        if line.starts_with('/') {
            Owned(line.bright_cyan().to_string())
        } else {
            Borrowed(line)
        }
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _forced: bool) -> bool {
        true
    }
}

impl Hinter for CliHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> Option<String> {
        let line = &line[..pos];

        if line.starts_with('/') && !line.contains(' ') {
            self.commands
                .iter()
                .find(|cmd| cmd.starts_with(line) && cmd.len() > line.len())
                .map(|cmd| cmd[line.len()..].to_string())
        } else {
            None
        }
    }
}

impl Validator for CliHelper {}

/// Tracks how much of the session has already been printed, so each turn
/// only renders the delta.
#[derive(Default)]
struct RenderCursor {
    messages: usize,
    events: usize,
    seat_map_shown: bool,
}

fn print_new_output(snapshot: &SessionSnapshot, cursor: &mut RenderCursor) {
    for event in snapshot.events.iter().skip(cursor.events) {
        println!(
            "{} {:?} [{}] {}",
            "·".dimmed(),
            event.kind,
            event.agent.dimmed(),
            event.content.dimmed()
        );
    }
    cursor.events = snapshot.events.len();

    for message in snapshot.messages.iter().skip(cursor.messages) {
        match message.role {
            MessageRole::User => {
                // The user already typed this line; skip echoing it back.
            }
            MessageRole::Assistant => {
                let agent = message.agent.as_deref().unwrap_or("assistant");
                println!("{} {}", format!("{agent}:").green().bold(), message.content);
            }
        }
    }
    cursor.messages = snapshot.messages.len();

    if snapshot.side_action == SideActionState::Prompting && !cursor.seat_map_shown {
        print_seat_map();
        cursor.seat_map_shown = true;
    }
}

fn print_seat_map() {
    println!("{}", "Please pick a seat:".yellow().bold());
    println!("        {}", SEAT_COLUMNS.iter().collect::<String>());
    for row in SEAT_ROWS {
        let seats: String = SEAT_COLUMNS.iter().map(|_| '□').collect();
        println!("  {row:>3}   {seats}");
    }
    println!("{}", "Type a seat (e.g. 21C) to continue.".yellow());
}

fn print_guardrails(snapshot: &SessionSnapshot) {
    if snapshot.guardrails.is_empty() {
        println!("{}", "No guardrails declared for the current agent.".dimmed());
        return;
    }
    for check in &snapshot.guardrails {
        let status = if check.is_pending() {
            "not yet evaluated".dimmed()
        } else if check.passed {
            "passed".green()
        } else {
            "failed".red()
        };
        println!("  {} - {}", display_guardrail_name(&check.name).bold(), status);
    }
}

fn print_agents(snapshot: &SessionSnapshot) {
    for agent in &snapshot.agents {
        let marker = if agent.name == snapshot.current_agent {
            "*".bright_green()
        } else {
            " ".normal()
        };
        println!("{} {} - {}", marker, agent.name.bold(), agent.description.dimmed());
    }
}

fn print_context(snapshot: &SessionSnapshot) {
    let mut keys: Vec<&String> = snapshot.context.keys().collect();
    keys.sort();
    for key in keys {
        println!("  {}: {}", key.bold(), snapshot.context[key]);
    }
}

fn handle_slash_command(command: &str, snapshot: &SessionSnapshot) {
    match command {
        "/agents" => print_agents(snapshot),
        "/events" => {
            for event in &snapshot.events {
                println!(
                    "  {} {:?} [{}] {}",
                    event.timestamp.format("%H:%M:%S"),
                    event.kind,
                    event.agent,
                    event.content
                );
            }
        }
        "/guardrails" => print_guardrails(snapshot),
        "/context" => print_context(snapshot),
        _ => println!("{}", format!("Unknown command: {command}").red()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = match cli.backend_url {
        Some(url) => BackendConfig::new(url),
        None => BackendConfig::resolve(),
    };

    println!(
        "{} {}",
        "Connecting to".dimmed(),
        config.base_url.dimmed()
    );
    let client = ChatApiClient::new(config)?;
    let mut session = ConversationSession::new(client);
    session.start().await?;

    let mut cursor = RenderCursor::default();
    let snapshot = session.snapshot();
    println!(
        "{} {}",
        "Connected. Current agent:".dimmed(),
        snapshot.current_agent.green().bold()
    );
    print_new_output(&snapshot, &mut cursor);

    let mut rl: Editor<CliHelper, DefaultHistory> = Editor::new()?;
    rl.set_helper(Some(CliHelper::new()));

    loop {
        let prompt = if session.side_action().is_prompting() {
            "seat> "
        } else {
            "you> "
        };

        match rl.readline(prompt) {
            Ok(line) => {
                let line = line.trim().to_string();
                if line.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(&line);

                if line.starts_with('/') {
                    handle_slash_command(&line, &session.snapshot());
                    continue;
                }

                let outcome = if session.side_action().is_prompting() {
                    cursor.seat_map_shown = false;
                    session.resolve_side_action(&line).await
                } else {
                    session.submit_utterance(&line).await
                };

                match outcome {
                    Ok(()) => print_new_output(&session.snapshot(), &mut cursor),
                    Err(err) => {
                        // A failed turn leaves the typed message in the
                        // timeline; surface the failure as one notice and
                        // keep the loop alive.
                        println!("{}", format!("⚠ {err}").red());
                        cursor.messages = session.snapshot().messages.len();
                    }
                }
            }
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => break,
            Err(err) => {
                println!("{}", format!("Input error: {err}").red());
                break;
            }
        }
    }

    println!("{}", "Goodbye!".dimmed());
    Ok(())
}
