pub mod cli;
pub mod controller;
pub mod conversation;
pub mod error;
pub mod ledger;
pub mod models;
pub mod notify;
pub mod stream;
pub mod transport;

use cli::Args;
use controller::{ SendParams, StreamController };
use conversation::Conversation;
use error::{ RewriteError, SendError };
use ledger::LedgerChange;
use log::{ debug, info, warn };
use models::chat::{ ConversationSnapshot, ConversationTurn, TurnId };
use models::stream::RewriteKind;
use std::error::Error;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use stream::parser::LINE_BREAK_MARKER;
use tokio::io::{ AsyncBufReadExt, BufReader };
use transport::{ HttpTransport, TransportConfig };

pub async fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    let config = TransportConfig::from_args(&args);

    info!("--- Core Configuration ---");
    info!("API Base URL: {}", config.base_url);
    info!("Stream Route: {}", config.stream_route);
    info!("Expand Route: {}", config.expand_route);
    info!("Shorten Route: {}", config.shorten_route);
    info!("Authenticated: {}", config.access_token.is_some());
    info!("Flush Interval: {}ms", args.flush_interval_ms);
    info!("Business: {}", args.business_id.as_deref().unwrap_or("-"));
    info!("Template: {}", args.template_id.as_deref().unwrap_or("-"));
    info!("Pricing: {}", args.pricing);
    if let Some(id) = &args.conversation_id {
        info!("Conversation: {}", id);
    }
    info!("-------------------------");

    let transport = Arc::new(HttpTransport::new(&config)?);
    let controller = StreamController::new(transport).with_flush_interval(
        Duration::from_millis(args.flush_interval_ms)
    );

    let mut conversation = match &args.conversation_id {
        Some(id) => {
            let snapshot = ConversationSnapshot {
                id: Some(id.clone()),
                title: args.conversation_title.clone(),
                ..ConversationSnapshot::default()
            };
            Conversation::from_snapshot(&snapshot)
        }
        None => Conversation::new(),
    };
    conversation.ledger_mut().subscribe(print_change);

    let params = SendParams {
        template_id: args.template_id.clone(),
        business_id: args.business_id.clone(),
        pricing: args.pricing.clone(),
    };

    if let Some(prompt) = &args.prompt {
        send(&controller, &mut conversation, prompt, &params).await;
        return Ok(());
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match line.trim() {
            "" => {}
            "/new" => {
                conversation.reset();
                info!("Started a new conversation");
            }
            "/expand" => rewrite_last(&controller, &mut conversation, RewriteKind::Expand).await,
            "/shorten" => rewrite_last(&controller, &mut conversation, RewriteKind::Shorten).await,
            prompt => send(&controller, &mut conversation, prompt, &params).await,
        }
    }

    Ok(())
}

async fn send(
    controller: &StreamController,
    conversation: &mut Conversation,
    prompt: &str,
    params: &SendParams
) {
    match controller.send(conversation, prompt, params).await {
        Ok(outcome) if !outcome.is_complete() => {
            warn!("Turn {} did not complete", outcome.turn_id());
        }
        Ok(_) => {}
        Err(SendError::Validation(e)) => eprintln!("{}", e),
        Err(e) => warn!("{}", e),
    }
}

async fn rewrite_last(controller: &StreamController, conversation: &mut Conversation, kind: RewriteKind) {
    let last = conversation.ledger().turns().last().map(|turn| turn.id);
    let Some(turn_id) = last else {
        eprintln!("Nothing to {} yet", kind.verb());
        return;
    };
    match controller.rewrite(conversation, turn_id, kind).await {
        // already reported through the notifier
        Ok(()) | Err(RewriteError::Transport(_)) => {}
        Err(e) => eprintln!("{}", e),
    }
}

fn print_change(change: &LedgerChange, turns: &[ConversationTurn]) {
    let mut stdout = std::io::stdout().lock();
    if let Err(e) = write_change(&mut stdout, change, turns).and_then(|()| stdout.flush()) {
        debug!("Failed to write transcript to stdout: {}", e);
    }
}

fn write_change<W: Write>(
    out: &mut W,
    change: &LedgerChange,
    turns: &[ConversationTurn]
) -> std::io::Result<()> {
    let find_turn = |turn_id: TurnId| turns.iter().find(|turn| turn.id == turn_id);
    match change {
        LedgerChange::TurnStarted { .. } => writeln!(out),
        LedgerChange::TurnRestored { turn_id } =>
            match find_turn(*turn_id) {
                Some(turn) => writeln!(out, "> {}\n{}", turn.prompt, render(&turn.reply)),
                None => Ok(()),
            }
        LedgerChange::ReplyAppended { text, .. } => write!(out, "{}", render(text)),
        LedgerChange::TurnFinalized { .. } | LedgerChange::TurnCompleted { .. } => writeln!(out),
        LedgerChange::TurnFailed { .. } => writeln!(out, "\n[failed]"),
        LedgerChange::ReplyRevised { turn_id } =>
            match find_turn(*turn_id) {
                Some(turn) => writeln!(out, "\n{}", render(&turn.reply)),
                None => Ok(()),
            }
        LedgerChange::TurnRemoved { .. } | LedgerChange::Cleared => Ok(()),
    }
}

fn render(text: &str) -> String {
    text.replace(LINE_BREAK_MARKER, "\n")
}
