use chrono::{ DateTime, Local };
use log::info;
use std::error::Error;
use tokio::io::{ AsyncBufReadExt, BufReader };
use tokio_stream::StreamExt;
use tokio_stream::wrappers::{ BroadcastStream, WatchStream };
use crate::dispatch::{ Notice, Rejection, SubmitOutcome };
use crate::models::{ ChatMessage, ConversationId, Role };
use crate::views::{ ChatPanel, MirrorMode };

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Ask(String),
    Open,
    Close,
    Switch(String),
    NoConversation,
    Clear,
    Refresh,
    History,
    Help,
    Quit,
    Unknown(String),
}

fn parse_command(line: &str) -> Command {
    let line = line.trim();
    let Some(rest) = line.strip_prefix('/') else {
        return Command::Ask(line.to_string());
    };
    let mut parts = rest.splitn(2, char::is_whitespace);
    let name = parts.next().unwrap_or_default();
    let arg = parts.next().map(str::trim).unwrap_or_default();
    match (name, arg) {
        ("open", _) => Command::Open,
        ("close", _) => Command::Close,
        ("switch", id) if !id.is_empty() => Command::Switch(id.to_string()),
        ("none", _) => Command::NoConversation,
        ("clear", _) => Command::Clear,
        ("refresh", _) => Command::Refresh,
        ("history", _) => Command::History,
        ("help", _) => Command::Help,
        ("quit" | "exit", _) => Command::Quit,
        _ => Command::Unknown(line.to_string()),
    }
}

fn format_message(message: &ChatMessage) -> String {
    let time = DateTime::from_timestamp_millis(message.timestamp)
        .map(|t| t.with_timezone(&Local).format("%H:%M:%S").to_string())
        .unwrap_or_default();
    let who = match message.role {
        Role::User => "you",
        Role::Assistant => "assistant",
    };
    format!("[{}] {}: {}", time, who, message.text)
}

fn describe(notice: &Notice) -> String {
    match notice {
        Notice::AnswerFailed { message } => message.clone(),
        Notice::HistoryCleared => "Chat history cleared".to_string(),
        Notice::ExplanationCacheCleared => "Explanation cache cleared".to_string(),
    }
}

/// Prints whatever was added since `printed` messages were shown. Shrinking
/// transcripts are printed again in full.
fn render_new(messages: &[ChatMessage], printed: usize) -> usize {
    let start = if messages.len() < printed {
        println!("--- transcript reset ---");
        0
    } else {
        printed
    };
    for message in &messages[start..] {
        println!("{}", format_message(message));
    }
    messages.len()
}

fn print_help() {
    println!("Type a question, or one of:");
    println!("  /open  /close        show or hide the full-screen view");
    println!("  /switch <id>  /none  change conversation");
    println!("  /clear  /refresh  /history  /help  /quit");
}

/// Drives a panel and its full-screen view from stdin until EOF or `/quit`.
pub async fn run(
    mut panel: ChatPanel,
    initial: Option<ConversationId>
) -> Result<(), Box<dyn Error + Send + Sync>> {
    panel.set_conversation(initial).await;
    let mut expanded = panel.expanded(MirrorMode::Independent);
    let mut updates = WatchStream::new(panel.cache().subscribe());
    let mut notices = BroadcastStream::new(panel.dispatcher().subscribe_notices());
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut printed = 0usize;
    print_help();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                match parse_command(&line) {
                    Command::Ask(text) if expanded.is_open() => {
                        match expanded.submit(&text).await {
                            SubmitOutcome::Rejected(Rejection::InFlight) => {
                                println!("Still waiting for the previous answer");
                            }
                            SubmitOutcome::Discarded => println!("Answer arrived too late and was dropped"),
                            _ => {}
                        }
                        panel.sync();
                        printed = render_new(expanded.messages(), printed);
                    }
                    Command::Ask(text) => {
                        match panel.dispatcher().check(&text) {
                            Ok(()) => drop(panel.spawn_ask(text)),
                            Err(Rejection::InFlight) => println!("Still waiting for the previous answer"),
                            Err(Rejection::EmptyInput) => {}
                        }
                    }
                    Command::Open => {
                        expanded.open();
                        println!("--- full-screen view ({} messages) ---", expanded.messages().len());
                        printed = render_new(expanded.messages(), 0);
                    }
                    Command::Close => {
                        expanded.close();
                        println!("--- panel view ---");
                        panel.sync();
                        printed = render_new(panel.messages(), 0);
                    }
                    Command::Switch(id) => {
                        panel.set_conversation(Some(ConversationId::new(id))).await;
                        expanded.sync();
                    }
                    Command::NoConversation => {
                        panel.set_conversation(None).await;
                        expanded.sync();
                    }
                    Command::Clear => panel.clear_history().await,
                    Command::Refresh => panel.refresh(),
                    Command::History => {
                        let messages = if expanded.is_open() { expanded.messages() } else { panel.messages() };
                        printed = render_new(messages, 0);
                    }
                    Command::Help => print_help(),
                    Command::Quit => break,
                    Command::Unknown(line) => println!("Unknown command: {}", line),
                }
            }
            Some(_) = updates.next() => {
                let panel_changed = panel.sync();
                let expanded_changed = expanded.sync();
                if expanded.is_open() {
                    if expanded_changed {
                        printed = render_new(expanded.messages(), printed);
                    }
                } else if panel_changed {
                    printed = render_new(panel.messages(), printed);
                }
            }
            Some(notice) = notices.next() => {
                if let Ok(notice) = notice {
                    println!("! {}", describe(&notice));
                }
            }
        }
    }

    info!("Closing conversation");
    panel.unmount();
    Ok(())
}
