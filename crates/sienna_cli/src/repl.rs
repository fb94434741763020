use anyhow::Result;
use async_trait::async_trait;
use rustyline::error::ReadlineError;
use sienna_core::Messenger;
use sienna_expression::SegmentDelivery;
use sienna_reasoning::ChatEngine;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Prints outbound messages to the terminal.
pub struct StdoutMessenger {
    companion: String,
}

impl StdoutMessenger {
    pub fn new(companion: &str) -> Self {
        Self {
            companion: companion.to_string(),
        }
    }
}

#[async_trait]
impl Messenger for StdoutMessenger {
    async fn send(&self, _user_id: &str, text: &str) -> Result<()> {
        println!("\n{}: {}\n", self.companion, text);
        Ok(())
    }
}

/// Local chat session as `user_id`. `/daily`, `/remind HH:MM text`,
/// `/reminders`, `/explicit [on|off]`, `/reset`, `/activate CODE`, `/rank`
/// and `/top [page]` stand in for the Discord commands.
pub async fn run(engine: Arc<ChatEngine>, delivery: SegmentDelivery, user_id: String) -> Result<()> {
    println!("Sienna online. Chatting as user {}. Type 'quit' to exit.", user_id);
    let mut lines = spawn_reader()?;

    while let Some(line) = lines.recv().await {
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if input == "quit" || input == "exit" {
            break;
        }

        let messages = match dispatch(&engine, &user_id, input).await {
            Ok(messages) => messages,
            Err(e) => {
                tracing::error!("Command failed: {:#}", e);
                println!("\n[System Error]: {}\n", e);
                continue;
            }
        };
        if let Err(e) = delivery.deliver(&user_id, &messages).await {
            tracing::error!("Delivery failed: {}", e);
        }
    }
    Ok(())
}

/// The line editor blocks, so it lives on its own thread and hands lines
/// over a channel. The channel closes on EOF or Ctrl-C.
fn spawn_reader() -> Result<mpsc::Receiver<String>> {
    let mut rl = rustyline::DefaultEditor::new()?;
    let (tx, rx) = mpsc::channel(8);
    std::thread::spawn(move || loop {
        match rl.readline("> ") {
            Ok(line) => {
                let _ = rl.add_history_entry(line.as_str());
                if tx.blocking_send(line).is_err() {
                    break;
                }
            }
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => {
                tracing::error!("Terminal read failed: {}", e);
                break;
            }
        }
    });
    Ok(rx)
}

async fn dispatch(engine: &ChatEngine, user_id: &str, input: &str) -> Result<Vec<String>> {
    let Some(command) = input.strip_prefix('/') else {
        return Ok(engine.handle_message(user_id, input).await.messages());
    };
    let (name, rest) = command.split_once(' ').unwrap_or((command, ""));
    let rest = rest.trim();

    let messages = match name {
        "daily" => engine.claim_daily(user_id).await?.reply.messages(),
        "reminders" => engine.list_reminders(user_id).await?.reply.messages(),
        "remind" => {
            let (time, message) = rest.split_once(' ').unwrap_or((rest, ""));
            engine.set_reminder(user_id, time, message).await?.reply.messages()
        }
        "explicit" => {
            let desired = match rest {
                "on" => Some(true),
                "off" => Some(false),
                _ => None,
            };
            engine.set_explicit_mode(user_id, desired).await?.reply.messages()
        }
        "reset" => engine.request_reset(user_id).await?.reply.messages(),
        "activate" => engine.activate(user_id, rest).await?.reply.messages(),
        "rank" => match engine.rank(user_id) {
            Some(entry) => vec![format!(
                "#{} {} | level {} | {} xp | {} messages",
                entry.rank, entry.display_name, entry.level, entry.xp, entry.messages
            )],
            None => vec!["Not ranked yet.".to_string()],
        },
        "top" => {
            let page = rest.parse().unwrap_or(1);
            let board = engine.leaderboard(page);
            let mut lines = vec![format!("Leaderboard {}/{}", board.page, board.total_pages)];
            lines.extend(board.entries.iter().map(|e| {
                format!("#{} {} | level {} | {} xp", e.rank, e.display_name, e.level, e.xp)
            }));
            vec![lines.join("\n")]
        }
        _ => vec![format!("Unknown command /{}", name)],
    };
    Ok(messages)
}
