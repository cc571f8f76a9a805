//! Interactive chat REPL.

use std::io::Write;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Map;
use tokio::io::{AsyncBufReadExt, BufReader};
use tripmate_chat::{ChatClient, ConversationAssembler, Role, TranscriptState};
use tripmate_core::SessionId;

use crate::Credentials;

/// Prints assistant text as it streams in.
///
/// Only transcript updates made while a send is in flight are printed, so
/// loading history or resetting stays quiet. Any idle snapshot (end of a send,
/// reset, history load) rewinds the cursor.
#[derive(Debug, Default)]
struct Printer {
    cursor: Mutex<Cursor>,
}

#[derive(Debug, Default)]
struct Cursor {
    index: Option<usize>,
    printed: usize,
}

impl Printer {
    fn on_update(&self, state: &TranscriptState) {
        let mut cursor = self.cursor.lock();
        if !state.loading {
            *cursor = Cursor::default();
            return;
        }
        let Some((index, message)) = state.messages.iter().enumerate().next_back() else {
            return;
        };
        if message.role != Role::Assistant {
            return;
        }

        let content = &message.content;
        let continues = cursor.index == Some(index)
            && cursor.printed <= content.len()
            && content.is_char_boundary(cursor.printed);
        if !continues {
            cursor.index = Some(index);
            cursor.printed = 0;
        }

        let fresh = &content[cursor.printed..];
        let mut stdout = std::io::stdout().lock();
        // Best effort; a closed stdout ends the REPL on the next prompt.
        let _ = stdout.write_all(fresh.as_bytes());
        let _ = stdout.flush();
        cursor.printed = content.len();
    }
}

fn prompt() -> std::io::Result<()> {
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(b"> ")?;
    stdout.flush()
}

/// Run the REPL until `/quit` or end of input.
pub async fn run(
    client: ChatClient,
    credentials: &Credentials,
    mut session: Option<SessionId>,
) -> anyhow::Result<()> {
    let assembler = ConversationAssembler::new(client);

    let printer = Arc::new(Printer::default());
    let _subscription = assembler.subscribe({
        let printer = Arc::clone(&printer);
        Arc::new(move |state: &TranscriptState| printer.on_update(state))
    });

    if let Some(id) = &session {
        let count = assembler
            .load_history(id, &credentials.bearer().await?)
            .await?;
        println!("Loaded {count} messages from session {id}.");
    }
    println!("Commands: /reset, /history, /quit");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        prompt()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();

        match line {
            "" => {}
            "/quit" => break,
            "/reset" => {
                assembler.reset();
                println!("Transcript cleared.");
            }
            "/history" => match &session {
                Some(id) => {
                    assembler
                        .load_history(id, &credentials.bearer().await?)
                        .await?;
                    for message in assembler.state().messages {
                        println!("{}: {}", message.role, message.content);
                    }
                }
                None => println!("No session yet; send a message first."),
            },
            text => {
                let token = credentials.bearer().await?;
                match assembler
                    .send(session.as_ref(), text, &token, Map::new())
                    .await
                {
                    Ok(reply) => {
                        println!();
                        if session.is_none() {
                            session = reply.session_id;
                        }
                    }
                    Err(e) => {
                        println!();
                        eprintln!("error: {e}");
                    }
                }
            }
        }
    }

    Ok(())
}
