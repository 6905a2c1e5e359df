use std::io::Write as _;
use std::path::Path;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_stream::StreamExt;
use tokio_stream::wrappers::LinesStream;

use crate::dialogue::DialogueEngine;
use crate::types::{Reply, Turn};

/// Interactive terminal session: one input line per turn, replies echoed
/// with their attributed speaker. When the image builder is waiting for
/// a file, the next line is read as a local file path instead of being
/// handed to the engine.
pub async fn run(engine: &mut DialogueEngine) -> anyhow::Result<()> {
    println!("Welcome to MiD. Type 'help' for commands.");
    prompt()?;

    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = LinesStream::new(stdin.lines());

    while let Some(line) = lines.next().await {
        let line = line?;
        let turn = step(engine, &line).await;
        render(&turn);
        prompt()?;
    }

    println!();
    Ok(())
}

async fn step(engine: &mut DialogueEngine, line: &str) -> Turn {
    let trimmed = line.trim();
    let lower = trimmed.to_ascii_lowercase();

    // File selection is out-of-band for the engine; here it arrives as a
    // path typed at the prompt. cancel/exit still reach the builder.
    if engine.awaiting_file() && !trimmed.is_empty() && lower != "cancel" && lower != "exit" {
        return match tokio::fs::read(trimmed).await {
            Ok(bytes) => {
                let name = Path::new(trimmed)
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| trimmed.to_string());
                engine.attach_file(&name, bytes).await
            }
            Err(e) => Turn::one(Reply::system(format!(
                "Could not read '{trimmed}': {e}. Enter an image file path, or 'cancel':"
            ))),
        };
    }

    engine.handle_line(line).await
}

fn render(turn: &Turn) {
    if turn.cleared {
        // ANSI clear screen + cursor home
        print!("\x1b[2J\x1b[H");
    }
    for reply in &turn.replies {
        println!("{}> {}", reply.speaker.name(), reply.text);
    }
}

fn prompt() -> anyhow::Result<()> {
    print!("you> ");
    std::io::stdout().flush()?;
    Ok(())
}
