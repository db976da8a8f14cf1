//! Line-oriented stdin prompts.

use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};

/// Print `question` and read one line. End of input yields an empty answer.
pub fn ask(question: &str) -> Result<String> {
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{question}").context("write prompt")?;
    stdout.flush().context("flush prompt")?;

    let mut answer = String::new();
    io::stdin()
        .lock()
        .read_line(&mut answer)
        .context("read answer from stdin")?;
    Ok(answer.trim_end_matches(['\r', '\n']).to_string())
}
