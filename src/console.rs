//! Operator prompts shared by the binaries.

use std::io::{self, BufRead, Write};

/// Print `question` and read one line; only an answer starting with `y`/`Y` confirms.
pub fn confirm(question: &str) -> io::Result<bool> {
    let stdin = io::stdin();
    confirm_with(question, &mut stdin.lock(), &mut io::stdout())
}

pub fn confirm_with<R: BufRead, W: Write>(
    question: &str,
    input: &mut R,
    output: &mut W,
) -> io::Result<bool> {
    writeln!(output, "{question} [Y]es or [N]o (default is No)")?;
    output.flush()?;

    let mut answer = String::new();
    input.read_line(&mut answer)?;

    Ok(answer.trim_start().starts_with(['y', 'Y']))
}

/// "message" or "messages" for a count; 0 renders as "ALL".
pub fn describe_count(count: u64) -> String {
    match count {
        0 => "ALL messages".to_string(),
        1 => "1 message".to_string(),
        n => format!("{n} messages"),
    }
}
