//! Yes/no confirmation for destructive commands.

use owo_colors::OwoColorize;
use std::io::{self, BufRead, Write};

/// Asks `question` on stderr and reads answers from stdin until `y` or `n`.
pub fn confirm(question: &str) -> io::Result<bool> {
    let stdin = io::stdin();
    let mut stderr = io::stderr();
    confirm_with(question, &mut stdin.lock(), &mut stderr)
}

/// [`confirm`] over arbitrary streams. End of input counts as `n`.
pub fn confirm_with<R: BufRead, W: Write>(question: &str, input: &mut R, output: &mut W) -> io::Result<bool> {
    writeln!(output, "{} [y/n]:", question.yellow())?;
    let mut line = String::new();
    loop {
        line.clear();
        if input.read_line(&mut line)? == 0 {
            return Ok(false);
        }
        match line.trim() {
            "y" => return Ok(true),
            "n" => return Ok(false),
            _ => writeln!(output, "Invalid input. Please enter 'y' or 'n'.")?,
        }
    }
}
