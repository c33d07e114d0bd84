use anyhow::Result;
use std::io::{self, BufRead, Write};

/// Asks the operator yes/no questions.
#[cfg_attr(test, mockall::automock)]
pub trait Prompt {
    fn confirm(&self, question: &str) -> Result<bool>;
}

/// Reads answers from stdin.
pub struct StdinPrompt;

impl Prompt for StdinPrompt {
    fn confirm(&self, question: &str) -> Result<bool> {
        let stdin = io::stdin();
        let mut stdout = io::stdout();
        confirm_with_io(question, &mut stdin.lock(), &mut stdout)
    }
}

/// Answers yes to everything (`--yes`).
pub struct AssumeYes;

impl Prompt for AssumeYes {
    fn confirm(&self, _question: &str) -> Result<bool> {
        Ok(true)
    }
}

pub(crate) fn confirm_with_io<R: BufRead, W: Write>(
    question: &str,
    input: &mut R,
    output: &mut W,
) -> Result<bool> {
    write!(output, "{} [y/N] ", question)?;
    output.flush()?;

    let mut line = String::new();
    input.read_line(&mut line)?;

    let response = line.trim().to_lowercase();
    Ok(response == "y" || response == "yes")
}
