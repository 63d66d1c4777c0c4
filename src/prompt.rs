//! Numbered-list prompt for the operator.
//!
//! ```text
//! ? Select the environment:
//!   1) stage
//!   2) prod
//! > 2
//! ```
//!
//! The answer may be the 1-based number or the choice itself. Anything else
//! re-asks; end of input is an error.

use std::io::{self, BufRead, Write};

use crate::contract::Prompter;
use crate::error::{RepublishError, Result};

pub struct LinePrompter<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> LinePrompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn into_output(self) -> W {
        self.output
    }
}

impl LinePrompter<io::StdinLock<'static>, io::Stdout> {
    /// Prompt on the terminal.
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

fn parse_answer<'a>(answer: &str, choices: &'a [String]) -> Option<&'a String> {
    let answer = answer.trim();
    if let Ok(n) = answer.parse::<usize>() {
        return n.checked_sub(1).and_then(|i| choices.get(i));
    }
    choices.iter().find(|c| c.as_str() == answer)
}

impl<R: BufRead, W: Write> Prompter for LinePrompter<R, W> {
    fn select(&mut self, message: &str, choices: &[String]) -> Result<String> {
        if choices.is_empty() {
            return Err(RepublishError::Config(format!("no choices for {message:?}")));
        }

        writeln!(self.output, "? {message}")?;
        for (i, choice) in choices.iter().enumerate() {
            writeln!(self.output, "  {}) {choice}", i + 1)?;
        }

        loop {
            write!(self.output, "> ")?;
            self.output.flush()?;

            let mut line = String::new();
            if self.input.read_line(&mut line)? == 0 {
                return Err(RepublishError::Prompt(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("input closed before answering {message:?}"),
                )));
            }

            match parse_answer(&line, choices) {
                Some(choice) => return Ok(choice.clone()),
                None => writeln!(
                    self.output,
                    "  Please enter a number between 1 and {} or one of the listed names.",
                    choices.len()
                )?,
            }
        }
    }
}
