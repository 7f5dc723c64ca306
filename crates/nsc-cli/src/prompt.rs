//! # Terminal Prompt
//!
//! Line-oriented [`Prompt`] over a reader and a writer. Questions go to the
//! writer (stderr in the binary), answers come from the reader one line
//! each. An empty line takes the default; end of input cancels.

use std::io::{self, BufRead, BufReader, Stdin, Stderr, Write};

use nsc_edit::prompt::parse_yes_no;
use nsc_edit::{Prompt, PromptError, PromptSpec, PromptValue};

/// A prompt over any line reader and writer.
pub struct TerminalPrompt<R, W> {
    input: R,
    output: W,
}

impl TerminalPrompt<BufReader<Stdin>, Stderr> {
    /// Read stdin, write stderr.
    pub fn stdio() -> Self {
        Self::new(BufReader::new(io::stdin()), io::stderr())
    }
}

impl<R: BufRead, W: Write> TerminalPrompt<R, W> {
    /// A prompt over `input` and `output`.
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// The writer, for inspecting what was shown.
    pub fn output(&self) -> &W {
        &self.output
    }

    fn read_line(&mut self) -> Result<String, PromptError> {
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(PromptError::Cancelled);
        }
        Ok(line.trim().to_string())
    }
}

impl<R: BufRead, W: Write> Prompt for TerminalPrompt<R, W> {
    fn ask(&mut self, spec: &PromptSpec) -> Result<PromptValue, PromptError> {
        match spec {
            PromptSpec::Text { label, default } => {
                write!(self.output, "? {label} [{default}]: ")?;
                self.output.flush()?;
                let line = self.read_line()?;
                Ok(PromptValue::Text(if line.is_empty() { default.clone() } else { line }))
            }
            PromptSpec::Confirm { label, default } => loop {
                let hint = if *default { "Y/n" } else { "y/N" };
                write!(self.output, "? {label} ({hint}): ")?;
                self.output.flush()?;
                let line = self.read_line()?;
                if line.is_empty() {
                    return Ok(PromptValue::Bool(*default));
                }
                match parse_yes_no(&line) {
                    Some(b) => return Ok(PromptValue::Bool(b)),
                    None => writeln!(self.output, "please answer y or n")?,
                }
            },
            PromptSpec::Select { label, options, default } => loop {
                writeln!(self.output, "? {label}")?;
                for (i, option) in options.iter().enumerate() {
                    let marker = if i == *default { ">" } else { " " };
                    writeln!(self.output, " {marker} {i}: {option}")?;
                }
                write!(self.output, "choice [{default}]: ")?;
                self.output.flush()?;
                let line = self.read_line()?;
                if line.is_empty() {
                    return Ok(PromptValue::Index(*default));
                }
                match line.parse::<usize>() {
                    Ok(i) if i < options.len() => return Ok(PromptValue::Index(i)),
                    _ => writeln!(self.output, "enter a number between 0 and {}", options.len().saturating_sub(1))?,
                }
            },
        }
    }
}
