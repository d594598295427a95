use std::collections::VecDeque;
use std::io::{self, BufRead, Write};
use std::sync::Mutex;

/// Source of operator input for manual fallbacks and continue prompts.
pub trait InputSource: Send + Sync {
    /// Show `prompt` (may be empty) and read one line without its newline.
    /// Returns `None` at end of input.
    fn read_line(&self, prompt: &str) -> io::Result<Option<String>>;
}

/// Reads from the process's standard input.
#[derive(Debug, Default)]
pub struct StdinInput;

impl InputSource for StdinInput {
    fn read_line(&self, prompt: &str) -> io::Result<Option<String>> {
        if !prompt.is_empty() {
            let mut stdout = io::stdout();
            write!(stdout, "{}", prompt)?;
            stdout.flush()?;
        }
        let mut line = String::new();
        if io::stdin().lock().read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }
}

/// Pre-recorded answers, consumed in order. Runs dry as end of input.
#[derive(Debug, Default)]
pub struct ScriptedInput {
    lines: Mutex<VecDeque<String>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedInput {
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: Mutex::new(lines.into_iter().map(Into::into).collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Prompts shown so far, in order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Number of answers not yet consumed.
    pub fn remaining(&self) -> usize {
        self.lines.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

impl InputSource for ScriptedInput {
    fn read_line(&self, prompt: &str) -> io::Result<Option<String>> {
        self.prompts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(prompt.to_string());
        Ok(self
            .lines
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scripted_input_replays_then_runs_dry() {
        let input = ScriptedInput::new(["y", "n"]);
        assert_eq!(input.read_line("Continue? ").unwrap().as_deref(), Some("y"));
        assert_eq!(input.read_line("").unwrap().as_deref(), Some("n"));
        assert_eq!(input.read_line("").unwrap(), None);
        assert_eq!(input.prompts(), vec!["Continue? ", "", ""]);
        assert_eq!(input.remaining(), 0);
    }
}
