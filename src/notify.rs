// User-facing notification sink

use colored::Colorize;
use std::io::{self, BufRead, Write};
use tracing::warn;

/// Where user-facing messages go
pub trait Notifier {
    fn message(&self, text: &str);
    fn error(&self, text: &str);
    fn warning(&self, text: &str);
    fn success(&self, text: &str);

    /// Ask a yes/no question
    fn confirm(&self, prompt: &str) -> bool;
}

/// Colored stdout/stderr output; confirmation read from stdin
pub struct ConsoleNotifier {
    interactive: bool,
}

impl ConsoleNotifier {
    /// When `interactive` is false, every confirmation is answered "no"
    pub fn new(interactive: bool) -> Self {
        Self { interactive }
    }
}

impl Notifier for ConsoleNotifier {
    fn message(&self, text: &str) {
        println!("{}", text);
    }

    fn error(&self, text: &str) {
        eprintln!("{}", text.red());
    }

    fn warning(&self, text: &str) {
        println!("{}", text.yellow());
    }

    fn success(&self, text: &str) {
        println!("{}", text.green());
    }

    fn confirm(&self, prompt: &str) -> bool {
        if !self.interactive {
            println!("{} {}", prompt.yellow(), "(no terminal, answering no)".dimmed());
            return false;
        }

        print!("{} (y/n): ", prompt.yellow());
        if let Err(e) = io::stdout().flush() {
            warn!(error = ?e, "Failed to flush stdout");
        }

        let mut answer = String::new();
        match io::stdin().lock().read_line(&mut answer) {
            Ok(_) => matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"),
            Err(e) => {
                warn!(error = ?e, "Failed to read confirmation");
                false
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::Notifier;
    use std::cell::RefCell;
    use std::collections::VecDeque;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Level {
        Message,
        Error,
        Warning,
        Success,
        Confirm,
    }

    /// Captures everything; answers confirmations from a queue (default no)
    #[derive(Default)]
    pub struct RecordingNotifier {
        pub entries: RefCell<Vec<(Level, String)>>,
        pub answers: RefCell<VecDeque<bool>>,
    }

    impl RecordingNotifier {
        pub fn answering(answers: &[bool]) -> Self {
            Self {
                entries: RefCell::default(),
                answers: RefCell::new(answers.iter().copied().collect()),
            }
        }

        pub fn texts(&self, level: Level) -> Vec<String> {
            self.entries
                .borrow()
                .iter()
                .filter(|(l, _)| *l == level)
                .map(|(_, t)| t.clone())
                .collect()
        }

        pub fn contains(&self, level: Level, needle: &str) -> bool {
            self.texts(level).iter().any(|t| t.contains(needle))
        }

        fn push(&self, level: Level, text: &str) {
            self.entries.borrow_mut().push((level, text.to_string()));
        }
    }

    impl Notifier for RecordingNotifier {
        fn message(&self, text: &str) {
            self.push(Level::Message, text);
        }

        fn error(&self, text: &str) {
            self.push(Level::Error, text);
        }

        fn warning(&self, text: &str) {
            self.push(Level::Warning, text);
        }

        fn success(&self, text: &str) {
            self.push(Level::Success, text);
        }

        fn confirm(&self, prompt: &str) -> bool {
            self.push(Level::Confirm, prompt);
            self.answers.borrow_mut().pop_front().unwrap_or(false)
        }
    }
}
