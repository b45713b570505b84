//! Interactive questions (production gate, creation confirmations)

use std::collections::VecDeque;

use inquire::InquireError;
use parking_lot::Mutex;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PromptError {
    #[error("prompt interrupted")]
    Interrupted,
    #[error("unable to prompt: {0}")]
    Unavailable(String),
}

/// Asks the user a free-form question.
pub trait Prompt: Send + Sync {
    /// Ask `question`, returning `default` when the user just presses enter.
    ///
    /// # Errors
    ///
    /// Returns `PromptError::Interrupted` on Ctrl+C, or `PromptError::Unavailable`
    /// when no terminal is attached.
    fn ask(&self, question: &str, default: &str) -> Result<String, PromptError>;
}

/// `y` or `yes`, in any case.
#[must_use]
pub fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

/// Ask a yes/no question that defaults to "no".
///
/// # Errors
///
/// Propagates the prompt's `PromptError`.
pub fn confirm(prompt: &dyn Prompt, question: &str) -> Result<bool, PromptError> {
    prompt
        .ask(question, "no")
        .map(|answer| is_affirmative(&answer))
}

/// Prompts on the controlling terminal.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalPrompt;

impl Prompt for TerminalPrompt {
    fn ask(&self, question: &str, default: &str) -> Result<String, PromptError> {
        match inquire::Text::new(question).with_default(default).prompt() {
            Ok(answer) => Ok(answer),
            Err(InquireError::OperationInterrupted) => Err(PromptError::Interrupted),
            // Esc counts as an empty, non-affirmative answer
            Err(InquireError::OperationCanceled) => Ok(String::new()),
            Err(e) => Err(PromptError::Unavailable(e.to_string())),
        }
    }
}

#[derive(Debug)]
enum Reply {
    Answer(String),
    Interrupt,
}

/// Answers questions from a fixed list, then falls back to each question's default.
#[derive(Debug, Default)]
pub struct Scripted {
    replies: Mutex<VecDeque<Reply>>,
    questions: Mutex<Vec<String>>,
}

impl Scripted {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(
                answers
                    .into_iter()
                    .map(|answer| Reply::Answer(answer.into()))
                    .collect(),
            ),
            questions: Mutex::default(),
        }
    }

    /// Queue a Ctrl+C after the scripted answers.
    #[must_use]
    pub fn interrupt(self) -> Self {
        self.replies.lock().push_back(Reply::Interrupt);
        self
    }

    /// Questions asked so far, in order.
    #[must_use]
    pub fn questions(&self) -> Vec<String> {
        self.questions.lock().clone()
    }
}

impl Prompt for Scripted {
    fn ask(&self, question: &str, default: &str) -> Result<String, PromptError> {
        self.questions.lock().push(question.to_string());
        match self.replies.lock().pop_front() {
            Some(Reply::Answer(answer)) => Ok(answer),
            Some(Reply::Interrupt) => Err(PromptError::Interrupted),
            None => Ok(default.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_affirmative_answers() {
        for answer in ["y", "Y", "yes", "YES", " yes "] {
            assert!(is_affirmative(answer), "{answer:?}");
        }
        for answer in ["", "no", "n", "yep", "sure"] {
            assert!(!is_affirmative(answer), "{answer:?}");
        }
    }

    #[test]
    fn test_scripted_falls_back_to_default() {
        let prompt = Scripted::new(["yes"]);
        assert!(confirm(&prompt, "first?").unwrap());
        assert!(!confirm(&prompt, "second?").unwrap());
        assert_eq!(prompt.questions(), vec!["first?", "second?"]);
    }

    #[test]
    fn test_scripted_interrupt_after_answers() {
        let prompt = Scripted::new(["yes"]).interrupt();
        assert!(confirm(&prompt, "first?").unwrap());
        match confirm(&prompt, "second?") {
            Err(PromptError::Interrupted) => {}
            other => panic!("Expected Interrupted, got: {other:?}"),
        }
        assert!(!confirm(&prompt, "third?").unwrap());
    }
}
