//! Interpretation of the words following `blt` on the command line

use crate::environment::{DEFAULT_ENVIRONMENT, expand_shortcut};

pub const SELECTOR_PREFIX: &str = "e:";

/// What the user asked for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    /// No words, or `help` alone
    Usage,
    Help(Vec<String>),
    List(Option<String>),
    Completion,
    Run {
        environment: String,
        /// No `e:` selector was given and the default environment was picked
        defaulted: bool,
        command: String,
        args: Vec<String>,
    },
}

impl Invocation {
    #[must_use]
    pub fn parse(mut words: Vec<String>) -> Self {
        let first = words.first().cloned();
        match first.as_deref() {
            None => return Invocation::Usage,
            Some("help") if words.len() == 1 => return Invocation::Usage,
            Some("help") => return Invocation::Help(words.split_off(1)),
            Some("list") => return Invocation::List(words.into_iter().nth(1)),
            Some("completion") => return Invocation::Completion,
            Some(_) => {}
        }

        let selector = words
            .iter()
            .position(|word| word.starts_with(SELECTOR_PREFIX));
        let (environment, defaulted) = match selector {
            Some(index) => {
                let word = words.remove(index);
                (expand_shortcut(&word[SELECTOR_PREFIX.len()..]).to_string(), false)
            }
            None => (DEFAULT_ENVIRONMENT.to_string(), true),
        };

        let mut words = words.into_iter();
        let command = words.next().unwrap_or_default();
        Invocation::Run {
            environment,
            defaulted,
            command,
            args: words.collect(),
        }
    }
}
