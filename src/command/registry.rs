//! Command registry: maps lower-cased command names to handlers.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use super::error::{DispatchError, DispatchResult, RegistrationError};
use super::handler::{Handler, HandlerSpec};
use crate::tokenizer::tokenize;

/// One or more command names sharing a handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandNames(Vec<String>);

impl CommandNames {
    /// Lower-case every name, rejecting empty ones.
    fn normalize(self) -> Result<Vec<String>, RegistrationError> {
        self.0
            .into_iter()
            .map(|name| {
                if name.is_empty() {
                    Err(RegistrationError::EmptyName)
                } else {
                    Ok(name.to_lowercase())
                }
            })
            .collect()
    }
}

impl From<&str> for CommandNames {
    fn from(name: &str) -> Self {
        Self(vec![name.to_string()])
    }
}

impl From<String> for CommandNames {
    fn from(name: String) -> Self {
        Self(vec![name])
    }
}

impl From<&[&str]> for CommandNames {
    fn from(names: &[&str]) -> Self {
        Self(names.iter().map(|s| s.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for CommandNames {
    fn from(names: [&str; N]) -> Self {
        Self(names.iter().map(|s| s.to_string()).collect())
    }
}

impl From<Vec<&str>> for CommandNames {
    fn from(names: Vec<&str>) -> Self {
        Self(names.into_iter().map(str::to_string).collect())
    }
}

impl From<Vec<String>> for CommandNames {
    fn from(names: Vec<String>) -> Self {
        Self(names)
    }
}

/// Input accepted by [`CommandRegistry::execute`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandInput {
    /// A raw command string, tokenized before lookup.
    Raw(String),
    /// An already tokenized command.
    Tokens(Vec<String>),
}

impl CommandInput {
    fn into_tokens(self) -> DispatchResult<Vec<String>> {
        match self {
            CommandInput::Raw(raw) => Ok(tokenize(&raw)?),
            CommandInput::Tokens(tokens) => Ok(tokens),
        }
    }
}

impl From<&str> for CommandInput {
    fn from(raw: &str) -> Self {
        CommandInput::Raw(raw.to_string())
    }
}

impl From<String> for CommandInput {
    fn from(raw: String) -> Self {
        CommandInput::Raw(raw)
    }
}

impl From<Vec<String>> for CommandInput {
    fn from(tokens: Vec<String>) -> Self {
        CommandInput::Tokens(tokens)
    }
}

impl From<&[String]> for CommandInput {
    fn from(tokens: &[String]) -> Self {
        CommandInput::Tokens(tokens.to_vec())
    }
}

impl From<Vec<&str>> for CommandInput {
    fn from(tokens: Vec<&str>) -> Self {
        CommandInput::Tokens(tokens.into_iter().map(str::to_string).collect())
    }
}

/// Registry of top-level commands.
#[derive(Debug, Default)]
pub struct CommandRegistry {
    /// Lower-cased command name to handler.
    handlers: HashMap<String, Handler>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `spec` under every name in `names`.
    pub fn add(
        &mut self,
        names: impl Into<CommandNames>,
        spec: HandlerSpec,
    ) -> Result<(), RegistrationError> {
        self.add_with_context(names, Arc::new(()), spec)
    }

    /// Register `spec` under every name in `names`, binding `ctx` into each
    /// of its callbacks.
    ///
    /// Either every name is registered or none is.
    pub fn add_with_context<C>(
        &mut self,
        names: impl Into<CommandNames>,
        ctx: Arc<C>,
        spec: HandlerSpec<C>,
    ) -> Result<(), RegistrationError>
    where
        C: Send + Sync + 'static,
    {
        let names = names.into().normalize()?;

        for (i, name) in names.iter().enumerate() {
            if self.handlers.contains_key(name) || names[..i].contains(name) {
                return Err(RegistrationError::AlreadyRegistered(name.clone()));
            }
        }

        let label = names.first().map(String::as_str).unwrap_or_default();
        let handler = spec.compile(&ctx, label)?;

        for name in names {
            tracing::debug!("registered command {name}");
            self.handlers.insert(name, handler.clone());
        }
        Ok(())
    }

    /// Unregister every name in `names`. Unknown names are ignored.
    pub fn remove(&mut self, names: impl Into<CommandNames>) -> Result<(), RegistrationError> {
        for name in names.into().normalize()? {
            if self.handlers.remove(&name).is_some() {
                tracing::debug!("removed command {name}");
            }
        }
        Ok(())
    }

    /// Look up a handler by name, case-insensitively.
    pub fn get(&self, name: &str) -> Option<&Handler> {
        self.handlers.get(&name.to_lowercase())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Registered command names, sorted.
    pub fn command_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.handlers.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Run a command.
    ///
    /// Returns `Ok(false)` when there are no tokens or the first token names
    /// no command, and `Ok(true)` once the handler has run successfully. The
    /// handler receives every token, its own name included. Handler errors
    /// and panics are returned as [`DispatchError::Handler`].
    pub fn execute(&self, input: impl Into<CommandInput>) -> DispatchResult<bool> {
        let tokens = input.into().into_tokens()?;

        let Some(name) = tokens.first() else {
            return Ok(false);
        };
        let Some(handler) = self.get(name) else {
            return Ok(false);
        };

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| handler.invoke(&tokens)));
        match outcome {
            Ok(Ok(())) => Ok(true),
            Ok(Err(err)) => Err(DispatchError::Handler {
                command: name.clone(),
                source: err,
            }),
            Err(payload) => Err(DispatchError::Handler {
                command: name.clone(),
                source: anyhow::anyhow!("handler panicked: {}", panic_message(payload.as_ref())),
            }),
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg
    } else {
        "unknown panic"
    }
}
