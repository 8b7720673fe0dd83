//! Error types for command registration and dispatch.

use thiserror::Error;

use crate::tokenizer::SyntaxError;

/// Misconfiguration detected while registering or removing commands.
///
/// These are programming errors in whoever registers the command and should
/// abort startup of that component.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    #[error("Command must not be an empty string")]
    EmptyName,

    #[error("Command already registered: {0}")]
    AlreadyRegistered(String),

    #[error("Sub-command of \"{command}\" must not be an empty string")]
    EmptySubCommand { command: String },

    #[error("Sub-command \"{name}\" registered twice under \"{command}\"")]
    DuplicateSubCommand { command: String, name: String },
}

/// A failed dispatch attempt. The display text is what the user gets to see.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The command string could not be tokenized.
    #[error("Syntax error: {0}")]
    Syntax(#[from] SyntaxError),

    /// No command is registered under the first token.
    #[error("Unknown command \"{0}\".")]
    UnknownCommand(String),

    /// The handler returned an error or panicked.
    #[error("Error running callback for command \"{command}\".")]
    Handler {
        command: String,
        #[source]
        source: anyhow::Error,
    },
}

/// Result type for dispatch operations.
pub type DispatchResult<T> = Result<T, DispatchError>;
