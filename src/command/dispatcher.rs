//! Dispatcher: turns trigger strings into command runs and latches the
//! message to show when a run fails.

use std::sync::Arc;

use super::error::{DispatchError, RegistrationError};
use super::handler::HandlerSpec;
use super::registry::{CommandNames, CommandRegistry};
use crate::packet::{ClientPacket, ClientSink};
use crate::tokenizer::{strip_outer_markup, tokenize};

/// Sends system messages to the invoking user's private channel.
#[derive(Clone)]
pub struct Messenger {
    sink: Arc<dyn ClientSink>,
    channel_id: u32,
}

impl Messenger {
    pub fn new(sink: Arc<dyn ClientSink>, channel_id: u32) -> Self {
        Self { sink, channel_id }
    }

    /// Show `text` to the user as a system line.
    pub fn message(&self, text: impl Into<String>) {
        self.sink.send(ClientPacket::PrivateChat {
            channel: self.channel_id,
            author_id: 0,
            author_name: String::new(),
            message: text.into(),
        });
    }

    /// Send an arbitrary packet to the client.
    pub fn send(&self, packet: ClientPacket) {
        self.sink.send(packet);
    }

    pub fn channel_id(&self) -> u32 {
        self.channel_id
    }
}

impl std::fmt::Debug for Messenger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Messenger")
            .field("channel_id", &self.channel_id)
            .finish_non_exhaustive()
    }
}

/// Outcome of [`Dispatcher::handle`].
#[derive(Debug)]
pub enum Dispatch {
    /// A handler ran to completion.
    Executed,
    /// The attempt failed; the user-facing message is latched.
    Failed(DispatchError),
    /// Nothing to run. The latch is left alone.
    Empty,
}

impl Dispatch {
    /// Whether the trigger was consumed by the command layer.
    pub fn is_intercepted(&self) -> bool {
        !matches!(self, Dispatch::Empty)
    }

    /// Whether a registered handler was found and run, successfully or not.
    pub fn is_claimed(&self) -> bool {
        matches!(
            self,
            Dispatch::Executed | Dispatch::Failed(DispatchError::Handler { .. })
        )
    }
}

/// A latched failure message.
#[derive(Debug, Clone, PartialEq, Eq)]
struct PendingError {
    message: String,
    /// Handler failures are always reported; other listeners may only
    /// suppress syntax and unknown-command complaints.
    forced: bool,
}

/// Owns the command registry and the pending-error latch.
#[derive(Debug)]
pub struct Dispatcher {
    registry: CommandRegistry,
    messenger: Messenger,
    pending_error: Option<PendingError>,
}

impl Dispatcher {
    pub fn new(messenger: Messenger) -> Self {
        Self {
            registry: CommandRegistry::new(),
            messenger,
            pending_error: None,
        }
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut CommandRegistry {
        &mut self.registry
    }

    pub fn messenger(&self) -> &Messenger {
        &self.messenger
    }

    /// Shorthand for [`CommandRegistry::add`].
    pub fn add(
        &mut self,
        names: impl Into<CommandNames>,
        spec: HandlerSpec,
    ) -> Result<(), RegistrationError> {
        self.registry.add(names, spec)
    }

    /// Shorthand for [`CommandRegistry::add_with_context`].
    pub fn add_with_context<C>(
        &mut self,
        names: impl Into<CommandNames>,
        ctx: Arc<C>,
        spec: HandlerSpec<C>,
    ) -> Result<(), RegistrationError>
    where
        C: Send + Sync + 'static,
    {
        self.registry.add_with_context(names, ctx, spec)
    }

    /// Shorthand for [`CommandRegistry::remove`].
    pub fn remove(&mut self, names: impl Into<CommandNames>) -> Result<(), RegistrationError> {
        self.registry.remove(names)
    }

    /// Show `text` to the user as a system line.
    pub fn message(&self, text: impl Into<String>) {
        self.messenger.message(text);
    }

    /// Handle one trigger string.
    ///
    /// The outer markup wrapper is stripped before tokenizing. Failures never
    /// escape: they are latched for [`Dispatcher::report_pending`] and
    /// returned inside [`Dispatch::Failed`]. Handler failures are also logged.
    pub fn handle(&mut self, raw: &str) -> Dispatch {
        let stripped = strip_outer_markup(raw);
        let tokens = match tokenize(&stripped) {
            Ok(tokens) => tokens,
            Err(err) => return self.fail(err.into()),
        };

        let Some(first) = tokens.first().cloned() else {
            return Dispatch::Empty;
        };

        match self.registry.execute(tokens) {
            Ok(true) => {
                tracing::debug!("command {first:?} executed");
                self.pending_error = None;
                Dispatch::Executed
            }
            Ok(false) => self.fail(DispatchError::UnknownCommand(first)),
            Err(err) => {
                if let DispatchError::Handler { command, source } = &err {
                    tracing::error!(command = %command, "command callback failed: {source:#}");
                }
                self.fail(err)
            }
        }
    }

    fn fail(&mut self, err: DispatchError) -> Dispatch {
        tracing::debug!("command attempt failed: {err}");
        self.pending_error = Some(PendingError {
            message: err.to_string(),
            forced: matches!(err, DispatchError::Handler { .. }),
        });
        Dispatch::Failed(err)
    }

    /// The message latched by the last failed attempt, if not yet reported.
    pub fn pending_error(&self) -> Option<&str> {
        self.pending_error.as_ref().map(|p| p.message.as_str())
    }

    /// Read and clear the latch in one step.
    pub fn take_pending_error(&mut self) -> Option<String> {
        self.pending_error.take().map(|p| p.message)
    }

    /// Deliver the latched message, then clear it.
    ///
    /// When another listener `silenced` the event, syntax and unknown-command
    /// messages are dropped; a handler failure is still shown.
    ///
    /// Returns `true` if something was latched, meaning the event belongs to
    /// the command layer and should not be delivered normally.
    pub fn report_pending(&mut self, silenced: bool) -> bool {
        match self.pending_error.take() {
            Some(PendingError { message, forced }) => {
                if forced || !silenced {
                    self.messenger.message(message);
                }
                true
            }
            None => false,
        }
    }
}
