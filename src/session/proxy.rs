//! Command session: wires a dispatcher into a host connection.
//!
//! The host calls [`CommandSession::before`] ahead of its other listeners for
//! every event, and [`CommandSession::after`] once they have all run, passing
//! whether one of them silenced the event. Failures are only reported in the
//! second pass, so a listener that recognizes the same trigger can suppress
//! the "unknown command" complaint. A command that was found but failed is
//! claimed in the first pass and its notice is always shown.

use std::collections::HashMap;
use std::sync::Arc;

use regex::Regex;

use super::config::{CommandConfig, ConfigError};
use super::event::{InboundEvent, Verdict};
use crate::command::{Dispatcher, Messenger};
use crate::packet::{ClientPacket, ClientSink};
use crate::tokenizer::strip_outer_markup;

/// The command layer of one host connection.
#[derive(Debug)]
pub struct CommandSession {
    config: CommandConfig,
    public_trigger: Option<Regex>,
    dispatcher: Dispatcher,
    /// Set once the private channel was announced for the current login.
    loaded: bool,
}

impl CommandSession {
    pub fn new(config: CommandConfig, sink: Arc<dyn ClientSink>) -> Result<Self, ConfigError> {
        let public_trigger = config.public_trigger()?;
        let messenger = Messenger::new(sink, config.private_channel_id);

        Ok(Self {
            config,
            public_trigger,
            dispatcher: Dispatcher::new(messenger),
            loaded: false,
        })
    }

    pub fn config(&self) -> &CommandConfig {
        &self.config
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn dispatcher_mut(&mut self) -> &mut Dispatcher {
        &mut self.dispatcher
    }

    /// First pass, ahead of other listeners.
    ///
    /// Blocks the event when a registered command ran (even if it failed),
    /// or when it is private-channel bookkeeping this session answers itself.
    pub fn before(&mut self, event: &InboundEvent) -> Verdict {
        match event {
            InboundEvent::Login => {
                self.loaded = false;
                Verdict::Pass
            }
            InboundEvent::ClientSettingsLoaded { client_version } => {
                if !self.loaded {
                    self.loaded = true;
                    self.announce(*client_version);
                }
                Verdict::Pass
            }
            InboundEvent::JoinPrivateChannel { index }
            | InboundEvent::LeavePrivateChannel { index }
                if *index == self.config.private_channel_index =>
            {
                Verdict::Block
            }
            InboundEvent::RequestPrivateChannelInfo { channel_id }
                if *channel_id == self.config.private_channel_id =>
            {
                self.dispatcher.messenger().send(ClientPacket::PrivateChannelInfo {
                    owner: 1,
                    password: 0,
                    members: Vec::new(),
                    friends: Vec::new(),
                });
                Verdict::Block
            }
            _ => match self.trigger(event) {
                Some(command) if self.dispatcher.handle(&command).is_claimed() => Verdict::Block,
                Some(_) => Verdict::Pass,
                None => Verdict::Pass,
            },
        }
    }

    /// Last pass, after every other listener.
    ///
    /// Reports a latched failure unless `silenced`, and blocks the event
    /// whenever one was latched.
    pub fn after(&mut self, event: &InboundEvent, silenced: bool) -> Verdict {
        if event.is_trigger_kind() && self.dispatcher.report_pending(silenced) {
            Verdict::Block
        } else {
            Verdict::Pass
        }
    }

    /// Extract the command string an event carries, if any.
    fn trigger(&self, event: &InboundEvent) -> Option<String> {
        match event {
            InboundEvent::OpCommand { command } => Some(command.clone()),
            InboundEvent::Chat { channel, message }
                if *channel == self.config.private_chat_channel() =>
            {
                Some(message.clone())
            }
            InboundEvent::Chat { message, .. } | InboundEvent::Whisper { message, .. } => {
                self.public_command(message)
            }
            _ => None,
        }
    }

    fn public_command(&self, message: &str) -> Option<String> {
        let re = self.public_trigger.as_ref()?;
        let stripped = strip_outer_markup(message);
        let caps = re.captures(&stripped)?;
        caps.get(1)
            .or_else(|| caps.get(0))
            .map(|m| m.as_str().to_string())
    }

    fn announce(&self, client_version: u32) {
        let messenger = self.dispatcher.messenger();
        messenger.send(ClientPacket::JoinPrivateChannel {
            index: self.config.private_channel_index,
            id: self.config.private_channel_id,
            name: self.config.private_channel_name.clone(),
        });

        if self.config.login_message {
            messenger.message(format!(
                "{} Client version: {}",
                self.config.login_banner, client_version
            ));
        }
    }
}

/// Identity of a host connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub u64);

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

/// One [`CommandSession`] per host connection.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: HashMap<SessionId, CommandSession>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: SessionId) -> Option<&CommandSession> {
        self.sessions.get(&id)
    }

    pub fn get_mut(&mut self, id: SessionId) -> Option<&mut CommandSession> {
        self.sessions.get_mut(&id)
    }

    /// Return the session for `id`, creating it with `create` on first use.
    pub fn get_or_try_insert_with<F>(
        &mut self,
        id: SessionId,
        create: F,
    ) -> Result<&mut CommandSession, ConfigError>
    where
        F: FnOnce() -> Result<CommandSession, ConfigError>,
    {
        match self.sessions.entry(id) {
            std::collections::hash_map::Entry::Occupied(entry) => Ok(entry.into_mut()),
            std::collections::hash_map::Entry::Vacant(entry) => {
                tracing::debug!("creating command session for {id}");
                Ok(entry.insert(create()?))
            }
        }
    }

    /// Drop the session of a closed connection.
    pub fn remove(&mut self, id: SessionId) -> Option<CommandSession> {
        let removed = self.sessions.remove(&id);
        if removed.is_some() {
            tracing::debug!("dropped command session for {id}");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
