//! Inbound events seen by a session and the verdicts it returns.

/// Events the host forwards to a command session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    /// An explicit operator command typed by the user.
    OpCommand { command: String },
    /// A chat line on any channel.
    Chat { channel: u32, message: String },
    /// A whisper to another player.
    Whisper { target: String, message: String },
    /// The server accepted a login; a new character session starts.
    Login,
    /// The client finished loading its settings after login.
    ClientSettingsLoaded { client_version: u32 },
    /// The server tells the client to join a private channel.
    JoinPrivateChannel { index: u32 },
    /// The client asks to leave a private channel.
    LeavePrivateChannel { index: u32 },
    /// The client asks for the member list of a private channel.
    RequestPrivateChannelInfo { channel_id: u32 },
}

impl InboundEvent {
    /// Whether this event type can carry a command.
    pub fn is_trigger_kind(&self) -> bool {
        matches!(
            self,
            InboundEvent::OpCommand { .. }
                | InboundEvent::Chat { .. }
                | InboundEvent::Whisper { .. }
        )
    }
}

/// What the host should do with an event after a listener pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Continue normal delivery.
    Pass,
    /// Stop delivery; the command layer consumed the event.
    Block,
}

impl Verdict {
    /// Returns `true` if the event must not be delivered.
    pub fn is_blocked(&self) -> bool {
        matches!(self, Self::Block)
    }
}
