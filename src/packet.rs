//! Packets sent back to the client, and the sink the host provides for them.

use std::sync::Mutex;

use serde::{Deserialize, Serialize};

/// Outgoing client-bound packets produced by the command layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientPacket {
    /// A message in a private channel. Author id `0` with an empty name
    /// renders as a system line rather than a player.
    PrivateChat {
        channel: u32,
        author_id: u64,
        author_name: String,
        message: String,
    },
    /// Makes the client show a private channel tab.
    JoinPrivateChannel { index: u32, id: u32, name: String },
    /// Reply to the client's channel-info request.
    PrivateChannelInfo {
        owner: u32,
        password: u32,
        members: Vec<String>,
        friends: Vec<String>,
    },
}

/// Where outgoing packets go. Delivery is fire-and-forget.
pub trait ClientSink: Send + Sync {
    fn send(&self, packet: ClientPacket);
}

impl<F> ClientSink for F
where
    F: Fn(ClientPacket) + Send + Sync,
{
    fn send(&self, packet: ClientPacket) {
        self(packet)
    }
}

/// A sink that keeps every packet in memory.
#[derive(Debug, Default)]
pub struct RecordingSink {
    packets: Mutex<Vec<ClientPacket>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain the recorded packets.
    pub fn take(&self) -> Vec<ClientPacket> {
        match self.packets.lock() {
            Ok(mut packets) => std::mem::take(&mut *packets),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }

    /// Drain the recorded packets, keeping only private chat message text.
    pub fn take_messages(&self) -> Vec<String> {
        self.take()
            .into_iter()
            .filter_map(|packet| match packet {
                ClientPacket::PrivateChat { message, .. } => Some(message),
                _ => None,
            })
            .collect()
    }
}

impl ClientSink for RecordingSink {
    fn send(&self, packet: ClientPacket) {
        match self.packets.lock() {
            Ok(mut packets) => packets.push(packet),
            Err(poisoned) => poisoned.into_inner().push(packet),
        }
    }
}
