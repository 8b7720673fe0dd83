//! Host-facing glue around the dispatcher.
//!
//! A [`CommandSession`] recognizes command triggers among inbound events:
//!
//! 1. explicit operator commands
//! 2. chat on the virtual private channel (taken verbatim)
//! 3. chat on any channel matching the public pattern (`!command` by default)
//! 4. whispers matching the same pattern
//!
//! It also owns the virtual private channel the replies are shown in.
//! Configuration is loaded from:
//! 1. `{working_dir}/.chatcmd/config.toml` (project-local)
//! 2. `~/.config/chatcmd/config.toml` (user-global)

pub mod config;
pub mod event;
pub mod proxy;

pub use config::{CommandConfig, ConfigError, load_config};
pub use event::{InboundEvent, Verdict};
pub use proxy::{CommandSession, SessionId, SessionRegistry};
