//! Chat command tokenizer and dispatcher.
//!
//! Raw chat lines such as `!heal "party leader" now` are tokenized, matched
//! against a registry of named handlers (optionally nested into sub-command
//! trees) and run synchronously. Failures never reach the host; they are
//! latched as user-facing messages and shown in a private system channel.

pub mod cli;
pub mod command;
pub mod packet;
pub mod session;
pub mod tokenizer;

pub use command::{
    Dispatch, DispatchError, Dispatcher, HandlerSpec, Messenger, RegistrationError, SubCommands,
};
pub use packet::{ClientPacket, ClientSink, RecordingSink};
pub use session::{CommandConfig, CommandSession, InboundEvent, SessionId, SessionRegistry, Verdict};
pub use tokenizer::{SyntaxError, tokenize};
