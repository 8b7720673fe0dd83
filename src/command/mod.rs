//! Command registration and dispatch.
//!
//! Commands are registered by name (case-insensitive) against a handler,
//! which is either a callback or a tree of sub-commands. A [`Dispatcher`]
//! owns the registry for one connection, runs trigger strings against it and
//! latches a user-facing message whenever an attempt fails, so that the host
//! can decide later whether to show it.

pub mod dispatcher;
pub mod error;
pub mod handler;
pub mod registry;

pub use dispatcher::{Dispatch, Dispatcher, Messenger};
pub use error::{DispatchError, DispatchResult, RegistrationError};
pub use handler::{DEFAULT_KEY, Handler, HandlerSpec, NONE_KEY, SubCommandNode, SubCommands};
pub use registry::{CommandInput, CommandNames, CommandRegistry};
