//! CLI entry for chatcmd: loads configuration, registers the built-in
//! commands and feeds stdin lines through a command session.
//!
//! Every input line becomes one inbound event:
//!
//! - `/op <command>` is an operator command
//! - `/w <target> <text>` is a whisper
//! - `/proxy <text>` is chat on the private channel
//! - anything else is chat on channel 0
//!
//! Packets sent to the client, and events that were delivered normally, are
//! printed to stdout as JSON lines. Logs go to stderr.

use std::io::{self, BufRead};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use crate::command::{HandlerSpec, Messenger, RegistrationError, SubCommands};
use crate::packet::{ClientPacket, ClientSink};
use crate::session::{CommandConfig, CommandSession, InboundEvent, load_config};

#[derive(Parser, Debug)]
#[command(
    about = "chatcmd: feed chat lines through the command dispatcher",
    version
)]
pub struct Cli {
    /// Config file to use instead of the project or user config
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Client version reported in the login banner
    #[arg(long, default_value_t = 0)]
    pub client_version: u32,
}

/// Parse arguments (from the process when `args` is `None`) and run.
pub fn parse(args: Option<&[&str]>) -> anyhow::Result<()> {
    let cli = match args {
        Some(args) => Cli::try_parse_from(args)?,
        None => Cli::parse(),
    };
    run(cli)
}

pub fn run(cli: Cli) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => CommandConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => load_config(&std::env::current_dir()?),
    };

    let sink: Arc<dyn ClientSink> = Arc::new(|packet: ClientPacket| emit(&packet));
    let mut session = CommandSession::new(config, sink)?;
    register_builtins(&mut session)?;

    session.before(&InboundEvent::Login);
    session.before(&InboundEvent::ClientSettingsLoaded {
        client_version: cli.client_version,
    });

    for line in io::stdin().lock().lines() {
        let line = line?;
        if line.is_empty() {
            continue;
        }

        let event = parse_line(&line, session.config());
        let silenced = session.before(&event).is_blocked();
        let blocked = session.after(&event, silenced).is_blocked() || silenced;
        if !blocked {
            deliver(&event);
        }
    }

    Ok(())
}

/// Context shared by the built-in commands.
struct Builtins {
    messenger: Messenger,
    channel: String,
}

/// Register `echo`, `channel` and `help`.
///
/// `help` lists the commands registered on the session at this point, itself
/// included.
pub fn register_builtins(session: &mut CommandSession) -> Result<(), RegistrationError> {
    let config = session.config();
    let ctx = Arc::new(Builtins {
        messenger: session.dispatcher().messenger().clone(),
        channel: format!(
            "\"{}\" (index {}, id {})",
            config.private_channel_name, config.private_channel_index, config.private_channel_id
        ),
    });
    let dispatcher = session.dispatcher_mut();

    dispatcher.add_with_context(
        "echo",
        Arc::clone(&ctx),
        HandlerSpec::leaf(|b: &Builtins, args: &[String]| {
            b.messenger.message(args[1..].join(" "));
            Ok(())
        }),
    )?;

    dispatcher.add_with_context(
        "channel",
        Arc::clone(&ctx),
        SubCommands::new()
            .on(
                "info",
                HandlerSpec::leaf(|b: &Builtins, _args: &[String]| {
                    b.messenger.message(format!("Private channel {}", b.channel));
                    Ok(())
                }),
            )
            .none(HandlerSpec::leaf(|b: &Builtins, _args: &[String]| {
                b.messenger.message("Usage: channel info");
                Ok(())
            }))
            .default(HandlerSpec::leaf(|b: &Builtins, args: &[String]| {
                b.messenger
                    .message(format!("Unknown sub-command \"{}\".", args[0]));
                Ok(())
            }))
            .build(),
    )?;

    // Registered last so the listing covers everything added so far.
    let mut names = dispatcher.registry().command_names();
    names.push("help".to_string());
    names.sort();
    let listing = format!("Commands: {}", names.join(", "));
    dispatcher.add_with_context(
        ["help", "?"],
        ctx,
        HandlerSpec::leaf(move |b: &Builtins, _args: &[String]| {
            b.messenger.message(listing.clone());
            Ok(())
        }),
    )?;

    Ok(())
}

fn parse_line(line: &str, config: &CommandConfig) -> InboundEvent {
    if let Some(command) = line.strip_prefix("/op ") {
        InboundEvent::OpCommand {
            command: command.to_string(),
        }
    } else if let Some(rest) = line.strip_prefix("/w ") {
        let (target, message) = rest.split_once(' ').unwrap_or((rest, ""));
        InboundEvent::Whisper {
            target: target.to_string(),
            message: message.to_string(),
        }
    } else if let Some(message) = line.strip_prefix("/proxy ") {
        InboundEvent::Chat {
            channel: config.private_chat_channel(),
            message: message.to_string(),
        }
    } else {
        InboundEvent::Chat {
            channel: 0,
            message: line.to_string(),
        }
    }
}

fn emit(packet: &ClientPacket) {
    match serde_json::to_string(packet) {
        Ok(json) => println!("{json}"),
        Err(e) => tracing::warn!("failed to encode packet: {e}"),
    }
}

fn deliver(event: &InboundEvent) {
    let value = match event {
        InboundEvent::OpCommand { command } => serde_json::json!({ "command": command }),
        InboundEvent::Chat { channel, message } => {
            serde_json::json!({ "channel": channel, "message": message })
        }
        InboundEvent::Whisper { target, message } => {
            serde_json::json!({ "whisper": target, "message": message })
        }
        other => serde_json::json!({ "event": format!("{other:?}") }),
    };
    println!("{}", serde_json::json!({ "deliver": value }));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::RecordingSink;

    fn session() -> (CommandSession, Arc<RecordingSink>) {
        let sink = Arc::new(RecordingSink::new());
        let mut session = CommandSession::new(CommandConfig::default(), sink.clone()).unwrap();
        register_builtins(&mut session).unwrap();
        (session, sink)
    }

    #[test]
    fn test_parse_line() {
        let config = CommandConfig::default();
        assert_eq!(
            parse_line("/op echo hi", &config),
            InboundEvent::OpCommand {
                command: "echo hi".to_string()
            }
        );
        assert_eq!(
            parse_line("/w bob !echo hi", &config),
            InboundEvent::Whisper {
                target: "bob".to_string(),
                message: "!echo hi".to_string()
            }
        );
        assert_eq!(
            parse_line("/proxy echo", &config),
            InboundEvent::Chat {
                channel: 18,
                message: "echo".to_string()
            }
        );
        assert_eq!(
            parse_line("hello", &config),
            InboundEvent::Chat {
                channel: 0,
                message: "hello".to_string()
            }
        );
    }

    #[test]
    fn test_builtin_echo() {
        let (mut session, sink) = session();
        session.dispatcher_mut().handle("echo hello 'big world'");
        assert_eq!(sink.take_messages(), vec!["hello big world"]);
    }

    #[test]
    fn test_builtin_help_alias() {
        let (mut session, sink) = session();
        session.dispatcher_mut().handle("?");
        assert_eq!(sink.take_messages(), vec!["Commands: channel, echo, help"]);
    }

    #[test]
    fn test_builtin_help_lists_registered_commands() {
        let sink = Arc::new(RecordingSink::new());
        let mut session = CommandSession::new(CommandConfig::default(), sink.clone()).unwrap();
        session
            .dispatcher_mut()
            .add("heal", HandlerSpec::func(|_| Ok(())))
            .unwrap();
        register_builtins(&mut session).unwrap();

        session.dispatcher_mut().handle("help");
        assert_eq!(
            sink.take_messages(),
            vec!["Commands: channel, echo, heal, help"]
        );
    }

    #[test]
    fn test_builtin_channel_subcommands() {
        let (mut session, sink) = session();
        let dispatcher = session.dispatcher_mut();

        dispatcher.handle("channel INFO");
        dispatcher.handle("channel");
        dispatcher.handle("channel bogus");
        assert_eq!(
            sink.take_messages(),
            vec![
                "Private channel \"Proxy\" (index 7, id 4294967294)",
                "Usage: channel info",
                "Unknown sub-command \"bogus\".",
            ]
        );
    }

    #[test]
    fn test_builtins_cannot_register_twice() {
        let (mut session, _sink) = session();
        assert!(register_builtins(&mut session).is_err());
    }

    #[test]
    fn test_cli_rejects_unknown_flag() {
        assert!(parse(Some(&["chatcmd", "--bogus"])).is_err());
    }
}
