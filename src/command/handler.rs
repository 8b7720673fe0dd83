//! Command handlers: plain callbacks and nested sub-command trees.
//!
//! Handlers are described with [`HandlerSpec`] and compiled into a
//! [`Handler`] when registered. Compilation lower-cases sub-command names,
//! validates them and binds the registration context into every leaf.
//!
//! Every handler receives the argument slice starting at the token that
//! selected it:
//!
//! - a top-level command sees its own name as `args[0]`
//! - a sub-command sees its own sub-name first
//! - a `$default` handler sees the unmatched token first
//! - a `$none` handler gets an empty slice

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::error::RegistrationError;

/// Reserved sub-command key used when no further tokens remain.
pub const NONE_KEY: &str = "$none";
/// Reserved sub-command key used when nothing else matches.
pub const DEFAULT_KEY: &str = "$default";

/// A compiled leaf callback.
pub type Callback = Arc<dyn Fn(&[String]) -> anyhow::Result<()> + Send + Sync>;

/// A leaf callback that still expects its registration context.
pub type ContextCallback<C> = Box<dyn Fn(&C, &[String]) -> anyhow::Result<()> + Send + Sync>;

/// A registered handler, ready to run.
#[derive(Clone)]
pub enum Handler {
    Leaf(Callback),
    SubTree(Arc<SubCommandNode>),
}

impl Handler {
    /// Run the handler. `args[0]` is the token that selected it.
    pub fn invoke(&self, args: &[String]) -> anyhow::Result<()> {
        match self {
            Handler::Leaf(callback) => callback(args),
            Handler::SubTree(node) => node.invoke(args),
        }
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Handler::Leaf(_) => f.write_str("Leaf"),
            Handler::SubTree(node) => f.debug_tuple("SubTree").field(node).finish(),
        }
    }
}

/// A compiled sub-command level.
#[derive(Debug, Default)]
pub struct SubCommandNode {
    children: HashMap<String, Handler>,
    none: Option<Handler>,
    default: Option<Handler>,
}

impl SubCommandNode {
    /// Pick the handler for the next token, if any.
    pub fn resolve(&self, next: Option<&str>) -> Option<&Handler> {
        match next {
            Some(name) => self.children.get(&name.to_lowercase()),
            None => self.none.as_ref(),
        }
        .or(self.default.as_ref())
    }

    fn invoke(&self, args: &[String]) -> anyhow::Result<()> {
        let rest = args.get(1..).unwrap_or_default();

        match self.resolve(rest.first().map(String::as_str)) {
            Some(handler) => handler.invoke(rest),
            None => {
                tracing::debug!(
                    "no sub-command matched {:?} under {:?}",
                    rest.first(),
                    args.first()
                );
                Ok(())
            }
        }
    }

    /// Names of the regular sub-commands, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.children.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// Description of a handler before registration.
///
/// `C` is the context type bound at registration; it defaults to `()` for
/// handlers that capture what they need themselves.
pub enum HandlerSpec<C = ()> {
    Leaf(ContextCallback<C>),
    Tree(SubCommands<C>),
}

impl<C: 'static> HandlerSpec<C> {
    /// A leaf that receives the registration context.
    pub fn leaf<F>(callback: F) -> Self
    where
        F: Fn(&C, &[String]) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        HandlerSpec::Leaf(Box::new(callback))
    }

    /// A leaf that ignores the registration context.
    pub fn func<F>(callback: F) -> Self
    where
        F: Fn(&[String]) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        HandlerSpec::Leaf(Box::new(move |_ctx: &C, args: &[String]| callback(args)))
    }
}

impl<C: Send + Sync + 'static> HandlerSpec<C> {
    /// Compile into a [`Handler`], binding `ctx` into every leaf.
    ///
    /// `command` names the registration in error messages.
    pub(crate) fn compile(
        self,
        ctx: &Arc<C>,
        command: &str,
    ) -> Result<Handler, RegistrationError> {
        match self {
            HandlerSpec::Leaf(callback) => {
                let ctx = Arc::clone(ctx);
                Ok(Handler::Leaf(Arc::new(move |args: &[String]| {
                    callback(&ctx, args)
                })))
            }
            HandlerSpec::Tree(tree) => tree.compile(ctx, command),
        }
    }
}

impl<C> fmt::Debug for HandlerSpec<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandlerSpec::Leaf(_) => f.write_str("Leaf"),
            HandlerSpec::Tree(tree) => f.debug_tuple("Tree").field(tree).finish(),
        }
    }
}

/// Builder for a sub-command tree.
///
/// ```
/// use chatcmd::command::{HandlerSpec, SubCommands};
///
/// let spec: HandlerSpec = SubCommands::new()
///     .on("list", HandlerSpec::func(|_args| Ok(())))
///     .none(HandlerSpec::func(|_args| Ok(())))
///     .build();
/// ```
pub struct SubCommands<C = ()> {
    entries: Vec<(String, HandlerSpec<C>)>,
}

impl<C> SubCommands<C> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Add a sub-command. `$none` and `$default` select the fallback slots.
    pub fn on(mut self, name: impl Into<String>, handler: HandlerSpec<C>) -> Self {
        self.entries.push((name.into(), handler));
        self
    }

    /// Handler used when no further tokens remain.
    pub fn none(self, handler: HandlerSpec<C>) -> Self {
        self.on(NONE_KEY, handler)
    }

    /// Handler used when the next token matches nothing.
    pub fn default(self, handler: HandlerSpec<C>) -> Self {
        self.on(DEFAULT_KEY, handler)
    }

    pub fn build(self) -> HandlerSpec<C> {
        HandlerSpec::Tree(self)
    }
}

impl<C> Default for SubCommands<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> fmt::Debug for SubCommands<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.entries.iter().map(|(name, spec)| (name, spec)))
            .finish()
    }
}

impl<C: Send + Sync + 'static> SubCommands<C> {
    fn compile(self, ctx: &Arc<C>, command: &str) -> Result<Handler, RegistrationError> {
        let mut node = SubCommandNode::default();

        for (name, spec) in self.entries {
            if name.is_empty() {
                return Err(RegistrationError::EmptySubCommand {
                    command: command.to_string(),
                });
            }

            let name = name.to_lowercase();
            let handler = spec.compile(ctx, command)?;
            let slot = match name.as_str() {
                NONE_KEY => &mut node.none,
                DEFAULT_KEY => &mut node.default,
                _ => {
                    if node.children.contains_key(&name) {
                        return Err(RegistrationError::DuplicateSubCommand {
                            command: command.to_string(),
                            name,
                        });
                    }
                    node.children.insert(name, handler);
                    continue;
                }
            };

            if slot.is_some() {
                return Err(RegistrationError::DuplicateSubCommand {
                    command: command.to_string(),
                    name,
                });
            }
            *slot = Some(handler);
        }

        Ok(Handler::SubTree(Arc::new(node)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    /// A leaf that records which label ran and with what arguments.
    fn recorder(log: &Arc<Mutex<Vec<String>>>, label: &'static str) -> HandlerSpec {
        let log = Arc::clone(log);
        HandlerSpec::func(move |args| {
            log.lock().unwrap().push(format!("{label}:{}", args.join(",")));
            Ok(())
        })
    }

    fn compile(spec: HandlerSpec) -> Handler {
        spec.compile(&Arc::new(()), "test").unwrap()
    }

    #[test]
    fn test_leaf_receives_all_args() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let handler = compile(recorder(&log, "leaf"));
        handler.invoke(&args(&["heal", "me"])).unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["leaf:heal,me"]);
    }

    #[test]
    fn test_leaf_bound_to_context() {
        struct Counter(Mutex<usize>);

        let spec: HandlerSpec<Counter> = HandlerSpec::leaf(|counter: &Counter, args: &[String]| {
            *counter.0.lock().unwrap() += args.len();
            Ok(())
        });
        let ctx = Arc::new(Counter(Mutex::new(0)));
        let handler = spec.compile(&ctx, "count").unwrap();

        handler.invoke(&args(&["count", "a", "b"])).unwrap();
        handler.invoke(&args(&["count"])).unwrap();
        assert_eq!(*ctx.0.lock().unwrap(), 4);
    }

    #[test]
    fn test_subcommand_dispatch_strips_parent_name() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let handler = compile(
            SubCommands::new()
                .on("list", recorder(&log, "list"))
                .build(),
        );

        handler.invoke(&args(&["tp", "LIST", "x"])).unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["list:LIST,x"]);
    }

    #[test]
    fn test_subcommand_names_are_case_insensitive() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let handler = compile(
            SubCommands::new()
                .on("Save", recorder(&log, "save"))
                .build(),
        );

        handler.invoke(&args(&["tp", "save"])).unwrap();
        handler.invoke(&args(&["tp", "sAvE"])).unwrap();
        assert_eq!(log.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_default_only_handles_anything() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let handler = compile(
            SubCommands::new()
                .default(recorder(&log, "default"))
                .build(),
        );

        handler.invoke(&args(&["tp", "unknown", "x"])).unwrap();
        handler.invoke(&args(&["tp"])).unwrap();
        assert_eq!(
            *log.lock().unwrap(),
            vec!["default:unknown,x", "default:"]
        );
    }

    #[test]
    fn test_none_only_ignores_unknown_token() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let handler = compile(
            SubCommands::new()
                .none(recorder(&log, "none"))
                .build(),
        );

        handler.invoke(&args(&["tp", "unknown"])).unwrap();
        assert!(log.lock().unwrap().is_empty());

        handler.invoke(&args(&["tp"])).unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["none:"]);
    }

    #[test]
    fn test_none_preferred_over_default_without_tokens() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let handler = compile(
            SubCommands::new()
                .none(recorder(&log, "none"))
                .default(recorder(&log, "default"))
                .build(),
        );

        handler.invoke(&args(&["tp"])).unwrap();
        handler.invoke(&args(&["tp", "zzz"])).unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["none:", "default:zzz"]);
    }

    #[test]
    fn test_reserved_key_is_not_matchable_as_token() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let handler = compile(
            SubCommands::new()
                .none(recorder(&log, "none"))
                .build(),
        );

        handler.invoke(&args(&["tp", "$none"])).unwrap();
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn test_nested_trees() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let handler = compile(
            SubCommands::new()
                .on(
                    "party",
                    SubCommands::new()
                        .on("invite", recorder(&log, "invite"))
                        .none(recorder(&log, "party-none"))
                        .build(),
                )
                .build(),
        );

        handler.invoke(&args(&["cmd", "party", "invite", "bob"])).unwrap();
        handler.invoke(&args(&["cmd", "party"])).unwrap();
        assert_eq!(
            *log.lock().unwrap(),
            vec!["invite:invite,bob", "party-none:"]
        );
    }

    #[test]
    fn test_errors_propagate_from_nested_leaf() {
        let handler = compile(
            SubCommands::new()
                .on("fail", HandlerSpec::func(|_| anyhow::bail!("nope")))
                .build(),
        );
        let err = handler.invoke(&args(&["cmd", "fail"])).unwrap_err();
        assert_eq!(err.to_string(), "nope");
    }

    #[test]
    fn test_empty_subcommand_name_rejected() {
        let spec: HandlerSpec = SubCommands::new()
            .on("", HandlerSpec::func(|_| Ok(())))
            .build();
        assert_eq!(
            spec.compile(&Arc::new(()), "tp").unwrap_err(),
            RegistrationError::EmptySubCommand {
                command: "tp".to_string()
            }
        );
    }

    #[test]
    fn test_duplicate_subcommand_rejected() {
        let spec: HandlerSpec = SubCommands::new()
            .on("list", HandlerSpec::func(|_| Ok(())))
            .on("LIST", HandlerSpec::func(|_| Ok(())))
            .build();
        assert_eq!(
            spec.compile(&Arc::new(()), "tp").unwrap_err(),
            RegistrationError::DuplicateSubCommand {
                command: "tp".to_string(),
                name: "list".to_string()
            }
        );
    }

    #[test]
    fn test_duplicate_fallback_rejected() {
        let spec: HandlerSpec = SubCommands::new()
            .none(HandlerSpec::func(|_| Ok(())))
            .on("$NONE", HandlerSpec::func(|_| Ok(())))
            .build();
        assert!(matches!(
            spec.compile(&Arc::new(()), "tp"),
            Err(RegistrationError::DuplicateSubCommand { .. })
        ));
    }

    #[test]
    fn test_node_names_sorted() {
        let handler = compile(
            SubCommands::new()
                .on("b", HandlerSpec::func(|_| Ok(())))
                .on("a", HandlerSpec::func(|_| Ok(())))
                .build(),
        );
        match handler {
            Handler::SubTree(node) => assert_eq!(node.names(), vec!["a", "b"]),
            Handler::Leaf(_) => panic!("expected a sub-command tree"),
        }
    }
}
