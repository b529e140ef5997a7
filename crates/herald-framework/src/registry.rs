//! Handler registry.
//!
//! Each [`EventKind`] owns a tree of [`Node`]s. Branches map a key segment to
//! a child node, the empty segment being the wildcard; leaves hold the
//! descriptors registered at that path.
//!
//! # Lookup
//!
//! Lookup is a fan-out rather than a single walk. At every level both the
//! child keyed by the concrete segment and the wildcard child are descended,
//! exact child first, and the descriptors of every leaf reached are unioned
//! in discovery order:
//!
//! ```text
//! root ─┬─ "general" ── [H2]        lookup ["general"] => [H2, H1]
//!       └─ ""        ── [H1]        lookup ["random"]  => [H1]
//! ```
//!
//! An empty segment in the looked-up path only follows the wildcard child. A
//! path that runs out at a branch continues through wildcards alone, and a
//! leaf reached before the path is exhausted matches as a prefix.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use herald_core::{EventKind, KeyPath};
use regex::Regex;
use serde::Serialize;
use tracing::{debug, warn};

use crate::command::{CommandDefinition, CommandSpec, SubcommandDefinition};
use crate::error::{RegistryError, RegistryResult};
use crate::filter::Location;
use crate::handler::HandlerRef;
use crate::registration::{ErrorMessages, command_path};

// ============================================================================
// Descriptor
// ============================================================================

/// Everything known about one registered handler.
#[derive(Debug, Clone)]
pub struct Descriptor {
    kind: EventKind,
    name: String,
    handler: HandlerRef,
    location: Location,
    roles: Vec<String>,
    pattern: Option<Regex>,
    messages: ErrorMessages,
    command: Option<Arc<CommandSpec>>,
    paths: Vec<KeyPath>,
}

impl Descriptor {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        kind: EventKind,
        name: String,
        handler: HandlerRef,
        location: Location,
        roles: Vec<String>,
        pattern: Option<Regex>,
        messages: ErrorMessages,
        command: Option<Arc<CommandSpec>>,
        paths: Vec<KeyPath>,
    ) -> Self {
        Self {
            kind,
            name,
            handler,
            location,
            roles,
            pattern,
            messages,
            command,
            paths,
        }
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn handler(&self) -> &HandlerRef {
        &self.handler
    }

    pub fn location(&self) -> Location {
        self.location
    }

    /// Allowed role names; empty means unrestricted.
    pub fn roles(&self) -> &[String] {
        &self.roles
    }

    pub fn pattern(&self) -> Option<&Regex> {
        self.pattern.as_ref()
    }

    pub fn messages(&self) -> &ErrorMessages {
        &self.messages
    }

    /// The command definition, for command kinds.
    pub fn command(&self) -> Option<&CommandSpec> {
        self.command.as_deref()
    }

    /// Key paths this descriptor is inserted at.
    pub fn paths(&self) -> &[KeyPath] {
        &self.paths
    }
}

// ============================================================================
// Node
// ============================================================================

/// A registry tree node.
#[derive(Debug, Clone)]
pub enum Node {
    /// Descriptors registered at this exact path.
    Leaf(Vec<Arc<Descriptor>>),
    /// Children keyed by segment.
    Branch(HashMap<String, Node>),
}

impl Node {
    fn branch() -> Self {
        Self::Branch(HashMap::new())
    }

    fn collect(&self, segments: &[String], found: &mut Vec<Arc<Descriptor>>) {
        let children = match self {
            Self::Leaf(descriptors) => {
                for descriptor in descriptors {
                    if !found.iter().any(|seen| Arc::ptr_eq(seen, descriptor)) {
                        found.push(Arc::clone(descriptor));
                    }
                }
                return;
            }
            Self::Branch(children) => children,
        };

        let rest = match segments.split_first() {
            Some((segment, rest)) => {
                if !segment.is_empty() {
                    if let Some(child) = children.get(segment) {
                        child.collect(rest, found);
                    }
                }
                rest
            }
            None => segments,
        };

        if let Some(wildcard) = children.get(KeyPath::WILDCARD) {
            wildcard.collect(rest, found);
        }
    }
}

// ============================================================================
// Registry
// ============================================================================

/// Handler counts for diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RegistryStats {
    /// Registered descriptors.
    pub handlers: usize,
    /// Registered descriptors per event kind.
    pub per_kind: BTreeMap<EventKind, usize>,
}

/// The handler registry: one tree per event kind.
#[derive(Debug, Default)]
pub struct Registry {
    roots: HashMap<EventKind, Node>,
    descriptors: Vec<Arc<Descriptor>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a descriptor at every one of its paths and records it.
    pub(crate) fn add(&mut self, descriptor: Arc<Descriptor>) -> RegistryResult<()> {
        for path in descriptor.paths() {
            self.insert(descriptor.kind(), path, Arc::clone(&descriptor))?;
        }
        self.descriptors.push(descriptor);
        Ok(())
    }

    /// Appends `descriptor` to the leaf at `path`, creating nodes as needed.
    pub fn insert(
        &mut self,
        kind: EventKind,
        path: &KeyPath,
        descriptor: Arc<Descriptor>,
    ) -> RegistryResult<()> {
        let conflict = || RegistryError::PathConflict {
            kind,
            path: path.clone(),
        };

        let mut node = self.roots.entry(kind).or_insert_with(Node::branch);
        for segment in path.segments() {
            node = match node {
                Node::Branch(children) => {
                    children.entry(segment.clone()).or_insert_with(Node::branch)
                }
                Node::Leaf(_) => return Err(conflict()),
            };
        }

        if matches!(&*node, Node::Branch(children) if children.is_empty()) {
            *node = Node::Leaf(Vec::new());
        }
        match node {
            Node::Leaf(descriptors) => {
                descriptors.push(descriptor);
                Ok(())
            }
            Node::Branch(_) => Err(conflict()),
        }
    }

    /// Returns every descriptor reachable from `path`, without duplicates.
    pub fn lookup(&self, kind: EventKind, path: &KeyPath) -> Vec<Arc<Descriptor>> {
        let mut found = Vec::new();
        if let Some(root) = self.roots.get(&kind) {
            root.collect(path.segments(), &mut found);
        }
        found
    }

    /// Registered descriptors in registration order.
    pub fn descriptors(&self) -> &[Arc<Descriptor>] {
        &self.descriptors
    }

    pub fn stats(&self) -> RegistryStats {
        let mut per_kind = BTreeMap::new();
        for descriptor in &self.descriptors {
            *per_kind.entry(descriptor.kind()).or_insert(0) += 1;
        }
        RegistryStats {
            handlers: self.descriptors.len(),
            per_kind,
        }
    }

    /// Builds the command definitions to submit to the platform.
    ///
    /// Handlers sharing a command name are merged: their subcommands become
    /// the command's subcommands, and a handler without a subcommand supplies
    /// the top-level options.
    pub fn command_definitions(&self) -> Vec<CommandDefinition> {
        let mut definitions: Vec<CommandDefinition> = Vec::new();

        for descriptor in &self.descriptors {
            let Some(spec) = descriptor.command() else {
                continue;
            };
            let kind = descriptor.kind();
            let index = match definitions
                .iter()
                .position(|def| def.kind == kind && def.name == spec.name)
            {
                Some(index) => index,
                None => {
                    definitions.push(CommandDefinition {
                        name: spec.name.clone(),
                        kind,
                        description: spec.description.clone(),
                        options: Vec::new(),
                        subcommands: Vec::new(),
                    });
                    definitions.len() - 1
                }
            };
            let definition = &mut definitions[index];
            let options = spec.options.iter().map(|option| option.definition()).collect();

            match &spec.subcommand {
                Some(subcommand) => definition.subcommands.push(SubcommandDefinition {
                    name: subcommand.clone(),
                    description: spec.description.clone(),
                    group: spec.group.clone(),
                    options,
                }),
                None => definition.options = options,
            }
        }

        definitions
    }

    /// Rebuilds the command subtrees keyed by platform-assigned ids.
    ///
    /// Command handlers whose name received no id are dropped with a warning;
    /// they can never be invoked.
    pub fn rekey_commands(&mut self, ids: &HashMap<String, String>) -> RegistryResult<()> {
        self.roots.retain(|kind, _| !kind.is_command());

        let previous = std::mem::take(&mut self.descriptors);
        for descriptor in previous {
            let kind = descriptor.kind();
            let Some(spec) = descriptor.command.as_deref() else {
                self.descriptors.push(descriptor);
                continue;
            };
            let Some(id) = ids.get(&spec.name) else {
                warn!(
                    kind = %kind,
                    command = %spec.name,
                    handler = descriptor.name(),
                    "Command has no platform id, dropping handler"
                );
                continue;
            };

            let mut rekeyed = Descriptor::clone(&descriptor);
            rekeyed.paths = vec![command_path(kind, spec, id)];
            self.add(Arc::new(rekeyed))?;
        }

        debug!(commands = ids.len(), "Rekeyed command handlers");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::CommandOption;
    use crate::registration::HandlerOptions;
    use crate::testing::counting_handler;

    fn names(found: &[Arc<Descriptor>]) -> Vec<&str> {
        found.iter().map(|d| d.name()).collect()
    }

    fn register(registry: &mut Registry, options: HandlerOptions, name: &str) -> Arc<Descriptor> {
        let (handler, _) = counting_handler();
        registry
            .register_instance(options.name(name), handler)
            .unwrap()
    }

    #[test]
    fn test_exact_before_wildcard() {
        let mut registry = Registry::new();
        register(&mut registry, HandlerOptions::message(), "any");
        register(&mut registry, HandlerOptions::message().channel("general"), "general");

        let found = registry.lookup(EventKind::Message, &KeyPath::from("general"));
        assert_eq!(names(&found), ["general", "any"]);

        let found = registry.lookup(EventKind::Message, &KeyPath::from("random"));
        assert_eq!(names(&found), ["any"]);
    }

    #[test]
    fn test_multiple_handlers_share_a_path() {
        let mut registry = Registry::new();
        register(&mut registry, HandlerOptions::button("confirm"), "first");
        register(&mut registry, HandlerOptions::button("confirm"), "second");

        let found = registry.lookup(EventKind::Button, &KeyPath::from("confirm"));
        assert_eq!(names(&found), ["first", "second"]);
        assert!(registry.lookup(EventKind::Button, &KeyPath::from("cancel")).is_empty());
        assert!(registry.lookup(EventKind::Message, &KeyPath::from("confirm")).is_empty());
    }

    #[test]
    fn test_empty_segment_does_not_visit_wildcard_twice() {
        let mut registry = Registry::new();
        register(
            &mut registry,
            HandlerOptions::slash(CommandSpec::new("abc", "x")),
            "top",
        );

        let found = registry.lookup(EventKind::SlashCommand, &KeyPath::from(["abc", "", ""]));
        assert_eq!(names(&found), ["top"]);
    }

    #[test]
    fn test_exhausted_path_follows_wildcards_only() {
        let mut registry = Registry::new();
        register(&mut registry, HandlerOptions::new(EventKind::Ready), "ready");
        register(
            &mut registry,
            HandlerOptions::new(EventKind::Ready).path("shard-0"),
            "shard",
        );

        let found = registry.lookup(EventKind::Ready, &KeyPath::root());
        assert_eq!(names(&found), ["ready"]);
    }

    #[test]
    fn test_leaf_matches_as_prefix() {
        let mut registry = Registry::new();
        register(
            &mut registry,
            HandlerOptions::new(EventKind::ReactionAdd).path("poll"),
            "poll",
        );

        let found = registry.lookup(EventKind::ReactionAdd, &KeyPath::from(["poll", "42"]));
        assert_eq!(names(&found), ["poll"]);
    }

    #[test]
    fn test_same_descriptor_reached_twice_is_listed_once() {
        let mut registry = Registry::new();
        let (handler, _) = counting_handler();
        registry
            .register_instance(
                HandlerOptions::new(EventKind::ReactionAdd).path("").path("poll"),
                handler,
            )
            .unwrap();

        let found = registry.lookup(EventKind::ReactionAdd, &KeyPath::from("poll"));
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn test_conflicting_shapes_are_rejected() {
        let mut registry = Registry::new();
        register(
            &mut registry,
            HandlerOptions::new(EventKind::Timer).path("daily"),
            "daily",
        );

        let (handler, _) = counting_handler();
        let err = registry
            .register_instance(
                HandlerOptions::new(EventKind::Timer).path(["daily", "noon"]),
                handler.clone(),
            )
            .unwrap_err();
        assert!(matches!(err, RegistryError::PathConflict { kind: EventKind::Timer, .. }));

        register(
            &mut registry,
            HandlerOptions::new(EventKind::Timer).path(["weekly", "monday"]),
            "monday",
        );
        let err = registry
            .register_instance(HandlerOptions::new(EventKind::Timer).path("weekly"), handler)
            .unwrap_err();
        assert!(matches!(err, RegistryError::PathConflict { .. }));
    }

    #[test]
    fn test_command_definitions_merge_subcommands() {
        let mut registry = Registry::new();
        register(
            &mut registry,
            HandlerOptions::slash(CommandSpec::new("ticket", "Tickets").subcommand("open")),
            "open",
        );
        register(
            &mut registry,
            HandlerOptions::slash(
                CommandSpec::new("ticket", "Tickets")
                    .group("admin")
                    .subcommand("close")
                    .option(CommandOption::new("reason", "Why")),
            ),
            "close",
        );
        register(
            &mut registry,
            HandlerOptions::user_menu(CommandSpec::new("Report", "")),
            "report",
        );

        let definitions = registry.command_definitions();
        assert_eq!(definitions.len(), 2);
        assert_eq!(definitions[0].name, "ticket");
        assert_eq!(definitions[0].subcommands.len(), 2);
        assert_eq!(definitions[0].subcommands[1].group.as_deref(), Some("admin"));
        assert_eq!(definitions[0].subcommands[1].options[0].name, "reason");
        assert_eq!(definitions[1].kind, EventKind::UserContextMenu);
    }

    #[test]
    fn test_rekey_moves_commands_to_ids() {
        let mut registry = Registry::new();
        register(
            &mut registry,
            HandlerOptions::slash(CommandSpec::new("ping", "Ping")),
            "ping",
        );
        register(
            &mut registry,
            HandlerOptions::message_menu(CommandSpec::new("Quote", "")),
            "quote",
        );
        register(&mut registry, HandlerOptions::message(), "chat");

        let ids = HashMap::from([("ping".to_string(), "111".to_string())]);
        registry.rekey_commands(&ids).unwrap();

        let by_id = registry.lookup(EventKind::SlashCommand, &KeyPath::from(["111", "", ""]));
        assert_eq!(names(&by_id), ["ping"]);
        assert!(
            registry
                .lookup(EventKind::SlashCommand, &KeyPath::from(["ping", "", ""]))
                .is_empty()
        );
        assert!(
            registry
                .lookup(EventKind::MessageContextMenu, &KeyPath::from("Quote"))
                .is_empty()
        );
        assert_eq!(names(&registry.lookup(EventKind::Message, &KeyPath::from("x"))), ["chat"]);

        let stats = registry.stats();
        assert_eq!(stats.handlers, 2);
        assert_eq!(stats.per_kind.get(&EventKind::MessageContextMenu), None);
    }
}
