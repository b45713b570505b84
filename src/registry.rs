//! Flattens a [`NamespaceGraph`] into a map of dotted command names
//!
//! The walk visits imported namespaces before the namespace's own groups, so a name a
//! namespace declares itself wins over one pulled in through an import. A namespace is
//! expanded at most once per build: a second binding of the same namespace, or a cycle
//! back to one already expanded, is skipped.

use std::collections::BTreeMap;
use std::sync::Arc;

use log::{debug, warn};

use crate::commands::{CommandError, Context, GroupSpec};
use crate::namespace::{NamespaceGraph, NamespaceId, VisitSet};
use crate::settings::Settings;

/// Operations whose name starts with this are never registered
pub const RESERVED_PREFIX: char = '_';

/// A single invocable command
#[derive(Debug, Clone)]
pub struct CommandHandle {
    group: Arc<GroupSpec>,
    name: String,
    doc: String,
}

impl CommandHandle {
    #[must_use]
    pub fn new(group: Arc<GroupSpec>, name: impl Into<String>, doc: impl Into<String>) -> Self {
        Self {
            group,
            name: name.into(),
            doc: doc.into(),
        }
    }

    #[must_use]
    pub fn group_name(&self) -> &str {
        self.group.name()
    }

    /// Both handles belong to the same group instance, not just to groups of one name.
    #[must_use]
    pub fn same_group(&self, other: &CommandHandle) -> bool {
        Arc::ptr_eq(&self.group, &other.group)
    }

    /// The operation name, without any namespace prefix
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn docstring(&self) -> &str {
        &self.doc
    }

    /// The first non-empty line of the documentation, trimmed.
    #[must_use]
    pub fn summary_docstring(&self) -> &str {
        self.doc
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .unwrap_or("")
    }

    /// Build a fresh group instance with `settings` and run this operation.
    ///
    /// # Errors
    ///
    /// Propagates whatever the operation returns.
    pub fn execute(
        &self,
        settings: Settings,
        context: &Context,
        args: &[String],
    ) -> Result<(), CommandError> {
        let mut commander = self.group.instantiate(settings, context.clone());
        commander.execute(&self.name, args)
    }
}

pub type CommandRegistry = BTreeMap<String, CommandHandle>;

/// Insert `handle`, returning whether it replaced a command of another group.
fn merge(registry: &mut CommandRegistry, name: String, handle: CommandHandle) -> bool {
    let replaced = registry
        .get(&name)
        .is_some_and(|previous| !previous.same_group(&handle));
    if replaced && let Some(previous) = registry.get(&name) {
        warn!(
            "Command '{name}' from group '{}' replaces the one from group '{}'",
            handle.group_name(),
            previous.group_name()
        );
    }
    registry.insert(name, handle);
    replaced
}

pub struct RegistryBuilder<'a> {
    graph: &'a NamespaceGraph,
    visited: VisitSet,
}

impl<'a> RegistryBuilder<'a> {
    #[must_use]
    pub fn new(graph: &'a NamespaceGraph) -> Self {
        Self {
            graph,
            visited: VisitSet::default(),
        }
    }

    /// Build the registry rooted at `root`, with no prefix.
    pub fn build_root(&mut self, root: NamespaceId) -> CommandRegistry {
        if let Some(namespace) = self.graph.get(root) {
            self.visited.insert(&namespace.identity);
        }
        self.build(root, "")
    }

    /// Register every command reachable from `id` under `prefix`.
    ///
    /// `prefix` is either empty or ends with a dot.
    pub fn build(&mut self, id: NamespaceId, prefix: &str) -> CommandRegistry {
        let mut registry = CommandRegistry::new();
        let graph = self.graph;
        let Some(namespace) = graph.get(id) else {
            return registry;
        };

        let mut imports: Vec<_> = namespace.imports.iter().collect();
        imports.sort_by(|a, b| a.binding.cmp(&b.binding));
        for import in imports {
            let Some(target) = graph.get(import.target) else {
                continue;
            };
            if !self.visited.insert(&target.identity) {
                debug!(
                    "Skipping {}{} ({} already expanded)",
                    prefix, import.binding, target.identity
                );
                continue;
            }
            let nested = self.build(import.target, &format!("{prefix}{}.", import.binding));
            for (name, handle) in nested {
                merge(&mut registry, name, handle);
            }
        }

        let mut groups: Vec<_> = namespace.groups.iter().collect();
        groups.sort_by(|a, b| a.name().cmp(b.name()));
        for group in groups {
            let mut operations: Vec<_> = group.operations().iter().collect();
            operations.sort_by(|a, b| a.name.cmp(&b.name));
            for operation in operations {
                if operation.name.starts_with(RESERVED_PREFIX) {
                    continue;
                }
                merge(
                    &mut registry,
                    format!("{prefix}{}", operation.name),
                    CommandHandle::new(Arc::clone(group), &operation.name, &operation.doc),
                );
            }
        }
        registry
    }

    /// Forget which namespaces were expanded, for another build pass.
    pub fn reset(&mut self) {
        self.visited.clear();
    }
}
