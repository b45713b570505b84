//! The namespace graph produced by the loader
//!
//! A namespace is a loaded environment file or a built-in tool. It holds command groups
//! and imports of other namespaces under a binding name. Imports may form cycles: a
//! namespace can import itself, or two files can import each other.

use std::collections::HashSet;
use std::sync::Arc;

use crate::commands::GroupSpec;

pub type NamespaceId = usize;

/// A binding of another namespace inside this one
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Import {
    pub binding: String,
    pub target: NamespaceId,
}

#[derive(Debug, Clone)]
pub struct Namespace {
    /// Unique identity: `builtin:<tool>` or the canonical path of a file
    pub identity: String,
    pub imports: Vec<Import>,
    pub groups: Vec<Arc<GroupSpec>>,
}

impl Namespace {
    #[must_use]
    pub fn new(identity: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            imports: Vec::new(),
            groups: Vec::new(),
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct NamespaceGraph {
    namespaces: Vec<Namespace>,
}

impl NamespaceGraph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, namespace: Namespace) -> NamespaceId {
        self.namespaces.push(namespace);
        self.namespaces.len() - 1
    }

    #[must_use]
    pub fn get(&self, id: NamespaceId) -> Option<&Namespace> {
        self.namespaces.get(id)
    }

    pub fn get_mut(&mut self, id: NamespaceId) -> Option<&mut Namespace> {
        self.namespaces.get_mut(id)
    }

    /// Find a namespace by identity.
    #[must_use]
    pub fn find(&self, identity: &str) -> Option<NamespaceId> {
        self.namespaces
            .iter()
            .position(|namespace| namespace.identity == identity)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.namespaces.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.namespaces.is_empty()
    }
}

/// Namespace identities already expanded during one registry build.
#[derive(Debug, Default, Clone)]
pub struct VisitSet {
    identities: HashSet<String>,
}

impl VisitSet {
    #[must_use]
    pub fn contains(&self, identity: &str) -> bool {
        self.identities.contains(identity)
    }

    /// Mark an identity as visited; returns `false` if it already was.
    pub fn insert(&mut self, identity: &str) -> bool {
        self.identities.insert(identity.to_string())
    }

    pub fn clear(&mut self) {
        self.identities.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_by_identity() {
        let mut graph = NamespaceGraph::new();
        let heroku = graph.add(Namespace::new("builtin:heroku"));
        let file = graph.add(Namespace::new("/srv/bltenv.yaml"));
        assert_eq!(graph.find("builtin:heroku"), Some(heroku));
        assert_eq!(graph.find("/srv/bltenv.yaml"), Some(file));
        assert_eq!(graph.find("builtin:aws"), None);
        assert_eq!(graph.len(), 2);
    }

    #[test]
    fn test_visit_set() {
        let mut visited = VisitSet::default();
        assert!(visited.insert("builtin:heroku"));
        assert!(!visited.insert("builtin:heroku"));
        assert!(visited.contains("builtin:heroku"));
        visited.clear();
        assert!(!visited.contains("builtin:heroku"));
    }
}
