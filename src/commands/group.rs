use std::fmt;
use std::sync::Arc;

use crate::commands::{Commander, Context};
use crate::settings::Settings;

type Factory = Arc<dyn Fn(Settings, Context) -> Box<dyn Commander> + Send + Sync>;

/// One operation a command group exposes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    pub name: String,
    pub doc: String,
}

/// Describes a command group: its name, its operations, and how to build an instance.
#[derive(Clone)]
pub struct GroupSpec {
    name: String,
    operations: Vec<Operation>,
    factory: Factory,
}

impl GroupSpec {
    pub fn new<F>(name: impl Into<String>, operations: Vec<Operation>, factory: F) -> Self
    where
        F: Fn(Settings, Context) -> Box<dyn Commander> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            operations,
            factory: Arc::new(factory),
        }
    }

    /// Build a spec from a static `(name, doc)` table.
    pub fn from_table<F>(name: &str, table: &[(&str, &str)], factory: F) -> Self
    where
        F: Fn(Settings, Context) -> Box<dyn Commander> + Send + Sync + 'static,
    {
        let operations = table
            .iter()
            .map(|(name, doc)| Operation {
                name: (*name).to_string(),
                doc: (*doc).to_string(),
            })
            .collect();
        Self::new(name, operations, factory)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    /// Build a fresh command group instance for one invocation.
    #[must_use]
    pub fn instantiate(&self, settings: Settings, context: Context) -> Box<dyn Commander> {
        (self.factory)(settings, context)
    }
}

impl fmt::Debug for GroupSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GroupSpec")
            .field("name", &self.name)
            .field("operations", &self.operations)
            .finish_non_exhaustive()
    }
}
