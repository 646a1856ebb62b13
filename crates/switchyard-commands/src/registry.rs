//! In-memory registry of finalized commands

use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

use crate::command::Command;
use crate::error::ProgrammerError;
use crate::handler::Handler;
use crate::schema::CommandSchema;

/// One registry-declared command as pushed to the platform
#[derive(Debug, Clone, PartialEq)]
pub struct ManifestEntry {
    pub id: String,
    pub schema: CommandSchema,
}

/// Commands keyed by id, immutable once built
#[derive(Debug, Default)]
pub struct CommandRegistry {
    commands: HashMap<String, Arc<Command>>,
    order: Vec<String>,
}

impl CommandRegistry {
    /// Flatten `commands` and validate every entry.
    ///
    /// Fails on duplicate ids and on controller paths that do not name a
    /// declared subcommand or group.
    pub fn new(commands: impl IntoIterator<Item = Command>) -> Result<Self, ProgrammerError> {
        let mut registry = Self::default();

        for command in commands.into_iter().flat_map(Command::registry) {
            validate_controllers(&command)?;

            let id = command.id().to_string();
            if registry.commands.contains_key(&id) {
                return Err(ProgrammerError::DuplicateId { id });
            }
            registry.order.push(id.clone());
            registry.commands.insert(id, Arc::new(command));
        }

        info!("Registered {} commands", registry.order.len());
        Ok(registry)
    }

    pub fn get(&self, id: &str) -> Option<Arc<Command>> {
        self.commands.get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Commands in registration order
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Command>> {
        self.order.iter().filter_map(|id| self.commands.get(id))
    }

    pub fn by_category(&self, category: &str) -> Vec<Arc<Command>> {
        self.iter().filter(|c| c.category == category).cloned().collect()
    }

    /// Categories in first-seen order
    pub fn categories(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for command in self.iter() {
            if !seen.contains(&command.category.as_str()) {
                seen.push(&command.category);
            }
        }
        seen
    }

    /// Registry-declared commands in registration order
    pub fn manifest(&self) -> Vec<ManifestEntry> {
        self.iter()
            .filter_map(|command| {
                command.schema().map(|schema| ManifestEntry {
                    id: command.id().to_string(),
                    schema: schema.clone(),
                })
            })
            .collect()
    }
}

fn validate_controllers(command: &Command) -> Result<(), ProgrammerError> {
    let Handler::Controllers(controllers) = &command.handler else {
        return Ok(());
    };

    for path in controllers.keys() {
        let declared = command.schema().is_some_and(|schema| schema.has_sub_path(path));
        if !declared {
            return Err(ProgrammerError::UnknownSubPath {
                id: command.id().to_string(),
                path: path.clone(),
            });
        }
    }
    Ok(())
}
