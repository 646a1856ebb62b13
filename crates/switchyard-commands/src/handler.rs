//! Handler functions and the context they are invoked with

use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use crate::command::Command;
use crate::error::InteractionError;
use crate::interaction::{AutocompleteChoice, Interaction, Reply};
use crate::permissions::PermissionLevel;

/// Everything a handler gets to see about one dispatch
#[derive(Clone)]
pub struct Invocation {
    pub command: Arc<Command>,
    pub interaction: Arc<dyn Interaction>,
    /// Name segment before truncation, e.g. the full custom id
    pub raw_name: String,
    /// Data packed after the component-data delimiter
    pub data: Option<String>,
    /// Resolved level of the caller
    pub level: PermissionLevel,
}

impl Invocation {
    pub async fn reply(&self, content: impl Into<String> + Send) -> Result<(), InteractionError> {
        self.interaction
            .reply(Reply {
                content: content.into(),
                ephemeral: self.command.interaction.ephemeral,
            })
            .await
    }

    /// Text value of an option of the invoked (sub)command
    pub fn option(&self, name: &str) -> Option<String> {
        self.interaction.option(name)
    }

    pub async fn autocomplete(&self, choices: Vec<AutocompleteChoice>) -> Result<(), InteractionError> {
        self.interaction.autocomplete(choices).await
    }
}

impl fmt::Debug for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Invocation")
            .field("command", &self.command.id())
            .field("raw_name", &self.raw_name)
            .field("data", &self.data)
            .field("level", &self.level)
            .finish_non_exhaustive()
    }
}

/// A run function or controller
#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn call(&self, invocation: Invocation) -> anyhow::Result<()>;
}

#[async_trait]
impl<F, Fut> CommandHandler for F
where
    F: Fn(Invocation) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    async fn call(&self, invocation: Invocation) -> anyhow::Result<()> {
        (self)(invocation).await
    }
}

/// Handler declaration of a command; exactly one shape is populated
#[derive(Clone)]
pub enum Handler {
    Run(Arc<dyn CommandHandler>),
    /// Keyed by `"sub"` or `"group.sub"`
    Controllers(HashMap<String, Arc<dyn CommandHandler>>),
}

impl Handler {
    /// Normalized controller key for the invoked sub-path
    pub fn sub_path(group: Option<&str>, sub: Option<&str>) -> Option<String> {
        match (group, sub) {
            (Some(group), Some(sub)) => Some(format!("{}.{}", group, sub)),
            (None, Some(single)) | (Some(single), None) => Some(single.to_string()),
            (None, None) => None,
        }
    }

    /// Handler for the invoked sub-path
    pub fn resolve(&self, path: Option<&str>) -> Option<Arc<dyn CommandHandler>> {
        match self {
            Self::Run(run) => Some(run.clone()),
            Self::Controllers(controllers) => path.and_then(|p| controllers.get(p).cloned()),
        }
    }

    pub fn controller_paths(&self) -> Vec<&str> {
        match self {
            Self::Run(_) => Vec::new(),
            Self::Controllers(controllers) => {
                let mut paths: Vec<&str> = controllers.keys().map(String::as_str).collect();
                paths.sort_unstable();
                paths
            }
        }
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Run(_) => f.write_str("Run"),
            Self::Controllers(_) => f.debug_tuple("Controllers").field(&self.controller_paths()).finish(),
        }
    }
}
