//! Wire payload of registry-declared commands

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Locale code to translated string
pub type Localizations = BTreeMap<String, String>;

/// Application command option type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum OptionType {
    SubCommand,
    SubCommandGroup,
    String,
    Integer,
    Boolean,
    User,
    Channel,
    Role,
    Mentionable,
    Number,
    Attachment,
}

impl From<OptionType> for u8 {
    fn from(kind: OptionType) -> Self {
        match kind {
            OptionType::SubCommand => 1,
            OptionType::SubCommandGroup => 2,
            OptionType::String => 3,
            OptionType::Integer => 4,
            OptionType::Boolean => 5,
            OptionType::User => 6,
            OptionType::Channel => 7,
            OptionType::Role => 8,
            OptionType::Mentionable => 9,
            OptionType::Number => 10,
            OptionType::Attachment => 11,
        }
    }
}

impl TryFrom<u8> for OptionType {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            1 => Self::SubCommand,
            2 => Self::SubCommandGroup,
            3 => Self::String,
            4 => Self::Integer,
            5 => Self::Boolean,
            6 => Self::User,
            7 => Self::Channel,
            8 => Self::Role,
            9 => Self::Mentionable,
            10 => Self::Number,
            11 => Self::Attachment,
            other => return Err(format!("unknown option type {}", other)),
        })
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// A command option, subcommand or subcommand group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandOption {
    #[serde(rename = "type")]
    pub kind: OptionType,
    pub name: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub required: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub autocomplete: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<CommandOption>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_localizations: Option<Localizations>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description_localizations: Option<Localizations>,
    /// Fields without a typed counterpart (`min_value`, `channel_types`, ...)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CommandOption {
    pub fn new(kind: OptionType, name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            description: description.into(),
            required: false,
            autocomplete: false,
            choices: Vec::new(),
            options: Vec::new(),
            name_localizations: None,
            description_localizations: None,
            extra: Map::new(),
        }
    }

    pub fn subcommand(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(OptionType::SubCommand, name, description)
    }

    pub fn group(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(OptionType::SubCommandGroup, name, description)
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn autocomplete(mut self, autocomplete: bool) -> Self {
        self.autocomplete = autocomplete;
        self
    }

    pub fn option(mut self, option: CommandOption) -> Self {
        self.options.push(option);
        self
    }

    pub fn choice(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.choices
            .push(serde_json::json!({ "name": name.into(), "value": value.into() }));
        self
    }

    /// Set an untyped field of the payload
    pub fn extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}

/// Payload of a registry-declared command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandSchema {
    /// Application command type (1 chat input, 2 user, 3 message, 4 entry point)
    #[serde(rename = "type")]
    pub kind: u8,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<CommandOption>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_member_permissions: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contexts: Option<Vec<u8>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integration_types: Option<Vec<u8>>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub nsfw: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_localizations: Option<Localizations>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description_localizations: Option<Localizations>,
    /// Fields without a typed counterpart (`handler` for entry points, ...)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CommandSchema {
    pub fn new(kind: u8, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            description: String::new(),
            options: Vec::new(),
            default_member_permissions: None,
            contexts: None,
            integration_types: None,
            nsfw: false,
            name_localizations: None,
            description_localizations: None,
            extra: Map::new(),
        }
    }

    /// Whether `path` (`"sub"` or `"group.sub"`) names a declared subcommand
    /// or group.
    pub fn has_sub_path(&self, path: &str) -> bool {
        let mut segments = path.split('.');
        let (Some(first), second, None) = (segments.next(), segments.next(), segments.next()) else {
            return false;
        };

        let Some(option) = self.options.iter().find(|o| o.name == first) else {
            return false;
        };

        match (option.kind, second) {
            (OptionType::SubCommand, None) => true,
            (OptionType::SubCommandGroup, None) => true,
            (OptionType::SubCommandGroup, Some(sub)) => option
                .options
                .iter()
                .any(|o| o.kind == OptionType::SubCommand && o.name == sub),
            _ => false,
        }
    }

    /// JSON form used for snapshots and diffs
    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> CommandSchema {
        let mut schema = CommandSchema::new(1, "settings");
        schema.description = "Settings".into();
        schema.options = vec![
            CommandOption::subcommand("show", "Show"),
            CommandOption::group("moderators", "Moderators")
                .option(CommandOption::subcommand("add", "Add"))
                .option(CommandOption::subcommand("remove", "Remove")),
        ];
        schema
    }

    #[test]
    fn test_sub_paths() {
        let schema = settings();
        assert!(schema.has_sub_path("show"));
        assert!(schema.has_sub_path("moderators.add"));
        assert!(schema.has_sub_path("moderators"));
        assert!(!schema.has_sub_path("moderators.list"));
        assert!(!schema.has_sub_path("show.extra"));
        assert!(!schema.has_sub_path("a.b.c"));
    }

    #[test]
    fn test_defaults_are_omitted_on_the_wire() {
        let value = settings().to_value().unwrap();
        let show = &value["options"][0];

        assert_eq!(show["type"], 1);
        assert!(show.get("required").is_none());
        assert!(value.get("nsfw").is_none());
        assert!(value.get("contexts").is_none());
    }

    #[test]
    fn test_unknown_fields_round_trip_through_extra() {
        let raw = serde_json::json!({
            "type": 4,
            "name": "launch",
            "description": "",
            "handler": 2
        });
        let schema: CommandSchema = serde_json::from_value(raw).unwrap();
        assert_eq!(schema.extra.get("handler"), Some(&Value::from(2)));
    }
}
