//! Command kinds and the interaction kinds they answer to

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of a declared command.
///
/// The first five variants are registry-declared and are pushed to the
/// platform; the rest only exist locally and answer component, modal and
/// autocomplete interactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommandKind {
    ChatInput,
    /// Chat input command whose payload is pushed without localization
    ChatInputPlain,
    UserContextMenu,
    MessageContextMenu,
    PrimaryEntryPoint,
    Button,
    StringSelect,
    UserSelect,
    RoleSelect,
    MentionableSelect,
    ChannelSelect,
    ModalSubmit,
    Autocomplete,
}

impl CommandKind {
    /// Every kind, registry-declared first
    pub const ALL: [CommandKind; 13] = [
        Self::ChatInput,
        Self::ChatInputPlain,
        Self::UserContextMenu,
        Self::MessageContextMenu,
        Self::PrimaryEntryPoint,
        Self::Button,
        Self::StringSelect,
        Self::UserSelect,
        Self::RoleSelect,
        Self::MentionableSelect,
        Self::ChannelSelect,
        Self::ModalSubmit,
        Self::Autocomplete,
    ];

    /// Whether commands of this kind live in the platform registry
    pub fn is_registry_declared(self) -> bool {
        matches!(
            self,
            Self::ChatInput
                | Self::ChatInputPlain
                | Self::UserContextMenu
                | Self::MessageContextMenu
                | Self::PrimaryEntryPoint
        )
    }

    /// Prefix of the command id
    pub fn id_prefix(self) -> &'static str {
        self.interaction_kind().id_prefix()
    }

    /// Interaction kind routed to commands of this kind
    pub fn interaction_kind(self) -> InteractionKind {
        match self {
            Self::ChatInput | Self::ChatInputPlain => InteractionKind::ChatInput,
            Self::UserContextMenu => InteractionKind::UserContextMenu,
            Self::MessageContextMenu => InteractionKind::MessageContextMenu,
            Self::PrimaryEntryPoint => InteractionKind::PrimaryEntryPoint,
            Self::Button => InteractionKind::Button,
            Self::StringSelect => InteractionKind::StringSelect,
            Self::UserSelect => InteractionKind::UserSelect,
            Self::RoleSelect => InteractionKind::RoleSelect,
            Self::MentionableSelect => InteractionKind::MentionableSelect,
            Self::ChannelSelect => InteractionKind::ChannelSelect,
            Self::ModalSubmit => InteractionKind::ModalSubmit,
            Self::Autocomplete => InteractionKind::Autocomplete,
        }
    }

    /// Application command type on the wire, for registry-declared kinds
    pub fn application_command_type(self) -> Option<u8> {
        match self {
            Self::ChatInput | Self::ChatInputPlain => Some(1),
            Self::UserContextMenu => Some(2),
            Self::MessageContextMenu => Some(3),
            Self::PrimaryEntryPoint => Some(4),
            _ => None,
        }
    }

    /// Whether commands of this kind carry a chat input payload
    pub fn is_chat_input(self) -> bool {
        matches!(self, Self::ChatInput | Self::ChatInputPlain)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::ChatInput => "chat-input",
            Self::ChatInputPlain => "chat-input-plain",
            Self::UserContextMenu => "user-context-menu",
            Self::MessageContextMenu => "message-context-menu",
            Self::PrimaryEntryPoint => "primary-entry-point",
            Self::Button => "button",
            Self::StringSelect => "string-select",
            Self::UserSelect => "user-select",
            Self::RoleSelect => "role-select",
            Self::MentionableSelect => "mentionable-select",
            Self::ChannelSelect => "channel-select",
            Self::ModalSubmit => "modal-submit",
            Self::Autocomplete => "autocomplete",
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Concrete subtype of an inbound interaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InteractionKind {
    ChatInput,
    UserContextMenu,
    MessageContextMenu,
    PrimaryEntryPoint,
    Button,
    StringSelect,
    UserSelect,
    RoleSelect,
    MentionableSelect,
    ChannelSelect,
    ModalSubmit,
    Autocomplete,
}

impl InteractionKind {
    /// Prefix of the canonical id resolved for this interaction
    pub fn id_prefix(self) -> &'static str {
        match self {
            Self::ChatInput => "ChatInput",
            Self::UserContextMenu => "UserContextMenu",
            Self::MessageContextMenu => "MessageContextMenu",
            Self::PrimaryEntryPoint => "PrimaryEntryPoint",
            Self::Button => "Button",
            Self::StringSelect => "StringSelect",
            Self::UserSelect => "UserSelect",
            Self::RoleSelect => "RoleSelect",
            Self::MentionableSelect => "MentionableSelect",
            Self::ChannelSelect => "ChannelSelect",
            Self::ModalSubmit => "ModalSubmit",
            Self::Autocomplete => "AutoComplete",
        }
    }

    /// Component, modal and autocomplete interactions carry a custom id
    /// or focused option instead of a registry name.
    pub fn is_component(self) -> bool {
        matches!(
            self,
            Self::Button
                | Self::StringSelect
                | Self::UserSelect
                | Self::RoleSelect
                | Self::MentionableSelect
                | Self::ChannelSelect
                | Self::ModalSubmit
        )
    }

    pub fn as_str(self) -> &'static str {
        self.id_prefix()
    }
}

impl fmt::Display for InteractionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id_prefix())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partitions_are_disjoint_and_complete() {
        let declared: Vec<_> = CommandKind::ALL.iter().filter(|k| k.is_registry_declared()).collect();
        assert_eq!(declared.len(), 5);
        for kind in CommandKind::ALL {
            assert_eq!(kind.is_registry_declared(), kind.application_command_type().is_some());
        }
    }

    #[test]
    fn test_plain_chat_input_shares_prefix() {
        assert_eq!(CommandKind::ChatInputPlain.id_prefix(), "ChatInput");
        assert_eq!(CommandKind::Autocomplete.id_prefix(), "AutoComplete");
    }
}
