//! Mapping of inbound interactions onto registry ids

use switchyard_config::DispatchConfig;

use crate::interaction::Interaction;
use crate::kind::InteractionKind;

/// Where an interaction should go
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Look up `id` in the registry
    Route {
        id: String,
        /// Untruncated name segment
        raw: String,
        /// Data after the component-data delimiter
        data: Option<String>,
    },
    /// Reserved for message-local collectors; skip dispatch
    OptOut,
    /// The interaction carries no name to route by
    Unresolvable,
}

/// Resolves canonical ids using the configured reserved tokens
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentifierResolver {
    delimiter: String,
    opt_out: String,
}

impl IdentifierResolver {
    pub fn new(delimiter: impl Into<String>, opt_out: impl Into<String>) -> Self {
        Self {
            delimiter: delimiter.into(),
            opt_out: opt_out.into(),
        }
    }

    pub fn from_config(config: &DispatchConfig) -> Self {
        Self::new(&config.component_data_delimiter, &config.handler_opt_out_token)
    }

    /// Name segment of `interaction`: the focused option for autocomplete,
    /// else the custom id, else the command name.
    pub fn name_segment(interaction: &dyn Interaction) -> Option<String> {
        match interaction.kind() {
            InteractionKind::Autocomplete => interaction.focused_option(),
            _ => interaction.custom_id().or_else(|| interaction.command_name()),
        }
    }

    pub fn resolve(&self, interaction: &dyn Interaction) -> Resolution {
        match Self::name_segment(interaction) {
            Some(name) => self.resolve_parts(interaction.kind(), &name),
            None => Resolution::Unresolvable,
        }
    }

    /// Resolve from an interaction kind and its name segment
    pub fn resolve_parts(&self, kind: InteractionKind, name: &str) -> Resolution {
        if name.is_empty() {
            return Resolution::Unresolvable;
        }
        if !self.opt_out.is_empty() && name.starts_with(&self.opt_out) {
            return Resolution::OptOut;
        }

        let canonical = format!("{}/{}", kind.id_prefix(), name);
        let (id, data) = match canonical.split_once(self.delimiter.as_str()) {
            Some((id, data)) if !self.delimiter.is_empty() => (id.to_string(), Some(data.to_string())),
            _ => (canonical.clone(), None),
        };

        Resolution::Route {
            id,
            raw: name.to_string(),
            data,
        }
    }

    /// Custom id of `key` carrying `data`
    pub fn pack(&self, key: &str, data: &str) -> String {
        format!("{}{}{}", key, self.delimiter, data)
    }
}

impl Default for IdentifierResolver {
    fn default() -> Self {
        Self::from_config(&DispatchConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_component_data_is_split_off() {
        let resolver = IdentifierResolver::default();
        let packed = resolver.pack("ban-confirm", "1234");

        assert_eq!(
            resolver.resolve_parts(InteractionKind::Button, &packed),
            Resolution::Route {
                id: "Button/ban-confirm".into(),
                raw: "ban-confirm#1234".into(),
                data: Some("1234".into()),
            }
        );
    }

    #[test]
    fn test_opt_out_and_empty_names() {
        let resolver = IdentifierResolver::default();
        assert_eq!(resolver.resolve_parts(InteractionKind::Button, "collector:page-2"), Resolution::OptOut);
        assert_eq!(resolver.resolve_parts(InteractionKind::Button, ""), Resolution::Unresolvable);
    }

    #[test]
    fn test_autocomplete_prefix() {
        let resolver = IdentifierResolver::default();
        let Resolution::Route { id, .. } = resolver.resolve_parts(InteractionKind::Autocomplete, "command") else {
            panic!("expected a route");
        };
        assert_eq!(id, "AutoComplete/command");
    }

    proptest! {
        #[test]
        fn prop_suffix_never_changes_the_key(
            key in "[a-z][a-z0-9-]{0,30}",
            first in "[ -~]{0,40}",
            second in "[ -~]{0,40}",
        ) {
            let resolver = IdentifierResolver::default();
            let a = resolver.resolve_parts(InteractionKind::StringSelect, &resolver.pack(&key, &first));
            let b = resolver.resolve_parts(InteractionKind::StringSelect, &resolver.pack(&key, &second));

            match (a, b) {
                (Resolution::Route { id: id_a, .. }, Resolution::Route { id: id_b, .. }) => {
                    prop_assert_eq!(&id_a, &id_b);
                    prop_assert_eq!(id_a, format!("StringSelect/{}", key));
                }
                other => prop_assert!(false, "unexpected resolution {:?}", other),
            }
        }

        #[test]
        fn prop_resolution_is_deterministic(name in "[a-zA-Z0-9#:_-]{1,60}") {
            let resolver = IdentifierResolver::default();
            prop_assert_eq!(
                resolver.resolve_parts(InteractionKind::Button, &name),
                resolver.resolve_parts(InteractionKind::Button, &name)
            );
        }
    }
}
