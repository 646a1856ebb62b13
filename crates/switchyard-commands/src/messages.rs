//! User-facing texts of the dispatch pipeline

use switchyard_i18n::{fluent_args, I18nManager};

use crate::error::DeclineReason;

/// Produces the replies sent by the dispatcher itself
pub trait Messages: Send + Sync {
    fn decline(&self, reason: &DeclineReason, locale: &str) -> String;

    fn unknown_command(&self, locale: &str) -> String;

    fn handler_failure(&self, locale: &str) -> String;
}

fn permission_list(permissions: &serenity::all::Permissions) -> String {
    permissions.get_permission_names().join(", ")
}

impl Messages for I18nManager {
    fn decline(&self, reason: &DeclineReason, locale: &str) -> String {
        let locale = self.resolve_locale(locale);
        let key = reason.message_key();

        let args = match reason {
            DeclineReason::Level { required } => {
                let level = self.get_message_or_default(required.message_key(), locale, None, required.as_str());
                fluent_args!["level" => level]
            }
            DeclineReason::UserPermissions { missing } | DeclineReason::BotPermissions { missing } => {
                fluent_args!["permissions" => permission_list(missing)]
            }
            DeclineReason::Throttled { expires_at } => {
                fluent_args!["timestamp" => expires_at.div_euclid(1000)]
            }
            _ => None,
        };

        self.get_message_or_default(key, locale, args.as_ref(), "You cannot use this command right now.")
    }

    fn unknown_command(&self, locale: &str) -> String {
        self.get_message_or_default(
            "error-unknown-command",
            self.resolve_locale(locale),
            None,
            "This command is no longer available.",
        )
    }

    fn handler_failure(&self, locale: &str) -> String {
        self.get_message_or_default(
            "error-handler-failure",
            self.resolve_locale(locale),
            None,
            "Something went wrong while running this command.",
        )
    }
}

/// Fixed English texts, for tests and tools without locale data
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainMessages;

impl Messages for PlainMessages {
    fn decline(&self, reason: &DeclineReason, _locale: &str) -> String {
        format!("Declined: {}", reason)
    }

    fn unknown_command(&self, _locale: &str) -> String {
        "Unknown command".to_string()
    }

    fn handler_failure(&self, _locale: &str) -> String {
        "Command failed".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permissions::PermissionLevel;
    use switchyard_i18n::Locale;
    use serenity::all::Permissions;

    #[test]
    fn test_localized_declines() {
        let manager = I18nManager::bundled(Locale::English).unwrap();

        let level = manager.decline(
            &DeclineReason::Level {
                required: PermissionLevel::Administrator,
            },
            "es-ES",
        );
        assert_eq!(level, "Necesitas el nivel Administrador para usar este comando.");

        let bits = manager.decline(
            &DeclineReason::BotPermissions {
                missing: Permissions::BAN_MEMBERS,
            },
            "en-US",
        );
        assert_eq!(bits, "I am missing the following permissions: Ban Members");

        let throttled = manager.decline(&DeclineReason::Throttled { expires_at: 5_999 }, "en-US");
        assert!(throttled.ends_with("<t:5:R>."));
    }

    #[test]
    fn test_unknown_locale_uses_default() {
        let manager = I18nManager::bundled(Locale::English).unwrap();
        assert_eq!(manager.unknown_command("ko"), "This command is no longer available.");
    }
}
