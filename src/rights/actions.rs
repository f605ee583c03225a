//! Free-form request actions mapped to the closed privilege set.
//!
//! The table is a compile-time `match`, so there is no lazily-populated
//! global to worry about under concurrent first use.

use crate::types::Privilege;

/// What a request action asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionClass {
    /// Login-flow pages: always reachable, no rights check.
    Login,
    /// A real access level to resolve.
    Level(Privilege),
}

/// Map a request action string to its access requirement.
/// Unmapped actions default to `edit`.
pub fn classify(action: &str) -> ActionClass {
    match action {
        "login" | "logout" | "loginerror" | "loginsubmit" => ActionClass::Login,
        "view" | "viewrev" | "plain" | "raw" | "attach" | "charting" | "skin" | "download"
        | "downloadrev" | "dot" | "svg" | "pdf" | "redirect" | "export" | "jsx" | "ssx" | "tex"
        | "unknown" => ActionClass::Level(Privilege::View),
        "delete" | "reset" => ActionClass::Level(Privilege::Delete),
        "deleteversions" | "import" | "admin" => ActionClass::Level(Privilege::Admin),
        "undelete" => ActionClass::Level(Privilege::Undelete),
        "commentadd" => ActionClass::Level(Privilege::Comment),
        "register" => ActionClass::Level(Privilege::Register),
        _ => ActionClass::Level(Privilege::Edit),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_actions_skip_rights() {
        for action in ["login", "logout", "loginerror", "loginsubmit"] {
            assert_eq!(classify(action), ActionClass::Login);
        }
    }

    #[test]
    fn read_actions_map_to_view() {
        for action in ["view", "raw", "pdf", "export", "downloadrev"] {
            assert_eq!(classify(action), ActionClass::Level(Privilege::View));
        }
    }

    #[test]
    fn unmapped_actions_default_to_edit() {
        assert_eq!(classify("save"), ActionClass::Level(Privilege::Edit));
        assert_eq!(classify("objectadd"), ActionClass::Level(Privilege::Edit));
        assert_eq!(classify(""), ActionClass::Level(Privilege::Edit));
    }

    #[test]
    fn destructive_actions_map_to_admin_or_delete() {
        assert_eq!(classify("delete"), ActionClass::Level(Privilege::Delete));
        assert_eq!(classify("reset"), ActionClass::Level(Privilege::Delete));
        assert_eq!(classify("import"), ActionClass::Level(Privilege::Admin));
        assert_eq!(
            classify("deleteversions"),
            ActionClass::Level(Privilege::Admin)
        );
    }
}
