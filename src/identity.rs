//! Principal parsing and name qualification.
//!
//! A principal is written as `[tenant:]Space.Name`, with two tersenesses the
//! matcher has to resolve: the tenant prefix is optional (implicitly the
//! tenant of the resource being checked) and the conventional `Users` space
//! may be omitted. This module is the single place those forms are parsed
//! and rebuilt; it performs no I/O.

use crate::types::{GUEST_NAME, SUPERADMIN_NAME, USERS_SPACE};

/// A parsed principal identity: `{tenant?, short name}`.
#[derive(Debug, Clone, Hash, Eq, PartialEq)]
pub struct Principal {
    tenant: Option<String>,
    short: String,
}

/// Prefix `name` with the conventional user container when it carries no
/// space part.
pub fn qualify(name: &str) -> String {
    if name.contains('.') {
        name.to_string()
    } else {
        format!("{}.{}", USERS_SPACE, name)
    }
}

impl Principal {
    /// Parse a raw principal string, splitting on the first `:`.
    ///
    /// An empty string resolves to the guest principal, so the short name is
    /// always non-empty.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.is_empty() {
            return Principal::guest();
        }
        match raw.split_once(':') {
            Some((tenant, short)) if !short.is_empty() => Principal {
                tenant: Some(tenant.to_string()),
                short: short.to_string(),
            },
            Some((tenant, _)) => Principal {
                tenant: Some(tenant.to_string()),
                short: GUEST_NAME.to_string(),
            },
            None => Principal {
                tenant: None,
                short: raw.to_string(),
            },
        }
    }

    /// The unauthenticated guest principal.
    pub fn guest() -> Self {
        Principal {
            tenant: None,
            short: format!("{}.{}", USERS_SPACE, GUEST_NAME),
        }
    }

    /// Pin an implicitly scoped principal to `tenant`. An explicit home
    /// tenant is kept as written.
    ///
    /// Names are resolved against the tenant of the resource being checked;
    /// pinning must happen before any tenant-context switch, or the implicit
    /// home would silently follow the switched context.
    pub fn resolve(self, tenant: &str) -> Self {
        Principal {
            tenant: self.tenant.or_else(|| Some(tenant.to_string())),
            short: self.short,
        }
    }

    /// Home tenant, when the principal was written fully qualified.
    pub fn home_tenant(&self) -> Option<&str> {
        self.tenant.as_deref()
    }

    /// Home tenant, falling back to the implicit evaluation tenant.
    pub fn home_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.tenant.as_deref().unwrap_or(default)
    }

    /// Short name as written (no tenant prefix).
    pub fn short(&self) -> &str {
        &self.short
    }

    /// Short name qualified with the conventional user container.
    pub fn qualified_short(&self) -> String {
        qualify(&self.short)
    }

    /// Page part of the short name (after the first `.`).
    pub fn page(&self) -> &str {
        match self.short.split_once('.') {
            Some((_, page)) => page,
            None => &self.short,
        }
    }

    /// Fully qualified `tenant:Space.Name` form.
    pub fn full_name(&self, default_tenant: &str) -> String {
        format!("{}:{}", self.home_or(default_tenant), self.qualified_short())
    }

    /// True iff the page name is the reserved superadmin name, whatever
    /// tenant or container it was written with.
    pub fn is_superadmin(&self) -> bool {
        self.page().eq_ignore_ascii_case(SUPERADMIN_NAME)
    }

    /// True iff this is the guest principal.
    pub fn is_guest(&self) -> bool {
        self.qualified_short() == format!("{}.{}", USERS_SPACE, GUEST_NAME)
    }
}

impl std::fmt::Display for Principal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.tenant {
            Some(tenant) => write!(f, "{}:{}", tenant, self.short),
            None => f.write_str(&self.short),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn parse_short_name() {
        let p = Principal::parse("Bob");
        assert_eq!(p.home_tenant(), None);
        assert_eq!(p.qualified_short(), "Users.Bob");
        assert_eq!(p.page(), "Bob");
        assert_eq!(p.full_name("main"), "main:Users.Bob");
    }

    #[test]
    fn parse_qualified_name() {
        let p = Principal::parse("sales:Users.Bob");
        assert_eq!(p.home_tenant(), Some("sales"));
        assert_eq!(p.qualified_short(), "Users.Bob");
        assert_eq!(p.full_name("main"), "sales:Users.Bob");
    }

    #[test]
    fn qualify_keeps_spaced_names() {
        assert_eq!(qualify("Staff.Bob"), "Staff.Bob");
        assert_eq!(qualify("Bob"), "Users.Bob");
    }

    #[test]
    fn resolve_pins_only_implicit_tenants() {
        let pinned = Principal::parse("Bob").resolve("sales");
        assert_eq!(pinned.home_tenant(), Some("sales"));
        assert_eq!(pinned.full_name("main"), "sales:Users.Bob");

        let explicit = Principal::parse("main:Users.Bob").resolve("sales");
        assert_eq!(explicit.home_tenant(), Some("main"));
        assert_eq!(explicit.full_name("other"), "main:Users.Bob");
    }

    #[test]
    fn empty_input_is_guest() {
        assert!(Principal::parse("").is_guest());
        assert!(Principal::parse("  ").is_guest());
    }

    #[test]
    fn superadmin_is_case_insensitive() {
        assert!(Principal::parse("superadmin").is_superadmin());
        assert!(Principal::parse("Users.SuperAdmin").is_superadmin());
        assert!(Principal::parse("sales:Users.SUPERADMIN").is_superadmin());
        assert!(!Principal::parse("Users.Bob").is_superadmin());
    }

    #[test]
    fn guest_detection_accepts_qualified_forms() {
        assert!(Principal::parse("Guest").is_guest());
        assert!(Principal::parse("Users.Guest").is_guest());
        assert!(Principal::parse("sales:Users.Guest").is_guest());
        assert!(!Principal::parse("Users.Bob").is_guest());
    }

    proptest! {
        #[test]
        fn full_name_is_stable_under_reparse(
            tenant in "[a-z]{1,8}",
            space in "[A-Z][a-z]{0,7}",
            page in "[A-Z][a-z]{1,8}",
        ) {
            let raw = format!("{}:{}.{}", tenant, space, page);
            let p = Principal::parse(&raw);
            let full = p.full_name("other");
            let reparsed = Principal::parse(&full);
            prop_assert_eq!(reparsed.full_name("other"), full);
        }

        #[test]
        fn qualify_is_idempotent(name in "[A-Za-z]{1,12}(\\.[A-Za-z]{1,12})?") {
            let once = qualify(&name);
            prop_assert_eq!(qualify(&once), once.clone());
            prop_assert!(once.contains('.'));
        }
    }
}
