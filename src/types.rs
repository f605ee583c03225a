//! Domain types shared across folio_rights modules.

use serde::{Deserialize, Serialize};

/// Conventional container space for user and group pages.
pub const USERS_SPACE: &str = "Users";

/// System space holding the wiki-wide preferences record.
pub const WIKI_SPACE: &str = "Wiki";

/// Document name of the wiki-wide preferences record.
pub const WIKI_PREFS_NAME: &str = "Preferences";

/// Document name of a space's preferences record.
pub const SPACE_PREFS_NAME: &str = "SpacePreferences";

/// Reserved superadmin short page name (matched case-insensitively).
pub const SUPERADMIN_NAME: &str = "superadmin";

/// Short page name of the unauthenticated guest principal.
pub const GUEST_NAME: &str = "Guest";

/// Wiki preference key bounding the parent-space walk.
pub const MAX_SPACE_CHECKS_PREF: &str = "max_space_checks";

/// Default bound on the parent-space walk when the preference is unset.
pub const DEFAULT_MAX_SPACE_CHECKS: u32 = 30;

/// Reference to a document inside one tenant: `Space.Name`.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct DocRef {
    pub space: String,
    pub name: String,
}

impl DocRef {
    pub fn new(space: impl Into<String>, name: impl Into<String>) -> Self {
        DocRef {
            space: space.into(),
            name: name.into(),
        }
    }

    /// The wiki-wide preferences record (`Wiki.Preferences`).
    pub fn wiki_preferences() -> Self {
        DocRef::new(WIKI_SPACE, WIKI_PREFS_NAME)
    }

    /// The preferences record of `space`.
    pub fn space_preferences(space: &str) -> Self {
        DocRef::new(space, SPACE_PREFS_NAME)
    }

    /// `Space.Name` form.
    pub fn full_name(&self) -> String {
        format!("{}.{}", self.space, self.name)
    }
}

impl std::fmt::Display for DocRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.space, self.name)
    }
}

/// Closed set of access levels.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Privilege {
    View,
    Edit,
    Comment,
    Delete,
    Undelete,
    Register,
    Admin,
    Programming,
}

/// All privileges, in the order the public `list_privileges` surface reports.
pub const ALL_PRIVILEGES: [Privilege; 8] = [
    Privilege::Admin,
    Privilege::View,
    Privilege::Edit,
    Privilege::Comment,
    Privilege::Delete,
    Privilege::Undelete,
    Privilege::Register,
    Privilege::Programming,
];

impl Privilege {
    pub fn as_str(self) -> &'static str {
        match self {
            Privilege::View => "view",
            Privilege::Edit => "edit",
            Privilege::Comment => "comment",
            Privilege::Delete => "delete",
            Privilege::Undelete => "undelete",
            Privilege::Register => "register",
            Privilege::Admin => "admin",
            Privilege::Programming => "programming",
        }
    }

    /// Parse a single privilege token. Unknown tokens yield `None`.
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "view" => Some(Privilege::View),
            "edit" => Some(Privilege::Edit),
            "comment" => Some(Privilege::Comment),
            "delete" => Some(Privilege::Delete),
            "undelete" => Some(Privilege::Undelete),
            "register" => Some(Privilege::Register),
            "admin" => Some(Privilege::Admin),
            "programming" => Some(Privilege::Programming),
            _ => None,
        }
    }

    /// Parse a stored privilege list (separators: space, comma, pipe).
    /// Unknown tokens are skipped so one malformed token cannot poison the
    /// rule it appears in.
    pub fn parse_list(raw: &str) -> Vec<Self> {
        raw.split([' ', ',', '|'])
            .filter(|t| !t.is_empty())
            .filter_map(Privilege::parse)
            .collect()
    }

    /// Privileges refused outright while the deployment is read-only.
    pub fn blocked_when_read_only(self) -> bool {
        matches!(
            self,
            Privilege::Edit
                | Privilege::Delete
                | Privilege::Undelete
                | Privilege::Comment
                | Privilege::Register
        )
    }

    /// Privileges that require an explicit grant somewhere in the hierarchy.
    pub fn requires_explicit_grant(self) -> bool {
        matches!(self, Privilege::Register | Privilege::Delete)
    }
}

impl std::fmt::Display for Privilege {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a rule names user pages or group pages as its subjects.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubjectKind {
    User,
    Group,
}

/// Allow/deny flag of one access rule.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Effect {
    Allow,
    Deny,
}

/// Which rule class of a document is being read.
///
/// `Local` rules bind the carrying document only; `Global` rules live on
/// preferences records and bind everything under that scope.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq)]
pub enum RuleScope {
    Local,
    Global,
}

/// One access-control entry attached to a document.
///
/// Subjects are stored as written by the rule's author: bare short names,
/// `Space.Name` forms, or fully qualified `tenant:Space.Name` forms. The
/// matcher resolves the equivalences; the engine never mutates a rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessRule {
    pub subjects: Vec<String>,
    pub kind: SubjectKind,
    pub privileges: Vec<Privilege>,
    pub effect: Effect,
}

/// A document as the rights engine sees it.
///
/// Storage never fails a read with "no such document": an absent record comes
/// back with `is_new` set and empty rule lists.
#[derive(Debug, Clone)]
pub struct Document {
    pub reference: DocRef,
    /// Fully qualified creator, when recorded.
    pub creator: Option<String>,
    /// Fully qualified author of the current content revision.
    pub content_author: Option<String>,
    /// Parent-space link, meaningful on space-preferences records.
    pub parent_space: Option<String>,
    /// True when the record was never materialized.
    pub is_new: bool,
    /// Document-scoped rules, in storage order.
    pub rules: Vec<AccessRule>,
    /// Global-scoped rules (preferences records), in storage order.
    pub global_rules: Vec<AccessRule>,
}

impl Document {
    /// An existing record with no rules attached yet.
    pub fn new(reference: DocRef) -> Self {
        Document {
            reference,
            creator: None,
            content_author: None,
            parent_space: None,
            is_new: false,
            rules: Vec::new(),
            global_rules: Vec::new(),
        }
    }

    /// The recognizable "new/empty" document for an absent record.
    pub fn absent(reference: DocRef) -> Self {
        Document {
            is_new: true,
            ..Document::new(reference)
        }
    }

    /// Rules of the requested class, in storage order.
    pub fn rules(&self, scope: RuleScope) -> &[AccessRule] {
        match scope {
            RuleScope::Local => &self.rules,
            RuleScope::Global => &self.global_rules,
        }
    }
}
