//! Collaborator traits at the engine boundary.
//!
//! The engine is read-only glue over these four collaborators. Implementors
//! own the documents, groups and tenant registry; the engine never writes
//! through any of them.

use crate::error::Result;
use crate::types::{DocRef, Document};

/// Read access to documents and preference records.
pub trait DocumentStore {
    /// Fetch a document in `tenant`. Never fails with "not found": an absent
    /// record comes back as `Document::absent` (is_new, empty rules).
    fn document(&self, tenant: &str, doc: &DocRef) -> Result<Document>;

    /// Wiki-scoped preference value, `None` when unset.
    fn preference(&self, tenant: &str, key: &str) -> Result<Option<String>>;

    /// Space-scoped preference value, `None` when unset.
    fn space_preference(&self, tenant: &str, space: &str, key: &str) -> Result<Option<String>>;
}

/// Group membership lookup.
pub trait GroupDirectory {
    /// Group pages `member` belongs to in `tenant`, as short names
    /// (transitive closure is the implementor's concern; the engine guards
    /// against cycles on its side too).
    fn groups_of(&self, tenant: &str, member: &str) -> Result<Vec<String>>;
}

/// The tenant registry of the deployment.
pub trait TenantDirectory {
    /// The designated root tenant hosting master-admin and programming
    /// grants.
    fn main_tenant(&self) -> String;

    /// True when more than one tenant is served.
    fn is_multi_tenant(&self) -> bool;

    /// True when the whole deployment refuses mutation.
    fn is_read_only(&self) -> bool;

    /// Declared owner principal of `tenant`, when any.
    fn owner_of(&self, tenant: &str) -> Result<Option<String>>;
}

/// Request authentication, consumed only by the legacy `check_access`
/// surface.
pub trait Authenticator {
    /// Resolve the request's user. `None` means guest.
    fn check_auth(&self) -> Result<Option<String>>;

    /// Ask the front end to present a login challenge.
    fn show_login(&self);
}
