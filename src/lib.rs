//! `folio_rights` — multi-tenant rights resolution engine for Folio.
//!
//! Given a principal (user or group, possibly qualified by a tenant), a
//! target document and a requested privilege, the engine walks the layered
//! grant hierarchy (document, parent-space chain, wiki) and returns a
//! definite allow/deny verdict. Storage, group membership and authentication
//! live behind collaborator traits; the engine only reads.
//!
//! Modules:
//! - `types`    — domain types (DocRef, Document, AccessRule, Privilege, ...)
//! - `identity` — principal parsing and name qualification
//! - `error`    — collaborator error taxonomy
//! - `store`    — collaborator traits (documents, groups, tenants, auth)
//! - `rights`   — the decision engine and its helpers

pub mod error;
pub mod identity;
pub mod rights;
pub mod store;
pub mod types;

pub use error::{Result, StoreError};
pub use identity::Principal;
pub use rights::{RightsContext, RightsEngine};
pub use types::{AccessRule, DocRef, Document, Effect, Privilege, RuleScope, SubjectKind};
