//! The rights decision engine.
//!
//! `RightsEngine::evaluate` is the single decision query: principal ×
//! resource × privilege → allow/deny. The walk is strictly ordered — fast
//! guards, superadmin/programming gate, wiki owner, admin gate, then
//! deny-before-allow at document, space-chain and wiki level — and every
//! verdict is logged with the level that decided it. Storage failures are
//! caught at this boundary and converted to a deny; nothing below this
//! module ever turns "no rule found" into an error.

pub mod actions;
pub(crate) mod groups;
pub(crate) mod matcher;
pub mod records;
pub(crate) mod space;

use ahash::AHashMap;

use crate::error::Result;
use crate::identity::Principal;
use crate::rights::actions::ActionClass;
use crate::rights::matcher::{check_level, RuleOutcome};
use crate::rights::space::SpaceWalker;
use crate::store::{Authenticator, DocumentStore, GroupDirectory, TenantDirectory};
use crate::types::{
    DocRef, Document, Effect, Privilege, RuleScope, ALL_PRIVILEGES, DEFAULT_MAX_SPACE_CHECKS,
    MAX_SPACE_CHECKS_PREF,
};

/// Per-request evaluation context: collaborator handles, the active tenant,
/// and the per-call group cache.
///
/// The engine itself is stateless; everything mutable lives here and is
/// scoped to the host's request lifecycle.
pub struct RightsContext<'a> {
    pub store: &'a dyn DocumentStore,
    pub groups: &'a dyn GroupDirectory,
    pub tenants: &'a dyn TenantDirectory,
    pub auth: Option<&'a dyn Authenticator>,
    /// Current request user, when one was resolved.
    pub user: Option<String>,
    /// Document the request is rendering, consulted by `has_admin_rights`.
    pub current_doc: Option<DocRef>,
    current_tenant: String,
    group_cache: AHashMap<(String, String), Vec<String>>,
}

impl<'a> RightsContext<'a> {
    pub fn new(
        store: &'a dyn DocumentStore,
        groups: &'a dyn GroupDirectory,
        tenants: &'a dyn TenantDirectory,
        current_tenant: impl Into<String>,
    ) -> Self {
        RightsContext {
            store,
            groups,
            tenants,
            auth: None,
            user: None,
            current_doc: None,
            current_tenant: current_tenant.into(),
            group_cache: AHashMap::new(),
        }
    }

    pub fn with_authenticator(mut self, auth: &'a dyn Authenticator) -> Self {
        self.auth = Some(auth);
        self
    }

    /// The active evaluation tenant.
    pub fn current_tenant(&self) -> &str {
        &self.current_tenant
    }

    /// Run `f` with `tenant` active, restoring the previous tenant on every
    /// exit path (`f` communicates failure by value, so restoration cannot
    /// be skipped).
    pub fn with_tenant<T>(&mut self, tenant: &str, f: impl FnOnce(&mut Self) -> T) -> T {
        let saved = std::mem::replace(&mut self.current_tenant, tenant.to_string());
        let out = f(self);
        self.current_tenant = saved;
        out
    }

    pub(crate) fn cached_groups(&self, key: &(String, String)) -> Option<Vec<String>> {
        self.group_cache.get(key).cloned()
    }

    pub(crate) fn cache_groups(&mut self, key: (String, String), groups: Vec<String>) {
        self.group_cache.insert(key, groups);
    }

    fn reset_after_call(&mut self, saved_tenant: String) {
        self.current_tenant = saved_tenant;
        self.group_cache.clear();
    }
}

fn log_allow(principal: &str, resource: &str, level: &str, reason: &str) {
    tracing::debug!(principal, resource, level, reason, "access granted");
}

fn log_deny(principal: &str, resource: &str, level: &str, reason: &str) {
    tracing::info!(principal, resource, level, reason, "access denied");
}

/// The stateless decision engine.
#[derive(Debug, Default)]
pub struct RightsEngine;

impl RightsEngine {
    pub fn new() -> Self {
        RightsEngine
    }

    /// The closed privilege set, as the admin UI lists it.
    pub fn list_privileges(&self) -> Vec<Privilege> {
        ALL_PRIVILEGES.to_vec()
    }

    /// Decide whether `principal` holds `privilege` on `resource`.
    ///
    /// Always returns a definite verdict: storage failures log and deny,
    /// the active tenant is restored and the per-call group cache discarded
    /// whatever path was taken.
    pub fn evaluate(
        &self,
        ctx: &mut RightsContext<'_>,
        principal: &str,
        resource: &DocRef,
        privilege: Privilege,
    ) -> bool {
        let saved = ctx.current_tenant().to_string();
        // Pinned here, before any tenant-context switch: an implicit home
        // must stay the evaluation tenant throughout the walk.
        let parsed = Principal::parse(principal).resolve(&saved);
        let verdict = self.evaluate_inner(ctx, &parsed, resource, privilege);
        ctx.reset_after_call(saved);

        match verdict {
            Ok(allowed) => allowed,
            Err(e) => {
                tracing::error!(principal, resource = %resource, %privilege, error = %e,
                    "storage failure during rights evaluation");
                log_deny(
                    principal,
                    &resource.full_name(),
                    privilege.as_str(),
                    "storage failure (fail closed)",
                );
                false
            }
        }
    }

    fn evaluate_inner(
        &self,
        ctx: &mut RightsContext<'_>,
        principal: &Principal,
        resource: &DocRef,
        privilege: Privilege,
    ) -> Result<bool> {
        let current = ctx.current_tenant().to_string();
        let name = principal.full_name(&current);
        let resource_key = resource.full_name();

        // 1. Read-only deployments refuse every mutating privilege outright.
        if ctx.tenants.is_read_only() && privilege.blocked_when_read_only() {
            log_deny(&name, &resource_key, privilege.as_str(), "server in read-only mode");
            return Ok(false);
        }

        // 2. Guests are refused where the privilege demands authentication.
        if principal.is_guest() && self.needs_auth(ctx, privilege, Some(&resource.space)) {
            log_deny(&name, &resource_key, privilege.as_str(), "authentication needed");
            return Ok(false);
        }

        // 3. Creators may always delete their own documents.
        let mut currentdoc = None;
        if privilege == Privilege::Delete {
            let doc = ctx.store.document(&current, resource)?;
            if let Some(creator) = &doc.creator {
                let creator_full = Principal::parse(creator).full_name(&current);
                if creator_full == name {
                    log_allow(
                        &name,
                        &resource_key,
                        privilege.as_str(),
                        "delete right from document ownership",
                    );
                    return Ok(true);
                }
            }
            currentdoc = Some(doc);
        }

        // 4. Superadmin and the main-tenant master-admin/programming gate.
        let gate = self.superadmin_or_programming(ctx, principal, &resource_key, privilege)?;
        if gate || privilege == Privilege::Programming {
            return Ok(gate);
        }

        // 5. The tenant owner holds implicit admin.
        if let Some(owner) = ctx.tenants.owner_of(&current)? {
            if Principal::parse(&owner).full_name(&current) == name {
                log_allow(&name, &resource_key, privilege.as_str(), "admin level from wiki ownership");
                return Ok(true);
            }
        }

        let wikidoc = ctx.store.document(&current, &DocRef::wiki_preferences())?;

        // 6. Registration is decided at wiki level only, open by default.
        if privilege == Privilege::Register {
            match check_level(ctx, principal, &wikidoc, privilege, Effect::Allow, RuleScope::Global)
            {
                RuleOutcome::Matched => {
                    log_allow(&name, &resource_key, privilege.as_str(), "register level");
                    return Ok(true);
                }
                RuleOutcome::Unmatched => {
                    log_deny(&name, &resource_key, privilege.as_str(), "register level");
                    return Ok(false);
                }
                RuleOutcome::NotFound => {
                    if check_level(
                        ctx,
                        principal,
                        &wikidoc,
                        privilege,
                        Effect::Deny,
                        RuleScope::Global,
                    ) == RuleOutcome::Matched
                    {
                        log_deny(&name, &resource_key, privilege.as_str(), "register level");
                        return Ok(false);
                    }
                }
            }
            log_allow(&name, &resource_key, privilege.as_str(), "register level (no right found)");
            return Ok(true);
        }

        let max_checks = self.max_space_checks(ctx);

        // 7. An admin grant anywhere above the resource implies everything.
        if self.is_admin_somewhere(ctx, principal, resource, &wikidoc, max_checks)? {
            log_allow(&name, &resource_key, privilege.as_str(), "admin level");
            return Ok(true);
        }

        // An allow rule of the right privilege seen anywhere (matched or
        // not) stops allow checks at wider levels; a matched document-level
        // allow is only recorded, so that denies at wider levels can still
        // override it before it is returned.
        let mut allow_found = false;
        let mut allow_matched = false;

        // 8. Document level: deny first, then allow (recorded, not
        //    returned).
        let document = match currentdoc {
            Some(doc) => doc,
            None => ctx.store.document(&current, resource)?,
        };
        match check_level(ctx, principal, &document, privilege, Effect::Deny, RuleScope::Local) {
            RuleOutcome::Matched => {
                log_deny(&name, &resource_key, privilege.as_str(), "document level");
                return Ok(false);
            }
            RuleOutcome::Unmatched | RuleOutcome::NotFound => {}
        }
        match check_level(ctx, principal, &document, privilege, Effect::Allow, RuleScope::Local) {
            RuleOutcome::Matched => {
                allow_matched = true;
                allow_found = true;
            }
            RuleOutcome::Unmatched => allow_found = true,
            RuleOutcome::NotFound => {}
        }

        // 9. Space chain: deny always checked; allow only until first found.
        let mut walker = SpaceWalker::new(&resource.space, max_checks);
        while let Some(prefs) = walker.next_level(ctx)? {
            match check_level(ctx, principal, &prefs, privilege, Effect::Deny, RuleScope::Global) {
                RuleOutcome::Matched => {
                    log_deny(&name, &resource_key, privilege.as_str(), "space level");
                    return Ok(false);
                }
                RuleOutcome::Unmatched | RuleOutcome::NotFound => {}
            }
            if !allow_found {
                match check_level(
                    ctx,
                    principal,
                    &prefs,
                    privilege,
                    Effect::Allow,
                    RuleScope::Global,
                ) {
                    RuleOutcome::Matched => {
                        log_allow(&name, &resource_key, privilege.as_str(), "space level");
                        return Ok(true);
                    }
                    RuleOutcome::Unmatched => allow_found = true,
                    RuleOutcome::NotFound => {}
                }
            }
        }

        // 10. Wiki level: the last deny able to override the recorded
        //     document-level allow.
        match check_level(ctx, principal, &wikidoc, privilege, Effect::Deny, RuleScope::Global) {
            RuleOutcome::Matched => {
                log_deny(&name, &resource_key, privilege.as_str(), "wiki level");
                return Ok(false);
            }
            RuleOutcome::Unmatched | RuleOutcome::NotFound => {}
        }
        if allow_matched {
            log_allow(&name, &resource_key, privilege.as_str(), "document level");
            return Ok(true);
        }
        if !allow_found {
            match check_level(ctx, principal, &wikidoc, privilege, Effect::Allow, RuleScope::Global)
            {
                RuleOutcome::Matched => {
                    log_allow(&name, &resource_key, privilege.as_str(), "wiki level");
                    return Ok(true);
                }
                RuleOutcome::Unmatched => allow_found = true,
                RuleOutcome::NotFound => {}
            }
        }

        // 11. Default verdict.
        if allow_found {
            log_deny(
                &name,
                &resource_key,
                privilege.as_str(),
                "global level (restricting right was found)",
            );
            Ok(false)
        } else if privilege.requires_explicit_grant() {
            log_deny(
                &name,
                &resource_key,
                privilege.as_str(),
                "global level (right must be explicit)",
            );
            Ok(false)
        } else {
            log_allow(
                &name,
                &resource_key,
                privilege.as_str(),
                "global level (no restricting right)",
            );
            Ok(true)
        }
    }

    /// Steps 4 of the walk: superadmin sentinel, master-admin escape hatch,
    /// and the programming gate, all against the main tenant's record.
    fn superadmin_or_programming(
        &self,
        ctx: &mut RightsContext<'_>,
        principal: &Principal,
        resource_key: &str,
        privilege: Privilege,
    ) -> Result<bool> {
        let current = ctx.current_tenant().to_string();
        let name = principal.full_name(&current);

        if principal.is_superadmin() {
            log_allow(&name, resource_key, privilege.as_str(), "super admin level");
            return Ok(true);
        }

        // Programming is reserved to principals homed in the current tenant.
        let home_is_current = principal.home_or(&current).eq_ignore_ascii_case(&current);

        let main = ctx.tenants.main_tenant();
        ctx.with_tenant(&main, |ctx| -> Result<bool> {
            let masterdoc = ctx.store.document(&main, &DocRef::wiki_preferences())?;

            if check_level(
                ctx,
                principal,
                &masterdoc,
                Privilege::Admin,
                Effect::Allow,
                RuleScope::Global,
            ) == RuleOutcome::Matched
            {
                log_allow(&name, resource_key, privilege.as_str(), "master admin level");
                return Ok(true);
            }

            if privilege == Privilege::Programming {
                if !home_is_current {
                    log_deny(&name, resource_key, privilege.as_str(), "programming level (foreign tenant)");
                    return Ok(false);
                }
                match check_level(
                    ctx,
                    principal,
                    &masterdoc,
                    Privilege::Programming,
                    Effect::Allow,
                    RuleScope::Global,
                ) {
                    RuleOutcome::Matched => {
                        log_allow(&name, resource_key, privilege.as_str(), "programming level");
                        return Ok(true);
                    }
                    RuleOutcome::Unmatched => {
                        log_deny(&name, resource_key, privilege.as_str(), "programming level");
                        return Ok(false);
                    }
                    RuleOutcome::NotFound => {
                        log_deny(&name, resource_key, privilege.as_str(), "programming level (no right found)");
                        return Ok(false);
                    }
                }
            }

            Ok(false)
        })
    }

    /// Step 7: admin grant on the wiki record or any space level above the
    /// resource.
    fn is_admin_somewhere(
        &self,
        ctx: &mut RightsContext<'_>,
        principal: &Principal,
        resource: &DocRef,
        wikidoc: &Document,
        max_checks: u32,
    ) -> Result<bool> {
        if check_level(
            ctx,
            principal,
            wikidoc,
            Privilege::Admin,
            Effect::Allow,
            RuleScope::Global,
        ) == RuleOutcome::Matched
        {
            return Ok(true);
        }

        let mut walker = SpaceWalker::new(&resource.space, max_checks);
        while let Some(prefs) = walker.next_level(ctx)? {
            if check_level(
                ctx,
                principal,
                &prefs,
                Privilege::Admin,
                Effect::Allow,
                RuleScope::Global,
            ) == RuleOutcome::Matched
            {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// `authenticate_<privilege>` flag at wiki or space scope; any read
    /// failure degrades to "no".
    fn needs_auth(
        &self,
        ctx: &RightsContext<'_>,
        privilege: Privilege,
        space: Option<&str>,
    ) -> bool {
        let key = format!("authenticate_{}", privilege.as_str());
        let tenant = ctx.current_tenant();

        let mut needs = flag_set(ctx.store.preference(tenant, &key), tenant, &key);
        if let Some(space) = space {
            needs |= flag_set(ctx.store.space_preference(tenant, space, &key), tenant, &key);
        }
        needs
    }

    /// Walk bound from the wiki preference, defaulting when unset or broken.
    fn max_space_checks(&self, ctx: &RightsContext<'_>) -> u32 {
        match ctx
            .store
            .preference(ctx.current_tenant(), MAX_SPACE_CHECKS_PREF)
        {
            Ok(Some(raw)) => raw.trim().parse().unwrap_or(DEFAULT_MAX_SPACE_CHECKS),
            Ok(None) => DEFAULT_MAX_SPACE_CHECKS,
            Err(e) => {
                tracing::warn!(error = %e, "failed to read max space checks preference");
                DEFAULT_MAX_SPACE_CHECKS
            }
        }
    }

    /// Legacy entry point: map a request action to a privilege, resolve the
    /// request user (challenging for login when needed) and delegate to
    /// `evaluate`.
    pub fn check_access(&self, ctx: &mut RightsContext<'_>, action: &str, doc: &Document) -> bool {
        tracing::debug!(action, doc = %doc.reference, "check_access");

        let privilege = match actions::classify(action) {
            ActionClass::Login => {
                let user = self
                    .authenticate(ctx)
                    .unwrap_or_else(|| Principal::guest().to_string());
                ctx.user = Some(user.clone());
                log_allow(&user, &doc.reference.full_name(), action, "login/logout pages");
                return true;
            }
            ActionClass::Level(privilege) => privilege,
        };

        // Creators delete their own documents without a rights walk.
        if privilege == Privilege::Delete {
            if let Some(user) = self.authenticate(ctx) {
                if doc.creator.as_deref() == Some(user.as_str()) {
                    ctx.user = Some(user);
                    return true;
                }
            }
        }

        let username = match ctx.user.clone() {
            Some(user) => user,
            None => {
                let needs = self.needs_auth(ctx, privilege, Some(&doc.reference.space));
                match self.authenticate(ctx) {
                    Some(user) => {
                        ctx.user = Some(user.clone());
                        user
                    }
                    None if needs => {
                        log_deny(
                            "unauthenticated",
                            &doc.reference.full_name(),
                            action,
                            "authentication needed",
                        );
                        if let Some(auth) = ctx.auth {
                            auth.show_login();
                        }
                        return false;
                    }
                    None => {
                        let guest = Principal::guest().to_string();
                        ctx.user = Some(guest.clone());
                        guest
                    }
                }
            }
        };

        let current = ctx.current_tenant().to_string();
        let qualified = Principal::parse(&username).full_name(&current);
        let docname = format!("{}:{}", current, doc.reference.full_name());

        if self.evaluate(ctx, &qualified, &doc.reference, privilege) {
            log_allow(&qualified, &docname, action, "access manager granted right");
            return true;
        }

        if Principal::parse(&username).is_guest() {
            log_deny("unauthenticated", &docname, action, "guest has been denied");
            if let Some(auth) = ctx.auth {
                auth.show_login();
            }
        } else {
            log_deny(&qualified, &docname, action, "access manager denied right");
        }
        false
    }

    /// Current user via the authenticator, degrading to `None` on failure.
    fn authenticate(&self, ctx: &RightsContext<'_>) -> Option<String> {
        let auth = ctx.auth?;
        match auth.check_auth() {
            Ok(user) => user,
            Err(e) => {
                tracing::error!(error = %e, "authentication check failed");
                None
            }
        }
    }

    /// Admin on the wiki record, falling back to admin on the current
    /// document's space record.
    pub fn has_admin_rights(&self, ctx: &mut RightsContext<'_>) -> bool {
        let user = ctx
            .user
            .clone()
            .unwrap_or_else(|| Principal::guest().to_string());

        if self.evaluate(ctx, &user, &DocRef::wiki_preferences(), Privilege::Admin) {
            return true;
        }
        if let Some(doc) = ctx.current_doc.clone() {
            return self.evaluate(
                ctx,
                &user,
                &DocRef::space_preferences(&doc.space),
                Privilege::Admin,
            );
        }
        false
    }

    /// Programming rights of a document's content author, or of the context
    /// user when no document is given.
    pub fn has_programming_rights(
        &self,
        ctx: &mut RightsContext<'_>,
        doc: Option<&Document>,
    ) -> bool {
        let Some(doc) = doc else {
            let user = ctx
                .user
                .clone()
                .unwrap_or_else(|| Principal::guest().to_string());
            let tenant = ctx.current_tenant().to_string();
            let principal = Principal::parse(&user).resolve(&tenant);
            return match self.superadmin_or_programming(
                ctx,
                &principal,
                "<context>",
                Privilege::Programming,
            ) {
                Ok(allowed) => allowed,
                Err(e) => {
                    tracing::error!(user, error = %e, "programming rights check failed");
                    false
                }
            };
        };

        let Some(author) = doc.content_author.clone() else {
            return false;
        };
        let current = ctx.current_tenant().to_string();
        let author = Principal::parse(&author);

        // Programming can only be held by principals of the main tenant.
        if ctx.tenants.is_multi_tenant() {
            let main = ctx.tenants.main_tenant();
            if !author.home_or(&current).eq_ignore_ascii_case(&main) {
                return false;
            }
        }

        let full = author.full_name(&current);
        self.evaluate(ctx, &full, &doc.reference, Privilege::Programming)
    }
}

fn flag_set(read: Result<Option<String>>, tenant: &str, key: &str) -> bool {
    match read {
        Ok(Some(value)) => {
            let value = value.trim();
            value.eq_ignore_ascii_case("yes") || value == "1"
        }
        Ok(None) => false,
        Err(e) => {
            tracing::warn!(tenant, key, error = %e, "preference read failed, assuming unset");
            false
        }
    }
}
