//! Group membership resolution with per-call memoization.
//!
//! Groups are looked up in the current evaluation tenant and, on a
//! multi-tenant deployment where the principal is homed elsewhere, in the
//! principal's home tenant as well (under a scoped tenant switch). Lookup
//! failures are never fatal: they are logged and degrade to an empty set,
//! the safest non-granting default.

use ahash::AHashSet;

use crate::identity::{qualify, Principal};
use crate::rights::RightsContext;

/// Fully qualified names of every group `principal` belongs to, visible from
/// the current evaluation tenant.
pub(crate) fn resolve(ctx: &mut RightsContext<'_>, principal: &Principal) -> Vec<String> {
    let current = ctx.current_tenant().to_string();
    let home = principal.home_or(&current).to_string();
    let full = principal.full_name(&current);

    let mut merged: AHashSet<String> = AHashSet::new();

    for group in lookup(ctx, &current, &home, &full, principal) {
        merged.insert(group);
    }

    // Groups of the principal in its home tenant, under a scoped switch.
    if ctx.tenants.is_multi_tenant() && !current.eq_ignore_ascii_case(&home) {
        let home_groups = ctx.with_tenant(&home, |ctx| {
            let tenant = ctx.current_tenant().to_string();
            lookup(ctx, &tenant, &tenant, &full, principal)
        });
        for group in home_groups {
            merged.insert(group);
        }
    }

    merged.into_iter().collect()
}

/// One cached directory lookup. The cache key pairs the lookup tenant with
/// the principal's fully qualified name so entries from unrelated tenants
/// never collide.
fn lookup(
    ctx: &mut RightsContext<'_>,
    tenant: &str,
    qualify_tenant: &str,
    full: &str,
    principal: &Principal,
) -> Vec<String> {
    let key = (tenant.to_string(), full.to_string());
    if let Some(cached) = ctx.cached_groups(&key) {
        return cached;
    }

    let groups = match ctx.groups.groups_of(tenant, &principal.qualified_short()) {
        Ok(names) => names
            .iter()
            .map(|name| format!("{}:{}", qualify_tenant, qualify(name)))
            .collect(),
        Err(e) => {
            tracing::error!(
                principal = %principal,
                tenant,
                error = %e,
                "group lookup failed, treating as no groups"
            );
            Vec::new()
        }
    };

    ctx.cache_groups(key, groups.clone());
    groups
}
