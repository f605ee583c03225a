//! Rule matching for one document level.
//!
//! `check_level` scans a document's rules of one (privilege, effect, scope)
//! combination for the principal, then retries through the principal's
//! groups. The outcome is a tri-state value, not an error: the decision
//! engine needs to distinguish "no rule of this shape exists here" (keep
//! walking outward) from "a rule exists but names someone else" (a found,
//! non-matching level) from a definitive match.

use ahash::AHashSet;

use crate::identity::{qualify, Principal};
use crate::rights::{groups, RightsContext};
use crate::types::{Document, Effect, Privilege, RuleScope, SubjectKind, USERS_SPACE};

/// Outcome of scanning one level for one (privilege, effect) combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RuleOutcome {
    /// A rule of the requested shape names this principal (or one of its
    /// groups).
    Matched,
    /// Rules of the requested shape exist at this level, but none names this
    /// principal.
    Unmatched,
    /// No rule of the requested shape exists at this level.
    NotFound,
}

/// Scan `doc` for `effect` rules carrying `privilege` that name `principal`
/// directly or through group membership.
///
/// "Found" means a rule of the requested shape exists at this level at all,
/// whatever its subject kind: a level carrying only group rules still counts
/// as restricted for a principal in none of those groups. When nothing of
/// the shape exists the group directory is never consulted.
pub(crate) fn check_level(
    ctx: &mut RightsContext<'_>,
    principal: &Principal,
    doc: &Document,
    privilege: Privilege,
    effect: Effect,
    scope: RuleScope,
) -> RuleOutcome {
    let found = doc
        .rules(scope)
        .iter()
        .any(|rule| rule.effect == effect && rule.privileges.contains(&privilege));
    if !found {
        return RuleOutcome::NotFound;
    }

    let mut visited = AHashSet::new();
    if check_subject(
        ctx,
        principal,
        SubjectKind::User,
        doc,
        privilege,
        effect,
        scope,
        &mut visited,
    ) {
        RuleOutcome::Matched
    } else {
        RuleOutcome::Unmatched
    }
}

/// One recursion step: scan rules of `kind`, then recurse into the subject's
/// groups with `kind = Group`. `visited` holds fully qualified group names
/// already expanded in this call tree, so group cycles terminate.
#[allow(clippy::too_many_arguments)]
fn check_subject(
    ctx: &mut RightsContext<'_>,
    subject: &Principal,
    kind: SubjectKind,
    doc: &Document,
    privilege: Privilege,
    effect: Effect,
    scope: RuleScope,
    visited: &mut AHashSet<String>,
) -> bool {
    tracing::debug!(
        subject = %subject,
        doc = %doc.reference,
        %privilege,
        ?effect,
        ?kind,
        "checking rules"
    );

    for rule in doc.rules(scope) {
        if rule.effect != effect || rule.kind != kind {
            continue;
        }
        if !rule.privileges.contains(&privilege) {
            continue;
        }
        if subject_matches(ctx, subject, &rule.subjects) {
            return true;
        }
    }

    // No direct match at this level; retry through the subject's groups.
    for group in groups::resolve(ctx, subject) {
        if !visited.insert(group.clone()) {
            continue;
        }
        let group_principal = Principal::parse(&group);
        if check_subject(
            ctx,
            &group_principal,
            SubjectKind::Group,
            doc,
            privilege,
            effect,
            scope,
            visited,
        ) {
            return true;
        }
    }

    false
}

/// Qualify a subject entry as written by a rule author: the part after any
/// tenant prefix gets the conventional user container when it has no space.
fn qualify_subject(subject: &str) -> String {
    match subject.split_once(':') {
        Some((tenant, name)) => format!("{}:{}", tenant, qualify(name)),
        None => qualify(subject),
    }
}

/// Does any entry of `subjects` name `principal`?
///
/// Tries, in order: the fully qualified form (covers cross-tenant explicit
/// grants), then — only when the principal is homed in the current tenant —
/// the short form and the container-stripped form. Cross-tenant subjects
/// must be written fully qualified.
fn subject_matches(ctx: &RightsContext<'_>, principal: &Principal, subjects: &[String]) -> bool {
    let current = ctx.current_tenant();
    let full = principal.full_name(current);
    let short = principal.qualified_short();
    // "Users.Bob" may be written as plain "Bob"; no such shorthand exists
    // for other containers.
    let stripped = short.strip_prefix(&format!("{}.", USERS_SPACE));
    let same_tenant = principal.home_or(current).eq_ignore_ascii_case(current);

    for subject in subjects {
        let qualified = qualify_subject(subject);
        if qualified == full {
            return true;
        }
        if same_tenant && (qualified == short || Some(subject.as_str()) == stripped) {
            return true;
        }
    }
    false
}
