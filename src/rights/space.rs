//! Parent-space chain walking.
//!
//! A space's preferences record may name a parent space, forming an
//! inheritance chain up to the root. The walker follows that chain lazily,
//! yielding each materialized preferences record, and terminates on the
//! first of: no parent link, a blank link, a link back into an already
//! visited space, or an exhausted depth budget. A walker is single-use;
//! re-walking means constructing a fresh one.

use ahash::AHashSet;

use crate::error::Result;
use crate::rights::RightsContext;
use crate::types::{DocRef, Document};

pub(crate) struct SpaceWalker {
    next_space: Option<String>,
    visited: AHashSet<String>,
    produced: u32,
    max_checks: u32,
}

impl SpaceWalker {
    /// Start a walk at the space containing the checked resource.
    /// At most `max_checks + 1` levels are produced.
    pub(crate) fn new(start_space: &str, max_checks: u32) -> Self {
        SpaceWalker {
            next_space: Some(start_space.to_string()),
            visited: AHashSet::new(),
            produced: 0,
            max_checks,
        }
    }

    /// Advance to the next level's preferences record, or `None` when the
    /// chain is exhausted. Storage failures propagate verbatim.
    pub(crate) fn next_level(&mut self, ctx: &RightsContext<'_>) -> Result<Option<Document>> {
        let space = match self.next_space.take() {
            Some(space) if self.produced <= self.max_checks => space,
            _ => return Ok(None),
        };
        self.produced += 1;
        self.visited.insert(space.clone());

        let prefs = ctx
            .store
            .document(ctx.current_tenant(), &DocRef::space_preferences(&space))?;
        if prefs.is_new {
            // Never-materialized preferences end the chain.
            return Ok(None);
        }

        self.next_space = match &prefs.parent_space {
            Some(parent) => {
                let parent = parent.trim();
                if parent.is_empty() || self.visited.contains(parent) {
                    None
                } else {
                    Some(parent.to_string())
                }
            }
            None => None,
        };

        Ok(Some(prefs))
    }
}
