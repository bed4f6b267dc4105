// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Tag resolution.
//!
//! Configuration entries name either a single tag or a container whose
//! children are discovered by browsing. Resolution expands containers
//! recursively into a flat, ordered, deduplicated [`TagSet`].
//!
//! Expansion is defensive: revisiting a node already on the active browse
//! path is a cycle, and expansion past the configured depth limit is cut
//! off. Either condition fails the offending entry only; the other entries
//! still resolve.

use std::future::Future;
use std::pin::Pin;

use async_trait::async_trait;
use tracing::{debug, warn};

use tagbridge_core::error::{ResolveError, ResolveResult};
use tagbridge_core::types::{ResolvedTag, TagKey, TagSet};

use crate::transport::BrowsedNode;

/// Default container expansion depth limit.
pub const DEFAULT_MAX_DEPTH: usize = 10;

// =============================================================================
// ChildBrowser
// =============================================================================

/// The browse capability resolution needs from the upstream.
///
/// Resolution is a pure function of its entries and this browser: the same
/// entries against the same address space produce the same tag set.
#[async_trait]
pub trait ChildBrowser: Send + Sync {
    /// Lists the children of a container node.
    async fn browse_children(&self, key: &TagKey) -> ResolveResult<Vec<BrowsedNode>>;
}

// =============================================================================
// Entries and limits
// =============================================================================

/// One configuration entry submitted for resolution.
#[derive(Debug, Clone, PartialEq)]
pub enum TagEntry {
    /// A single tag, optionally renamed.
    Tag {
        /// Override for the published field name.
        name: Option<String>,
        /// Upstream identity.
        key: TagKey,
    },

    /// A container whose variable children become tags.
    Container {
        /// Upstream identity of the container.
        key: TagKey,
    },
}

impl TagEntry {
    fn describe(&self) -> String {
        match self {
            TagEntry::Tag { key, .. } => key.to_string(),
            TagEntry::Container { key } => format!("container {}", key),
        }
    }
}

/// Limits applied during container expansion.
#[derive(Debug, Clone, Copy)]
pub struct ResolveLimits {
    /// Maximum container nesting depth.
    pub max_depth: usize,
}

impl Default for ResolveLimits {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// Result of resolving a set of entries.
///
/// Failures are collected per entry so one bad container does not take the
/// whole configuration down.
#[derive(Debug, Default)]
pub struct ResolveOutcome {
    /// All successfully resolved tags, in declaration order, deduplicated.
    pub tag_set: TagSet,

    /// Entries that failed, with the entry description and its error.
    pub failures: Vec<(String, ResolveError)>,
}

impl ResolveOutcome {
    /// Returns `true` when every entry resolved.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

// =============================================================================
// resolve_tags
// =============================================================================

/// Resolves configuration entries into a flat tag set.
pub async fn resolve_tags<B: ChildBrowser>(
    entries: &[TagEntry],
    browser: &B,
    limits: ResolveLimits,
) -> ResolveOutcome {
    let mut outcome = ResolveOutcome::default();

    for entry in entries {
        match entry {
            TagEntry::Tag { name, key } => {
                let tag = match name {
                    Some(n) => ResolvedTag::named(n.clone(), key.clone()),
                    None => ResolvedTag::from_key(key.clone()),
                };
                outcome.tag_set.push(tag);
            }
            TagEntry::Container { key } => {
                let mut path = Vec::new();
                match expand_container(key, browser, limits, 0, &mut path, &mut outcome.tag_set)
                    .await
                {
                    Ok(()) => {
                        debug!(container = %key, "Container expanded");
                    }
                    Err(e) => {
                        warn!(container = %key, error = %e, "Container expansion failed");
                        outcome.failures.push((entry.describe(), e));
                    }
                }
            }
        }
    }

    outcome
}

/// Recursively expands one container into `out`.
///
/// `path` holds the containers currently being expanded, root first. A
/// child key already on the path means the address space loops back on
/// itself.
fn expand_container<'a, B: ChildBrowser>(
    key: &'a TagKey,
    browser: &'a B,
    limits: ResolveLimits,
    depth: usize,
    path: &'a mut Vec<TagKey>,
    out: &'a mut TagSet,
) -> Pin<Box<dyn Future<Output = ResolveResult<()>> + Send + 'a>> {
    Box::pin(async move {
        if path.contains(key) {
            return Err(ResolveError::cyclic_reference(key.to_string()));
        }
        if depth >= limits.max_depth {
            return Err(ResolveError::depth_exceeded(
                key.to_string(),
                limits.max_depth,
            ));
        }

        path.push(key.clone());
        let children = match browser.browse_children(key).await {
            Ok(children) => children,
            Err(e) => {
                path.pop();
                return Err(e);
            }
        };

        for child in children {
            if child.is_container {
                expand_container(&child.key, browser, limits, depth + 1, path, out).await?;
            } else {
                out.push(ResolvedTag::named(child.name, child.key));
            }
        }

        path.pop();
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    /// Browser over a static parent -> children map.
    struct MapBrowser {
        children: HashMap<TagKey, Vec<BrowsedNode>>,
    }

    impl MapBrowser {
        fn new(edges: Vec<(TagKey, Vec<BrowsedNode>)>) -> Self {
            Self {
                children: edges.into_iter().collect(),
            }
        }
    }

    #[async_trait]
    impl ChildBrowser for MapBrowser {
        async fn browse_children(&self, key: &TagKey) -> ResolveResult<Vec<BrowsedNode>> {
            self.children
                .get(key)
                .cloned()
                .ok_or_else(|| ResolveError::browse(key.to_string(), "unknown node"))
        }
    }

    fn key(id: &str) -> TagKey {
        TagKey::new("urn:test", id)
    }

    fn leaf(id: &str) -> BrowsedNode {
        BrowsedNode {
            name: id.to_string(),
            key: key(id),
            is_container: false,
        }
    }

    fn container(id: &str) -> BrowsedNode {
        BrowsedNode {
            name: id.to_string(),
            key: key(id),
            is_container: true,
        }
    }

    #[tokio::test]
    async fn single_tags_resolve_without_browsing() {
        let browser = MapBrowser::new(vec![]);
        let entries = vec![
            TagEntry::Tag {
                name: None,
                key: key("a"),
            },
            TagEntry::Tag {
                name: Some("renamed".into()),
                key: key("b"),
            },
        ];

        let outcome = resolve_tags(&entries, &browser, ResolveLimits::default()).await;
        assert!(outcome.is_complete());
        assert_eq!(outcome.tag_set.len(), 2);
        assert_eq!(outcome.tag_set.tags()[0].name, "a");
        assert_eq!(outcome.tag_set.tags()[1].name, "renamed");
    }

    #[tokio::test]
    async fn containers_expand_recursively_in_order() {
        let browser = MapBrowser::new(vec![
            (key("root"), vec![leaf("x"), container("sub"), leaf("y")]),
            (key("sub"), vec![leaf("z")]),
        ]);
        let entries = vec![TagEntry::Container { key: key("root") }];

        let outcome = resolve_tags(&entries, &browser, ResolveLimits::default()).await;
        assert!(outcome.is_complete());
        let names: Vec<_> = outcome.tag_set.tags().iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["x", "z", "y"]);
    }

    #[tokio::test]
    async fn resolution_is_idempotent_and_deduplicates() {
        let browser = MapBrowser::new(vec![(key("root"), vec![leaf("x"), leaf("y")])]);
        let entries = vec![
            TagEntry::Container { key: key("root") },
            TagEntry::Tag {
                name: None,
                key: key("x"),
            },
            TagEntry::Container { key: key("root") },
        ];

        let first = resolve_tags(&entries, &browser, ResolveLimits::default()).await;
        let second = resolve_tags(&entries, &browser, ResolveLimits::default()).await;

        assert_eq!(first.tag_set, second.tag_set);
        assert_eq!(first.tag_set.len(), 2);
    }

    #[tokio::test]
    async fn cycles_fail_with_cyclic_reference() {
        let browser = MapBrowser::new(vec![
            (key("a"), vec![container("b")]),
            (key("b"), vec![container("a")]),
        ]);
        let entries = vec![TagEntry::Container { key: key("a") }];

        let outcome = resolve_tags(&entries, &browser, ResolveLimits::default()).await;
        assert_eq!(outcome.failures.len(), 1);
        assert!(matches!(
            outcome.failures[0].1,
            ResolveError::CyclicReference { .. }
        ));
    }

    #[tokio::test]
    async fn self_cycle_fails_too() {
        let browser = MapBrowser::new(vec![(key("a"), vec![container("a")])]);
        let entries = vec![TagEntry::Container { key: key("a") }];

        let outcome = resolve_tags(&entries, &browser, ResolveLimits::default()).await;
        assert!(matches!(
            outcome.failures[0].1,
            ResolveError::CyclicReference { .. }
        ));
    }

    #[tokio::test]
    async fn depth_limit_is_enforced() {
        let browser = MapBrowser::new(vec![
            (key("l0"), vec![container("l1")]),
            (key("l1"), vec![container("l2")]),
            (key("l2"), vec![leaf("deep")]),
        ]);
        let entries = vec![TagEntry::Container { key: key("l0") }];

        let shallow = resolve_tags(&entries, &browser, ResolveLimits { max_depth: 2 }).await;
        assert!(matches!(
            shallow.failures[0].1,
            ResolveError::DepthExceeded { .. }
        ));

        let deep = resolve_tags(&entries, &browser, ResolveLimits { max_depth: 5 }).await;
        assert!(deep.is_complete());
        assert_eq!(deep.tag_set.len(), 1);
    }

    #[tokio::test]
    async fn failing_entry_does_not_poison_others() {
        let browser = MapBrowser::new(vec![(key("good"), vec![leaf("x")])]);
        let entries = vec![
            TagEntry::Container { key: key("broken") },
            TagEntry::Container { key: key("good") },
        ];

        let outcome = resolve_tags(&entries, &browser, ResolveLimits::default()).await;
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.tag_set.len(), 1);
        assert_eq!(outcome.tag_set.tags()[0].name, "x");
    }
}
