//! Comment chain reconstruction.
//!
//! Walks ancestor links from a target reply up to the document root and
//! renders the path as nested quotations. The reply tree is only partially
//! observed: the initial listing may be missing ancestors, so the walk
//! backfills lazily — one full deep refetch first, then individual point
//! fetches.

use std::collections::{HashMap, HashSet};

use thiserror::Error;

use crate::api::{ApiError, ContentApi, DocumentNode, Node, ReplyNode};
use crate::resolver::{ContentResolver, ResolveError};

/// Quoting starts below the tagline/title block, hence level 2.
const BASE_NESTING_LEVEL: usize = 2;

/// Errors from chain reconstruction. Callers fall back to rendering only
/// the target reply with an explicit failure marker.
#[derive(Error, Debug)]
pub enum ChainError {
    /// An ancestor could not be located even after the deep refetch and a
    /// point fetch.
    #[error("Could not locate ancestor reply \"{id}\"")]
    MissingAncestor { id: String },

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),
}

/// Builds quoted transcripts of reply chains.
pub struct ChainBuilder<'a, A: ContentApi> {
    api: &'a A,
    resolver: ContentResolver<'a, A>,
}

impl<'a, A: ContentApi> ChainBuilder<'a, A> {
    pub fn new(api: &'a A) -> Self {
        Self {
            api,
            resolver: ContentResolver::new(api),
        }
    }

    /// Renders every ancestor reply from the tree root (exclusive) down to
    /// and including `target`, in root-to-target order, one nesting level
    /// deeper per step.
    pub fn build(
        &self,
        document: &DocumentNode,
        initial_replies: &[ReplyNode],
        target: &ReplyNode,
    ) -> Result<String, ChainError> {
        let mut lookup: HashMap<String, ReplyNode> = initial_replies
            .iter()
            .map(|r| (r.id.clone(), r.clone()))
            .collect();
        lookup.insert(target.id.clone(), target.clone());

        // Walk upward, collecting the path target-first.
        let mut path = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        let mut current = target.id.clone();
        let mut refetched = false;
        while current != document.id {
            if let Some(node) = lookup.get(&current) {
                // A parent-id loop in the fetched data never reaches the
                // document root.
                if !seen.insert(current.clone()) {
                    return Err(ChainError::MissingAncestor { id: current });
                }
                let parent = node.parent_bare_id().to_string();
                path.push(current);
                current = parent;
            } else if !refetched {
                // First gap: one expensive refetch of the whole subtree.
                log::debug!(
                    "Reply {} missing from listing of {}, refetching subtree",
                    current,
                    document.id
                );
                for node in self.api.fetch_reply_subtree(&document.id)? {
                    lookup.entry(node.id.clone()).or_insert(node);
                }
                refetched = true;
            } else {
                // Still missing: point-fetch this specific reply.
                let reference = format!("{}{}", document.permalink, current);
                let fetched = self.resolver.resolve(&reference)?;
                match fetched {
                    Some(Node::Reply(node)) if node.id == current => {
                        lookup.insert(node.id.clone(), node);
                    }
                    _ => {
                        return Err(ChainError::MissingAncestor { id: current });
                    }
                }
            }
        }

        Ok(render_chain(document, &lookup, &path))
    }
}

/// Renders the collected path (target-first) as nested quotations.
fn render_chain(
    document: &DocumentNode,
    lookup: &HashMap<String, ReplyNode>,
    path: &[String],
) -> String {
    let mut content = String::new();
    let mut level = BASE_NESTING_LEVEL;
    for id in path.iter().rev() {
        let Some(node) = lookup.get(id) else {
            continue;
        };
        let author_label = match &node.author {
            Some(name) if document.author.as_deref() == Some(name.as_str()) => {
                format!("/u/{} (OP)", name)
            }
            Some(name) => format!("/u/{}", name),
            None => "[deleted]".to_string(),
        };
        content.push_str(&"> ".repeat(level));
        content.push_str(&author_label);
        content.push_str(":\n\n");
        match &node.body {
            Some(body) => {
                for line in body.split('\n') {
                    content.push_str(&">".repeat(level));
                    content.push_str(line);
                    content.push('\n');
                }
            }
            None => {
                content.push_str(&"> ".repeat(level));
                content.push_str("[deleted]\n");
            }
        }
        level += 1;
    }
    content
}
