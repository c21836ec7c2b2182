//! Reference resolution: permalink-like string to canonical content node.
//!
//! A reference may point at a document or at one reply inside it; the
//! platform serves both through the same listing endpoint, so after
//! fetching we disambiguate against the first reply of the focused listing.

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use crate::api::{ContentApi, DocumentNode, Node, ReplyNode};

/// The number of `/`-separated segments a url with a reply id specified
/// will split into (not counting empties).
const URL_SEGMENTS_WITH_REPLY: usize = 8;

static RE_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)((?:https?://)(?:[\w-]+\.)?reddit\.com)?(?P<path>/r/(?P<community>\w+)/comments/[^?\s()]*)(\?[\w-]+(=[\w-]*)?(&[\w-]+(=[\w-]*)?)*)?",
    )
    .unwrap()
});

/// Errors from reference resolution.
#[derive(Error, Debug)]
pub enum ResolveError {
    /// The reference does not parse as a content locator. Fatal to the
    /// single operation; callers typically mark the source item ignored.
    #[error("Failure parsing link for \"{reference}\"")]
    CannotResolve { reference: String },
}

/// A resolved reference together with its fetch context, so downstream
/// rendering does not refetch the document or its listing.
#[derive(Debug, Clone)]
pub struct Resolved {
    pub node: Node,
    pub document: DocumentNode,
    pub replies: Vec<ReplyNode>,
}

/// Resolves permalink-like references to canonical nodes.
pub struct ContentResolver<'a, A: ContentApi> {
    api: &'a A,
}

impl<'a, A: ContentApi> ContentResolver<'a, A> {
    pub fn new(api: &'a A) -> Self {
        Self { api }
    }

    /// Normalizes a reference to its canonical absolute URL.
    pub fn canonical_url(&self, reference: &str) -> Result<String, ResolveError> {
        let decoded = urlencoding::decode(reference)
            .map(|c| c.into_owned())
            .unwrap_or_else(|_| reference.to_string());
        match RE_LINK.captures(&decoded) {
            Some(captures) => Ok(format!("https://www.reddit.com{}", &captures["path"])),
            None => Err(ResolveError::CannotResolve {
                reference: reference.to_string(),
            }),
        }
    }

    /// Resolves a reference to its canonical node.
    ///
    /// `Ok(None)` means the content is transiently unavailable (malformed
    /// response, HTTP failure); such references are frequently non-mirror
    /// links, so unavailability is deliberately not fatal.
    pub fn resolve(&self, reference: &str) -> Result<Option<Node>, ResolveError> {
        Ok(self.resolve_full(reference)?.map(|resolved| resolved.node))
    }

    /// Like [`resolve`](Self::resolve) but keeps the fetched document and
    /// reply listing alongside the node.
    pub fn resolve_full(&self, reference: &str) -> Result<Option<Resolved>, ResolveError> {
        let url = self.canonical_url(reference)?;
        match self.api.fetch_document(&url) {
            Ok((document, replies)) => {
                let node = match replies.first() {
                    Some(first) if is_reply_reference(&url, &first.permalink) => {
                        Node::Reply(first.clone())
                    }
                    _ => Node::Document(document.clone()),
                };
                Ok(Some(Resolved {
                    node,
                    document,
                    replies,
                }))
            }
            Err(e) if e.is_transient() => {
                log::warn!("Failure fetching \"{}\": {}", url, e);
                Ok(None)
            }
            // Redirects and other non-transient failures mean a platform
            // link that is not a fetchable document.
            Err(_) => Err(ResolveError::CannotResolve {
                reference: reference.to_string(),
            }),
        }
    }
}

fn segments(url: &str) -> Vec<&str> {
    url.split('/').filter(|s| !s.trim().is_empty()).collect()
}

/// A reference addresses a reply when it equals the focused reply's
/// permalink, or when both carry a trailing reply-id segment and those
/// segments match.
fn is_reply_reference(url: &str, reply_permalink: &str) -> bool {
    if url == reply_permalink {
        return true;
    }
    let url_segments = segments(url);
    let permalink_segments = segments(reply_permalink);
    url_segments.len() == URL_SEGMENTS_WITH_REPLY
        && permalink_segments.len() == URL_SEGMENTS_WITH_REPLY
        && url_segments[URL_SEGMENTS_WITH_REPLY - 1]
            == permalink_segments[URL_SEGMENTS_WITH_REPLY - 1]
}
