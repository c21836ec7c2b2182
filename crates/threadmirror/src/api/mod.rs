//! Remote platform API abstraction.
//!
//! The core never talks to the network directly; it depends on the
//! `ContentApi` trait. `RedditClient` is the production implementation,
//! tests substitute an in-memory fake.

pub mod error;
pub mod http;
pub mod node;

#[cfg(test)]
pub(crate) mod fake;

pub use error::ApiError;
pub use http::RedditClient;
pub use node::{DocumentNode, Node, ReplyNode, ReplyRef};

/// Contract with the remote content platform.
pub trait ContentApi {
    /// Fetches a document by canonical URL, together with its initially
    /// loaded, flattened reply listing.
    ///
    /// When the URL addresses a specific reply, the platform focuses the
    /// listing on it: that reply is the first element.
    fn fetch_document(&self, url: &str) -> Result<(DocumentNode, Vec<ReplyNode>), ApiError>;

    /// Fetches the complete, flattened reply subtree of a document.
    /// Expensive; used as the bulk backfill when chain walking finds a gap.
    fn fetch_reply_subtree(&self, document_id: &str) -> Result<Vec<ReplyNode>, ApiError>;

    /// Posts a new reply under the given node.
    fn post_reply(&self, parent: &Node, text: &str) -> Result<ReplyRef, ApiError>;

    /// Replaces the body of a reply previously posted by the bot.
    fn edit_reply(&self, reply: &ReplyRef, text: &str) -> Result<(), ApiError>;
}
