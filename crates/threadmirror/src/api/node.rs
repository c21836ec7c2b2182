//! Remote content node types.
//!
//! A fetched unit of remote content is either a top-level document
//! (submission) or a reply (comment) within its tree. The two variants share
//! an accessor surface; variant-specific fields stay on the concrete structs.

/// Type prefix carried by reply ids in parent references.
pub const REPLY_TYPE_PREFIX: &str = "t1_";

/// Type prefix carried by document ids in parent references.
pub const DOCUMENT_TYPE_PREFIX: &str = "t3_";

/// A top-level document with its own body or an outbound link.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentNode {
    pub id: String,
    pub title: String,
    /// `None` when the author account no longer exists.
    pub author: Option<String>,
    /// Self-post body; `None` when removed.
    pub selftext: Option<String>,
    /// Whether this is a self post (text) rather than a link post.
    pub is_self: bool,
    /// Outbound URL for link posts.
    pub url: String,
    /// Absolute permalink.
    pub permalink: String,
    pub created: i64,
    pub edited: Option<i64>,
}

/// A reply within a document's tree.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplyNode {
    pub id: String,
    /// `None` when the author account no longer exists.
    pub author: Option<String>,
    /// Reply body; `None` when deleted.
    pub body: Option<String>,
    /// Parent reference including its type prefix (`t1_` or `t3_`).
    pub parent_id: String,
    /// Id of the document this reply belongs to.
    pub document_id: String,
    /// Absolute permalink.
    pub permalink: String,
    pub created: i64,
    pub edited: Option<i64>,
}

impl ReplyNode {
    /// The parent id with its type prefix stripped.
    pub fn parent_bare_id(&self) -> &str {
        strip_type_prefix(&self.parent_id)
    }
}

/// A fetched unit of remote content.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Document(DocumentNode),
    Reply(ReplyNode),
}

impl Node {
    pub fn id(&self) -> &str {
        match self {
            Node::Document(d) => &d.id,
            Node::Reply(r) => &r.id,
        }
    }

    pub fn author(&self) -> Option<&str> {
        match self {
            Node::Document(d) => d.author.as_deref(),
            Node::Reply(r) => r.author.as_deref(),
        }
    }

    pub fn permalink(&self) -> &str {
        match self {
            Node::Document(d) => &d.permalink,
            Node::Reply(r) => &r.permalink,
        }
    }

    pub fn created(&self) -> i64 {
        match self {
            Node::Document(d) => d.created,
            Node::Reply(r) => r.created,
        }
    }

    pub fn edited(&self) -> Option<i64> {
        match self {
            Node::Document(d) => d.edited,
            Node::Reply(r) => r.edited,
        }
    }

    /// The fully-qualified id used when addressing this node in API calls.
    pub fn fullname(&self) -> String {
        match self {
            Node::Document(d) => format!("{}{}", DOCUMENT_TYPE_PREFIX, d.id),
            Node::Reply(r) => format!("{}{}", REPLY_TYPE_PREFIX, r.id),
        }
    }
}

/// Reference to a reply posted by the bot.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplyRef {
    pub id: String,
    pub permalink: String,
}

/// Strips a `tN_` type prefix from an id, if present.
pub fn strip_type_prefix(id: &str) -> &str {
    match id.split_once('_') {
        Some((prefix, rest)) if prefix.len() == 2 && prefix.starts_with('t') => rest,
        _ => id,
    }
}
