//! In-memory `ContentApi` implementation for unit tests.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};

use super::{ApiError, ContentApi, DocumentNode, Node, ReplyNode, ReplyRef};

/// Builds a document with a permalink of the canonical 7-segment shape.
pub(crate) fn document(id: &str, author: Option<&str>, selftext: Option<&str>) -> DocumentNode {
    DocumentNode {
        id: id.to_string(),
        title: format!("Title of {}", id),
        author: author.map(str::to_string),
        selftext: selftext.map(str::to_string),
        is_self: selftext.is_some(),
        url: format!("https://example.com/{}", id),
        permalink: format!("https://www.reddit.com/r/source/comments/{}/slug/", id),
        created: 1_000,
        edited: None,
    }
}

/// Builds a reply whose permalink appends its id to the document permalink
/// (the canonical 8-segment shape).
pub(crate) fn reply(
    id: &str,
    document: &DocumentNode,
    parent_id: &str,
    author: Option<&str>,
    body: Option<&str>,
) -> ReplyNode {
    ReplyNode {
        id: id.to_string(),
        author: author.map(str::to_string),
        body: body.map(str::to_string),
        parent_id: parent_id.to_string(),
        document_id: document.id.clone(),
        permalink: format!("{}{}", document.permalink, id),
        created: 1_100,
        edited: None,
    }
}

struct FakeBotReply {
    reply_ref: ReplyRef,
    body: String,
}

/// Scripted fake of the remote platform.
///
/// Documents are keyed by canonical URL, exactly as the resolver produces
/// them. Replies posted through `post_reply` become resolvable at their own
/// permalink, with `edit_reply` updating the live body.
#[derive(Default)]
pub(crate) struct FakeApi {
    documents: RefCell<HashMap<String, (DocumentNode, Vec<ReplyNode>)>>,
    deep: RefCell<HashMap<String, Vec<ReplyNode>>>,
    transient: RefCell<HashSet<String>>,
    redirect: RefCell<HashSet<String>>,
    host: RefCell<Option<DocumentNode>>,
    bot_replies: RefCell<HashMap<String, FakeBotReply>>,
    pub posted: RefCell<Vec<(String, String)>>,
    pub edited: RefCell<Vec<(String, String)>>,
    pub fail_edits: Cell<bool>,
    pub deep_fetch_count: Cell<u32>,
    next_reply_seq: Cell<u32>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a document (and its initial listing) at a canonical URL.
    pub fn register_document(&self, url: &str, doc: DocumentNode, replies: Vec<ReplyNode>) {
        self.documents
            .borrow_mut()
            .insert(url.to_string(), (doc, replies));
    }

    /// Registers the complete reply subtree returned by a deep refetch.
    pub fn register_subtree(&self, document_id: &str, replies: Vec<ReplyNode>) {
        self.deep
            .borrow_mut()
            .insert(document_id.to_string(), replies);
    }

    /// Makes fetches of `url` fail with a malformed-response error.
    pub fn make_transient(&self, url: &str) {
        self.transient.borrow_mut().insert(url.to_string());
    }

    /// Makes fetches of `url` redirect (a non-document platform link).
    pub fn make_redirect(&self, url: &str) {
        self.redirect.borrow_mut().insert(url.to_string());
    }

    /// Sets the document hosting the bot's replies, so posted replies get
    /// permalinks under it.
    pub fn set_host(&self, doc: DocumentNode) {
        *self.host.borrow_mut() = Some(doc);
    }

    /// Current live body of a posted reply.
    pub fn reply_body(&self, permalink: &str) -> Option<String> {
        self.bot_replies
            .borrow()
            .get(permalink)
            .map(|r| r.body.clone())
    }
}

impl ContentApi for FakeApi {
    fn fetch_document(&self, url: &str) -> Result<(DocumentNode, Vec<ReplyNode>), ApiError> {
        if self.transient.borrow().contains(url) {
            return Err(ApiError::Malformed(format!("scripted failure for {}", url)));
        }
        if self.redirect.borrow().contains(url) {
            return Err(ApiError::Redirect(url.to_string()));
        }
        if let Some(bot_reply) = self.bot_replies.borrow().get(url) {
            let host = self
                .host
                .borrow()
                .clone()
                .ok_or_else(|| ApiError::Malformed("no host document".to_string()))?;
            let node = ReplyNode {
                id: bot_reply.reply_ref.id.clone(),
                author: Some("threadmirror".to_string()),
                body: Some(bot_reply.body.clone()),
                parent_id: format!("t3_{}", host.id),
                document_id: host.id.clone(),
                permalink: bot_reply.reply_ref.permalink.clone(),
                created: 1_200,
                edited: None,
            };
            return Ok((host, vec![node]));
        }
        self.documents
            .borrow()
            .get(url)
            .cloned()
            .ok_or_else(|| ApiError::Malformed(format!("unknown url {}", url)))
    }

    fn fetch_reply_subtree(&self, document_id: &str) -> Result<Vec<ReplyNode>, ApiError> {
        self.deep_fetch_count.set(self.deep_fetch_count.get() + 1);
        Ok(self
            .deep
            .borrow()
            .get(document_id)
            .cloned()
            .unwrap_or_default())
    }

    fn post_reply(&self, parent: &Node, text: &str) -> Result<ReplyRef, ApiError> {
        let seq = self.next_reply_seq.get();
        self.next_reply_seq.set(seq + 1);
        let id = format!("botreply{}", seq);
        let permalink = match &*self.host.borrow() {
            Some(host) => format!("{}{}", host.permalink, id),
            None => format!("https://www.reddit.com/r/mirror/comments/m0/slug/{}", id),
        };
        let reply_ref = ReplyRef {
            id: id.clone(),
            permalink: permalink.clone(),
        };
        self.bot_replies.borrow_mut().insert(
            permalink,
            FakeBotReply {
                reply_ref: reply_ref.clone(),
                body: text.to_string(),
            },
        );
        self.posted
            .borrow_mut()
            .push((parent.fullname(), text.to_string()));
        Ok(reply_ref)
    }

    fn edit_reply(&self, reply: &ReplyRef, text: &str) -> Result<(), ApiError> {
        if self.fail_edits.get() {
            return Err(ApiError::Rejected("scripted edit failure".to_string()));
        }
        let mut replies = self.bot_replies.borrow_mut();
        let entry = replies
            .get_mut(&reply.permalink)
            .ok_or_else(|| ApiError::Rejected(format!("no such reply {}", reply.id)))?;
        entry.body = text.to_string();
        self.edited
            .borrow_mut()
            .push((reply.id.clone(), text.to_string()));
        Ok(())
    }
}
