//! Shared test utilities for threadmirror integration tests: node builders
//! and a scripted in-memory platform.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;

use threadmirror::api::{ApiError, ContentApi, DocumentNode, Node, ReplyNode, ReplyRef};

/// Builds a self post with a canonical 7-segment permalink.
pub fn self_post(id: &str, author: &str, selftext: &str) -> DocumentNode {
    DocumentNode {
        id: id.to_string(),
        title: format!("Title of {}", id),
        author: Some(author.to_string()),
        selftext: Some(selftext.to_string()),
        is_self: true,
        url: format!("https://example.com/{}", id),
        permalink: format!("https://www.reddit.com/r/source/comments/{}/slug/", id),
        created: 1_000,
        edited: None,
    }
}

/// Builds a comment whose permalink appends its id to the document
/// permalink.
pub fn comment(
    id: &str,
    document: &DocumentNode,
    parent_id: &str,
    author: &str,
    body: &str,
) -> ReplyNode {
    ReplyNode {
        id: id.to_string(),
        author: Some(author.to_string()),
        body: Some(body.to_string()),
        parent_id: parent_id.to_string(),
        document_id: document.id.clone(),
        permalink: format!("{}{}", document.permalink, id),
        created: 1_100,
        edited: None,
    }
}

/// Scripted stand-in for the remote platform. Documents are keyed by
/// canonical URL; replies posted by the bot become fetchable at their own
/// permalink and editable in place.
#[derive(Default)]
pub struct ScriptedApi {
    documents: RefCell<HashMap<String, (DocumentNode, Vec<ReplyNode>)>>,
    subtrees: RefCell<HashMap<String, Vec<ReplyNode>>>,
    host: RefCell<Option<DocumentNode>>,
    bot_replies: RefCell<HashMap<String, (ReplyRef, String)>>,
    next_seq: Cell<u32>,
}

impl ScriptedApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_document(&self, url: &str, doc: DocumentNode, replies: Vec<ReplyNode>) {
        self.documents
            .borrow_mut()
            .insert(url.to_string(), (doc, replies));
    }

    pub fn register_subtree(&self, document_id: &str, replies: Vec<ReplyNode>) {
        self.subtrees
            .borrow_mut()
            .insert(document_id.to_string(), replies);
    }

    /// Sets the document under which the bot posts.
    pub fn set_host(&self, doc: DocumentNode) {
        *self.host.borrow_mut() = Some(doc);
    }

    /// Current live body of a posted bot reply.
    pub fn reply_body(&self, permalink: &str) -> Option<String> {
        self.bot_replies
            .borrow()
            .get(permalink)
            .map(|(_, body)| body.clone())
    }
}

impl ContentApi for ScriptedApi {
    fn fetch_document(&self, url: &str) -> Result<(DocumentNode, Vec<ReplyNode>), ApiError> {
        if let Some((reply_ref, body)) = self.bot_replies.borrow().get(url) {
            let host = self
                .host
                .borrow()
                .clone()
                .ok_or_else(|| ApiError::Malformed("no host document".to_string()))?;
            let node = ReplyNode {
                id: reply_ref.id.clone(),
                author: Some("threadmirror".to_string()),
                body: Some(body.clone()),
                parent_id: format!("t3_{}", host.id),
                document_id: host.id.clone(),
                permalink: reply_ref.permalink.clone(),
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
        Ok(self
            .subtrees
            .borrow()
            .get(document_id)
            .cloned()
            .unwrap_or_default())
    }

    fn post_reply(&self, _parent: &Node, text: &str) -> Result<ReplyRef, ApiError> {
        let seq = self.next_seq.get();
        self.next_seq.set(seq + 1);
        let id = format!("mirror{}", seq);
        let permalink = match &*self.host.borrow() {
            Some(host) => format!("{}{}", host.permalink, id),
            None => format!("https://www.reddit.com/r/mirror/comments/m0/slug/{}", id),
        };
        let reply_ref = ReplyRef {
            id,
            permalink: permalink.clone(),
        };
        self.bot_replies
            .borrow_mut()
            .insert(permalink, (reply_ref.clone(), text.to_string()));
        Ok(reply_ref)
    }

    fn edit_reply(&self, reply: &ReplyRef, text: &str) -> Result<(), ApiError> {
        let mut replies = self.bot_replies.borrow_mut();
        let entry = replies
            .get_mut(&reply.permalink)
            .ok_or_else(|| ApiError::Rejected(format!("no such reply {}", reply.id)))?;
        entry.1 = text.to_string();
        Ok(())
    }
}
