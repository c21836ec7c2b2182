//! Rendering of mirrored reply bodies.
//!
//! A mirrored body has four divider-delimited sections: tagline, title,
//! content, footer. The divider literal is load-bearing: edit
//! reconciliation re-parses bodies by it, so composition here and peeling
//! there must agree exactly.

use crate::api::{ContentApi, Node};
use crate::chain::ChainBuilder;
use crate::resolver::Resolved;

/// Section divider within a rendered mirror body.
pub const TEXT_DIVIDER: &str = "\n\n----\n";

/// Hard limit on the length of a posted reply.
pub const MAX_REPLY_LENGTH: usize = 10_000;

/// Renders source content into mirror bodies.
pub struct Renderer<'a, A: ContentApi> {
    chain: ChainBuilder<'a, A>,
    error_msg: &'a str,
}

impl<'a, A: ContentApi> Renderer<'a, A> {
    pub fn new(api: &'a A, error_msg: &'a str) -> Self {
        Self {
            chain: ChainBuilder::new(api),
            error_msg,
        }
    }

    /// Extracts the title and content text to be mirrored from a resolved
    /// source.
    ///
    /// Document selftext is quoted paragraph by paragraph; link posts
    /// contribute their outbound URL. For reply targets the full comment
    /// chain follows; if chain reconstruction fails, only the target reply
    /// is rendered behind an explicit failure marker.
    pub fn render_source(&self, resolved: &Resolved) -> (String, String) {
        let document = &resolved.document;
        let title = document.title.clone();
        let mut content = String::new();

        match &document.selftext {
            Some(text) if document.is_self && !text.is_empty() => {
                for para in text.split('\n') {
                    content.push_str("> ");
                    content.push_str(para);
                    content.push('\n');
                }
            }
            _ => {
                content.push_str(&document.url);
                content.push('\n');
            }
        }

        if let Node::Reply(target) = &resolved.node {
            match self.chain.build(document, &resolved.replies, target) {
                Ok(chain) => content.push_str(&chain),
                Err(e) => {
                    log::error!("Error building comment tree for \"{}\": {}", target.id, e);
                    content.push_str("\n\n[Error building full comment tree]  \n");
                    content.push_str(self.error_msg);
                    content.push_str("\n\n");
                    if let Some(body) = &target.body {
                        for para in body.split('\n') {
                            content.push_str("> ");
                            content.push_str(para);
                            content.push('\n');
                        }
                    }
                }
            }
        }

        (title, content)
    }

    /// Assembles the full reply body: tagline, title, content, footer,
    /// divider-delimited. Content that would push the body over the reply
    /// length limit is replaced by a quoted error message.
    pub fn compose_body(
        &self,
        tagline: Option<&str>,
        title: &str,
        content: &str,
        footer: &str,
    ) -> String {
        let mut text = String::new();
        if let Some(tagline) = tagline {
            text.push_str(tagline);
        }
        text.push_str(TEXT_DIVIDER);
        if !title.is_empty() {
            text.push_str(title);
            text.push_str("\n\n");
        }
        if !content.is_empty() {
            let reserved = text.len() + 2 * TEXT_DIVIDER.len() + 2 + footer.len();
            if content.len() <= MAX_REPLY_LENGTH.saturating_sub(reserved) {
                text.push_str(content);
            } else {
                text.push_str("> ");
                text.push_str(self.error_msg);
            }
        }
        text.push_str(TEXT_DIVIDER);
        text.push_str(footer);
        text
    }
}
