//! Blocking Reddit API client.
//!
//! Listing fetches go to the public `.json` endpoints with redirects
//! disabled (a redirect means the reference is not a document link).
//! Posting and editing go through the OAuth host with a password-grant
//! token acquired at construction. Credentials are resolved from the
//! environment variables named in config, never stored in config itself.

use reqwest::blocking::Client;
use reqwest::redirect::Policy;
use serde_json::Value;

use crate::config::{AuthConfig, PlatformConfig};

use super::error::ApiError;
use super::node::{DocumentNode, Node, ReplyNode, ReplyRef};
use super::ContentApi;

const TOKEN_URL: &str = "https://www.reddit.com/api/v1/access_token";
const OAUTH_HOST: &str = "https://oauth.reddit.com";
const SITE_HOST: &str = "https://www.reddit.com";

/// Reddit implementation of `ContentApi`.
pub struct RedditClient {
    listing: Client,
    oauth: Client,
    token: String,
}

impl RedditClient {
    /// Builds the client and acquires an access token.
    pub fn new(platform: &PlatformConfig, auth: &AuthConfig) -> Result<Self, ApiError> {
        let client_id = require_env(&auth.client_id_env)?;
        let client_secret = require_env(&auth.client_secret_env)?;
        let password = require_env(&auth.password_env)?;

        let listing = Client::builder()
            .user_agent(platform.user_agent.clone())
            .redirect(Policy::none())
            .build()
            .map_err(|e| ApiError::Http(e.to_string()))?;
        let oauth = Client::builder()
            .user_agent(platform.user_agent.clone())
            .build()
            .map_err(|e| ApiError::Http(e.to_string()))?;

        let response = oauth
            .post(TOKEN_URL)
            .basic_auth(&client_id, Some(&client_secret))
            .form(&[
                ("grant_type", "password"),
                ("username", platform.username.as_str()),
                ("password", password.as_str()),
            ])
            .send()
            .map_err(|e| ApiError::Http(e.to_string()))?;
        let body: Value = response.json().map_err(|e| ApiError::Auth(e.to_string()))?;
        let token = body["access_token"]
            .as_str()
            .ok_or_else(|| ApiError::Auth(format!("no access_token in response: {}", body)))?
            .to_string();

        log::info!("Authenticated to Reddit as {}", platform.username);

        Ok(Self {
            listing,
            oauth,
            token,
        })
    }

    fn get_listing(&self, url: &str) -> Result<Value, ApiError> {
        let fetch_url = format!("{}.json", url.trim_end_matches('/'));
        let response = self
            .listing
            .get(&fetch_url)
            .query(&[("raw_json", "1")])
            .send()
            .map_err(|e| ApiError::Http(e.to_string()))?;
        if response.status().is_redirection() {
            return Err(ApiError::Redirect(url.to_string()));
        }
        if !response.status().is_success() {
            return Err(ApiError::Http(format!(
                "status {} for {}",
                response.status(),
                fetch_url
            )));
        }
        response.json().map_err(|e| ApiError::Malformed(e.to_string()))
    }

    fn post_api(&self, endpoint: &str, form: &[(&str, &str)]) -> Result<Value, ApiError> {
        let response = self
            .oauth
            .post(format!("{}{}", OAUTH_HOST, endpoint))
            .bearer_auth(&self.token)
            .form(form)
            .send()
            .map_err(|e| ApiError::Http(e.to_string()))?;
        let body: Value = response
            .json()
            .map_err(|e| ApiError::Malformed(e.to_string()))?;
        let errors = &body["json"]["errors"];
        match errors.as_array() {
            Some(list) if !list.is_empty() => Err(ApiError::Rejected(errors.to_string())),
            _ => Ok(body),
        }
    }
}

impl ContentApi for RedditClient {
    fn fetch_document(&self, url: &str) -> Result<(DocumentNode, Vec<ReplyNode>), ApiError> {
        let listing = self.get_listing(url)?;
        parse_document_listing(&listing)
    }

    fn fetch_reply_subtree(&self, document_id: &str) -> Result<Vec<ReplyNode>, ApiError> {
        let response = self
            .oauth
            .get(format!("{}/comments/{}", OAUTH_HOST, document_id))
            .bearer_auth(&self.token)
            .query(&[("limit", "500"), ("raw_json", "1"), ("depth", "100")])
            .send()
            .map_err(|e| ApiError::Http(e.to_string()))?;
        let listing: Value = response
            .json()
            .map_err(|e| ApiError::Malformed(e.to_string()))?;
        let (_, replies) = parse_document_listing(&listing)?;
        Ok(replies)
    }

    fn post_reply(&self, parent: &Node, text: &str) -> Result<ReplyRef, ApiError> {
        let fullname = parent.fullname();
        let body = self.post_api(
            "/api/comment",
            &[
                ("api_type", "json"),
                ("thing_id", fullname.as_str()),
                ("text", text),
            ],
        )?;
        let thing = &body["json"]["data"]["things"][0]["data"];
        let id = thing["id"]
            .as_str()
            .ok_or_else(|| ApiError::Malformed("comment response missing id".to_string()))?;
        let permalink = thing["permalink"]
            .as_str()
            .ok_or_else(|| ApiError::Malformed("comment response missing permalink".to_string()))?;
        Ok(ReplyRef {
            id: super::node::strip_type_prefix(id).to_string(),
            permalink: absolutize(permalink),
        })
    }

    fn edit_reply(&self, reply: &ReplyRef, text: &str) -> Result<(), ApiError> {
        let thing_id = format!("t1_{}", reply.id);
        self.post_api(
            "/api/editusertext",
            &[
                ("api_type", "json"),
                ("thing_id", thing_id.as_str()),
                ("text", text),
            ],
        )?;
        Ok(())
    }
}

fn require_env(name: &str) -> Result<String, ApiError> {
    std::env::var(name)
        .map_err(|_| ApiError::Auth(format!("environment variable '{}' is not set", name)))
}

fn absolutize(permalink: &str) -> String {
    if permalink.starts_with('/') {
        format!("{}{}", SITE_HOST, permalink)
    } else {
        permalink.to_string()
    }
}

/// Parses the two-listing response of a document fetch: the document itself
/// followed by its reply tree, flattened depth-first.
fn parse_document_listing(listing: &Value) -> Result<(DocumentNode, Vec<ReplyNode>), ApiError> {
    let doc_data = listing[0]["data"]["children"][0]["data"]
        .as_object()
        .ok_or_else(|| ApiError::Malformed("missing document in listing".to_string()))?;
    let doc = parse_document(doc_data)?;

    let mut replies = Vec::new();
    if let Some(children) = listing[1]["data"]["children"].as_array() {
        for child in children {
            flatten_reply_tree(child, &doc.id, &mut replies);
        }
    }
    Ok((doc, replies))
}

fn parse_document(data: &serde_json::Map<String, Value>) -> Result<DocumentNode, ApiError> {
    let id = str_field(data, "id")?;
    let permalink = str_field(data, "permalink")?;
    let is_self = data.get("is_self").and_then(Value::as_bool).unwrap_or(false);
    Ok(DocumentNode {
        id,
        title: str_field(data, "title")?,
        author: author_opt(data.get("author")),
        selftext: body_opt(data.get("selftext")),
        is_self,
        url: data
            .get("url")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        permalink: absolutize(&permalink),
        created: epoch_field(data.get("created_utc")),
        edited: edited_opt(data.get("edited")),
    })
}

fn flatten_reply_tree(child: &Value, document_id: &str, out: &mut Vec<ReplyNode>) {
    // "more" stubs carry no content; the deep refetch handles them.
    if child["kind"].as_str() != Some("t1") {
        return;
    }
    let Some(data) = child["data"].as_object() else {
        return;
    };
    let (Ok(id), Ok(permalink), Ok(parent_id)) = (
        str_field(data, "id"),
        str_field(data, "permalink"),
        str_field(data, "parent_id"),
    ) else {
        log::warn!("Skipping reply with missing fields in listing");
        return;
    };
    out.push(ReplyNode {
        id,
        author: author_opt(data.get("author")),
        body: body_opt(data.get("body")),
        parent_id,
        document_id: document_id.to_string(),
        permalink: absolutize(&permalink),
        created: epoch_field(data.get("created_utc")),
        edited: edited_opt(data.get("edited")),
    });
    if let Some(nested) = data
        .get("replies")
        .and_then(|r| r["data"]["children"].as_array())
    {
        for nested_child in nested {
            flatten_reply_tree(nested_child, document_id, out);
        }
    }
}

fn str_field(data: &serde_json::Map<String, Value>, key: &str) -> Result<String, ApiError> {
    data.get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| ApiError::Malformed(format!("missing field '{}'", key)))
}

fn author_opt(value: Option<&Value>) -> Option<String> {
    match value.and_then(Value::as_str) {
        None | Some("[deleted]") => None,
        Some(name) => Some(name.to_string()),
    }
}

fn body_opt(value: Option<&Value>) -> Option<String> {
    match value.and_then(Value::as_str) {
        None | Some("[deleted]") | Some("[removed]") => None,
        Some(text) => Some(text.to_string()),
    }
}

fn epoch_field(value: Option<&Value>) -> i64 {
    value.and_then(Value::as_f64).unwrap_or(0.0) as i64
}

/// Reddit reports `edited` as `false` or an epoch float.
fn edited_opt(value: Option<&Value>) -> Option<i64> {
    value.and_then(Value::as_f64).map(|ts| ts as i64)
}
