use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

// ============================================================================
// Identity
// ============================================================================

/// Opaque post identity as issued by the server.
///
/// The list endpoint returns a string id while the create endpoint returns
/// the numeric row id, so both JSON shapes are accepted and normalized to text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "RawId", into = "String")]
pub struct PostId(String);

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Number(i64),
}

impl From<RawId> for PostId {
    fn from(raw: RawId) -> Self {
        match raw {
            RawId::Text(s) => PostId(s),
            RawId::Number(n) => PostId(n.to_string()),
        }
    }
}

impl From<PostId> for String {
    fn from(id: PostId) -> Self {
        id.0
    }
}

impl From<&str> for PostId {
    fn from(s: &str) -> Self {
        PostId(s.to_string())
    }
}

impl PostId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque pagination token. Never inspected by the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cursor(String);

impl Cursor {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// ============================================================================
// Post
// ============================================================================

/// A published post. Read-only on the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: PostId,
    pub image_url: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<String>,
    /// RFC 3339 timestamp as sent by the server.
    #[serde(default, deserialize_with = "null_as_default")]
    pub created_at: String,
}

impl Post {
    /// Parsed creation time, or `None` if the server sent something unparseable.
    pub fn created_at_utc(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.created_at)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// ============================================================================
// Feed Pages
// ============================================================================

/// Query for one page of the feed.
///
/// A query without a cursor asks for the first page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageQuery {
    pub tag: Option<String>,
    pub cursor: Option<Cursor>,
    pub limit: u32,
}

impl PageQuery {
    /// Query string pairs in the order the server documents them.
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![("limit", self.limit.to_string())];
        if let Some(tag) = &self.tag {
            pairs.push(("tag", tag.clone()));
        }
        if let Some(cursor) = &self.cursor {
            pairs.push(("cursor", cursor.as_str().to_string()));
        }
        pairs
    }
}

/// Normalize a raw search term: trimmed, and `None` when blank.
pub fn normalize_term(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// One page of posts from the list endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct FeedPage {
    #[serde(default, deserialize_with = "null_as_default")]
    pub items: Vec<Post>,
    #[serde(default)]
    pub next_cursor: Option<Cursor>,
    #[serde(default)]
    pub has_more: bool,
}

// ============================================================================
// Write Side
// ============================================================================

/// Body of the create-post request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewPost {
    pub image_url: String,
    pub title: String,
    pub tags: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UploadResponse {
    pub image_url: String,
}

/// Error body carried by every non-2xx response.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    pub error: String,
}
