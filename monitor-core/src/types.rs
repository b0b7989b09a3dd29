use chrono::{DateTime, Local, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// Marker appended to text that was cut short.
pub const ELLIPSIS: &str = "...";

/// A forum community to poll, e.g. `dementia` for r/dementia.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Channel(String);

impl Channel {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Channel {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// One post as returned by the channel fetcher.
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    /// Unique within the source system only.
    pub id: String,
    pub title: String,
    /// `None` for deleted or anonymous authors.
    pub author: Option<String>,
    pub body: String,
    pub created_utc: DateTime<Utc>,
    /// Site-relative path, e.g. `/r/dementia/comments/abc123/title/`.
    pub permalink: String,
}

impl Item {
    pub fn absolute_url(&self, base: &Url) -> String {
        match base.join(&self.permalink) {
            Ok(url) => url.to_string(),
            Err(_) => format!(
                "{}{}",
                base.as_str().trim_end_matches('/'),
                self.permalink
            ),
        }
    }
}

/// Notification payload for one matched item. Built, dispatched, dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub channel: String,
    pub title: String,
    pub author: String,
    pub url: String,
    pub created: String,
    pub excerpt: String,
}

impl Alert {
    pub const EXCERPT_CHARS: usize = 500;
    const CREATED_FORMAT: &'static str = "%Y-%m-%d %H:%M:%S";

    pub fn from_item(channel: &Channel, item: &Item, permalink_base: &Url) -> Self {
        Self::with_excerpt_len(channel, item, permalink_base, Self::EXCERPT_CHARS)
    }

    pub fn with_excerpt_len(
        channel: &Channel,
        item: &Item,
        permalink_base: &Url,
        excerpt_chars: usize,
    ) -> Self {
        Self {
            channel: channel.name().to_string(),
            title: item.title.clone(),
            author: item
                .author
                .clone()
                .unwrap_or_else(|| "[deleted]".to_string()),
            url: item.absolute_url(permalink_base),
            created: format_created(&item.created_utc, &Local),
            excerpt: excerpt(&item.body, excerpt_chars),
        }
    }
}

fn format_created<Tz: TimeZone>(created: &DateTime<Utc>, tz: &Tz) -> String
where
    Tz::Offset: fmt::Display,
{
    created
        .with_timezone(tz)
        .format(Alert::CREATED_FORMAT)
        .to_string()
}

/// First `max_chars` characters of `text`, with [`ELLIPSIS`] appended when cut.
pub fn excerpt(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}{}", &text[..cut], ELLIPSIS),
        None => text.to_string(),
    }
}

/// First `max_chars` characters of `text`, never decorated.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => &text[..cut],
        None => text,
    }
}
