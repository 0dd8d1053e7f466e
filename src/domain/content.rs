//! Content items whose changes trigger cache purges.

use serde::{Deserialize, Serialize};

/// Content type never purged: binary uploads have no cached page of their own.
pub const ATTACHMENT_KIND: &str = "attachment";

/// Which purge policy governs a content item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentClass {
    /// Content types shipped with the site itself (posts, pages).
    Builtin,
    /// Content types registered by extensions.
    Custom,
}

impl ContentClass {
    pub fn as_str(self) -> &'static str {
        match self {
            ContentClass::Builtin => "builtin",
            ContentClass::Custom => "custom",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentStatus {
    Draft,
    Scheduled,
    Published,
    Trashed,
}

/// A changed piece of content as delivered by an external trigger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentItem {
    /// Content type name (`post`, `page`, `product`, ...).
    pub kind: String,
    pub class: ContentClass,
    pub status: ContentStatus,
    /// Whether the content type is publicly reachable.
    pub public: bool,
    /// Permalink, either absolute or already relative to the site home.
    pub permalink: String,
    /// Links of the site taxonomy terms (categories, tags) assigned to the item.
    #[serde(default)]
    pub term_links: Vec<String>,
    /// Links of the commerce taxonomy terms assigned to the item.
    #[serde(default)]
    pub commerce_term_links: Vec<String>,
}

impl ContentItem {
    pub fn new(kind: impl Into<String>, class: ContentClass, permalink: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            class,
            status: ContentStatus::Published,
            public: true,
            permalink: permalink.into(),
            term_links: Vec::new(),
            commerce_term_links: Vec::new(),
        }
    }

    pub fn with_status(mut self, status: ContentStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_term_links<I, S>(mut self, links: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.term_links = links.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_commerce_term_links<I, S>(mut self, links: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.commerce_term_links = links.into_iter().map(Into::into).collect();
        self
    }

    /// Public content types are purged, attachments never are.
    pub fn is_purgeable(&self) -> bool {
        self.public && self.kind != ATTACHMENT_KIND
    }

    pub fn is_published(&self) -> bool {
        self.status == ContentStatus::Published
    }

    /// Permalink relative to `home_url`, always with a leading `/`.
    pub fn relative_path(&self, home_url: &str) -> String {
        relative_to_home(&self.permalink, home_url)
    }
}

/// Strip `home_url` from the front of `link` and make sure the result starts with `/`.
///
/// The home URL only matches on a path boundary, so `https://example.com.au/x`
/// is not under `https://example.com`.
pub fn relative_to_home(link: &str, home_url: &str) -> String {
    let home = home_url.trim_end_matches('/');
    let stripped = match link.strip_prefix(home) {
        Some(rest) if !home.is_empty() && (rest.is_empty() || rest.starts_with(['/', '?', '#'])) => {
            rest
        }
        _ => link,
    };

    if stripped.starts_with('/') {
        stripped.to_string()
    } else {
        format!("/{stripped}")
    }
}
