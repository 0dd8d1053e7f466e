//! Content-change events delivered by external triggers.

use std::fmt;

use crate::domain::ContentItem;

/// Something happened to site content that may require a purge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentEvent {
    /// An item was saved. `update` is false for newly created items.
    Saved { item: ContentItem, update: bool },
    Trashed(ContentItem),
    Untrashed(ContentItem),
    /// The slug is about to change; `item.permalink` still carries the old URL.
    SlugChanged {
        item: ContentItem,
        previous_slug: String,
        new_slug: String,
    },
    /// A navigation menu changed; may fire many times per unit of work.
    NavigationChanged,
}

impl ContentEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            ContentEvent::Saved { .. } => "saved",
            ContentEvent::Trashed(_) => "trashed",
            ContentEvent::Untrashed(_) => "untrashed",
            ContentEvent::SlugChanged { .. } => "slug_changed",
            ContentEvent::NavigationChanged => "navigation_changed",
        }
    }
}

impl fmt::Display for ContentEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentEvent::Saved { item, .. }
            | ContentEvent::Trashed(item)
            | ContentEvent::Untrashed(item)
            | ContentEvent::SlugChanged { item, .. } => {
                write!(f, "{}({} {})", self.kind(), item.kind, item.permalink)
            }
            ContentEvent::NavigationChanged => f.write_str(self.kind()),
        }
    }
}
