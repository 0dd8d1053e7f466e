//! Purge trigger service.
//!
//! Turns content events into dispatcher calls: filters events that need no
//! purge, resolves the class policy into a target and coalesces navigation
//! changes into a single purge per unit of work.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::debug;

use crate::domain::ContentItem;

use super::dispatcher::PurgeDispatcher;
use super::events::ContentEvent;
use super::outcome::PurgeOutcome;
use super::policy::{PolicySet, PurgeResolver};

/// Trigger adapter shared by hooks, admin actions and background jobs.
///
/// # Usage
///
/// ```ignore
/// trigger.handle(ContentEvent::NavigationChanged).await;
/// trigger.handle(ContentEvent::NavigationChanged).await;
/// // one purge_all for both changes
/// let outcome = trigger.finish().await;
/// ```
pub struct PurgeTrigger {
    dispatcher: Arc<PurgeDispatcher>,
    resolver: PurgeResolver,
    policies: PolicySet,
    navigation_dirty: AtomicBool,
}

impl PurgeTrigger {
    pub fn new(dispatcher: Arc<PurgeDispatcher>, resolver: PurgeResolver, policies: PolicySet) -> Self {
        Self {
            dispatcher,
            resolver,
            policies,
            navigation_dirty: AtomicBool::new(false),
        }
    }

    /// Handle one event; `None` when the event requires no purge (yet).
    pub async fn handle(&self, event: ContentEvent) -> Option<PurgeOutcome> {
        match event {
            ContentEvent::Saved { item, update } => self.content_saved(&item, update).await,
            ContentEvent::Trashed(item) => self.content_trashed(&item).await,
            ContentEvent::Untrashed(item) => self.content_untrashed(&item).await,
            ContentEvent::SlugChanged {
                item,
                previous_slug,
                new_slug,
            } => self.slug_changed(&item, &previous_slug, &new_slug).await,
            ContentEvent::NavigationChanged => {
                self.navigation_changed();
                None
            }
        }
    }

    /// Only updates of published items purge; new, draft and scheduled items do not.
    pub async fn content_saved(&self, item: &ContentItem, update: bool) -> Option<PurgeOutcome> {
        if !update {
            debug!(kind = %item.kind, "Purge skipped: new item");
            return None;
        }
        if !item.is_published() {
            debug!(kind = %item.kind, status = ?item.status, "Purge skipped: item not published");
            return None;
        }
        self.purge_item(item).await
    }

    pub async fn content_trashed(&self, item: &ContentItem) -> Option<PurgeOutcome> {
        self.purge_item(item).await
    }

    pub async fn content_untrashed(&self, item: &ContentItem) -> Option<PurgeOutcome> {
        self.purge_item(item).await
    }

    /// Purge the old URL of a published item whose slug actually changes.
    pub async fn slug_changed(
        &self,
        item: &ContentItem,
        previous_slug: &str,
        new_slug: &str,
    ) -> Option<PurgeOutcome> {
        if !item.is_published() || previous_slug == new_slug {
            debug!(kind = %item.kind, "Purge skipped: slug unchanged or item not published");
            return None;
        }
        self.purge_item(item).await
    }

    /// Mark navigation as changed; the purge happens in [`PurgeTrigger::finish`].
    pub fn navigation_changed(&self) {
        self.navigation_dirty.store(true, Ordering::Release);
    }

    /// End of a unit of work: purge everything once if navigation changed.
    pub async fn finish(&self) -> Option<PurgeOutcome> {
        if !self.navigation_dirty.swap(false, Ordering::AcqRel) {
            return None;
        }
        debug!("Navigation changed, purging all content");
        Some(self.dispatcher.purge_all().await)
    }

    pub fn dispatcher(&self) -> &Arc<PurgeDispatcher> {
        &self.dispatcher
    }

    async fn purge_item(&self, item: &ContentItem) -> Option<PurgeOutcome> {
        if !item.is_purgeable() {
            debug!(kind = %item.kind, "Purge skipped: content type not purgeable");
            return None;
        }
        let target = self.resolver.resolve_with(item, &self.policies);
        debug!(kind = %item.kind, class = item.class.as_str(), target = %target, "Purge target resolved");
        Some(self.dispatcher.purge_target(target).await)
    }
}
