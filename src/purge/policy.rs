//! Purge setting resolver.
//!
//! Decides which relative paths a content change invalidates, based on the
//! toggles configured for the item's content class.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::domain::content::{ContentClass, ContentItem, relative_to_home};

/// Relative path of the site home.
pub const HOME_PATH: &str = "/";

/// Independent purge toggles for one content class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PurgePolicy {
    /// Purge the changed item's own URL.
    pub changed_url: bool,
    pub home: bool,
    /// Purge the item's category and tag archive pages.
    pub site_taxonomy: bool,
    /// Purge the commerce extension's category pages.
    pub commerce_taxonomy: bool,
    /// Purge everything on every host.
    pub everything: bool,
}

impl Default for PurgePolicy {
    fn default() -> Self {
        Self {
            changed_url: true,
            home: false,
            site_taxonomy: false,
            commerce_taxonomy: false,
            everything: false,
        }
    }
}

impl PurgePolicy {
    fn enabled_toggles(&self) -> usize {
        [
            self.changed_url,
            self.home,
            self.site_taxonomy,
            self.commerce_taxonomy,
            self.everything,
        ]
        .into_iter()
        .filter(|enabled| *enabled)
        .count()
    }
}

/// Policies for built-in and custom content types.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicySet {
    pub builtin: PurgePolicy,
    pub custom: PurgePolicy,
}

impl PolicySet {
    pub fn for_class(&self, class: ContentClass) -> &PurgePolicy {
        match class {
            ContentClass::Builtin => &self.builtin,
            ContentClass::Custom => &self.custom,
        }
    }
}

/// What a content change invalidates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PurgeTarget {
    AllContent,
    SingleUrl(String),
    /// Ordered, duplicate-free relative paths; may be empty.
    MultipleUrls(Vec<String>),
}

impl fmt::Display for PurgeTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PurgeTarget::AllContent => f.write_str("all"),
            PurgeTarget::SingleUrl(path) => write!(f, "single({path})"),
            PurgeTarget::MultipleUrls(paths) => write!(f, "multiple({})", paths.join(", ")),
        }
    }
}

/// Source of commerce category pages for an item.
///
/// Sites without a commerce extension use [`NoCommerce`], which contributes nothing.
pub trait CommerceTaxonomy: Send + Sync {
    fn term_links(&self, item: &ContentItem) -> Vec<String>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoCommerce;

impl CommerceTaxonomy for NoCommerce {
    fn term_links(&self, _item: &ContentItem) -> Vec<String> {
        Vec::new()
    }
}

/// Reads the commerce term links carried on the item itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct AssignedCommerceTerms;

impl CommerceTaxonomy for AssignedCommerceTerms {
    fn term_links(&self, item: &ContentItem) -> Vec<String> {
        item.commerce_term_links.clone()
    }
}

/// Turns a content item and its class policy into a [`PurgeTarget`].
#[derive(Clone)]
pub struct PurgeResolver {
    home_url: String,
    commerce: Arc<dyn CommerceTaxonomy>,
}

impl fmt::Debug for PurgeResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PurgeResolver")
            .field("home_url", &self.home_url)
            .finish_non_exhaustive()
    }
}

impl PurgeResolver {
    pub fn new(home_url: impl Into<String>) -> Self {
        Self::with_commerce(home_url, Arc::new(NoCommerce))
    }

    pub fn with_commerce(home_url: impl Into<String>, commerce: Arc<dyn CommerceTaxonomy>) -> Self {
        Self {
            home_url: home_url.into(),
            commerce,
        }
    }

    /// Apply the toggle precedence.
    ///
    /// `everything` alone purges all content and `changed_url` alone purges one
    /// path. Every other combination, including none, yields the union of the
    /// enabled toggles' paths in the order changed URL, home, site taxonomy,
    /// commerce taxonomy. `everything` contributes no path of its own there.
    pub fn resolve(&self, item: &ContentItem, policy: &PurgePolicy) -> PurgeTarget {
        let changed_path = item.relative_path(&self.home_url);
        let enabled = policy.enabled_toggles();

        if policy.everything && enabled == 1 {
            return PurgeTarget::AllContent;
        }
        if policy.changed_url && enabled == 1 {
            return PurgeTarget::SingleUrl(changed_path);
        }

        let mut paths = Vec::new();
        if policy.changed_url {
            paths.push(changed_path);
        }
        if policy.home {
            paths.push(HOME_PATH.to_string());
        }
        if policy.site_taxonomy {
            paths.extend(
                item.term_links
                    .iter()
                    .map(|link| relative_to_home(link, &self.home_url)),
            );
        }
        if policy.commerce_taxonomy {
            paths.extend(
                self.commerce
                    .term_links(item)
                    .iter()
                    .map(|link| relative_to_home(link, &self.home_url)),
            );
        }

        let mut unique: Vec<String> = Vec::with_capacity(paths.len());
        for path in paths {
            if !unique.contains(&path) {
                unique.push(path);
            }
        }
        PurgeTarget::MultipleUrls(unique)
    }

    /// Resolve using the policy that governs the item's class.
    pub fn resolve_with(&self, item: &ContentItem, policies: &PolicySet) -> PurgeTarget {
        self.resolve(item, policies.for_class(item.class))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOME: &str = "https://example.com";

    fn item() -> ContentItem {
        ContentItem::new("post", ContentClass::Builtin, "https://example.com/blog/post-1")
            .with_term_links(["https://example.com/category/news/", "https://example.com/tag/rust/"])
            .with_commerce_term_links(["https://example.com/product-category/shoes/"])
    }

    fn policy(changed_url: bool, home: bool, site: bool, commerce: bool, everything: bool) -> PurgePolicy {
        PurgePolicy {
            changed_url,
            home,
            site_taxonomy: site,
            commerce_taxonomy: commerce,
            everything,
        }
    }

    #[test]
    fn everything_alone_purges_all_content() {
        let resolver = PurgeResolver::new(HOME);
        let target = resolver.resolve(&item(), &policy(false, false, false, false, true));
        assert_eq!(target, PurgeTarget::AllContent);
    }

    #[test]
    fn changed_url_alone_purges_single_path() {
        let resolver = PurgeResolver::new(HOME);
        let target = resolver.resolve(&item(), &PurgePolicy::default());
        assert_eq!(target, PurgeTarget::SingleUrl("/blog/post-1".to_string()));
    }

    #[test]
    fn combinations_union_in_fixed_order() {
        let resolver = PurgeResolver::with_commerce(HOME, Arc::new(AssignedCommerceTerms));
        let target = resolver.resolve(&item(), &policy(true, true, true, true, false));
        assert_eq!(
            target,
            PurgeTarget::MultipleUrls(vec![
                "/blog/post-1".to_string(),
                "/".to_string(),
                "/category/news/".to_string(),
                "/tag/rust/".to_string(),
                "/product-category/shoes/".to_string(),
            ])
        );
    }

    #[test]
    fn everything_combined_with_others_is_multiple() {
        let resolver = PurgeResolver::new(HOME);
        let target = resolver.resolve(&item(), &policy(false, true, false, false, true));
        assert_eq!(target, PurgeTarget::MultipleUrls(vec!["/".to_string()]));

        let target = resolver.resolve(&item(), &policy(true, false, false, false, true));
        assert_eq!(target, PurgeTarget::MultipleUrls(vec!["/blog/post-1".to_string()]));
    }

    #[test]
    fn no_toggles_yields_empty_multiple() {
        let resolver = PurgeResolver::new(HOME);
        let target = resolver.resolve(&item(), &policy(false, false, false, false, false));
        assert_eq!(target, PurgeTarget::MultipleUrls(Vec::new()));
    }

    #[test]
    fn missing_commerce_extension_contributes_nothing() {
        let resolver = PurgeResolver::new(HOME);
        let target = resolver.resolve(&item(), &policy(false, false, false, true, false));
        assert_eq!(target, PurgeTarget::MultipleUrls(Vec::new()));
    }

    #[test]
    fn item_without_terms_contributes_nothing() {
        let resolver = PurgeResolver::new(HOME);
        let bare = ContentItem::new("post", ContentClass::Builtin, "https://example.com/x");
        let target = resolver.resolve(&bare, &policy(false, true, true, false, false));
        assert_eq!(target, PurgeTarget::MultipleUrls(vec!["/".to_string()]));
    }

    #[test]
    fn policy_is_chosen_by_class() {
        let policies = PolicySet {
            builtin: PurgePolicy::default(),
            custom: policy(false, false, false, false, true),
        };
        let resolver = PurgeResolver::new(HOME);
        let custom = ContentItem::new("product", ContentClass::Custom, "https://example.com/p/1");

        assert_eq!(resolver.resolve_with(&custom, &policies), PurgeTarget::AllContent);
        assert!(matches!(
            resolver.resolve_with(&item(), &policies),
            PurgeTarget::SingleUrl(_)
        ));
    }
}
