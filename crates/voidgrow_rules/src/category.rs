//! Category (biome) registry: known categories and their tags.

use std::collections::{BTreeMap, BTreeSet};

use voidgrow_core::rng::mix64;
use voidgrow_core::CategoryId;

/// Every category the engine may copy from, with its tag memberships.
///
/// The `identity` fingerprint changes whenever the contents change, which
/// is what resolver caches are keyed on.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CategoryRegistry {
    categories: BTreeMap<CategoryId, BTreeSet<String>>,
    identity: u64,
}

impl CategoryRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a category (or adds tags to an existing one).
    pub fn register<I, S>(&mut self, id: impl Into<CategoryId>, tags: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let entry = self.categories.entry(id.into()).or_default();
        entry.extend(tags.into_iter().map(Into::into));
        self.identity = self.fingerprint();
        self
    }

    /// Returns true if the category is registered.
    #[must_use]
    pub fn contains(&self, id: &CategoryId) -> bool {
        self.categories.contains_key(id)
    }

    /// Returns true if the category carries `tag`.
    #[must_use]
    pub fn has_tag(&self, id: &CategoryId, tag: &str) -> bool {
        self.categories.get(id).is_some_and(|tags| tags.contains(tag))
    }

    /// Iterates category ids in sorted order.
    pub fn ids(&self) -> impl Iterator<Item = &CategoryId> {
        self.categories.keys()
    }

    /// Number of registered categories.
    #[must_use]
    pub fn len(&self) -> usize {
        self.categories.len()
    }

    /// Returns true if no category is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Content fingerprint used as a cache key.
    #[must_use]
    pub fn identity(&self) -> u64 {
        self.identity
    }

    fn fingerprint(&self) -> u64 {
        let mut hash = 0xCBF2_9CE4_8422_2325_u64;
        let mut feed = |s: &str| {
            for b in s.bytes() {
                hash = (hash ^ u64::from(b)).wrapping_mul(0x0100_0000_01B3);
            }
            hash = mix64(hash);
        };
        for (id, tags) in &self.categories {
            feed(id.as_str());
            for tag in tags {
                feed(tag);
            }
            feed("\u{0}");
        }
        hash
    }
}
