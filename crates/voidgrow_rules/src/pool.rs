//! Weighted category pool for one tier.

use voidgrow_core::CategoryId;

/// Ordered `(category, weight)` table.
///
/// Selection is a stable cumulative walk: the same roll always yields the
/// same category for a fixed pool.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WeightedPool {
    entries: Vec<(CategoryId, u32)>,
    total_weight: u64,
}

impl WeightedPool {
    /// Builds a pool. Zero weights are raised to 1.
    #[must_use]
    pub fn new(entries: Vec<(CategoryId, u32)>) -> Self {
        let entries: Vec<(CategoryId, u32)> =
            entries.into_iter().map(|(c, w)| (c, w.max(1))).collect();
        let total_weight = entries.iter().map(|(_, w)| u64::from(*w)).sum();
        Self {
            entries,
            total_weight,
        }
    }

    /// Sum of all weights.
    #[inline]
    #[must_use]
    pub fn total_weight(&self) -> u64 {
        self.total_weight
    }

    /// Entries in selection order.
    #[must_use]
    pub fn entries(&self) -> &[(CategoryId, u32)] {
        &self.entries
    }

    /// Returns true if the tier has no categories.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Picks the entry at `roll mod total_weight`.
    ///
    /// Returns `None` only for an empty pool.
    #[must_use]
    pub fn select(&self, roll: u32) -> Option<&CategoryId> {
        if self.total_weight == 0 {
            return None;
        }
        let r = u64::from(roll) % self.total_weight;
        let mut cumulative = 0u64;
        for (category, weight) in &self.entries {
            cumulative += u64::from(*weight);
            if cumulative > r {
                return Some(category);
            }
        }
        None
    }

    /// Total weight clamped to `u32`, suitable as an RNG bound.
    #[must_use]
    pub fn roll_bound(&self) -> u32 {
        u32::try_from(self.total_weight).unwrap_or(u32::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool(weights: &[u32]) -> WeightedPool {
        WeightedPool::new(
            weights
                .iter()
                .enumerate()
                .map(|(i, w)| (CategoryId::new(format!("c{i}")), *w))
                .collect(),
        )
    }

    #[test]
    fn test_select_exact_boundaries() {
        let p = pool(&[1, 3, 6]);
        assert_eq!(p.total_weight(), 10);
        let picks: Vec<&str> = (0..10).map(|r| p.select(r).unwrap().as_str()).collect();
        assert_eq!(
            picks,
            ["c0", "c1", "c1", "c1", "c2", "c2", "c2", "c2", "c2", "c2"]
        );
    }

    #[test]
    fn test_select_wraps_roll() {
        let p = pool(&[1, 3, 6]);
        assert_eq!(p.select(10), p.select(0));
        assert_eq!(p.select(23), p.select(3));
    }

    #[test]
    fn test_empty_pool() {
        let p = pool(&[]);
        assert!(p.is_empty());
        assert_eq!(p.select(0), None);
        assert_eq!(p.roll_bound(), 0);
    }

    #[test]
    fn test_zero_weight_floored() {
        let p = pool(&[0, 0]);
        assert_eq!(p.total_weight(), 2);
        assert_eq!(p.select(1).unwrap().as_str(), "c1");
    }
}
