/*!
 * Tier Budget
 *
 * Staging allocations are charged against two tiers in priority order:
 * shared memory first, then local memory when it has a non-zero budget.
 * The tier plan is decided once, when the budget is discovered.
 */

use super::traits::MemoryBudgetProvider;
use super::types::{MemoryTier, TierCapacity};
use crate::core::types::{Size, TierId};
use tracing::info;

/// Which tiers an allocation may be charged to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TierPlan {
    SharedOnly,
    SharedThenLocal,
}

/// Usage accounting for both tiers
#[derive(Debug, Clone)]
pub struct TierBudget {
    shared: MemoryTier,
    local: MemoryTier,
    plan: TierPlan,
}

impl TierBudget {
    /// Derive tier capacities from the platform's memory sizes
    ///
    /// A zero shared budget means no limit. A zero local budget disables the
    /// local tier.
    pub fn discover(
        provider: &dyn MemoryBudgetProvider,
        max_percent_shared: u32,
        max_percent_local: u32,
    ) -> Self {
        let shared_cap = percent_of(
            provider.total_tier_capacity(TierId::Shared),
            max_percent_shared,
        );
        let local_cap = percent_of(
            provider.total_tier_capacity(TierId::Local),
            max_percent_local,
        );

        let budget = Self::with_capacities(shared_cap, local_cap);
        info!(
            shared = ?budget.shared.capacity,
            local = ?budget.local.capacity,
            plan = ?budget.plan,
            "Staging budget discovered"
        );
        budget
    }

    /// Budget from explicit byte capacities, same zero rules as `discover`
    pub fn with_capacities(shared: Size, local: Size) -> Self {
        let shared_capacity = if shared == 0 {
            TierCapacity::Unbounded
        } else {
            TierCapacity::Bounded(shared)
        };
        let plan = if local > 0 {
            TierPlan::SharedThenLocal
        } else {
            TierPlan::SharedOnly
        };

        Self {
            shared: MemoryTier::new(TierId::Shared, shared_capacity),
            local: MemoryTier::new(TierId::Local, TierCapacity::Bounded(local)),
            plan,
        }
    }

    #[inline]
    pub fn plan(&self) -> TierPlan {
        self.plan
    }

    pub fn tier(&self, id: TierId) -> &MemoryTier {
        match id {
            TierId::Shared => &self.shared,
            TierId::Local => &self.local,
        }
    }

    fn tier_mut(&mut self, id: TierId) -> &mut MemoryTier {
        match id {
            TierId::Shared => &mut self.shared,
            TierId::Local => &mut self.local,
        }
    }

    /// Charge `size` bytes to the first tier with room
    pub fn reserve(&mut self, size: Size) -> Option<TierId> {
        let tier = if self.shared.has_room(size) {
            TierId::Shared
        } else if self.plan == TierPlan::SharedThenLocal && self.local.has_room(size) {
            TierId::Local
        } else {
            return None;
        };

        self.tier_mut(tier).used += size;
        Some(tier)
    }

    /// Undo a charge made by `reserve`
    pub fn refund(&mut self, tier: TierId, size: Size) {
        let t = self.tier_mut(tier);
        t.used = t.used.saturating_sub(size);
    }

    pub fn snapshot(&self) -> Vec<MemoryTier> {
        vec![self.shared, self.local]
    }
}

#[inline]
fn percent_of(total: Size, percent: u32) -> Size {
    total / 100 * percent as Size
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    struct Fixed(Size, Size);

    impl MemoryBudgetProvider for Fixed {
        fn total_tier_capacity(&self, tier: TierId) -> Size {
            match tier {
                TierId::Shared => self.0,
                TierId::Local => self.1,
            }
        }
    }

    #[test]
    fn test_discover_percentages() {
        let budget = TierBudget::discover(&Fixed(1000, 2000), 75, 10);
        assert_eq!(budget.tier(TierId::Shared).capacity, TierCapacity::Bounded(750));
        assert_eq!(budget.tier(TierId::Local).capacity, TierCapacity::Bounded(200));
        assert_eq!(budget.plan(), TierPlan::SharedThenLocal);
    }

    #[test]
    fn test_zero_shared_is_unbounded() {
        let budget = TierBudget::discover(&Fixed(0, 0), 75, 0);
        assert_eq!(budget.tier(TierId::Shared).capacity, TierCapacity::Unbounded);
        assert_eq!(budget.plan(), TierPlan::SharedOnly);
    }

    #[test]
    fn test_reserve_falls_back_to_local() {
        let mut budget = TierBudget::with_capacities(100, 50);
        assert_eq!(budget.reserve(80), Some(TierId::Shared));
        assert_eq!(budget.reserve(40), Some(TierId::Local));
        assert_eq!(budget.reserve(20), Some(TierId::Shared));
        assert_eq!(budget.reserve(20), None);

        budget.refund(TierId::Local, 40);
        assert_eq!(budget.tier(TierId::Local).used, 0);
    }

    #[test]
    fn test_local_disabled_without_budget() {
        let mut budget = TierBudget::with_capacities(100, 0);
        assert_eq!(budget.reserve(100), Some(TierId::Shared));
        assert_eq!(budget.reserve(1), None);
    }

    proptest! {
        #[test]
        fn prop_usage_never_exceeds_capacity(
            shared in 1usize..10_000,
            local in 0usize..10_000,
            sizes in proptest::collection::vec(1usize..2_000, 0..64),
        ) {
            let mut budget = TierBudget::with_capacities(shared, local);
            let mut charged = 0usize;

            for size in sizes {
                if budget.reserve(size).is_some() {
                    charged += size;
                }
                prop_assert!(budget.tier(TierId::Shared).used <= shared);
                prop_assert!(budget.tier(TierId::Local).used <= local);
            }

            let used: usize = budget.snapshot().iter().map(|t| t.used).sum();
            prop_assert_eq!(used, charged);
        }
    }
}
