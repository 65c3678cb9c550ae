use crate::cache::CacheEntry;
use crate::config::ReplacementPolicyConfig;

/// A generic trait for implementing new replacement policies. Used by a CacheLevel to decide which
/// entry to give up when it is full.
///
/// Recency and frequency are tracked on the entries themselves (a logical tick and an access
/// count), so policies are stateless and only need to compare entries
pub trait ReplacementPolicy {
    /// Picks the index of the entry to evict. Only called with a non-empty, full set of entries
    ///
    /// Implementations must be deterministic for a given set of entries, simulations have to be
    /// reproducible from their seed
    ///
    /// # Arguments
    ///
    /// * `entries`: Every entry currently held by the level
    ///
    /// returns: usize
    fn select_victim<V>(&self, entries: &[CacheEntry<V>]) -> usize;
}

/// Least Recently Used replacement policy
///
/// Last access ticks come from a strictly increasing logical clock owned by the level, so two
/// entries never share a tick and there is nothing to break ties on
#[derive(Debug, Default, Clone, Copy)]
pub struct LeastRecentlyUsed;

impl ReplacementPolicy for LeastRecentlyUsed {
    fn select_victim<V>(&self, entries: &[CacheEntry<V>]) -> usize {
        entries
            .iter()
            .enumerate()
            .min_by_key(|(_, entry)| entry.last_access)
            .map_or(0, |(index, _)| index)
    }
}

/// Least frequently used replacement policy, falling back to recency between equally used entries
#[derive(Debug, Default, Clone, Copy)]
pub struct LeastFrequentlyUsed;

impl ReplacementPolicy for LeastFrequentlyUsed {
    fn select_victim<V>(&self, entries: &[CacheEntry<V>]) -> usize {
        entries
            .iter()
            .enumerate()
            .min_by_key(|(_, entry)| (entry.access_count, entry.last_access))
            .map_or(0, |(index, _)| index)
    }
}

/// Enum over the provided policies, so a level can be configured at runtime without boxing
#[derive(Debug, Clone, Copy)]
pub enum GenericPolicy {
    LeastRecentlyUsed(LeastRecentlyUsed),
    LeastFrequentlyUsed(LeastFrequentlyUsed),
}

impl Default for GenericPolicy {
    fn default() -> Self {
        Self::LeastRecentlyUsed(LeastRecentlyUsed)
    }
}

impl From<LeastRecentlyUsed> for GenericPolicy {
    fn from(value: LeastRecentlyUsed) -> Self {
        Self::LeastRecentlyUsed(value)
    }
}

impl From<LeastFrequentlyUsed> for GenericPolicy {
    fn from(value: LeastFrequentlyUsed) -> Self {
        Self::LeastFrequentlyUsed(value)
    }
}

impl From<ReplacementPolicyConfig> for GenericPolicy {
    fn from(value: ReplacementPolicyConfig) -> Self {
        match value {
            ReplacementPolicyConfig::LeastRecentlyUsed => LeastRecentlyUsed.into(),
            ReplacementPolicyConfig::LeastFrequentlyUsed => LeastFrequentlyUsed.into(),
        }
    }
}

impl ReplacementPolicy for GenericPolicy {
    fn select_victim<V>(&self, entries: &[CacheEntry<V>]) -> usize {
        match self {
            GenericPolicy::LeastRecentlyUsed(p) => p.select_victim(entries),
            GenericPolicy::LeastFrequentlyUsed(p) => p.select_victim(entries),
        }
    }
}
