//! The session cache and its reconciliation rules.
//!
//! A `SessionCache` is the client-held ordered collection backing one
//! view. It is a cache of shared state, never the source of truth: it
//! holds whatever the last full list returned, patched by the
//! mutations this client issued, in issue order. Other clients'
//! mutations appear on the next full install.
//!
//! Staleness is tracked with a generation counter. Starting a new list
//! or invalidating the cache bumps the generation; any result or
//! mutation side effect stamped with an older generation is discarded
//! when it lands. That is how in-flight reads are "cancelled" — the
//! call itself may still complete, but its outcome never reaches the
//! view.

use emberwatch_common::{AlertZone, Comment, Incident, Subscription, WeatherSample};

/// Records that can be reconciled by id.
pub trait Keyed {
    fn record_id(&self) -> &str;
}

impl Keyed for Incident {
    fn record_id(&self) -> &str {
        &self.id
    }
}

impl Keyed for Comment {
    fn record_id(&self) -> &str {
        &self.id
    }
}

impl Keyed for AlertZone {
    fn record_id(&self) -> &str {
        &self.id
    }
}

impl Keyed for Subscription {
    fn record_id(&self) -> &str {
        &self.id
    }
}

impl Keyed for WeatherSample {
    fn record_id(&self) -> &str {
        &self.id
    }
}

/// Ordered client-side collection of one record kind.
pub struct SessionCache<T> {
    records: Vec<T>,
    generation: u64,
    populated: bool,
}

impl<T: Keyed + Clone> Default for SessionCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Keyed + Clone> SessionCache<T> {
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
            generation: 0,
            populated: false,
        }
    }

    /// Start a full list. Returns the token the eventual result must
    /// present to `install`. Supersedes any list still in flight.
    pub fn begin_list(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    /// Drop the cached view and supersede anything in flight. Used on
    /// view teardown.
    pub fn invalidate(&mut self) {
        self.generation += 1;
        self.records.clear();
        self.populated = false;
    }

    /// Adopt a full list result. Returns false (and changes nothing)
    /// when the token is stale.
    pub fn install(&mut self, token: u64, records: Vec<T>) -> bool {
        if token != self.generation {
            return false;
        }
        self.records = records;
        self.populated = true;
        true
    }

    /// Reconcile a successful create: append. Discarded when the token
    /// is stale, or when no list has been installed this generation —
    /// a torn-down or never-populated view has nothing to patch.
    pub fn apply_create(&mut self, token: u64, record: T) -> bool {
        if token != self.generation || !self.populated {
            return false;
        }
        self.records.push(record);
        true
    }

    /// Reconcile a successful update: replace in place, preserving
    /// position. A record not present locally is a no-op — it will
    /// appear on the next full list. Discarded like `apply_create`
    /// when the view is stale or unpopulated.
    pub fn apply_update(&mut self, token: u64, record: T) -> bool {
        if token != self.generation || !self.populated {
            return false;
        }
        if let Some(existing) = self
            .records
            .iter_mut()
            .find(|r| r.record_id() == record.record_id())
        {
            *existing = record;
        }
        true
    }

    /// The current token. Mutations capture this before suspending on
    /// the store call.
    pub fn token(&self) -> u64 {
        self.generation
    }

    /// Whether a full list has been installed this generation.
    pub fn is_populated(&self) -> bool {
        self.populated
    }

    pub fn records(&self) -> &[T] {
        &self.records
    }

    pub fn get(&self, id: &str) -> Option<&T> {
        self.records.iter().find(|r| r.record_id() == id)
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Rec {
        id: String,
        value: u32,
    }

    impl Keyed for Rec {
        fn record_id(&self) -> &str {
            &self.id
        }
    }

    fn rec(id: &str, value: u32) -> Rec {
        Rec {
            id: id.into(),
            value,
        }
    }

    #[test]
    fn create_then_update_preserves_order() {
        let mut cache = SessionCache::new();
        let token = cache.begin_list();
        assert!(cache.install(token, vec![]));

        assert!(cache.apply_create(token, rec("a", 1)));
        assert!(cache.apply_create(token, rec("b", 2)));
        assert!(cache.apply_update(token, rec("a", 10)));

        let records = cache.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0], rec("a", 10)); // updated in place, still first
        assert_eq!(records[1], rec("b", 2));
    }

    #[test]
    fn update_for_unknown_record_is_a_no_op() {
        let mut cache = SessionCache::new();
        let token = cache.begin_list();
        cache.install(token, vec![rec("a", 1)]);

        assert!(cache.apply_update(token, rec("ghost", 9)));
        assert_eq!(cache.records(), &[rec("a", 1)]);
    }

    #[test]
    fn stale_list_result_is_discarded() {
        let mut cache = SessionCache::new();
        let first = cache.begin_list();
        let second = cache.begin_list(); // supersedes the first

        // The slow first read lands after the second began.
        assert!(!cache.install(first, vec![rec("stale", 0)]));
        assert!(!cache.is_populated());

        assert!(cache.install(second, vec![rec("fresh", 1)]));
        assert_eq!(cache.records(), &[rec("fresh", 1)]);
    }

    #[test]
    fn mutation_from_torn_down_view_is_discarded() {
        let mut cache = SessionCache::new();
        let token = cache.begin_list();
        cache.install(token, vec![]);

        cache.invalidate();

        assert!(!cache.apply_create(token, rec("late", 1)));
        assert!(cache.records().is_empty());
    }

    #[test]
    fn mutation_after_teardown_never_revives_the_view() {
        let mut cache = SessionCache::new();
        let token = cache.begin_list();
        cache.install(token, vec![rec("a", 1)]);

        cache.invalidate();

        // A mutation stamped with the post-teardown token has no
        // installed view to patch, so it must still be discarded.
        let token = cache.token();
        assert!(!cache.apply_create(token, rec("late", 1)));
        assert!(!cache.apply_update(token, rec("a", 2)));
        assert!(cache.records().is_empty());
        assert!(!cache.is_populated());
    }

    #[test]
    fn invalidate_clears_and_supersedes() {
        let mut cache = SessionCache::new();
        let token = cache.begin_list();
        cache.install(token, vec![rec("a", 1)]);

        cache.invalidate();
        assert!(!cache.is_populated());
        assert!(cache.records().is_empty());
        assert!(!cache.install(token, vec![rec("a", 1)]));
    }
}
