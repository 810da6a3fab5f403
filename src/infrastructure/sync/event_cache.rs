use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Short-term memory of identifiers the agent has recently emitted or
/// applied, used to break sync loops.
///
/// Two kinds of identifier live here, treated uniformly: event ids (catch
/// the exact event the hub echoes back) and content hashes (catch the
/// clipboard change our own remote-apply write provokes on the next poll
/// tick). Both are collision-resistant strings, so one container serves.
pub struct RecentEventCache {
    entries: Mutex<HashMap<String, Instant>>,
    max_age: Duration,
}

impl RecentEventCache {
    pub fn new(max_age: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            max_age,
        }
    }

    /// Record an identifier as recently seen.
    pub fn add(&self, id: &str) {
        self.entries
            .lock()
            .unwrap()
            .insert(id.to_string(), Instant::now());
    }

    /// True while the identifier is younger than the maximum age. A stale
    /// entry is deleted on the spot, so routine lookups keep the map tidy
    /// between sweeps.
    pub fn contains(&self, id: &str) -> bool {
        let mut entries = self.entries.lock().unwrap();
        match entries.get(id) {
            Some(seen) if seen.elapsed() < self.max_age => true,
            Some(_) => {
                entries.remove(id);
                false
            }
            None => false,
        }
    }

    /// Full sweep of expired entries. Lazy expiration only reaps ids that
    /// get queried again; this catches the rest.
    pub fn prune(&self) {
        let mut entries = self.entries.lock().unwrap();
        let max_age = self.max_age;
        entries.retain(|_, seen| seen.elapsed() < max_age);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn test_add_then_contains() {
        let cache = RecentEventCache::new(Duration::from_secs(60));
        cache.add("event-1");
        assert!(cache.contains("event-1"));
        assert!(!cache.contains("event-2"));
    }

    #[test]
    fn test_entries_expire() {
        let cache = RecentEventCache::new(Duration::from_millis(20));
        cache.add("event-1");
        assert!(cache.contains("event-1"));
        sleep(Duration::from_millis(40));
        assert!(!cache.contains("event-1"));
        // Lazy expiration removed it.
        assert!(cache.is_empty());
    }

    #[test]
    fn test_prune_sweeps_stale_entries() {
        let cache = RecentEventCache::new(Duration::from_millis(20));
        cache.add("stale-1");
        cache.add("stale-2");
        sleep(Duration::from_millis(40));
        cache.add("fresh");

        cache.prune();
        assert_eq!(cache.len(), 1);
        assert!(cache.contains("fresh"));
    }

    #[test]
    fn test_event_ids_and_hashes_coexist() {
        let cache = RecentEventCache::new(Duration::from_secs(60));
        cache.add("9b2af8f0-0b1a-4c8e-bf2a-111111111111");
        cache.add("2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824");
        assert_eq!(cache.len(), 2);
    }
}
