use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use tracing::debug;

use super::Accelerators;
use crate::geometry::GeometryKey;

#[derive(Debug)]
struct Ring {
    slots: Vec<Option<GeometryKey>>,
    next: usize,
}

/// Bounded cache of built accelerators keyed by geometry content.
///
/// Lookups take a read lock on the table. Insertion writes the key into the
/// next ring slot and evicts whatever key that slot held before, so the cache
/// never holds more than `capacity` entries. An eviction racing a concurrent
/// lookup only costs a rebuild.
#[derive(Debug)]
pub struct AcceleratorCache {
    table: RwLock<HashMap<GeometryKey, Arc<Accelerators>>>,
    ring: Mutex<Ring>,
}

impl AcceleratorCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            table: RwLock::new(HashMap::new()),
            ring: Mutex::new(Ring {
                slots: vec![None; capacity.max(1)],
                next: 0,
            }),
        }
    }

    pub fn capacity(&self) -> usize {
        self.ring.lock().unwrap_or_else(PoisonError::into_inner).slots.len()
    }

    pub fn get(&self, key: &GeometryKey) -> Option<Arc<Accelerators>> {
        self.table
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    pub fn contains(&self, key: &GeometryKey) -> bool {
        self.get(key).is_some()
    }

    pub fn insert(&self, key: GeometryKey, accelerators: Accelerators) -> Arc<Accelerators> {
        let value = Arc::new(accelerators);
        let evicted = {
            let mut table = self.table.write().unwrap_or_else(PoisonError::into_inner);
            if table.insert(key, Arc::clone(&value)).is_some() {
                return value;
            }
            let mut ring = self.ring.lock().unwrap_or_else(PoisonError::into_inner);
            let slot = ring.next;
            ring.next = (slot + 1) % ring.slots.len();
            let evicted = ring.slots[slot].replace(key);
            if let Some(old) = evicted {
                table.remove(&old);
            }
            evicted
        };
        if evicted.is_some() {
            debug!("accelerator cache evicted its oldest entry");
        }
        value
    }

    pub fn len(&self) -> usize {
        self.table.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        let mut table = self.table.write().unwrap_or_else(PoisonError::into_inner);
        let mut ring = self.ring.lock().unwrap_or_else(PoisonError::into_inner);
        table.clear();
        ring.slots.iter_mut().for_each(|s| *s = None);
        ring.next = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AccelerationDegree;
    use crate::geometry::Geometry;

    fn entry() -> Accelerators {
        Accelerators {
            quad_tree: None,
            raster: None,
            degree: AccelerationDegree::Mild,
            tolerance: 0.0,
        }
    }

    fn key(i: usize) -> GeometryKey {
        Geometry::point(i as f64, 0.0).key()
    }

    #[test]
    fn test_ring_evicts_oldest() {
        let cache = AcceleratorCache::new(2);
        cache.insert(key(0), entry());
        cache.insert(key(1), entry());
        cache.insert(key(2), entry());
        assert_eq!(cache.len(), 2);
        assert!(!cache.contains(&key(0)));
        assert!(cache.contains(&key(1)));
        assert!(cache.contains(&key(2)));
    }

    #[test]
    fn test_reinsert_does_not_consume_slot() {
        let cache = AcceleratorCache::new(2);
        cache.insert(key(0), entry());
        cache.insert(key(0), entry());
        cache.insert(key(1), entry());
        assert!(cache.contains(&key(0)));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_concurrent_inserts() {
        let cache = Arc::new(AcceleratorCache::new(8));
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || {
                    for i in 0..20 {
                        cache.insert(key(t * 100 + i), entry());
                        let _ = cache.get(&key(t * 100 + i));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert!(cache.len() <= 8);
    }
}
