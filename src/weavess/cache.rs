use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use crate::sigpro::TimeRange;
use crate::weavess::position::PositionBuffer;
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub segment_id: String,
    pub viewport: (u64, u64),
    pub width_px: u32,
}
impl CacheKey {
    pub fn new(segment_id: impl Into<String>, viewport: &TimeRange, width_px: u32) -> Self {
        Self {
            segment_id: segment_id.into(),
            viewport: viewport.cache_key(),
            width_px,
        }
    }
}
/// Published buffers keyed by everything they were built from.
///
/// Entries are shared `Arc`s and never mutated; replacing or evicting an entry leaves any
/// reader's handle intact.
#[derive(Debug)]
pub struct PositionBufferCache {
    capacity: usize,
    entries: HashMap<CacheKey, Arc<PositionBuffer>>,
    order: VecDeque<CacheKey>,
}
impl PositionBufferCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: HashMap::new(),
            order: VecDeque::new(),
        }
    }
    pub fn get(&self, key: &CacheKey) -> Option<Arc<PositionBuffer>> {
        self.entries.get(key).cloned()
    }
    pub fn insert(&mut self, key: CacheKey, buffer: Arc<PositionBuffer>) -> Arc<PositionBuffer> {
        if self.entries.insert(key.clone(), buffer.clone()).is_none() {
            self.order.push_back(key);
        }
        while self.entries.len() > self.capacity {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            self.entries.remove(&oldest);
        }
        buffer
    }
    /// Drop every buffer built from `segment_id`.
    pub fn invalidate_segment(&mut self, segment_id: &str) {
        self.entries.retain(|key, _| key.segment_id != segment_id);
        self.order.retain(|key| key.segment_id != segment_id);
    }
    /// Keep only buffers built for `viewport`.
    pub fn retain_viewport(&mut self, viewport: &TimeRange) {
        let bits = viewport.cache_key();
        self.entries.retain(|key, _| key.viewport == bits);
        self.order.retain(|key| key.viewport == bits);
    }
    pub fn len(&self) -> usize {
        self.entries.len()
    }
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    fn buffer(v: f32) -> Arc<PositionBuffer> {
        Arc::new(PositionBuffer::from_points([(0.0, v)]))
    }
    #[test]
    fn key_changes_miss() {
        let mut cache = PositionBufferCache::new(8);
        let viewport = TimeRange::new(0.0, 10.0).unwrap();
        cache.insert(CacheKey::new("a", &viewport, 100), buffer(1.0));
        assert!(cache.get(&CacheKey::new("a", &viewport, 100)).is_some());
        assert!(cache.get(&CacheKey::new("a", &viewport, 101)).is_none());
        let zoomed = TimeRange::new(0.0, 9.0).unwrap();
        assert!(cache.get(&CacheKey::new("a", &zoomed, 100)).is_none());
    }
    #[test]
    fn readers_keep_evicted_buffers() {
        let mut cache = PositionBufferCache::new(1);
        let viewport = TimeRange::new(0.0, 10.0).unwrap();
        let held = cache.insert(CacheKey::new("a", &viewport, 100), buffer(1.0));
        cache.insert(CacheKey::new("b", &viewport, 100), buffer(2.0));
        assert_eq!(cache.len(), 1);
        assert!(cache.get(&CacheKey::new("a", &viewport, 100)).is_none());
        assert_eq!(held.points().next(), Some((0.0, 1.0)));
    }
    #[test]
    fn invalidation_by_segment_and_viewport() {
        let mut cache = PositionBufferCache::new(8);
        let v1 = TimeRange::new(0.0, 10.0).unwrap();
        let v2 = TimeRange::new(5.0, 10.0).unwrap();
        cache.insert(CacheKey::new("a", &v1, 100), buffer(1.0));
        cache.insert(CacheKey::new("b", &v1, 100), buffer(2.0));
        cache.insert(CacheKey::new("a", &v2, 100), buffer(3.0));
        cache.invalidate_segment("b");
        assert_eq!(cache.len(), 2);
        cache.retain_viewport(&v2);
        assert_eq!(cache.len(), 1);
        assert!(cache.get(&CacheKey::new("a", &v2, 100)).is_some());
    }
}
