use crate::entry::CacheEntry;
use crate::time::Nanos;

use std::sync::Arc;

use ahash::{HashMap, HashMapExt};

/// A slot in the expiry heap. The deadline is duplicated here so sift
/// comparisons never have to chase the map.
struct HeapSlot {
  expires_at: Nanos,
  key: Arc<str>,
}

/// The entry store: a key map paired with an indexed min-heap ordered by
/// deadline.
///
/// Every live entry appears exactly once in both structures, and
/// `CacheEntry::heap_idx` always names the entry's current slot, so removal
/// and deadline updates stay logarithmic. Entries that never expire carry
/// the sentinel deadline and sink to the back of the heap.
pub(crate) struct EntryStore<V> {
  map: HashMap<Arc<str>, CacheEntry<V>>,
  heap: Vec<HeapSlot>,
}

impl<V> EntryStore<V> {
  pub(crate) fn new() -> Self {
    Self {
      map: HashMap::new(),
      heap: Vec::new(),
    }
  }

  #[inline]
  pub(crate) fn len(&self) -> usize {
    self.map.len()
  }

  #[inline]
  pub(crate) fn get(&self, key: &str) -> Option<&CacheEntry<V>> {
    self.map.get(key)
  }

  #[inline]
  pub(crate) fn get_mut(&mut self, key: &str) -> Option<&mut CacheEntry<V>> {
    self.map.get_mut(key)
  }

  #[inline]
  pub(crate) fn contains(&self, key: &str) -> bool {
    self.map.contains_key(key)
  }

  /// The deadline of the soonest-expiring entry.
  #[inline]
  pub(crate) fn earliest_deadline(&self) -> Option<Nanos> {
    self.heap.first().map(|slot| slot.expires_at)
  }

  /// Inserts a brand-new entry. Overwrites of existing keys go through
  /// `get_mut` and `update_deadline` instead.
  pub(crate) fn insert(&mut self, key: Arc<str>, mut entry: CacheEntry<V>) {
    debug_assert!(!self.map.contains_key(&*key));
    let idx = self.heap.len();
    entry.heap_idx = idx;
    self.heap.push(HeapSlot {
      expires_at: entry.expires_at,
      key: key.clone(),
    });
    self.map.insert(key, entry);
    self.sift_up(idx);
  }

  /// Removes the entry for `key`, if present.
  pub(crate) fn remove(&mut self, key: &str) -> Option<(Arc<str>, CacheEntry<V>)> {
    let (key, entry) = self.map.remove_entry(key)?;
    self.remove_slot(entry.heap_idx);
    Some((key, entry))
  }

  /// Removes and returns the soonest-expiring entry.
  pub(crate) fn pop_earliest(&mut self) -> Option<(Arc<str>, CacheEntry<V>)> {
    let key = self.heap.first()?.key.clone();
    let (key, entry) = self
      .map
      .remove_entry(&*key)
      .expect("heap slot without a map entry");
    self.remove_slot(entry.heap_idx);
    Some((key, entry))
  }

  /// Moves an entry to a new deadline and restores heap order in place.
  pub(crate) fn update_deadline(&mut self, key: &str, expires_at: Nanos) {
    let Some(entry) = self.map.get_mut(key) else {
      return;
    };
    entry.expires_at = expires_at;
    let idx = entry.heap_idx;
    self.heap[idx].expires_at = expires_at;
    let idx = self.sift_up(idx);
    self.sift_down(idx);
  }

  /// Empties the store, returning every entry.
  pub(crate) fn drain_all(&mut self) -> Vec<(Arc<str>, CacheEntry<V>)> {
    self.heap.clear();
    self.map.drain().collect()
  }

  fn remove_slot(&mut self, idx: usize) {
    self.heap.swap_remove(idx);
    if idx < self.heap.len() {
      // The former tail landed in `idx`; re-home it.
      self.set_heap_idx(idx);
      let idx = self.sift_up(idx);
      self.sift_down(idx);
    }
  }

  /// Returns the slot's final index.
  fn sift_up(&mut self, mut idx: usize) -> usize {
    while idx > 0 {
      let parent = (idx - 1) / 2;
      if self.heap[idx].expires_at >= self.heap[parent].expires_at {
        break;
      }
      self.swap_slots(idx, parent);
      idx = parent;
    }
    idx
  }

  /// Returns the slot's final index.
  fn sift_down(&mut self, mut idx: usize) -> usize {
    loop {
      let left = 2 * idx + 1;
      if left >= self.heap.len() {
        break;
      }
      let right = left + 1;
      let mut child = left;
      if right < self.heap.len() && self.heap[right].expires_at < self.heap[left].expires_at {
        child = right;
      }
      if self.heap[idx].expires_at <= self.heap[child].expires_at {
        break;
      }
      self.swap_slots(idx, child);
      idx = child;
    }
    idx
  }

  fn swap_slots(&mut self, a: usize, b: usize) {
    self.heap.swap(a, b);
    self.set_heap_idx(a);
    self.set_heap_idx(b);
  }

  fn set_heap_idx(&mut self, idx: usize) {
    let key = self.heap[idx].key.clone();
    self
      .map
      .get_mut(&*key)
      .expect("heap slot without a map entry")
      .heap_idx = idx;
  }
}
