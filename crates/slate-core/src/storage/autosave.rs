//! Debounced autosave with value-based dirty tracking.

use crate::element::{Element, decode_elements_json};
use crate::storage::{Storage, StorageError, StorageResult};
use crate::timer::Debounce;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Trailing-debounce delay between the last mutation and the write.
pub const AUTOSAVE_DELAY: Duration = Duration::from_millis(1500);

/// Storage key for a canvas's element sequence.
pub fn canvas_key(canvas_id: &str) -> String {
    format!("whiteboard:{}", canvas_id)
}

/// Manages local durability for one canvas.
///
/// Dirty state is derived by comparing the serialized live sequence against
/// the last-saved payload - by value, not by mutation counting. A mutation
/// that restores the saved value clears the dirty flag and cancels the
/// pending write.
pub struct AutosaveManager<S: Storage> {
    storage: Arc<S>,
    key: String,
    /// Serialized form of the last durably saved sequence.
    saved: String,
    dirty: bool,
    debounce: Debounce,
}

impl<S: Storage> AutosaveManager<S> {
    pub fn new(storage: Arc<S>, canvas_id: &str) -> Self {
        Self {
            storage,
            key: canvas_key(canvas_id),
            saved: "[]".to_string(),
            dirty: false,
            debounce: Debounce::new(AUTOSAVE_DELAY),
        }
    }

    /// Load the stored sequence for this canvas.
    ///
    /// Absent or corrupt data starts an empty canvas; the failure is logged,
    /// never surfaced.
    pub fn load(&mut self) -> Vec<Element> {
        let elements = match self.storage.load(&self.key) {
            Ok(payload) => decode_elements_json(&payload),
            Err(StorageError::NotFound(_)) => Vec::new(),
            Err(e) => {
                log::warn!("Failed to load {}: {}", self.key, e);
                Vec::new()
            }
        };
        // Keep the canonical (post-coercion) form for dirty comparison.
        self.saved = encode(&elements).unwrap_or_else(|| "[]".to_string());
        self.dirty = false;
        self.debounce.cancel();
        elements
    }

    /// Re-derive the dirty flag after a mutation and (re)schedule the
    /// debounced write. Equal-to-saved cancels any pending write instead.
    pub fn sync_dirty(&mut self, elements: &[Element], now: Instant) {
        let Some(current) = encode(elements) else {
            return;
        };
        if current == self.saved {
            self.dirty = false;
            self.debounce.cancel();
        } else {
            self.dirty = true;
            self.debounce.schedule(now);
        }
    }

    /// Drive the debounce timer. Performs the pending background save when
    /// its deadline has passed; failures are logged and swallowed.
    /// Returns true when a save was written.
    pub fn poll(&mut self, elements: &[Element], now: Instant) -> bool {
        if !self.debounce.fire_ready(now) {
            return false;
        }
        match self.save(elements) {
            Ok(()) => true,
            Err(e) => {
                log::warn!("Autosave failed for {}: {}", self.key, e);
                false
            }
        }
    }

    /// Write immediately. Unlike background autosave, the error is returned
    /// so an explicit save action can surface it.
    pub fn save(&mut self, elements: &[Element]) -> StorageResult<()> {
        let payload = serde_json::to_string(elements)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        self.storage.save(&self.key, &payload)?;
        self.saved = payload;
        self.dirty = false;
        self.debounce.cancel();
        Ok(())
    }

    /// Discard in-memory changes and return the last-saved sequence.
    pub fn revert(&mut self) -> Vec<Element> {
        self.dirty = false;
        self.debounce.cancel();
        decode_elements_json(&self.saved)
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn has_pending_save(&self) -> bool {
        self.debounce.is_pending()
    }

    pub fn storage(&self) -> &Arc<S> {
        &self.storage
    }
}

fn encode(elements: &[Element]) -> Option<String> {
    match serde_json::to_string(elements) {
        Ok(json) => Some(json),
        Err(e) => {
            log::warn!("Failed to serialize elements: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::ShapeData;
    use crate::storage::MemoryStorage;
    use kurbo::Point;

    fn dot(x: f64) -> Element {
        Element::new(ShapeData::Path {
            points: vec![Point::new(x, x)],
        })
    }

    fn manager() -> AutosaveManager<MemoryStorage> {
        AutosaveManager::new(Arc::new(MemoryStorage::new()), "c1")
    }

    #[test]
    fn test_clean_after_save() {
        let t0 = Instant::now();
        let mut autosave = manager();
        let elements = vec![dot(1.0)];

        autosave.sync_dirty(&elements, t0);
        assert!(autosave.is_dirty());

        autosave.save(&elements).unwrap();
        assert!(!autosave.is_dirty());
        assert!(!autosave.has_pending_save());
    }

    #[test]
    fn test_mutation_back_to_saved_value_clears_dirty() {
        let t0 = Instant::now();
        let mut autosave = manager();
        let saved = vec![dot(1.0)];
        autosave.save(&saved).unwrap();

        autosave.sync_dirty(&[dot(1.0), dot(2.0)], t0);
        assert!(autosave.is_dirty());
        assert!(autosave.has_pending_save());

        // Reverting to the same serialized value cancels the pending write.
        autosave.sync_dirty(&saved, t0 + Duration::from_millis(100));
        assert!(!autosave.is_dirty());
        assert!(!autosave.has_pending_save());
    }

    #[test]
    fn test_debounce_timed_from_last_mutation() {
        let t0 = Instant::now();
        let mut autosave = manager();
        let elements = vec![dot(1.0)];

        autosave.sync_dirty(&elements, t0);
        autosave.sync_dirty(&elements, t0 + Duration::from_millis(1000));

        // 1.6s after the first mutation, but only 0.6s after the second.
        assert!(!autosave.poll(&elements, t0 + Duration::from_millis(1600)));
        assert!(autosave.poll(&elements, t0 + Duration::from_millis(2500)));
        assert!(!autosave.is_dirty());
    }

    #[test]
    fn test_load_roundtrip() {
        let storage = Arc::new(MemoryStorage::new());
        let elements = vec![dot(1.0), dot(2.0)];

        let mut first = AutosaveManager::new(storage.clone(), "c1");
        first.save(&elements).unwrap();

        let mut second = AutosaveManager::new(storage, "c1");
        assert_eq!(second.load(), elements);
        assert!(!second.is_dirty());
    }

    #[test]
    fn test_load_missing_starts_empty() {
        let mut autosave = manager();
        assert!(autosave.load().is_empty());
        assert!(!autosave.is_dirty());
    }

    #[test]
    fn test_load_corrupt_starts_empty() {
        let storage = Arc::new(MemoryStorage::new());
        storage.save(&canvas_key("c1"), "{{{not json").unwrap();

        let mut autosave = AutosaveManager::new(storage, "c1");
        assert!(autosave.load().is_empty());
    }

    #[test]
    fn test_revert_restores_saved() {
        let t0 = Instant::now();
        let mut autosave = manager();
        let saved = vec![dot(1.0)];
        autosave.save(&saved).unwrap();

        autosave.sync_dirty(&[dot(1.0), dot(2.0)], t0);
        let restored = autosave.revert();

        assert_eq!(restored, saved);
        assert!(!autosave.is_dirty());
        assert!(!autosave.has_pending_save());
    }

    #[test]
    fn test_keys_are_scoped_per_canvas() {
        assert_eq!(canvas_key("abc"), "whiteboard:abc");

        let storage = Arc::new(MemoryStorage::new());
        let mut one = AutosaveManager::new(storage.clone(), "one");
        let mut two = AutosaveManager::new(storage, "two");

        one.save(&[dot(1.0)]).unwrap();
        two.save(&[dot(2.0)]).unwrap();
        assert_eq!(one.load(), vec![dot(1.0)]);
        assert_eq!(two.load(), vec![dot(2.0)]);
    }
}
