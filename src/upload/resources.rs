//! Ownership of generated preview resources.
//!
//! Every preview shown during the upload flow is registered here. The store
//! enforces the lifecycle rules the rest of the flow relies on:
//!
//! - at most one live composed preview per source, with the replacement
//!   installed before its predecessor is released
//! - releasing a resource twice is a no-op
//! - releasing a source retires everything registered under it
//!
//! Handles are cheap clones over shared bytes. A released resource leaves
//! the store, but its payload stays readable through any handle still held.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine};
use bytes::Bytes;
use parking_lot::Mutex;
use uuid::Uuid;

use crate::watermark::ComposedPreview;

/// What a stored resource holds, which decides how release routes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    /// Original encoded photo bytes, shown before a watermark exists
    RawPreview,
    /// Composited watermarked preview
    ComposedPreview,
}

/// Read-only view of a stored preview resource.
#[derive(Debug, Clone, PartialEq)]
pub struct PreviewHandle {
    id: Uuid,
    source_id: Uuid,
    kind: ResourceKind,
    data: Bytes,
    content_type: &'static str,
}

impl PreviewHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn source_id(&self) -> Uuid {
        self.source_id
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }

    pub fn content_type(&self) -> &'static str {
        self.content_type
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Encode the payload as a `data:` URL for direct display.
    pub fn to_data_url(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.content_type,
            STANDARD.encode(&self.data)
        )
    }
}

/// Point-in-time counters for lifecycle assertions and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceStats {
    pub allocated: u64,
    pub released: u64,
    pub live: usize,
}

#[derive(Debug, Default)]
struct StoreState {
    entries: HashMap<Uuid, PreviewHandle>,
    /// Live raw preview per source
    raw_by_source: HashMap<Uuid, Uuid>,
    /// Live composed preview per source
    composed_by_source: HashMap<Uuid, Uuid>,
}

/// Shared registry that owns every generated preview resource.
#[derive(Debug, Clone, Default)]
pub struct ResourceStore {
    state: Arc<Mutex<StoreState>>,
    allocated: Arc<AtomicU64>,
    released: Arc<AtomicU64>,
}

impl ResourceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the raw preview for a freshly decoded source. An existing
    /// raw preview for the same source is released first.
    pub fn insert_raw(
        &self,
        source_id: Uuid,
        data: Bytes,
        content_type: &'static str,
    ) -> PreviewHandle {
        let handle = PreviewHandle {
            id: Uuid::new_v4(),
            source_id,
            kind: ResourceKind::RawPreview,
            data,
            content_type,
        };

        let mut state = self.state.lock();
        if let Some(previous) = state.raw_by_source.insert(source_id, handle.id) {
            if state.entries.remove(&previous).is_some() {
                self.released.fetch_add(1, Ordering::Relaxed);
            }
        }
        state.entries.insert(handle.id, handle.clone());
        self.allocated.fetch_add(1, Ordering::Relaxed);

        tracing::debug!(source = %source_id, resource = %handle.id, bytes = handle.len(), "registered raw preview");
        handle
    }

    /// Install a composed preview as the live one for its source, then
    /// release the preview it supersedes. The new resource is always
    /// registered before the old one disappears.
    pub fn publish(&self, source_id: Uuid, preview: ComposedPreview) -> PreviewHandle {
        let handle = PreviewHandle {
            id: Uuid::new_v4(),
            source_id,
            kind: ResourceKind::ComposedPreview,
            data: preview.data,
            content_type: preview.content_type,
        };

        let mut state = self.state.lock();
        state.entries.insert(handle.id, handle.clone());
        self.allocated.fetch_add(1, Ordering::Relaxed);

        if let Some(previous) = state.composed_by_source.insert(source_id, handle.id) {
            if state.entries.remove(&previous).is_some() {
                self.released.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(source = %source_id, resource = %previous, "released superseded preview");
            }
        }

        tracing::debug!(source = %source_id, resource = %handle.id, bytes = handle.len(), "published composed preview");
        handle
    }

    /// Release one resource. Returns `false` when it was already gone.
    pub fn release(&self, resource_id: Uuid) -> bool {
        let mut state = self.state.lock();
        let handle = match state.entries.remove(&resource_id) {
            Some(handle) => handle,
            None => return false,
        };

        let index = match handle.kind {
            ResourceKind::RawPreview => &mut state.raw_by_source,
            ResourceKind::ComposedPreview => &mut state.composed_by_source,
        };
        if index.get(&handle.source_id) == Some(&resource_id) {
            index.remove(&handle.source_id);
        }

        self.released.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(resource = %resource_id, "released preview resource");
        true
    }

    /// Release the live composed preview for a source, if one exists.
    pub fn release_composed(&self, source_id: Uuid) -> bool {
        let resource_id = {
            let state = self.state.lock();
            match state.composed_by_source.get(&source_id) {
                Some(id) => *id,
                None => return false,
            }
        };
        self.release(resource_id)
    }

    /// Release every resource registered under a source. Returns how many
    /// were actually released.
    pub fn release_all(&self, source_id: Uuid) -> usize {
        let ids = {
            let state = self.state.lock();
            state
                .entries
                .values()
                .filter(|handle| handle.source_id == source_id)
                .map(|handle| handle.id)
                .collect::<Vec<_>>()
        };

        let mut count = 0;
        for id in ids {
            if self.release(id) {
                count += 1;
            }
        }
        if count > 0 {
            tracing::debug!(source = %source_id, released = count, "released all source resources");
        }
        count
    }

    pub fn raw_preview(&self, source_id: Uuid) -> Option<PreviewHandle> {
        let state = self.state.lock();
        let id = state.raw_by_source.get(&source_id)?;
        state.entries.get(id).cloned()
    }

    pub fn composed_preview(&self, source_id: Uuid) -> Option<PreviewHandle> {
        let state = self.state.lock();
        let id = state.composed_by_source.get(&source_id)?;
        state.entries.get(id).cloned()
    }

    pub fn contains(&self, resource_id: Uuid) -> bool {
        self.state.lock().entries.contains_key(&resource_id)
    }

    pub fn stats(&self) -> ResourceStats {
        ResourceStats {
            allocated: self.allocated.load(Ordering::Relaxed),
            released: self.released.load(Ordering::Relaxed),
            live: self.state.lock().entries.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn preview(text: &str) -> ComposedPreview {
        ComposedPreview {
            data: Bytes::from(text.to_string()),
            content_type: "image/png",
            width: 8,
            height: 8,
        }
    }

    #[test]
    fn test_insert_raw_and_lookup() {
        let store = ResourceStore::new();
        let source = Uuid::new_v4();

        let handle = store.insert_raw(source, Bytes::from_static(b"jpeg bytes"), "image/jpeg");

        let found = store.raw_preview(source).unwrap();
        assert_eq!(found.id(), handle.id());
        assert_eq!(found.kind(), ResourceKind::RawPreview);
        assert_eq!(found.content_type(), "image/jpeg");
        assert_eq!(store.stats().allocated, 1);
        assert_eq!(store.stats().live, 1);
    }

    #[test]
    fn test_publish_replaces_previous_composed() {
        let store = ResourceStore::new();
        let source = Uuid::new_v4();

        let first = store.publish(source, preview("v1"));
        let second = store.publish(source, preview("v2"));

        assert!(!store.contains(first.id()));
        assert!(store.contains(second.id()));
        assert_eq!(store.composed_preview(source).unwrap().id(), second.id());

        let stats = store.stats();
        assert_eq!(stats.allocated, 2);
        assert_eq!(stats.released, 1);
        assert_eq!(stats.live, 1);

        // Superseded bytes stay readable through the held handle.
        assert_eq!(first.data().as_ref(), b"v1");
    }

    #[test]
    fn test_release_is_idempotent() {
        let store = ResourceStore::new();
        let source = Uuid::new_v4();
        let handle = store.publish(source, preview("v1"));

        assert!(store.release(handle.id()));
        assert!(!store.release(handle.id()));
        assert!(!store.release(handle.id()));

        let stats = store.stats();
        assert_eq!(stats.released, 1);
        assert_eq!(stats.live, 0);
        assert!(store.composed_preview(source).is_none());
    }

    #[test]
    fn test_release_composed_by_source() {
        let store = ResourceStore::new();
        let source = Uuid::new_v4();
        store.publish(source, preview("v1"));

        assert!(store.release_composed(source));
        assert!(!store.release_composed(source));
        assert!(store.composed_preview(source).is_none());
    }

    #[test]
    fn test_release_all_retires_raw_and_composed() {
        let store = ResourceStore::new();
        let source = Uuid::new_v4();
        let other = Uuid::new_v4();

        store.insert_raw(source, Bytes::from_static(b"raw"), "image/png");
        store.publish(source, preview("composed"));
        let unrelated = store.insert_raw(other, Bytes::from_static(b"other"), "image/png");

        assert_eq!(store.release_all(source), 2);
        assert_eq!(store.release_all(source), 0);

        assert!(store.raw_preview(source).is_none());
        assert!(store.composed_preview(source).is_none());
        assert!(store.contains(unrelated.id()));
    }

    #[test]
    fn test_insert_raw_replaces_existing_raw() {
        let store = ResourceStore::new();
        let source = Uuid::new_v4();

        let first = store.insert_raw(source, Bytes::from_static(b"one"), "image/png");
        let second = store.insert_raw(source, Bytes::from_static(b"two"), "image/png");

        assert!(!store.contains(first.id()));
        assert_eq!(store.raw_preview(source).unwrap().id(), second.id());
        assert_eq!(store.stats().released, 1);
    }

    #[test]
    fn test_data_url_round_trip() {
        let store = ResourceStore::new();
        let source = Uuid::new_v4();
        let handle = store.insert_raw(source, Bytes::from_static(b"pixels"), "image/png");

        let url = handle.to_data_url();
        assert!(url.starts_with("data:image/png;base64,"));
        let encoded = url.strip_prefix("data:image/png;base64,").unwrap();
        assert_eq!(STANDARD.decode(encoded).unwrap(), b"pixels");
    }
}
