//! Memoizing bufferView cache with per-buffer wait-lists.
//!
//! Views are carved out of raw buffers at most once per view id; whoever
//! asks first constructs, everyone later gets the cached `Arc`. Work that
//! needs a buffer that has not arrived is parked as an explicit
//! [`DecodeTask`] on that buffer's wait-list and drained in FIFO order on
//! arrival.

use std::collections::HashMap;
use std::sync::Arc;

use crate::buffer::{BufferView, RawBuffer};
use crate::document::{BufferViewDesc, ComponentType};
use crate::error::{Error, Result};
use crate::model::Attribute;

/// Addresses one primitive slot in the model under construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrimitiveSlot {
    pub scene: String,
    pub mesh: usize,
    pub primitive: usize,
}

/// Decode work postponed until its backing buffer arrives. Tasks carry
/// everything they need; running one never consults the document again.
pub enum DecodeTask {
    Indices {
        target: PrimitiveSlot,
        byte_offset: usize,
        component_type: ComponentType,
        components: usize,
    },
    Vertices {
        target: PrimitiveSlot,
        storage_type: ComponentType,
        attributes: HashMap<String, Attribute>,
    },
}

impl DecodeTask {
    pub fn target(&self) -> &PrimitiveSlot {
        match self {
            DecodeTask::Indices { target, .. } => target,
            DecodeTask::Vertices { target, .. } => target,
        }
    }
}

/// Outcome of [`BufferCache::request`].
pub enum Resolution {
    /// The view exists (or was just carved); the caller runs the task now.
    Ready(Arc<BufferView>, DecodeTask),
    /// The backing buffer is still in flight; the task was queued.
    Deferred,
}

struct PendingView {
    view_id: String,
    desc: BufferViewDesc,
    task: DecodeTask,
}

#[derive(Default)]
pub struct BufferCache {
    buffers: HashMap<String, Arc<RawBuffer>>,
    views: HashMap<String, Arc<BufferView>>,
    wait_lists: HashMap<String, Vec<PendingView>>,
}

impl BufferCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve a view for `task`, or park the task until the buffer arrives.
    pub fn request(
        &mut self,
        view_id: &str,
        desc: &BufferViewDesc,
        task: DecodeTask,
    ) -> Result<Resolution> {
        if let Some(view) = self.views.get(view_id) {
            return Ok(Resolution::Ready(view.clone(), task));
        }

        if let Some(buffer) = self.buffers.get(&desc.buffer) {
            let view = carve(buffer, view_id, desc)?;
            self.views.insert(view_id.to_string(), view.clone());
            log::trace!("buffer view \"{view_id}\" carved from resident buffer \"{}\"", desc.buffer);
            return Ok(Resolution::Ready(view, task));
        }

        log::trace!("buffer \"{}\" still in flight, deferring decode of view \"{view_id}\"", desc.buffer);
        self.wait_lists
            .entry(desc.buffer.clone())
            .or_default()
            .push(PendingView {
                view_id: view_id.to_string(),
                desc: desc.clone(),
                task,
            });
        Ok(Resolution::Deferred)
    }

    /// Store an arrived buffer and drain its wait-list in registration
    /// order. Each drained entry re-checks the memo before carving, so
    /// several tasks on the same view id collapse to one construction.
    pub fn insert_buffer(
        &mut self,
        id: &str,
        bytes: Vec<u8>,
    ) -> Result<Vec<(Arc<BufferView>, DecodeTask)>> {
        let buffer = Arc::new(RawBuffer::new(bytes));
        self.buffers.insert(id.to_string(), buffer.clone());

        let pending = self.wait_lists.remove(id).unwrap_or_default();
        let mut ready = Vec::with_capacity(pending.len());
        for entry in pending {
            let view = match self.views.get(&entry.view_id) {
                Some(view) => view.clone(),
                None => {
                    let view = carve(&buffer, &entry.view_id, &entry.desc)?;
                    self.views.insert(entry.view_id.clone(), view.clone());
                    log::trace!("buffer view \"{}\" carved on arrival of buffer \"{id}\"", entry.view_id);
                    view
                }
            };
            ready.push((view, entry.task));
        }
        Ok(ready)
    }

    /// Drain the wait-list of a buffer that will never arrive. The returned
    /// tasks were not run; the caller still counts them as settled.
    pub fn fail_buffer(&mut self, id: &str) -> Vec<DecodeTask> {
        self.wait_lists
            .remove(id)
            .unwrap_or_default()
            .into_iter()
            .map(|entry| entry.task)
            .collect()
    }

    pub fn view(&self, view_id: &str) -> Option<&Arc<BufferView>> {
        self.views.get(view_id)
    }
}

fn carve(
    buffer: &Arc<RawBuffer>,
    view_id: &str,
    desc: &BufferViewDesc,
) -> Result<Arc<BufferView>> {
    if desc.byte_offset + desc.byte_length > buffer.len() {
        return Err(Error::ViewOutOfBounds {
            view: view_id.to_string(),
            buffer: desc.buffer.clone(),
            byte_offset: desc.byte_offset,
            byte_length: desc.byte_length,
            available: buffer.len(),
        });
    }
    Ok(Arc::new(BufferView::new(
        buffer.clone(),
        desc.byte_offset,
        desc.byte_length,
    )))
}
