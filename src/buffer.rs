//! Fetched binary data and the typed windows carved out of it.
//!
//! A [`RawBuffer`] is the immutable payload of one fetched buffer URI. A
//! [`BufferView`] is a copy-free sub-range of exactly one raw buffer; the
//! cache guarantees at most one lives per view id, so consumers can compare
//! views by `Arc` identity. A [`TypedView`] reinterprets a span of a buffer
//! view as numeric components without copying the bytes.

use std::sync::Arc;

use bytemuck::AnyBitPattern;

use crate::document::ComponentType;
use crate::error::{Error, Result};

/// Immutable bytes of one fetched buffer.
pub struct RawBuffer {
    bytes: Box<[u8]>,
}

impl RawBuffer {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            bytes: bytes.into_boxed_slice(),
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// A byte sub-range `[byte_offset, byte_offset + byte_length)` of one
/// [`RawBuffer`]. Constructed only by the cache, which checks the range
/// against the buffer first.
pub struct BufferView {
    buffer: Arc<RawBuffer>,
    byte_offset: usize,
    byte_length: usize,
}

impl BufferView {
    pub(crate) fn new(buffer: Arc<RawBuffer>, byte_offset: usize, byte_length: usize) -> Self {
        debug_assert!(byte_offset + byte_length <= buffer.len());
        Self {
            buffer,
            byte_offset,
            byte_length,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.buffer.bytes()[self.byte_offset..self.byte_offset + self.byte_length]
    }

    pub fn byte_length(&self) -> usize {
        self.byte_length
    }
}

/// A typed window over a [`BufferView`]: `len` components of
/// `component_type` starting `byte_offset` bytes into the view.
///
/// The bytes are not copied; they are reinterpreted on access. Buffer data
/// is little-endian, which matches every platform this crate targets.
pub struct TypedView {
    view: Arc<BufferView>,
    byte_offset: usize,
    component_type: ComponentType,
    len: usize,
}

impl TypedView {
    pub fn new(
        view: Arc<BufferView>,
        byte_offset: usize,
        component_type: ComponentType,
        len: usize,
    ) -> Result<Self> {
        let needed = len * component_type.byte_size();
        if byte_offset + needed > view.byte_length() {
            return Err(Error::AccessorOutOfBounds {
                byte_offset,
                components: len,
                component_bytes: component_type.byte_size(),
                available: view.byte_length(),
            });
        }
        Ok(Self {
            view,
            byte_offset,
            component_type,
            len,
        })
    }

    /// Number of components.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn component_type(&self) -> ComponentType {
        self.component_type
    }

    /// The backing view; two typed views decoded from the same cached
    /// bufferView compare equal under `Arc::ptr_eq`.
    pub fn buffer_view(&self) -> &Arc<BufferView> {
        &self.view
    }

    /// The exact byte span covered by the components.
    pub fn bytes(&self) -> &[u8] {
        let size = self.component_type.byte_size();
        &self.view.bytes()[self.byte_offset..self.byte_offset + self.len * size]
    }

    /// Zero-copy typed slice; `None` when the span is not aligned for `T`.
    pub fn try_as_slice<T: AnyBitPattern>(&self) -> Option<&[T]> {
        debug_assert_eq!(std::mem::size_of::<T>(), self.component_type.byte_size());
        bytemuck::try_cast_slice(self.bytes()).ok()
    }

    /// Read one component, regardless of alignment.
    pub fn read<T: AnyBitPattern>(&self, index: usize) -> T {
        debug_assert_eq!(std::mem::size_of::<T>(), self.component_type.byte_size());
        let size = std::mem::size_of::<T>();
        let bytes = self.bytes();
        bytemuck::pod_read_unaligned(&bytes[index * size..(index + 1) * size])
    }

    /// Gather all components into an owned vector.
    pub fn to_vec<T: AnyBitPattern>(&self) -> Vec<T> {
        if let Some(slice) = self.try_as_slice::<T>() {
            return slice.to_vec();
        }
        (0..self.len).map(|i| self.read::<T>(i)).collect()
    }
}
