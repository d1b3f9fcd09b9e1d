//! Constant-buffer payload with upload change detection.
//!
//! Shared by every render core instead of a base class. The block owns the
//! CPU payload, the registered [`ConstantBuffer`] and a copy of what was last
//! uploaded, so redundant uploads can be skipped.

use bytemuck::Pod;

use super::device::DeviceContext;
use super::technique::ConstantBuffer;

#[derive(Debug)]
pub struct UniformBlock<T: Pod + PartialEq> {
    data: T,
    buffer: Option<ConstantBuffer>,
    uploaded: Option<T>,
    upload_count: u64,
}

impl<T: Pod + PartialEq> UniformBlock<T> {
    pub fn new(data: T) -> Self {
        Self {
            data,
            buffer: None,
            uploaded: None,
            upload_count: 0,
        }
    }

    /// Binds the block to a registered buffer. Forgets the previous upload.
    pub fn bind(&mut self, buffer: ConstantBuffer) {
        self.buffer = Some(buffer);
        self.uploaded = None;
    }

    pub fn unbind(&mut self) {
        self.buffer = None;
        self.uploaded = None;
    }

    #[inline]
    #[must_use]
    pub fn buffer(&self) -> Option<&ConstantBuffer> {
        self.buffer.as_ref()
    }

    #[inline]
    #[must_use]
    pub fn get(&self) -> &T {
        &self.data
    }

    /// Mutable payload access; the next [`sync`](Self::sync) compares against
    /// the last upload, so no explicit dirty marking is needed.
    #[inline]
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.data
    }

    pub fn set(&mut self, data: T) {
        self.data = data;
    }

    /// Whether the payload differs from what the GPU last received.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.uploaded.as_ref() != Some(&self.data)
    }

    /// Uploads only when the payload changed since the last upload.
    /// Returns whether an upload was issued.
    pub fn sync(&mut self, device: &mut dyn DeviceContext) -> bool {
        if self.is_dirty() {
            self.upload(device)
        } else {
            false
        }
    }

    /// Uploads unconditionally (buffers registered by name may be shared
    /// between cores). Returns `false` when the block is unbound.
    pub fn upload(&mut self, device: &mut dyn DeviceContext) -> bool {
        let Some(buffer) = &self.buffer else {
            return false;
        };
        device.upload(buffer, bytemuck::bytes_of(&self.data));
        self.uploaded = Some(self.data);
        self.upload_count += 1;
        true
    }

    /// Number of uploads issued through this block.
    #[must_use]
    pub fn upload_count(&self) -> u64 {
        self.upload_count
    }
}
