//! Transient Depth-Stencil Pool
//!
//! Hands out single-sample depth-stencil buffers for passes that cannot use the
//! primary (multisampled) depth buffer directly. Buffers are keyed by pixel
//! format and sized to the pool extent.
//!
//! # Design
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │              DepthStencilPool                        │
//! │                                                     │
//! │  free:        FxHashMap<Format, Vec<Pooled>>        │
//! │  outstanding: FxHashMap<Format, usize>              │
//! │                                                     │
//! │  checkout(format) → view   (during a render call)   │
//! │  release(format, view)     (before it returns)      │
//! │  lease(format)    → RAII guard doing both           │
//! │  end_frame()               (warns on imbalance)     │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! # Memory Strategy
//!
//! - Buffers are **never** destroyed during normal rendering; they remain
//!   in the free list for reuse.
//! - The pool grows on demand: if no free buffer of the format exists, a new
//!   one is created through the device.
//! - Every checkout must be released within the same render call. An
//!   unreleased checkout makes the pool grow by one buffer per frame.
//! - Call [`DepthStencilPool::trim`] after resolution changes to release
//!   buffers that have been idle for several frames.

use std::ops::Deref;

use rustc_hash::FxHashMap;

use crate::renderer::core::{DepthStencilView, DeviceContext, TargetDesc};

/// Per-format counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PoolStats {
    pub checkouts: u64,
    pub releases: u64,
    pub created: u64,
}

struct PooledBuffer {
    view: DepthStencilView,
    /// Number of `trim` calls this buffer spent in the free list unused.
    idle_frames: u32,
}

pub struct DepthStencilPool {
    width: u32,
    height: u32,
    free: FxHashMap<wgpu::TextureFormat, Vec<PooledBuffer>>,
    outstanding: FxHashMap<wgpu::TextureFormat, usize>,
    stats: FxHashMap<wgpu::TextureFormat, PoolStats>,
}

impl DepthStencilPool {
    /// Creates an empty pool producing `width` × `height` buffers.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            free: FxHashMap::default(),
            outstanding: FxHashMap::default(),
            stats: FxHashMap::default(),
        }
    }

    #[must_use]
    pub fn extent(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Switches the pool to a new extent, dropping free buffers of the old one.
    pub fn ensure_extent(&mut self, width: u32, height: u32) {
        if (width, height) == (self.width, self.height) {
            return;
        }
        log::debug!(
            "DepthStencilPool resized ({}x{} -> {}x{}), dropping {} free buffers",
            self.width,
            self.height,
            width,
            height,
            self.free.values().map(Vec::len).sum::<usize>()
        );
        self.width = width;
        self.height = height;
        self.free.clear();
    }

    /// Takes a buffer of `format` out of the pool, creating one when none is free.
    pub fn checkout(
        &mut self,
        device: &mut dyn DeviceContext,
        format: wgpu::TextureFormat,
    ) -> DepthStencilView {
        let stats = self.stats.entry(format).or_default();
        stats.checkouts += 1;

        let view = if let Some(pooled) = self.free.get_mut(&format).and_then(Vec::pop) {
            pooled.view
        } else {
            stats.created += 1;
            device.create_depth_stencil(TargetDesc::new(
                "Pooled DepthStencil",
                self.width,
                self.height,
                format,
            ))
        };

        *self.outstanding.entry(format).or_default() += 1;
        view
    }

    /// Returns a buffer obtained from [`checkout`](Self::checkout).
    ///
    /// Buffers whose format or extent no longer match the pool are dropped
    /// instead of being pooled.
    pub fn release(&mut self, format: wgpu::TextureFormat, view: DepthStencilView) {
        self.stats.entry(format).or_default().releases += 1;

        match self.outstanding.get_mut(&format) {
            Some(count) if *count > 0 => *count -= 1,
            _ => log::warn!("DepthStencilPool: release of {format:?} without a matching checkout"),
        }

        let desc = view.desc();
        if desc.format != format || (desc.width, desc.height) != (self.width, self.height) {
            log::debug!(
                "DepthStencilPool: dropping stale buffer ({:?} {}x{})",
                desc.format,
                desc.width,
                desc.height
            );
            return;
        }

        self.free.entry(format).or_default().push(PooledBuffer {
            view,
            idle_frames: 0,
        });
    }

    /// Checks out a buffer that is released automatically when the lease drops.
    pub fn lease(
        &mut self,
        device: &mut dyn DeviceContext,
        format: wgpu::TextureFormat,
    ) -> DepthStencilLease<'_> {
        let view = self.checkout(device, format);
        DepthStencilLease {
            pool: self,
            format,
            view: Some(view),
        }
    }

    /// Number of checkouts of `format` not yet released.
    #[must_use]
    pub fn outstanding(&self, format: wgpu::TextureFormat) -> usize {
        self.outstanding.get(&format).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn stats(&self, format: wgpu::TextureFormat) -> PoolStats {
        self.stats.get(&format).copied().unwrap_or_default()
    }

    /// Frame boundary check: logs every format with unreleased checkouts.
    /// Returns the total number of outstanding buffers.
    pub fn end_frame(&mut self) -> usize {
        let mut total = 0;
        for (format, count) in &self.outstanding {
            if *count > 0 {
                log::warn!("DepthStencilPool: {count} buffer(s) of {format:?} not released this frame");
                total += count;
            }
        }
        total
    }

    /// Release free buffers that have been idle for more than `max_idle_frames`.
    pub fn trim(&mut self, max_idle_frames: u32) {
        for bucket in self.free.values_mut() {
            for pooled in bucket.iter_mut() {
                pooled.idle_frames += 1;
            }
            bucket.retain(|pooled| pooled.idle_frames <= max_idle_frames);
        }
        self.free.retain(|_, bucket| !bucket.is_empty());
    }

    /// Number of free buffers currently held by the pool.
    #[must_use]
    pub fn free_count(&self) -> usize {
        self.free.values().map(Vec::len).sum()
    }

    /// Total buffers managed by the pool (free + outstanding).
    #[must_use]
    pub fn total_count(&self) -> usize {
        self.free_count() + self.outstanding.values().sum::<usize>()
    }
}

/// A checked-out depth-stencil buffer, returned to its pool on drop.
pub struct DepthStencilLease<'p> {
    pool: &'p mut DepthStencilPool,
    format: wgpu::TextureFormat,
    view: Option<DepthStencilView>,
}

impl DepthStencilLease<'_> {
    #[must_use]
    pub fn format(&self) -> wgpu::TextureFormat {
        self.format
    }
}

impl Deref for DepthStencilLease<'_> {
    type Target = DepthStencilView;

    fn deref(&self) -> &Self::Target {
        // `view` is only emptied in `drop`.
        match &self.view {
            Some(view) => view,
            None => unreachable!("lease used after release"),
        }
    }
}

impl Drop for DepthStencilLease<'_> {
    fn drop(&mut self) {
        if let Some(view) = self.view.take() {
            self.pool.release(self.format, view);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::software::SoftwareDevice;

    const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32FloatStencil8;

    #[test]
    fn test_checkout_release_reuses_buffer() {
        let mut device = SoftwareDevice::new(8, 8);
        let mut pool = DepthStencilPool::new(8, 8);

        let first = pool.checkout(&mut device, FORMAT);
        let first_id = first.id();
        assert_eq!(pool.outstanding(FORMAT), 1);
        pool.release(FORMAT, first);
        assert_eq!(pool.outstanding(FORMAT), 0);

        let second = pool.checkout(&mut device, FORMAT);
        assert_eq!(second.id(), first_id, "free buffer should be reused");
        pool.release(FORMAT, second);

        let stats = pool.stats(FORMAT);
        assert_eq!(stats.checkouts, 2);
        assert_eq!(stats.releases, 2);
        assert_eq!(stats.created, 1);
        assert_eq!(pool.total_count(), 1);
    }

    #[test]
    fn test_lease_releases_on_drop() {
        let mut device = SoftwareDevice::new(8, 8);
        let mut pool = DepthStencilPool::new(8, 8);
        {
            let lease = pool.lease(&mut device, FORMAT);
            assert_eq!(lease.desc().format, FORMAT);
        }
        assert_eq!(pool.outstanding(FORMAT), 0);
        assert_eq!(pool.end_frame(), 0);
        assert_eq!(pool.free_count(), 1);
    }

    #[test]
    fn test_unreleased_checkout_grows_pool() {
        let mut device = SoftwareDevice::new(8, 8);
        let mut pool = DepthStencilPool::new(8, 8);
        let leaked = pool.checkout(&mut device, FORMAT);
        assert_eq!(pool.end_frame(), 1);
        let other = pool.checkout(&mut device, FORMAT);
        assert_ne!(leaked.id(), other.id());
        assert_eq!(pool.stats(FORMAT).created, 2);
    }

    #[test]
    fn test_formats_are_separate() {
        let mut device = SoftwareDevice::new(8, 8);
        let mut pool = DepthStencilPool::new(8, 8);
        let a = pool.checkout(&mut device, FORMAT);
        let b = pool.checkout(&mut device, wgpu::TextureFormat::Depth24PlusStencil8);
        pool.release(FORMAT, a);
        assert_eq!(pool.outstanding(wgpu::TextureFormat::Depth24PlusStencil8), 1);
        pool.release(wgpu::TextureFormat::Depth24PlusStencil8, b);
        assert_eq!(pool.free_count(), 2);
    }

    #[test]
    fn test_resize_drops_stale_buffers() {
        let mut device = SoftwareDevice::new(8, 8);
        let mut pool = DepthStencilPool::new(8, 8);
        let view = pool.checkout(&mut device, FORMAT);
        pool.ensure_extent(16, 16);
        pool.release(FORMAT, view);
        assert_eq!(pool.free_count(), 0);
        assert_eq!(pool.outstanding(FORMAT), 0);
    }

    #[test]
    fn test_trim_idle_buffers() {
        let mut device = SoftwareDevice::new(8, 8);
        let mut pool = DepthStencilPool::new(8, 8);
        let view = pool.checkout(&mut device, FORMAT);
        pool.release(FORMAT, view);
        pool.trim(1);
        assert_eq!(pool.free_count(), 1);
        pool.trim(1);
        assert_eq!(pool.free_count(), 0);
    }
}
