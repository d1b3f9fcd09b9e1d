//! Render-target and depth-stencil view handles.
//!
//! Views are owned, reference-counted handles: cloning a view is the add-ref,
//! dropping it is the release. Introspection through
//! [`DeviceContext::output_targets`](super::DeviceContext::output_targets)
//! hands out clones, so every reference obtained that way is released exactly
//! once when the returned [`TargetBinding`] goes out of scope.

use std::sync::{Arc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use smallvec::SmallVec;

/// Global unique view ID generator
static NEXT_VIEW_ID: AtomicU64 = AtomicU64::new(1);

/// Backend-neutral identity of a view (key for backend surface maps).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct ViewId(u64);

impl ViewId {
    #[inline]
    #[must_use]
    pub fn raw(self) -> u64 {
        self.0
    }
}

/// Description of the texture behind a view.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TargetDesc {
    pub label: &'static str,
    pub width: u32,
    pub height: u32,
    pub format: wgpu::TextureFormat,
    pub sample_count: u32,
}

impl TargetDesc {
    #[must_use]
    pub fn new(label: &'static str, width: u32, height: u32, format: wgpu::TextureFormat) -> Self {
        Self {
            label,
            width,
            height,
            format,
            sample_count: 1,
        }
    }

    #[must_use]
    pub fn with_samples(mut self, sample_count: u32) -> Self {
        self.sample_count = sample_count;
        self
    }
}

#[derive(Debug)]
struct ViewInner {
    id: ViewId,
    desc: TargetDesc,
}

/// Non-owning reference to a view.
///
/// Backends keep one next to each surface and free the surface once the last
/// handle is gone.
#[derive(Clone, Debug)]
pub struct ViewToken(Weak<ViewInner>);

impl ViewToken {
    /// `true` while at least one handle to the view exists.
    #[inline]
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.0.strong_count() > 0
    }
}

macro_rules! view_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug)]
        pub struct $name(Arc<ViewInner>);

        impl $name {
            /// Wraps a freshly created view and assigns it a new ID.
            ///
            /// Called by [`DeviceContext`](super::DeviceContext) implementations.
            #[must_use]
            pub fn new(desc: TargetDesc) -> Self {
                Self(Arc::new(ViewInner {
                    id: ViewId(NEXT_VIEW_ID.fetch_add(1, Ordering::Relaxed)),
                    desc,
                }))
            }

            #[inline]
            #[must_use]
            pub fn id(&self) -> ViewId {
                self.0.id
            }

            #[inline]
            #[must_use]
            pub fn desc(&self) -> &TargetDesc {
                &self.0.desc
            }

            /// Number of live references to this view.
            #[must_use]
            pub fn ref_count(&self) -> usize {
                Arc::strong_count(&self.0)
            }

            /// Liveness token that does not count as a reference.
            #[must_use]
            pub fn downgrade(&self) -> ViewToken {
                ViewToken(Arc::downgrade(&self.0))
            }
        }

        impl PartialEq for $name {
            fn eq(&self, other: &Self) -> bool {
                self.0.id == other.0.id
            }
        }

        impl Eq for $name {}

        impl std::hash::Hash for $name {
            fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
                self.0.id.hash(state);
            }
        }
    };
}

view_handle!(
    /// Colour render-target view.
    RenderTargetView
);
view_handle!(
    /// Combined depth + stencil view.
    DepthStencilView
);

/// Snapshot of the output-merger bindings.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TargetBinding {
    pub colors: SmallVec<[RenderTargetView; 2]>,
    pub depth_stencil: Option<DepthStencilView>,
}

impl TargetBinding {
    #[must_use]
    pub fn new(depth_stencil: Option<&DepthStencilView>, colors: &[RenderTargetView]) -> Self {
        Self {
            colors: colors.iter().cloned().collect(),
            depth_stencil: depth_stencil.cloned(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.colors.is_empty() && self.depth_stencil.is_none()
    }
}
