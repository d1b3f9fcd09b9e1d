//! CPU-side data owned by the post-effect cores and scene nodes.

pub mod attributes;
pub mod color;
pub mod uniforms;
pub mod version_tracker;

pub use attributes::{AttributeValue, COLOR_ATTRIBUTE, EffectAttributes};
pub use uniforms::{BorderEffectUniforms, ClipParamsUniforms};
pub use version_tracker::{ChangeTracker, set_if_changed};
