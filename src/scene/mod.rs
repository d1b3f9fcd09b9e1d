//! Scene boundary consumed by the post-effect cores.

pub mod node;

pub use node::{EffectNode, MeshNode};
