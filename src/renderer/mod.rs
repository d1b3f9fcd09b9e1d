//! Rendering
//!
//! - [`core`]: device abstraction, state guard, technique boundary, render-core trait
//! - [`graph`]: per-frame context and the depth-stencil pool
//! - [`passes`]: the post-effect cores

pub mod core;
pub mod graph;
pub mod passes;
