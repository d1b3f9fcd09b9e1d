//! 帧级资源组织
//!
//! 提供：
//! - FrameContext: 每帧传递给渲染核心的上下文
//! - RenderBuffer: 主渲染缓冲区描述
//! - DepthStencilPool: 单采样深度模板缓冲池

pub mod frame;
pub mod transient_pool;

pub use frame::{FrameContext, RenderBuffer};
pub use transient_pool::{DepthStencilLease, DepthStencilPool, PoolStats};
