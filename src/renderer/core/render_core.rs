//! Render-core capability trait.

use super::technique::Technique;
use crate::errors::Result;
use crate::renderer::graph::FrameContext;

/// A post-effect or mesh render core driven once per frame by the host.
///
/// Lifecycle: [`attach`](Self::attach) to a technique, call
/// [`render`](Self::render) every frame, [`detach`](Self::detach) when done.
/// Attach failures are returned to the host; a detached core never draws.
pub trait RenderCore {
    /// Short name used in log output.
    fn name(&self) -> &str;

    /// Resolves shader passes and registers constant buffers.
    ///
    /// On error the core stays detached.
    fn attach(&mut self, technique: &dyn Technique) -> Result<()>;

    /// Releases every pass and buffer handle.
    fn detach(&mut self);

    fn is_attached(&self) -> bool;

    /// Per-frame hook to refresh the uniform payload before upload.
    fn update_model_struct(&mut self) {}

    /// Issues the core's passes. Only called on attached cores.
    fn on_render(&mut self, frame: &mut FrameContext<'_>);

    fn render(&mut self, frame: &mut FrameContext<'_>) {
        if !self.is_attached() {
            log::warn!("{}: render called on a detached core, skipping", self.name());
            return;
        }
        self.update_model_struct();
        self.on_render(frame);
    }
}
