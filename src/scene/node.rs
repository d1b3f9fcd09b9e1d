//! Scene nodes as seen by the post-effect cores.
//!
//! The scene graph itself belongs to the host. Cores only need to ask a node
//! for its technique, look up its effect tags and make it issue its draw.

use std::sync::Arc;

use crate::renderer::core::{DeviceContext, MeshDraw, Technique};
use crate::resources::EffectAttributes;

pub trait EffectNode {
    fn label(&self) -> &str;

    /// Technique whose passes this node is drawn with.
    fn technique(&self) -> &dyn Technique;

    /// Effect tag lookup. `None` when the node is not tagged with `effect_name`.
    fn post_effect(&self, effect_name: &str) -> Option<&EffectAttributes>;

    /// Issues the node's geometry with whatever pass and state are bound.
    fn render(&self, device: &mut dyn DeviceContext);
}

/// A mesh with a technique and a list of post-effect tags.
#[derive(Clone)]
pub struct MeshNode {
    label: String,
    technique: Arc<dyn Technique>,
    mesh: MeshDraw,
    effects: Vec<EffectAttributes>,
}

impl MeshNode {
    pub fn new(label: impl Into<String>, technique: Arc<dyn Technique>, mesh: MeshDraw) -> Self {
        Self {
            label: label.into(),
            technique,
            mesh,
            effects: Vec::new(),
        }
    }

    /// Tags the node. A later tag with the same effect name replaces the earlier one.
    #[must_use]
    pub fn with_effect(mut self, effect: EffectAttributes) -> Self {
        self.add_effect(effect);
        self
    }

    pub fn add_effect(&mut self, effect: EffectAttributes) {
        self.effects
            .retain(|existing| existing.effect_name() != effect.effect_name());
        self.effects.push(effect);
    }

    pub fn remove_effect(&mut self, effect_name: &str) -> Option<EffectAttributes> {
        let index = self
            .effects
            .iter()
            .position(|effect| effect.effect_name() == effect_name)?;
        Some(self.effects.remove(index))
    }

    #[inline]
    #[must_use]
    pub fn mesh(&self) -> &MeshDraw {
        &self.mesh
    }
}

impl std::fmt::Debug for MeshNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MeshNode")
            .field("label", &self.label)
            .field("technique", &self.technique.name())
            .field("mesh", &self.mesh)
            .field("effects", &self.effects.len())
            .finish()
    }
}

impl EffectNode for MeshNode {
    fn label(&self) -> &str {
        &self.label
    }

    fn technique(&self) -> &dyn Technique {
        self.technique.as_ref()
    }

    fn post_effect(&self, effect_name: &str) -> Option<&EffectAttributes> {
        self.effects
            .iter()
            .find(|effect| effect.effect_name() == effect_name)
    }

    fn render(&self, device: &mut dyn DeviceContext) {
        device.draw_mesh(&self.mesh);
    }
}
