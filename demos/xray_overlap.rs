//! X-ray overlap demo on the software device.
//!
//! Renders two overlapping tagged quads in single-pass and double-pass mode
//! and prints which colour ended up in the overlap.
//!
//! Run with `RUST_LOG=debug cargo run --example xray_overlap`.

use std::sync::Arc;

use glam::{Vec3, Vec4};

use myth_postfx::backend::software::{Geometry, SoftwareDevice, reference_technique};
use myth_postfx::renderer::core::{MeshDraw, RenderCore, Technique};
use myth_postfx::renderer::graph::{DepthStencilPool, FrameContext, RenderBuffer};
use myth_postfx::renderer::passes::XRayEffectCore;
use myth_postfx::resources::EffectAttributes;
use myth_postfx::scene::{EffectNode, MeshNode};
use myth_postfx::settings::XRaySettings;

const SIZE: u32 = 16;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let mut device = SoftwareDevice::new(SIZE, SIZE);
    let technique: Arc<dyn Technique> = reference_technique(&mut device, "XRay");

    let mut node = |label: &str, x: f32, color: &str| {
        let geometry = device.add_geometry(Geometry::quad(Vec3::new(x, 0.0, 0.5), 0.5, Vec4::ONE));
        MeshNode::new(label, technique.clone(), MeshDraw::new(geometry)).with_effect(
            EffectAttributes::new(XRaySettings::default().effect_name).with_raw("Color", color),
        )
    };
    let first = node("First", -0.25, "#FF0000");
    let second = node("Second", 0.25, "#00FF00");
    let nodes: [&dyn EffectNode; 2] = [&first, &second];

    let buffer = RenderBuffer {
        width: SIZE,
        height: SIZE,
        color_sample_count: 1,
        depth_stencil: device.create_depth_stencil_default(),
        post_process_target: device.create_render_target_default(),
    };
    let mut pool = DepthStencilPool::new(SIZE, SIZE);

    for double_pass in [false, true] {
        let settings = XRaySettings {
            double_pass,
            ..XRaySettings::default()
        };
        let mut core = XRayEffectCore::from_settings(&settings)?;
        core.attach(technique.as_ref())?;
        {
            let mut frame =
                FrameContext::new(&mut device, &buffer, &mut pool).with_post_effect_nodes(&nodes);
            core.render(&mut frame);
        }

        let overlap = device.color_at(&buffer.post_process_target, SIZE / 2, SIZE / 2);
        println!(
            "{:<11} overlap = {overlap:?}, stats = {:?}",
            if double_pass { "double pass" } else { "single pass" },
            core.last_frame_stats()
        );
    }
    Ok(())
}
