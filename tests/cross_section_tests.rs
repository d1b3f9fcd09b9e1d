//! Cross-Section Core Tests
//!
//! Tests for:
//! - Stencil mask: back faces of the clipped mesh mark exactly the exposed interior
//! - Section fill: screen quad colours only stencil == 1 pixels
//! - Constant buffer: uploaded parameters match the last values set
//! - State restore: targets, topology, rasterizer and ref counts survive a render
//! - Early return without a depth-stencil target

use std::sync::Arc;

use glam::{Mat4, Vec3, Vec4};

use myth_postfx::backend::software::{Geometry, SoftwareDevice, SoftwareTechnique, reference_technique};
use myth_postfx::renderer::core::{
    DeviceContext, MeshDraw, RasterizerState, RenderCore, Viewport, buffer_names, pass_names,
};
use myth_postfx::renderer::graph::{DepthStencilPool, FrameContext, RenderBuffer};
use myth_postfx::renderer::passes::CrossSectionCore;
use myth_postfx::resources::{ClipParamsUniforms, color};

const SIZE: u32 = 16;
const CUBE_COLOR: Vec4 = Vec4::new(0.2, 0.6, 0.2, 1.0);

struct Fixture {
    device: SoftwareDevice,
    technique: Arc<SoftwareTechnique>,
    buffer: RenderBuffer,
    pool: DepthStencilPool,
    cube: MeshDraw,
}

/// Unit cube seen down -Z through a [-2, 2] orthographic box: it covers
/// pixels 4..12 on both axes, front face at depth 0.25, back face at 0.75.
fn fixture() -> Fixture {
    let mut device = SoftwareDevice::new(SIZE, SIZE);
    device.set_view_projection(Mat4::orthographic_rh(-2.0, 2.0, -2.0, 2.0, -2.0, 2.0));
    let cube = MeshDraw::new(device.add_geometry(Geometry::cube(Vec3::ZERO, 1.0, CUBE_COLOR)));
    let technique = reference_technique(&mut device, "Mesh");

    let color_target = device.create_render_target_default();
    let depth_stencil = device.create_depth_stencil_default();
    device.set_output_targets(Some(&depth_stencil), std::slice::from_ref(&color_target));

    let buffer = RenderBuffer {
        width: SIZE,
        height: SIZE,
        color_sample_count: 1,
        depth_stencil,
        post_process_target: color_target,
    };
    Fixture {
        device,
        technique,
        buffer,
        pool: DepthStencilPool::new(SIZE, SIZE),
        cube,
    }
}

fn render(core: &mut CrossSectionCore, f: &mut Fixture) {
    let mut frame = FrameContext::new(&mut f.device, &f.buffer, &mut f.pool);
    core.render(&mut frame);
}

fn attached_core(f: &Fixture) -> CrossSectionCore {
    let mut core = CrossSectionCore::new();
    core.set_geometry(Some(f.cube));
    core.attach(f.technique.as_ref()).unwrap();
    core
}

fn inside_cube(x: u32, y: u32) -> bool {
    (4..12).contains(&x) && (4..12).contains(&y)
}

// ============================================================================
// Stencil mask & section fill
// ============================================================================

#[test]
fn plane_facing_camera_fills_whole_silhouette() {
    let mut f = fixture();
    let mut core = attached_core(&f);
    core.set_section_color(color::RED);
    core.set_plane(0, Vec4::new(0.0, 0.0, 1.0, 0.0));
    core.set_plane_enabled(0, true);

    render(&mut core, &mut f);

    let ds = &f.buffer.depth_stencil;
    let target = &f.buffer.post_process_target;
    for y in 0..SIZE {
        for x in 0..SIZE {
            if inside_cube(x, y) {
                assert_eq!(f.device.stencil_at(ds, x, y), 1, "stencil at ({x}, {y})");
                assert_eq!(f.device.color_at(target, x, y), color::RED, "colour at ({x}, {y})");
            } else {
                assert_eq!(f.device.stencil_at(ds, x, y), 0, "stencil at ({x}, {y})");
                assert_eq!(f.device.color_at(target, x, y), Vec4::ZERO, "colour at ({x}, {y})");
            }
        }
    }
}

#[test]
fn side_plane_masks_unclipped_half_only() {
    let mut f = fixture();
    let mut core = attached_core(&f);
    core.set_section_color(color::RED);
    core.set_plane(0, Vec4::new(1.0, 0.0, 0.0, 0.0));
    core.set_plane_enabled(0, true);

    render(&mut core, &mut f);

    let ds = &f.buffer.depth_stencil;
    let target = &f.buffer.post_process_target;
    for y in 4..12 {
        for x in 4..8 {
            assert_eq!(f.device.stencil_at(ds, x, y), 1);
            assert_eq!(f.device.color_at(target, x, y), color::RED);
        }
        for x in 8..12 {
            assert_eq!(f.device.stencil_at(ds, x, y), 0);
            assert_eq!(f.device.color_at(target, x, y), CUBE_COLOR);
        }
    }
    // Depth from the mesh pass only: front face.
    assert!((f.device.depth_at(ds, 6, 6) - 0.25).abs() < 1e-5);
}

#[test]
fn no_enabled_plane_fills_every_back_face() {
    let mut f = fixture();
    let mut core = attached_core(&f);
    core.set_plane(0, Vec4::new(1.0, 0.0, 0.0, 0.0));

    render(&mut core, &mut f);

    // Back faces still mark the stencil, the quad paints them: the section
    // colour replaces the mesh wherever the back faces are unclipped.
    let ds = &f.buffer.depth_stencil;
    assert_eq!(f.device.stencil_at(ds, 9, 9), 1);
    assert_eq!(f.device.color_at(&f.buffer.post_process_target, 9, 9), color::FIREBRICK);
    assert_eq!(f.device.color_at(&f.buffer.post_process_target, 1, 1), Vec4::ZERO);
}

// ============================================================================
// Constant buffer
// ============================================================================

#[test]
fn uploaded_params_match_last_values_set() {
    let mut f = fixture();
    let mut core = attached_core(&f);

    core.set_section_color(color::GREEN);
    core.set_plane(1, Vec4::new(0.0, 1.0, 0.0, -0.5));
    core.set_plane_enabled(1, true);
    core.set_section_color(color::YELLOW);

    render(&mut core, &mut f);

    let uploaded: ClipParamsUniforms = f
        .device
        .uniforms()
        .get(buffer_names::CLIP_PARAMS_CB)
        .unwrap();
    assert_eq!(uploaded.cross_section_color, color::YELLOW);
    assert_eq!(uploaded.enable_planes, [0, 1, 0, 0]);
    assert_eq!(uploaded.plane_params.col(1), Vec4::new(0.0, 1.0, 0.0, -0.5));
    assert_eq!(&uploaded, core.clip_params());
}

#[test]
fn params_uploaded_every_frame() {
    let mut f = fixture();
    let mut core = attached_core(&f);
    render(&mut core, &mut f);
    render(&mut core, &mut f);
    assert_eq!(f.device.upload_count(buffer_names::CLIP_PARAMS_CB), 2);
}

// ============================================================================
// State restore
// ============================================================================

#[test]
fn render_restores_caller_state() {
    let mut f = fixture();
    let mut core = attached_core(&f);
    core.set_plane_enabled(0, true);

    let caller_raster = RasterizerState {
        cull_mode: None,
        ..RasterizerState::default()
    };
    f.device.set_rasterizer_state(&caller_raster);
    f.device.set_primitive_topology(wgpu::PrimitiveTopology::LineList);
    f.device.set_viewport(Viewport::new(8, 8));
    let targets_before = f.device.output_targets();
    let ds_refs = f.buffer.depth_stencil.ref_count();
    let color_refs = f.buffer.post_process_target.ref_count();

    render(&mut core, &mut f);

    assert_eq!(f.device.output_targets(), targets_before);
    assert_eq!(f.device.rasterizer_state(), caller_raster);
    assert_eq!(f.device.primitive_topology(), wgpu::PrimitiveTopology::LineList);
    assert_eq!(f.device.viewport(), Viewport::new(8, 8));
    assert_eq!(f.buffer.depth_stencil.ref_count(), ds_refs);
    assert_eq!(f.buffer.post_process_target.ref_count(), color_refs);
}

#[test]
fn missing_depth_stencil_draws_mesh_only() {
    let mut f = fixture();
    let mut core = attached_core(&f);
    let color_target = f.buffer.post_process_target.clone();
    f.device.set_output_targets(None, std::slice::from_ref(&color_target));
    f.device.set_primitive_topology(wgpu::PrimitiveTopology::PointList);
    f.device.clear_commands();

    render(&mut core, &mut f);

    assert_eq!(f.device.mesh_draw_count(), 1);
    assert_eq!(f.device.draw_count(), 0);
    assert_eq!(f.device.color_at(&color_target, 6, 6), CUBE_COLOR);
    assert_eq!(f.device.primitive_topology(), wgpu::PrimitiveTopology::PointList);
    let targets = f.device.output_targets();
    assert!(targets.depth_stencil.is_none());
    assert_eq!(targets.colors.as_slice(), std::slice::from_ref(&color_target));
}

#[test]
fn draw_sequence_uses_expected_passes_and_refs() {
    use myth_postfx::backend::software::Command;

    let mut f = fixture();
    let mut core = attached_core(&f);
    f.device.clear_commands();
    render(&mut core, &mut f);

    let draws: Vec<(Option<String>, u32)> = f
        .device
        .commands()
        .iter()
        .filter_map(|c| match c {
            Command::DrawMesh { pass, stencil_ref, .. } | Command::Draw { pass, stencil_ref, .. } => {
                Some((pass.clone(), *stencil_ref))
            }
            _ => None,
        })
        .collect();
    assert_eq!(
        draws,
        vec![
            (Some(pass_names::MESH_DEFAULT.to_string()), 0),
            (Some(pass_names::BACKFACE.to_string()), 1),
            (Some(pass_names::SCREEN_QUAD.to_string()), 1),
        ]
    );
    let backface_cull = f.device.commands().iter().find_map(|c| match c {
        Command::DrawMesh { pass: Some(p), cull_mode, .. } if p == pass_names::BACKFACE => Some(*cull_mode),
        _ => None,
    });
    assert_eq!(backface_cull, Some(Some(wgpu::Face::Front)));
}

// ============================================================================
// Lifecycle
// ============================================================================

#[test]
fn detached_core_does_nothing() {
    let mut f = fixture();
    let mut core = CrossSectionCore::new();
    core.set_geometry(Some(f.cube));
    f.device.clear_commands();

    render(&mut core, &mut f);
    assert!(f.device.commands().is_empty());

    core.attach(f.technique.as_ref()).unwrap();
    core.detach();
    render(&mut core, &mut f);
    assert!(f.device.commands().is_empty());
}

#[test]
fn no_geometry_draws_nothing() {
    let mut f = fixture();
    let mut core = attached_core(&f);
    core.set_geometry(None);
    f.device.clear_commands();
    render(&mut core, &mut f);
    assert_eq!(f.device.mesh_draw_count(), 0);
    assert_eq!(f.device.draw_count(), 0);
}

#[test]
fn attach_fails_when_a_pass_is_missing() {
    let f = fixture();
    f.technique.remove_pass(pass_names::SCREEN_QUAD);
    let mut core = CrossSectionCore::new();
    assert!(core.attach(f.technique.as_ref()).is_err());
    assert!(!core.is_attached());
}
