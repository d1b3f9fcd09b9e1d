//! Cross-section demo on the software device.
//!
//! Clips a cube against a tilted plane and prints the frame as ASCII:
//! `#` section fill, `o` cube surface, `.` background.
//!
//! Run with `RUST_LOG=debug cargo run --example cross_section`.

use glam::{Mat4, Vec3, Vec4};

use myth_postfx::backend::software::{Geometry, SoftwareDevice, reference_technique};
use myth_postfx::renderer::core::{DeviceContext, MeshDraw, RenderCore};
use myth_postfx::renderer::graph::{DepthStencilPool, FrameContext, RenderBuffer};
use myth_postfx::renderer::passes::CrossSectionCore;
use myth_postfx::settings::PostFxSettings;

const WIDTH: u32 = 48;
const HEIGHT: u32 = 24;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let settings = PostFxSettings::from_json_str(
        r#"{
            "cross_section": {
                "section_color": "red",
                "planes_enabled": [true, false, false, false],
                "planes": [[0.0, 0.0, 1.0, -0.25], [0,0,0,0], [0,0,0,0], [0,0,0,0]]
            }
        }"#,
    )?;

    let mut device = SoftwareDevice::new(WIDTH, HEIGHT);
    let view = Mat4::look_at_rh(Vec3::new(2.0, 1.5, 3.0), Vec3::ZERO, Vec3::Y);
    let projection = Mat4::orthographic_rh(-2.4, 2.4, -1.6, 1.6, 0.1, 10.0);
    device.set_view_projection(projection * view);

    let cube_color = Vec4::new(0.3, 0.6, 0.9, 1.0);
    let cube = device.add_geometry(Geometry::cube(Vec3::ZERO, 1.0, cube_color));
    let technique = reference_technique(&mut device, "Mesh");

    let buffer = RenderBuffer {
        width: WIDTH,
        height: HEIGHT,
        color_sample_count: 1,
        depth_stencil: device.create_depth_stencil_default(),
        post_process_target: device.create_render_target_default(),
    };
    device.set_output_targets(
        Some(&buffer.depth_stencil),
        std::slice::from_ref(&buffer.post_process_target),
    );
    let mut pool = DepthStencilPool::new(WIDTH, HEIGHT);

    let mut core = CrossSectionCore::from_settings(&settings.cross_section)?;
    core.set_geometry(Some(MeshDraw::new(cube)));
    core.attach(technique.as_ref())?;

    let section_color = core.section_color();
    {
        let mut frame = FrameContext::new(&mut device, &buffer, &mut pool);
        core.render(&mut frame);
    }

    for y in 0..HEIGHT {
        let row: String = (0..WIDTH)
            .map(|x| {
                let pixel = device.color_at(&buffer.post_process_target, x, y);
                if pixel == section_color {
                    '#'
                } else if pixel == cube_color {
                    'o'
                } else {
                    '.'
                }
            })
            .collect();
        println!("{row}");
    }

    log::info!("{} commands recorded", device.commands().len());
    Ok(())
}
