//! CPU reference implementation of [`DeviceContext`].
//!
//! Keeps one colour, depth and stencil surface per view and executes draws
//! immediately. Multisampled views are stored single-sampled. A surface is
//! freed on the next allocation after its last view handle is dropped.
//!
//! Besides rendering, the device records a [`Command`] log and the last
//! contents of every constant buffer so tests can inspect what a render core
//! issued, not only what it produced.

use glam::{Mat4, UVec2, Vec2, Vec3, Vec4};
use rustc_hash::FxHashMap;

use super::geometry::Geometry;
use super::program::{FragmentInput, FragmentProgram, UniformStore};
use super::raster::{self, ScreenVertex};
use crate::renderer::core::{
    ClearFlags, ConstantBuffer, DepthStencilMode, DepthStencilView, DeviceContext, GeometryId,
    MeshDraw, PassId, PassState, RasterizerState, RenderTargetView, ShaderPass, TargetBinding,
    TargetDesc, ViewId, ViewToken, Viewport,
};

/// One recorded device call.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    ClearColor {
        view: ViewId,
        color: Vec4,
    },
    ClearDepthStencil {
        view: ViewId,
        flags: ClearFlags,
        depth: f32,
        stencil: u8,
    },
    SetTargets {
        depth_stencil: Option<ViewId>,
        colors: Vec<ViewId>,
    },
    BindPass {
        name: String,
    },
    Upload {
        buffer: &'static str,
        size: usize,
    },
    Draw {
        pass: Option<String>,
        stencil_ref: u32,
        vertex_count: u32,
        topology: wgpu::PrimitiveTopology,
    },
    DrawMesh {
        pass: Option<String>,
        stencil_ref: u32,
        geometry: GeometryId,
        cull_mode: Option<wgpu::Face>,
    },
}

struct ColorSurface {
    token: ViewToken,
    width: u32,
    height: u32,
    pixels: Vec<Vec4>,
}

struct DepthSurface {
    token: ViewToken,
    width: u32,
    height: u32,
    depth: Vec<f32>,
    stencil: Vec<u8>,
}

struct PassProgram {
    name: String,
    state: PassState,
    program: Box<dyn FragmentProgram>,
}

/// Primitive handed to the fragment pipeline.
struct Primitive {
    vertices: [ScreenVertex; 3],
    front_facing: bool,
    color: Vec4,
}

pub struct SoftwareDevice {
    width: u32,
    height: u32,
    view_projection: Mat4,

    colors: FxHashMap<ViewId, ColorSurface>,
    depths: FxHashMap<ViewId, DepthSurface>,
    geometries: FxHashMap<GeometryId, Geometry>,
    programs: FxHashMap<PassId, PassProgram>,
    next_geometry: u64,

    // Pipeline state
    targets: TargetBinding,
    viewport: Viewport,
    rasterizer: RasterizerState,
    topology: wgpu::PrimitiveTopology,
    depth_stencil: DepthStencilMode,
    stencil_ref: u32,
    bound_pass: Option<PassId>,

    uniforms: UniformStore,
    upload_counts: FxHashMap<&'static str, u64>,
    commands: Vec<Command>,
}

impl SoftwareDevice {
    /// Creates a device whose default viewport is `width` × `height`.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            view_projection: Mat4::IDENTITY,
            colors: FxHashMap::default(),
            depths: FxHashMap::default(),
            geometries: FxHashMap::default(),
            programs: FxHashMap::default(),
            next_geometry: 1,
            targets: TargetBinding::default(),
            viewport: Viewport::new(width, height),
            rasterizer: RasterizerState::default(),
            topology: wgpu::PrimitiveTopology::TriangleList,
            depth_stencil: DepthStencilMode::default(),
            stencil_ref: 0,
            bound_pass: None,
            uniforms: UniformStore::default(),
            upload_counts: FxHashMap::default(),
            commands: Vec::new(),
        }
    }

    // === Setup ===

    /// Transform applied to geometry positions by [`draw_mesh`](DeviceContext::draw_mesh).
    pub fn set_view_projection(&mut self, view_projection: Mat4) {
        self.view_projection = view_projection;
    }

    pub fn add_geometry(&mut self, geometry: Geometry) -> GeometryId {
        let id = GeometryId(self.next_geometry);
        self.next_geometry += 1;
        self.geometries.insert(id, geometry);
        id
    }

    /// Creates a shader pass backed by `program`.
    pub fn register_pass(
        &mut self,
        name: &str,
        state: PassState,
        program: impl FragmentProgram + 'static,
    ) -> ShaderPass {
        let pass = ShaderPass::new(name, state);
        self.programs.insert(
            pass.id(),
            PassProgram {
                name: name.to_string(),
                state,
                program: Box::new(program),
            },
        );
        pass
    }

    /// Device-sized `Rgba8Unorm` colour target.
    pub fn create_render_target_default(&mut self) -> RenderTargetView {
        let desc = TargetDesc::new("Color", self.width, self.height, wgpu::TextureFormat::Rgba8Unorm);
        self.create_render_target(desc)
    }

    /// Device-sized `Depth32FloatStencil8` buffer.
    pub fn create_depth_stencil_default(&mut self) -> DepthStencilView {
        let desc = TargetDesc::new(
            "DepthStencil",
            self.width,
            self.height,
            wgpu::TextureFormat::Depth32FloatStencil8,
        );
        self.create_depth_stencil(desc)
    }

    // === Readback ===

    #[must_use]
    pub fn color_at(&self, view: &RenderTargetView, x: u32, y: u32) -> Vec4 {
        self.colors
            .get(&view.id())
            .and_then(|s| (x < s.width && y < s.height).then(|| s.pixels[(y * s.width + x) as usize]))
            .unwrap_or(Vec4::ZERO)
    }

    #[must_use]
    pub fn depth_at(&self, view: &DepthStencilView, x: u32, y: u32) -> f32 {
        self.depths
            .get(&view.id())
            .and_then(|s| (x < s.width && y < s.height).then(|| s.depth[(y * s.width + x) as usize]))
            .unwrap_or(1.0)
    }

    #[must_use]
    pub fn stencil_at(&self, view: &DepthStencilView, x: u32, y: u32) -> u8 {
        self.depths
            .get(&view.id())
            .and_then(|s| (x < s.width && y < s.height).then(|| s.stencil[(y * s.width + x) as usize]))
            .unwrap_or(0)
    }

    /// Every pixel of a colour target, row-major.
    #[must_use]
    pub fn color_pixels(&self, view: &RenderTargetView) -> &[Vec4] {
        self.colors.get(&view.id()).map_or(&[], |s| s.pixels.as_slice())
    }

    #[must_use]
    pub fn uniforms(&self) -> &UniformStore {
        &self.uniforms
    }

    /// Number of uploads into the buffer named `name`.
    #[must_use]
    pub fn upload_count(&self, name: &str) -> u64 {
        self.upload_counts.get(name).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn clear_commands(&mut self) {
        self.commands.clear();
    }

    #[must_use]
    pub fn draw_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| matches!(c, Command::Draw { .. }))
            .count()
    }

    #[must_use]
    pub fn mesh_draw_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| matches!(c, Command::DrawMesh { .. }))
            .count()
    }

    /// Number of surfaces held by the device (colour + depth-stencil).
    #[must_use]
    pub fn surface_count(&self) -> usize {
        self.colors.len() + self.depths.len()
    }

    /// Frees every surface whose view has no handle left. Returns how many
    /// were freed.
    pub fn prune_surfaces(&mut self) -> usize {
        let before = self.surface_count();
        self.colors.retain(|_, surface| surface.token.is_alive());
        self.depths.retain(|_, surface| surface.token.is_alive());
        let freed = before - self.surface_count();
        if freed > 0 {
            log::debug!("SoftwareDevice: freed {freed} orphaned surfaces");
        }
        freed
    }

    // === Pipeline ===

    fn bound_pass_name(&self) -> Option<String> {
        self.bound_pass
            .and_then(|id| self.programs.get(&id))
            .map(|p| p.name.clone())
    }

    fn to_screen(&self, clip: Vec4, world: Vec3) -> ScreenVertex {
        let inv_w = 1.0 / clip.w;
        let ndc = clip.truncate() * inv_w;
        ScreenVertex {
            position: Vec2::new(
                (ndc.x + 1.0) * 0.5 * self.viewport.width as f32,
                (1.0 - ndc.y) * 0.5 * self.viewport.height as f32,
            ),
            depth: ndc.z,
            inv_w,
            world,
        }
    }

    /// Facing from the NDC winding, then culling. `None` when culled.
    fn assemble(&self, clip: [Vec4; 3], world: [Vec3; 3], color: Vec4) -> Option<Primitive> {
        let ndc = clip.map(|c| c.truncate().truncate() / c.w);
        let signed_area = (ndc[1].x - ndc[0].x) * (ndc[2].y - ndc[0].y)
            - (ndc[1].y - ndc[0].y) * (ndc[2].x - ndc[0].x);
        let ccw = signed_area > 0.0;
        let front_facing = match self.rasterizer.front_face {
            wgpu::FrontFace::Ccw => ccw,
            wgpu::FrontFace::Cw => !ccw,
        };
        let culled = match self.rasterizer.cull_mode {
            Some(wgpu::Face::Back) => !front_facing,
            Some(wgpu::Face::Front) => front_facing,
            None => false,
        };
        if culled {
            return None;
        }
        Some(Primitive {
            vertices: [0, 1, 2].map(|i| self.to_screen(clip[i], world[i])),
            front_facing,
            color,
        })
    }

    fn rasterize(&mut self, primitive: &Primitive) {
        let Some(pass_id) = self.bound_pass else {
            return;
        };
        let Some(pass) = self.programs.get(&pass_id) else {
            return;
        };

        let mode = self.depth_stencil;
        let reference = self.stencil_ref as u8;
        let read_mask = mode.stencil_read_mask as u8;
        let write_mask = mode.stencil_write_mask as u8;
        let color_ids: Vec<ViewId> = self.targets.colors.iter().map(RenderTargetView::id).collect();
        let depth_id = self.targets.depth_stencil.as_ref().map(DepthStencilView::id);

        let uniforms = &self.uniforms;
        let colors = &mut self.colors;
        let depths = &mut self.depths;

        raster::rasterize_triangle(
            primitive.vertices,
            self.viewport.width,
            self.viewport.height,
            |fragment| {
                if !(0.0..=1.0).contains(&fragment.depth) {
                    return;
                }
                let input = FragmentInput {
                    pixel: UVec2::new(fragment.x, fragment.y),
                    depth: fragment.depth,
                    world_position: fragment.world,
                    front_facing: primitive.front_facing,
                    color: primitive.color,
                };
                let Some(output) = pass.program.shade(&input, uniforms) else {
                    return;
                };

                if let Some(surface) = depth_id.and_then(|id| depths.get_mut(&id)) {
                    if fragment.x >= surface.width || fragment.y >= surface.height {
                        return;
                    }
                    let index = (fragment.y * surface.width + fragment.x) as usize;
                    let stencil = surface.stencil[index];
                    let face = mode.stencil;

                    if !raster::compare(face.compare, reference & read_mask, stencil & read_mask) {
                        surface.stencil[index] =
                            raster::apply_stencil_op(face.fail_op, stencil, reference, write_mask);
                        return;
                    }
                    if !raster::compare(mode.depth_compare, fragment.depth, surface.depth[index]) {
                        surface.stencil[index] =
                            raster::apply_stencil_op(face.depth_fail_op, stencil, reference, write_mask);
                        return;
                    }
                    surface.stencil[index] =
                        raster::apply_stencil_op(face.pass_op, stencil, reference, write_mask);
                    if mode.depth_write {
                        surface.depth[index] = fragment.depth;
                    }
                }

                for id in &color_ids {
                    let Some(surface) = colors.get_mut(id) else {
                        continue;
                    };
                    if fragment.x >= surface.width || fragment.y >= surface.height {
                        continue;
                    }
                    let index = (fragment.y * surface.width + fragment.x) as usize;
                    surface.pixels[index] = raster::blend(
                        pass.state.blend.as_ref(),
                        pass.state.color_writes,
                        output,
                        surface.pixels[index],
                    );
                }
            },
        );
    }
}

/// Full-screen procedural vertex `id` for `topology`, in NDC.
fn procedural_vertex(topology: wgpu::PrimitiveTopology, id: u32) -> Vec2 {
    match topology {
        wgpu::PrimitiveTopology::TriangleStrip => {
            Vec2::new(((id & 1) * 2) as f32 - 1.0, (((id >> 1) & 1) * 2) as f32 - 1.0)
        }
        _ => match id % 3 {
            0 => Vec2::new(-1.0, -1.0),
            1 => Vec2::new(3.0, -1.0),
            _ => Vec2::new(-1.0, 3.0),
        },
    }
}

impl DeviceContext for SoftwareDevice {
    fn create_render_target(&mut self, desc: TargetDesc) -> RenderTargetView {
        self.prune_surfaces();
        let len = (desc.width * desc.height) as usize;
        let (width, height) = (desc.width, desc.height);
        let view = RenderTargetView::new(desc);
        let surface = ColorSurface {
            token: view.downgrade(),
            width,
            height,
            pixels: vec![Vec4::ZERO; len],
        };
        self.colors.insert(view.id(), surface);
        view
    }

    fn create_depth_stencil(&mut self, desc: TargetDesc) -> DepthStencilView {
        self.prune_surfaces();
        let len = (desc.width * desc.height) as usize;
        let (width, height) = (desc.width, desc.height);
        let view = DepthStencilView::new(desc);
        let surface = DepthSurface {
            token: view.downgrade(),
            width,
            height,
            depth: vec![1.0; len],
            stencil: vec![0; len],
        };
        self.depths.insert(view.id(), surface);
        view
    }

    fn output_targets(&self) -> TargetBinding {
        self.targets.clone()
    }

    fn set_output_targets(&mut self, depth_stencil: Option<&DepthStencilView>, colors: &[RenderTargetView]) {
        self.commands.push(Command::SetTargets {
            depth_stencil: depth_stencil.map(DepthStencilView::id),
            colors: colors.iter().map(RenderTargetView::id).collect(),
        });
        self.targets = TargetBinding::new(depth_stencil, colors);
    }

    fn clear_render_target(&mut self, view: &RenderTargetView, color: Vec4) {
        self.commands.push(Command::ClearColor { view: view.id(), color });
        if let Some(surface) = self.colors.get_mut(&view.id()) {
            surface.pixels.fill(color);
        }
    }

    fn clear_depth_stencil(&mut self, view: &DepthStencilView, flags: ClearFlags, depth: f32, stencil: u8) {
        self.commands.push(Command::ClearDepthStencil {
            view: view.id(),
            flags,
            depth,
            stencil,
        });
        if let Some(surface) = self.depths.get_mut(&view.id()) {
            if flags.contains(ClearFlags::DEPTH) {
                surface.depth.fill(depth);
            }
            if flags.contains(ClearFlags::STENCIL) {
                surface.stencil.fill(stencil);
            }
        }
    }

    fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    fn rasterizer_state(&self) -> RasterizerState {
        self.rasterizer
    }

    fn set_rasterizer_state(&mut self, state: &RasterizerState) {
        self.rasterizer = *state;
    }

    fn primitive_topology(&self) -> wgpu::PrimitiveTopology {
        self.topology
    }

    fn set_primitive_topology(&mut self, topology: wgpu::PrimitiveTopology) {
        self.topology = topology;
    }

    fn depth_stencil_state(&self) -> (DepthStencilMode, u32) {
        (self.depth_stencil, self.stencil_ref)
    }

    fn set_depth_stencil_state(&mut self, mode: &DepthStencilMode, stencil_ref: u32) {
        self.depth_stencil = *mode;
        self.stencil_ref = stencil_ref;
    }

    fn bind_pass(&mut self, pass: &ShaderPass) {
        self.commands.push(Command::BindPass {
            name: pass.name().to_string(),
        });
        if self.programs.contains_key(&pass.id()) {
            self.bound_pass = Some(pass.id());
        } else {
            log::warn!("SoftwareDevice: pass '{}' was not registered on this device", pass.name());
            self.bound_pass = None;
        }
    }

    fn upload(&mut self, buffer: &ConstantBuffer, bytes: &[u8]) {
        if bytes.len() != buffer.size() {
            log::warn!(
                "SoftwareDevice: upload of {} bytes into '{}' ({} bytes), ignored",
                bytes.len(),
                buffer.name(),
                buffer.size()
            );
            return;
        }
        self.commands.push(Command::Upload {
            buffer: buffer.name(),
            size: bytes.len(),
        });
        self.uniforms.write(buffer.name(), bytes);
        *self.upload_counts.entry(buffer.name()).or_default() += 1;
    }

    fn draw(&mut self, vertex_count: u32, start_vertex: u32) {
        self.commands.push(Command::Draw {
            pass: self.bound_pass_name(),
            stencil_ref: self.stencil_ref,
            vertex_count,
            topology: self.topology,
        });

        let topology = self.topology;
        let vertex = |id: u32| {
            let p = procedural_vertex(topology, id);
            (Vec4::new(p.x, p.y, 0.0, 1.0), p.extend(0.0))
        };
        let triangle_count = match topology {
            wgpu::PrimitiveTopology::TriangleList => vertex_count / 3,
            wgpu::PrimitiveTopology::TriangleStrip => vertex_count.saturating_sub(2),
            other => {
                log::warn!("SoftwareDevice: procedural draw with {other:?} is not rasterised");
                0
            }
        };

        for i in 0..triangle_count {
            let ids = match topology {
                wgpu::PrimitiveTopology::TriangleStrip if i % 2 == 1 => [i + 1, i, i + 2],
                wgpu::PrimitiveTopology::TriangleStrip => [i, i + 1, i + 2],
                _ => [i * 3, i * 3 + 1, i * 3 + 2],
            };
            let [a, b, c] = ids.map(|id| vertex(start_vertex + id));
            if let Some(primitive) = self.assemble([a.0, b.0, c.0], [a.1, b.1, c.1], Vec4::ONE) {
                self.rasterize(&primitive);
            }
        }
    }

    fn draw_mesh(&mut self, mesh: &MeshDraw) {
        self.topology = wgpu::PrimitiveTopology::TriangleList;
        self.commands.push(Command::DrawMesh {
            pass: self.bound_pass_name(),
            stencil_ref: self.stencil_ref,
            geometry: mesh.geometry,
            cull_mode: self.rasterizer.cull_mode,
        });

        let Some(geometry) = self.geometries.get(&mesh.geometry) else {
            log::warn!("SoftwareDevice: unknown geometry {:?}", mesh.geometry);
            return;
        };

        let clip: Vec<Vec4> = geometry
            .positions
            .iter()
            .map(|p| self.view_projection * p.extend(1.0))
            .collect();
        let mut out_of_range = 0usize;
        let primitives: Vec<Primitive> = geometry
            .indices
            .chunks_exact(3)
            .filter_map(|tri| {
                let fetch = |i: u32| -> Option<(Vec4, Vec3)> {
                    let i = i as usize;
                    Some((*clip.get(i)?, *geometry.positions.get(i)?))
                };
                let (Some(a), Some(b), Some(c)) = (fetch(tri[0]), fetch(tri[1]), fetch(tri[2])) else {
                    out_of_range += 1;
                    return None;
                };
                self.assemble([a.0, b.0, c.0], [a.1, b.1, c.1], geometry.color)
            })
            .collect();
        if out_of_range > 0 {
            log::warn!(
                "SoftwareDevice: geometry {:?} has {out_of_range} triangles with out-of-range indices, skipped",
                mesh.geometry
            );
        }

        for _ in 0..mesh.instance_count {
            for primitive in &primitives {
                self.rasterize(primitive);
            }
        }
    }
}

impl std::fmt::Debug for SoftwareDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SoftwareDevice")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("surfaces", &self.surface_count())
            .field("geometries", &self.geometries.len())
            .field("passes", &self.programs.len())
            .field("commands", &self.commands.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::color;

    fn solid(color: Vec4) -> impl Fn(&FragmentInput, &UniformStore) -> Option<Vec4> {
        move |_, _| Some(color)
    }

    #[test]
    fn test_fullscreen_quad_covers_every_pixel_once() {
        let mut device = SoftwareDevice::new(8, 8);
        let target = device.create_render_target_default();
        let pass = device.register_pass(
            "Add",
            PassState {
                blend: Some(wgpu::BlendState {
                    color: wgpu::BlendComponent {
                        src_factor: wgpu::BlendFactor::One,
                        dst_factor: wgpu::BlendFactor::One,
                        operation: wgpu::BlendOperation::Add,
                    },
                    alpha: wgpu::BlendComponent::REPLACE,
                }),
                ..PassState::default()
            },
            solid(Vec4::new(0.25, 0.0, 0.0, 1.0)),
        );
        device.set_output_targets(None, std::slice::from_ref(&target));
        device.bind_pass(&pass);
        device.set_primitive_topology(wgpu::PrimitiveTopology::TriangleStrip);
        device.draw(4, 0);

        assert!(device
            .color_pixels(&target)
            .iter()
            .all(|p| (p.x - 0.25).abs() < 1e-6));
    }

    #[test]
    fn test_depth_test_keeps_nearest() {
        let mut device = SoftwareDevice::new(4, 4);
        let target = device.create_render_target_default();
        let depth = device.create_depth_stencil_default();
        device.set_output_targets(Some(&depth), std::slice::from_ref(&target));
        device.clear_depth_stencil(&depth, ClearFlags::DEPTH | ClearFlags::STENCIL, 1.0, 0);

        let pass = device.register_pass("Mesh", PassState::default(), |input: &FragmentInput, _: &UniformStore| {
            Some(input.color)
        });
        let near = device.add_geometry(Geometry::quad(Vec3::new(0.0, 0.0, 0.2), 1.0, color::RED));
        let far = device.add_geometry(Geometry::quad(Vec3::new(0.0, 0.0, 0.8), 1.0, color::GREEN));
        device.bind_pass(&pass);
        device.set_depth_stencil_state(&DepthStencilMode::default(), 0);
        device.draw_mesh(&MeshDraw::new(near));
        device.draw_mesh(&MeshDraw::new(far));

        assert_eq!(device.color_at(&target, 1, 1), color::RED);
        assert!((device.depth_at(&depth, 1, 1) - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_stencil_gates_color() {
        let mut device = SoftwareDevice::new(4, 4);
        let target = device.create_render_target_default();
        let depth = device.create_depth_stencil_default();
        device.set_output_targets(Some(&depth), std::slice::from_ref(&target));
        device.clear_depth_stencil(&depth, ClearFlags::STENCIL, 1.0, 0);

        let pass = device.register_pass("Quad", PassState::default(), solid(color::WHITE));
        device.bind_pass(&pass);
        device.set_primitive_topology(wgpu::PrimitiveTopology::TriangleStrip);
        let gated = DepthStencilMode::disabled()
            .with_stencil(wgpu::CompareFunction::Equal, wgpu::StencilOperation::Keep);
        device.set_depth_stencil_state(&gated, 1);
        device.draw(4, 0);

        assert_eq!(device.color_at(&target, 2, 2), Vec4::ZERO);
        assert_eq!(device.draw_count(), 1);
    }

    #[test]
    fn test_back_faces_culled() {
        let mut device = SoftwareDevice::new(4, 4);
        let target = device.create_render_target_default();
        device.set_output_targets(None, std::slice::from_ref(&target));
        let pass = device.register_pass("Mesh", PassState::default(), solid(color::WHITE));
        // Looking down -Z at a quad rotated to face away.
        let mut quad = Geometry::quad(Vec3::ZERO, 1.0, color::WHITE);
        quad.indices = vec![0, 2, 1, 0, 3, 2];
        let id = device.add_geometry(quad);
        device.bind_pass(&pass);
        device.draw_mesh(&MeshDraw::new(id));
        assert_eq!(device.color_at(&target, 2, 2), Vec4::ZERO);

        device.set_rasterizer_state(&RasterizerState {
            cull_mode: Some(wgpu::Face::Front),
            ..RasterizerState::default()
        });
        device.draw_mesh(&MeshDraw::new(id));
        assert_eq!(device.color_at(&target, 2, 2), color::WHITE);
    }

    #[test]
    fn test_unsized_upload_ignored() {
        let mut device = SoftwareDevice::new(1, 1);
        let buffer = ConstantBuffer::new(crate::renderer::core::BufferDesc::new("CB", 16));
        device.upload(&buffer, &[0u8; 8]);
        assert_eq!(device.upload_count("CB"), 0);
        device.upload(&buffer, &[1u8; 16]);
        assert_eq!(device.upload_count("CB"), 1);
        assert_eq!(device.uniforms().bytes("CB"), Some(&[1u8; 16][..]));
    }

    #[test]
    fn test_out_of_range_indices_skip_triangle() {
        let mut device = SoftwareDevice::new(4, 4);
        let target = device.create_render_target_default();
        device.set_output_targets(None, std::slice::from_ref(&target));
        let pass = device.register_pass("Mesh", PassState::default(), solid(color::WHITE));
        let mut quad = Geometry::quad(Vec3::ZERO, 1.0, color::WHITE);
        quad.indices = vec![0, 1, 7, 0, 1, 2, 0, 2, 3];
        let id = device.add_geometry(quad);

        device.bind_pass(&pass);
        device.draw_mesh(&MeshDraw::new(id));

        assert_eq!(device.mesh_draw_count(), 1);
        assert_eq!(device.color_at(&target, 2, 2), color::WHITE);
    }

    #[test]
    fn test_dropped_views_free_their_surfaces() {
        let mut device = SoftwareDevice::new(4, 4);
        let kept = device.create_render_target_default();
        let dropped = device.create_depth_stencil_default();
        let bound = device.create_depth_stencil_default();
        device.set_output_targets(Some(&bound), &[]);
        drop(bound);
        assert_eq!(device.surface_count(), 3);

        drop(dropped);
        assert_eq!(device.prune_surfaces(), 1);
        assert_eq!(device.surface_count(), 2);

        // The binding still holds a handle; releasing it frees the surface on
        // the next allocation.
        device.reset_targets();
        let _fresh = device.create_depth_stencil_default();
        assert_eq!(device.surface_count(), 2);
        assert_eq!(device.color_pixels(&kept).len(), 16);
    }
}
