//! wgpu backend
//!
//! [`WgpuRecorder`] implements [`DeviceContext`] by recording the command
//! stream, then [`encode`](WgpuRecorder::encode)s it into a
//! [`wgpu::CommandEncoder`]. Immediate-mode calls map onto render passes as
//! follows:
//!
//! ```text
//! set_output_targets (changed)   → new render pass
//! clear_* before the first draw  → LoadOp::Clear of that attachment
//! upload                         → staging buffer + copy_buffer_to_buffer between passes
//! draw / draw_mesh               → set_pipeline + set_stencil_reference + draw
//! ```
//!
//! Pipelines, bind groups, mesh buffers and the GPU side of constant buffers
//! belong to the host and are looked up through [`PassResolver`].
//!
//! Recorded commands hold references to the views they touch until the
//! stream is encoded or [`discard`](WgpuRecorder::discard)ed. The GPU texture
//! of a view is released on the next allocation or encode after its last
//! handle is dropped.

use glam::Vec4;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use wgpu::util::DeviceExt;

use crate::renderer::core::{
    ClearFlags, ConstantBuffer, DepthStencilMode, DepthStencilView, DeviceContext, MeshDraw,
    PassId, RasterizerState, RenderTargetView, ShaderPass, TargetBinding, TargetDesc, ViewId,
    ViewToken, Viewport,
};
use crate::resources::color;

// ---------------------------------------------------------------------------
// Pipeline key
// ---------------------------------------------------------------------------

/// Everything that selects a `wgpu::RenderPipeline` for a recorded draw.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PipelineKey {
    pub pass: PassId,
    pub topology: wgpu::PrimitiveTopology,
    pub cull_mode: Option<wgpu::Face>,
    pub front_face: wgpu::FrontFace,
    pub unclipped_depth: bool,
    pub depth_bias: i32,
    pub depth_stencil: DepthStencilMode,
    pub color_formats: SmallVec<[wgpu::TextureFormat; 2]>,
    pub depth_format: Option<wgpu::TextureFormat>,
    pub sample_count: u32,
}

impl PipelineKey {
    #[must_use]
    pub fn primitive_state(&self) -> wgpu::PrimitiveState {
        wgpu::PrimitiveState {
            topology: self.topology,
            cull_mode: self.cull_mode,
            front_face: self.front_face,
            unclipped_depth: self.unclipped_depth,
            ..Default::default()
        }
    }

    /// Depth-stencil pipeline state, `None` when no depth-stencil target is bound.
    #[must_use]
    pub fn depth_stencil_state(&self) -> Option<wgpu::DepthStencilState> {
        let format = self.depth_format?;
        let mode = &self.depth_stencil;
        Some(wgpu::DepthStencilState {
            format,
            depth_write_enabled: Some(mode.depth_write),
            depth_compare: Some(mode.depth_compare),
            stencil: wgpu::StencilState {
                front: mode.stencil,
                back: mode.stencil,
                read_mask: mode.stencil_read_mask,
                write_mask: mode.stencil_write_mask,
            },
            bias: wgpu::DepthBiasState {
                constant: self.depth_bias,
                ..Default::default()
            },
        })
    }

    #[must_use]
    pub fn multisample_state(&self) -> wgpu::MultisampleState {
        wgpu::MultisampleState {
            count: self.sample_count,
            ..Default::default()
        }
    }
}

/// Host services needed to turn recorded draws into GPU work.
pub trait PassResolver {
    /// Pipeline for `key`, compiled on first request.
    fn pipeline(&mut self, key: &PipelineKey) -> Option<wgpu::RenderPipeline>;

    /// GPU buffer backing a registered constant buffer.
    fn constant_buffer(&self, buffer: &ConstantBuffer) -> Option<wgpu::Buffer>;

    /// Binds the resources of `pass` (constant buffers, textures).
    fn bind_groups(&self, render_pass: &mut wgpu::RenderPass<'_>, pass: PassId);

    /// Binds the mesh buffers and issues the indexed draw.
    fn draw_mesh(&self, render_pass: &mut wgpu::RenderPass<'_>, mesh: &MeshDraw);
}

// ---------------------------------------------------------------------------
// Recorded stream
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DrawKind {
    Procedural { vertex_count: u32, start_vertex: u32 },
    Mesh(MeshDraw),
}

#[derive(Clone, Debug, PartialEq)]
pub struct RecordedDraw {
    pub key: PipelineKey,
    pub stencil_ref: u32,
    pub viewport: Viewport,
    pub kind: DrawKind,
}

/// One render pass of the encoded frame.
#[derive(Clone, Debug, PartialEq)]
pub struct PassSegment {
    pub targets: TargetBinding,
    /// Per colour attachment: `Some` clears on load.
    pub color_clears: SmallVec<[Option<Vec4>; 2]>,
    pub depth_clear: Option<f32>,
    pub stencil_clear: Option<u8>,
    pub draws: Vec<RecordedDraw>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Segment {
    Upload { buffer: ConstantBuffer, bytes: Vec<u8> },
    Pass(PassSegment),
}

#[derive(Debug)]
enum Op {
    Targets(TargetBinding),
    ClearColor(RenderTargetView, Vec4),
    ClearDepthStencil(DepthStencilView, ClearFlags, f32, u8),
    Upload(ConstantBuffer, Vec<u8>),
    Draw(RecordedDraw),
}

#[derive(Default)]
struct PendingClears {
    colors: Vec<(RenderTargetView, Vec4)>,
    depth_stencils: Vec<(DepthStencilView, Option<f32>, Option<u8>)>,
}

impl PendingClears {
    fn touches(&self, targets: &TargetBinding) -> bool {
        self.colors.iter().any(|(v, _)| targets.colors.contains(v))
            || self
                .depth_stencils
                .iter()
                .any(|(v, _, _)| targets.depth_stencil.as_ref() == Some(v))
    }

    fn take_color(&mut self, view: &RenderTargetView) -> Option<Vec4> {
        let index = self.colors.iter().position(|(v, _)| v == view)?;
        Some(self.colors.remove(index).1)
    }

    fn take_depth_stencil(&mut self, view: &DepthStencilView) -> (Option<f32>, Option<u8>) {
        match self.depth_stencils.iter().position(|(v, _, _)| v == view) {
            Some(index) => {
                let (_, depth, stencil) = self.depth_stencils.remove(index);
                (depth, stencil)
            }
            None => (None, None),
        }
    }
}

fn flush(
    segments: &mut Vec<Segment>,
    targets: &TargetBinding,
    draws: &mut Vec<RecordedDraw>,
    clears: &mut PendingClears,
) {
    if draws.is_empty() && !clears.touches(targets) {
        return;
    }
    let color_clears = targets.colors.iter().map(|v| clears.take_color(v)).collect();
    let (depth_clear, stencil_clear) = targets
        .depth_stencil
        .as_ref()
        .map_or((None, None), |v| clears.take_depth_stencil(v));
    segments.push(Segment::Pass(PassSegment {
        targets: targets.clone(),
        color_clears,
        depth_clear,
        stencil_clear,
        draws: std::mem::take(draws),
    }));
}

// ---------------------------------------------------------------------------
// WgpuRecorder
// ---------------------------------------------------------------------------

struct GpuView {
    token: ViewToken,
    /// `None` for views imported from the host.
    _texture: Option<wgpu::Texture>,
    view: wgpu::TextureView,
}

struct PendingAllocation {
    id: ViewId,
    token: ViewToken,
    desc: TargetDesc,
}

pub struct WgpuRecorder {
    ops: Vec<Op>,
    views: FxHashMap<ViewId, GpuView>,
    /// Views created since the last encode, allocated on the GPU at encode time.
    pending_allocations: Vec<PendingAllocation>,

    targets: TargetBinding,
    viewport: Viewport,
    rasterizer: RasterizerState,
    topology: wgpu::PrimitiveTopology,
    depth_stencil: DepthStencilMode,
    stencil_ref: u32,
    bound_pass: Option<ShaderPass>,
}

impl WgpuRecorder {
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            ops: Vec::new(),
            views: FxHashMap::default(),
            pending_allocations: Vec::new(),
            targets: TargetBinding::default(),
            viewport: Viewport::new(width, height),
            rasterizer: RasterizerState::default(),
            topology: wgpu::PrimitiveTopology::TriangleList,
            depth_stencil: DepthStencilMode::default(),
            stencil_ref: 0,
            bound_pass: None,
        }
    }

    /// Wraps a host-owned colour view (e.g. the swap-chain image).
    pub fn import_render_target(&mut self, desc: TargetDesc, view: wgpu::TextureView) -> RenderTargetView {
        let handle = RenderTargetView::new(desc);
        let token = handle.downgrade();
        self.views.insert(
            handle.id(),
            GpuView {
                token,
                _texture: None,
                view,
            },
        );
        handle
    }

    /// Wraps a host-owned depth-stencil view.
    pub fn import_depth_stencil(&mut self, desc: TargetDesc, view: wgpu::TextureView) -> DepthStencilView {
        let handle = DepthStencilView::new(desc);
        let token = handle.downgrade();
        self.views.insert(
            handle.id(),
            GpuView {
                token,
                _texture: None,
                view,
            },
        );
        handle
    }

    /// Forgets the GPU view of a handle that is no longer used.
    pub fn release_view(&mut self, id: ViewId) {
        self.views.remove(&id);
        self.pending_allocations.retain(|pending| pending.id != id);
    }

    /// Releases every view (allocated or still pending) whose handles are all
    /// gone. Returns how many were released.
    pub fn prune_views(&mut self) -> usize {
        let before = self.view_count();
        self.views.retain(|_, gpu| gpu.token.is_alive());
        self.pending_allocations.retain(|pending| pending.token.is_alive());
        let released = before - self.view_count();
        if released > 0 {
            log::debug!("WgpuRecorder: released {released} orphaned views");
        }
        released
    }

    /// Views tracked by the recorder, allocated or pending.
    #[must_use]
    pub fn view_count(&self) -> usize {
        self.views.len() + self.pending_allocations.len()
    }

    #[must_use]
    pub fn recorded_len(&self) -> usize {
        self.ops.len()
    }

    /// Drops the recorded commands without encoding them.
    pub fn discard(&mut self) {
        self.ops.clear();
        self.prune_views();
    }

    /// Splits the recorded stream into uploads and render passes.
    #[must_use]
    pub fn plan(&self) -> Vec<Segment> {
        let mut segments = Vec::new();
        let mut targets = TargetBinding::default();
        let mut draws = Vec::new();
        let mut clears = PendingClears::default();

        for op in &self.ops {
            match op {
                Op::Targets(binding) => {
                    if *binding != targets {
                        flush(&mut segments, &targets, &mut draws, &mut clears);
                        targets = binding.clone();
                    }
                }
                Op::ClearColor(view, color) => {
                    if !draws.is_empty() && targets.colors.contains(view) {
                        flush(&mut segments, &targets, &mut draws, &mut clears);
                    }
                    clears.colors.retain(|(v, _)| v != view);
                    clears.colors.push((view.clone(), *color));
                }
                Op::ClearDepthStencil(view, flags, depth, stencil) => {
                    if !draws.is_empty() && targets.depth_stencil.as_ref() == Some(view) {
                        flush(&mut segments, &targets, &mut draws, &mut clears);
                    }
                    let (mut pending_depth, mut pending_stencil) = clears.take_depth_stencil(view);
                    if flags.contains(ClearFlags::DEPTH) {
                        pending_depth = Some(*depth);
                    }
                    if flags.contains(ClearFlags::STENCIL) {
                        pending_stencil = Some(*stencil);
                    }
                    clears
                        .depth_stencils
                        .push((view.clone(), pending_depth, pending_stencil));
                }
                Op::Upload(buffer, bytes) => {
                    flush(&mut segments, &targets, &mut draws, &mut clears);
                    segments.push(Segment::Upload {
                        buffer: buffer.clone(),
                        bytes: bytes.clone(),
                    });
                }
                Op::Draw(draw) => draws.push(draw.clone()),
            }
        }
        flush(&mut segments, &targets, &mut draws, &mut clears);

        // Clears of views that were never drawn into still have to happen.
        for (view, color) in std::mem::take(&mut clears.colors) {
            segments.push(Segment::Pass(PassSegment {
                targets: TargetBinding::new(None, std::slice::from_ref(&view)),
                color_clears: std::iter::once(Some(color)).collect(),
                depth_clear: None,
                stencil_clear: None,
                draws: Vec::new(),
            }));
        }
        for (view, depth_clear, stencil_clear) in std::mem::take(&mut clears.depth_stencils) {
            segments.push(Segment::Pass(PassSegment {
                targets: TargetBinding::new(Some(&view), &[]),
                color_clears: SmallVec::new(),
                depth_clear,
                stencil_clear,
                draws: Vec::new(),
            }));
        }

        segments
    }

    /// Encodes and clears the recorded stream.
    pub fn encode(
        &mut self,
        device: &wgpu::Device,
        encoder: &mut wgpu::CommandEncoder,
        resolver: &mut dyn PassResolver,
    ) {
        self.allocate_views(device);
        let segments = self.plan();
        self.ops.clear();

        for segment in &segments {
            match segment {
                Segment::Upload { buffer, bytes } => {
                    let Some(target) = resolver.constant_buffer(buffer) else {
                        log::warn!("WgpuRecorder: no GPU buffer for '{}', upload dropped", buffer.name());
                        continue;
                    };
                    let staging = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                        label: Some(buffer.name()),
                        contents: bytes,
                        usage: wgpu::BufferUsages::COPY_SRC,
                    });
                    encoder.copy_buffer_to_buffer(&staging, 0, &target, 0, bytes.len() as u64);
                }
                Segment::Pass(pass) => self.encode_pass(encoder, resolver, pass),
            }
        }

        drop(segments);
        self.prune_views();
    }

    fn allocate_views(&mut self, device: &wgpu::Device) {
        for PendingAllocation { id, token, desc } in std::mem::take(&mut self.pending_allocations) {
            if !token.is_alive() {
                continue;
            }
            let texture = device.create_texture(&wgpu::TextureDescriptor {
                label: Some(desc.label),
                size: wgpu::Extent3d {
                    width: desc.width,
                    height: desc.height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: desc.sample_count,
                dimension: wgpu::TextureDimension::D2,
                format: desc.format,
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
                view_formats: &[],
            });
            let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
            self.views.insert(
                id,
                GpuView {
                    token,
                    _texture: Some(texture),
                    view,
                },
            );
        }
    }

    fn encode_pass(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        resolver: &mut dyn PassResolver,
        segment: &PassSegment,
    ) {
        let pipelines: Vec<Option<wgpu::RenderPipeline>> =
            segment.draws.iter().map(|d| resolver.pipeline(&d.key)).collect();

        let color_attachments: SmallVec<[Option<wgpu::RenderPassColorAttachment<'_>>; 2]> = segment
            .targets
            .colors
            .iter()
            .zip(&segment.color_clears)
            .map(|(handle, clear)| {
                let Some(gpu) = self.views.get(&handle.id()) else {
                    log::warn!("WgpuRecorder: colour view {:?} has no GPU texture", handle.id());
                    return None;
                };
                Some(wgpu::RenderPassColorAttachment {
                    view: &gpu.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: clear.map_or(wgpu::LoadOp::Load, |c| wgpu::LoadOp::Clear(color::to_wgpu(c))),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })
            })
            .collect();

        let depth_stencil_attachment = segment.targets.depth_stencil.as_ref().and_then(|handle| {
            let gpu = self.views.get(&handle.id())?;
            let format = handle.desc().format;
            Some(wgpu::RenderPassDepthStencilAttachment {
                view: &gpu.view,
                depth_ops: format.has_depth_aspect().then(|| wgpu::Operations {
                    load: segment.depth_clear.map_or(wgpu::LoadOp::Load, wgpu::LoadOp::Clear),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: format.has_stencil_aspect().then(|| wgpu::Operations {
                    load: segment
                        .stencil_clear
                        .map_or(wgpu::LoadOp::Load, |s| wgpu::LoadOp::Clear(u32::from(s))),
                    store: wgpu::StoreOp::Store,
                }),
            })
        });

        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("PostFx Pass"),
            color_attachments: &color_attachments,
            depth_stencil_attachment,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        for (draw, pipeline) in segment.draws.iter().zip(&pipelines) {
            let Some(pipeline) = pipeline else {
                log::warn!("WgpuRecorder: no pipeline for pass {:?}, draw skipped", draw.key.pass);
                continue;
            };
            render_pass.set_pipeline(pipeline);
            render_pass.set_viewport(
                0.0,
                0.0,
                draw.viewport.width as f32,
                draw.viewport.height as f32,
                0.0,
                1.0,
            );
            render_pass.set_stencil_reference(draw.stencil_ref);
            resolver.bind_groups(&mut render_pass, draw.key.pass);
            match draw.kind {
                DrawKind::Procedural {
                    vertex_count,
                    start_vertex,
                } => render_pass.draw(start_vertex..start_vertex + vertex_count, 0..1),
                DrawKind::Mesh(mesh) => resolver.draw_mesh(&mut render_pass, &mesh),
            }
        }
    }

    fn pipeline_key(&self, pass: &ShaderPass) -> PipelineKey {
        let color_formats = self.targets.colors.iter().map(|v| v.desc().format).collect();
        let depth_format = self.targets.depth_stencil.as_ref().map(|v| v.desc().format);
        let sample_count = self
            .targets
            .colors
            .first()
            .map(|v| v.desc().sample_count)
            .or_else(|| self.targets.depth_stencil.as_ref().map(|v| v.desc().sample_count))
            .unwrap_or(1);
        PipelineKey {
            pass: pass.id(),
            topology: self.topology,
            cull_mode: self.rasterizer.cull_mode,
            front_face: self.rasterizer.front_face,
            unclipped_depth: self.rasterizer.unclipped_depth,
            depth_bias: self.rasterizer.depth_bias.constant,
            depth_stencil: self.depth_stencil,
            color_formats,
            depth_format,
            sample_count,
        }
    }

    fn record_draw(&mut self, kind: DrawKind) {
        let Some(pass) = &self.bound_pass else {
            log::warn!("WgpuRecorder: draw without a bound pass, skipped");
            return;
        };
        let draw = RecordedDraw {
            key: self.pipeline_key(pass),
            stencil_ref: self.stencil_ref,
            viewport: self.viewport,
            kind,
        };
        self.ops.push(Op::Draw(draw));
    }
}

impl DeviceContext for WgpuRecorder {
    fn create_render_target(&mut self, desc: TargetDesc) -> RenderTargetView {
        self.prune_views();
        let handle = RenderTargetView::new(desc.clone());
        self.pending_allocations.push(PendingAllocation {
            id: handle.id(),
            token: handle.downgrade(),
            desc,
        });
        handle
    }

    fn create_depth_stencil(&mut self, desc: TargetDesc) -> DepthStencilView {
        self.prune_views();
        let handle = DepthStencilView::new(desc.clone());
        self.pending_allocations.push(PendingAllocation {
            id: handle.id(),
            token: handle.downgrade(),
            desc,
        });
        handle
    }

    fn output_targets(&self) -> TargetBinding {
        self.targets.clone()
    }

    fn set_output_targets(&mut self, depth_stencil: Option<&DepthStencilView>, colors: &[RenderTargetView]) {
        self.targets = TargetBinding::new(depth_stencil, colors);
        self.ops.push(Op::Targets(self.targets.clone()));
    }

    fn clear_render_target(&mut self, view: &RenderTargetView, color: Vec4) {
        self.ops.push(Op::ClearColor(view.clone(), color));
    }

    fn clear_depth_stencil(&mut self, view: &DepthStencilView, flags: ClearFlags, depth: f32, stencil: u8) {
        self.ops
            .push(Op::ClearDepthStencil(view.clone(), flags, depth, stencil));
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
        self.bound_pass = Some(pass.clone());
    }

    fn upload(&mut self, buffer: &ConstantBuffer, bytes: &[u8]) {
        self.ops.push(Op::Upload(buffer.clone(), bytes.to_vec()));
    }

    fn draw(&mut self, vertex_count: u32, start_vertex: u32) {
        self.record_draw(DrawKind::Procedural {
            vertex_count,
            start_vertex,
        });
    }

    fn draw_mesh(&mut self, mesh: &MeshDraw) {
        self.topology = wgpu::PrimitiveTopology::TriangleList;
        self.record_draw(DrawKind::Mesh(*mesh));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::core::{BufferDesc, GeometryId, PassState};

    fn color_target(recorder: &mut WgpuRecorder) -> RenderTargetView {
        recorder.create_render_target(TargetDesc::new("C", 8, 8, wgpu::TextureFormat::Rgba8Unorm))
    }

    fn depth_target(recorder: &mut WgpuRecorder) -> DepthStencilView {
        recorder.create_depth_stencil(TargetDesc::new(
            "DS",
            8,
            8,
            wgpu::TextureFormat::Depth32FloatStencil8,
        ))
    }

    fn passes(plan: &[Segment]) -> Vec<&PassSegment> {
        plan.iter()
            .filter_map(|s| match s {
                Segment::Pass(p) => Some(p),
                Segment::Upload { .. } => None,
            })
            .collect()
    }

    #[test]
    fn test_clears_fold_into_load_ops() {
        let mut recorder = WgpuRecorder::new(8, 8);
        let color = color_target(&mut recorder);
        let depth = depth_target(&mut recorder);
        let pass = ShaderPass::new("P", PassState::default());

        recorder.clear_render_target(&color, Vec4::ONE);
        recorder.set_output_targets(Some(&depth), std::slice::from_ref(&color));
        recorder.clear_depth_stencil(&depth, ClearFlags::STENCIL, 1.0, 0);
        recorder.bind_pass(&pass);
        recorder.draw_mesh(&MeshDraw::new(GeometryId(1)));

        let plan = recorder.plan();
        let passes = passes(&plan);
        assert_eq!(passes.len(), 1);
        assert_eq!(passes[0].color_clears.as_slice(), &[Some(Vec4::ONE)]);
        assert_eq!(passes[0].depth_clear, None);
        assert_eq!(passes[0].stencil_clear, Some(0));
        assert_eq!(passes[0].draws.len(), 1);
    }

    #[test]
    fn test_target_change_splits_passes() {
        let mut recorder = WgpuRecorder::new(8, 8);
        let color = color_target(&mut recorder);
        let depth = depth_target(&mut recorder);
        let pass = ShaderPass::new("P", PassState::default());
        recorder.bind_pass(&pass);

        recorder.set_output_targets(Some(&depth), std::slice::from_ref(&color));
        recorder.draw_mesh(&MeshDraw::new(GeometryId(1)));
        recorder.set_output_targets(Some(&depth), &[]);
        recorder.draw_mesh(&MeshDraw::new(GeometryId(1)));
        recorder.set_primitive_topology(wgpu::PrimitiveTopology::TriangleStrip);
        recorder.set_output_targets(Some(&depth), std::slice::from_ref(&color));
        recorder.draw(4, 0);

        let plan = recorder.plan();
        let passes = passes(&plan);
        assert_eq!(passes.len(), 3);
        assert!(passes[1].targets.colors.is_empty());
        let quad = &passes[2].draws[0];
        assert_eq!(quad.key.topology, wgpu::PrimitiveTopology::TriangleStrip);
        assert_eq!(quad.kind, DrawKind::Procedural { vertex_count: 4, start_vertex: 0 });
    }

    #[test]
    fn test_upload_between_passes() {
        let mut recorder = WgpuRecorder::new(8, 8);
        let color = color_target(&mut recorder);
        let pass = ShaderPass::new("P", PassState::default());
        let buffer = ConstantBuffer::new(BufferDesc::new("CB", 4));

        recorder.set_output_targets(None, std::slice::from_ref(&color));
        recorder.bind_pass(&pass);
        recorder.draw(3, 0);
        recorder.upload(&buffer, &[1, 2, 3, 4]);
        recorder.draw(3, 0);

        let plan = recorder.plan();
        assert_eq!(plan.len(), 3);
        assert!(matches!(&plan[1], Segment::Upload { bytes, .. } if bytes == &[1, 2, 3, 4]));
    }

    #[test]
    fn test_clear_without_draws_still_encoded() {
        let mut recorder = WgpuRecorder::new(8, 8);
        let color = color_target(&mut recorder);
        recorder.clear_render_target(&color, Vec4::ZERO);
        let plan = recorder.plan();
        let passes = passes(&plan);
        assert_eq!(passes.len(), 1);
        assert!(passes[0].draws.is_empty());
        assert_eq!(passes[0].color_clears.as_slice(), &[Some(Vec4::ZERO)]);
    }

    #[test]
    fn test_pipeline_key_tracks_state() {
        let mut recorder = WgpuRecorder::new(8, 8);
        let depth = depth_target(&mut recorder);
        let pass = ShaderPass::new("P", PassState::default());
        recorder.set_output_targets(Some(&depth), &[]);
        recorder.bind_pass(&pass);
        recorder.set_rasterizer_state(&RasterizerState::backface_of(&RasterizerState::default()));
        let mode = DepthStencilMode::disabled()
            .with_stencil(wgpu::CompareFunction::Always, wgpu::StencilOperation::IncrementClamp);
        recorder.set_depth_stencil_state(&mode, 1);
        recorder.draw_mesh(&MeshDraw::new(GeometryId(3)));

        let plan = recorder.plan();
        let passes = passes(&plan);
        let draw = &passes[0].draws[0];
        assert_eq!(draw.key.cull_mode, Some(wgpu::Face::Front));
        assert_eq!(draw.key.depth_format, Some(wgpu::TextureFormat::Depth32FloatStencil8));
        assert!(draw.key.color_formats.is_empty());
        assert_eq!(draw.stencil_ref, 1);
        let state = draw.key.depth_stencil_state().unwrap();
        assert_eq!(state.stencil.front.pass_op, wgpu::StencilOperation::IncrementClamp);
        assert_eq!(state.depth_write_enabled, Some(false));
    }

    #[test]
    fn test_dropped_views_are_released() {
        let mut recorder = WgpuRecorder::new(8, 8);
        let kept = color_target(&mut recorder);
        let dropped = depth_target(&mut recorder);
        assert_eq!(recorder.view_count(), 2);

        drop(dropped);
        let _replacement = depth_target(&mut recorder);
        assert_eq!(recorder.view_count(), 2);

        // A recorded clear keeps its view until the stream is discarded.
        let recorded = depth_target(&mut recorder);
        recorder.clear_depth_stencil(&recorded, ClearFlags::DEPTH, 1.0, 0);
        drop(recorded);
        assert_eq!(recorder.prune_views(), 0);
        recorder.discard();
        assert_eq!(recorder.view_count(), 2);
        assert_eq!(kept.ref_count(), 1);
    }
}
