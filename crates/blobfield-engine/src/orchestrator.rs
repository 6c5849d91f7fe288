//! Per-frame orchestration of the compute/render hand-off.
//!
//! Owns the scene resources and drives the fixed frame sequence: advance the
//! field, transfer the geometry buffer to the compute domain, reset the
//! counter, upload sources, dispatch extraction, transfer back, read the
//! triangle count across the frame barrier, then draw. The ordering is
//! enforced by the signal types in [`crate::geometry`]; this module only
//! strings them together.

use std::path::PathBuf;

use crate::core::{App, AppControl, FrameCtx};
use crate::error::EngineError;
use crate::extract::{ExtractParams, ExtractStage, GridDims, MarchingCubesStage};
use crate::field::{FieldBuffer, FieldSources};
use crate::geometry::GeometryBuffer;
use crate::render::{MeshRenderer, WireRenderer, orbit_pvm};

use winit::event::WindowEvent;
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::WindowId;

/// Scene parameters, fixed at startup.
#[derive(Debug, Clone)]
pub struct SceneConfig {
    pub grid: GridDims,
    pub threshold: f32,
    pub max_faces: u32,
    pub source_count: u32,
    pub kernel_path: PathBuf,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            grid: GridDims::cubic(64),
            threshold: 0.04,
            max_faces: 250_000,
            source_count: 8,
            kernel_path: PathBuf::from("shaders/extract.wgsl"),
        }
    }
}

/// GPU-resident scene state, created on the first frame once a device
/// exists.
struct GpuState {
    geometry: GeometryBuffer,
    field: FieldBuffer,
    stage: MarchingCubesStage,
    mesh: MeshRenderer,
    wire: WireRenderer,
}

impl GpuState {
    fn new(
        device: &wgpu::Device,
        config: &SceneConfig,
        kernel_source: &str,
        sources: &FieldSources,
    ) -> Result<Self, EngineError> {
        let geometry = GeometryBuffer::new(device, config.max_faces)?;
        let field = FieldBuffer::new(device, sources)?;
        let params = ExtractParams::new(
            config.grid,
            config.threshold,
            config.source_count,
            config.max_faces,
        );
        let stage = MarchingCubesStage::new(device, kernel_source, &params, &geometry, &field)?;

        Ok(Self {
            geometry,
            field,
            stage,
            mesh: MeshRenderer::new(),
            wire: WireRenderer::new(),
        })
    }
}

/// The application: one animated metaball scene in one window.
pub struct FrameOrchestrator {
    config: SceneConfig,
    kernel_source: String,
    sources: FieldSources,
    gpu_state: Option<GpuState>,
    fatal: Option<EngineError>,
}

impl FrameOrchestrator {
    /// Loads the kernel source eagerly so a missing or empty kernel file
    /// fails before any window opens.
    pub fn new(config: SceneConfig) -> Result<Self, EngineError> {
        let kernel_source = MarchingCubesStage::load_source(&config.kernel_path)?;
        let sources = FieldSources::new(config.source_count, config.grid.extent());

        Ok(Self {
            config,
            kernel_source,
            sources,
            gpu_state: None,
            fatal: None,
        })
    }

    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    /// The error that stopped the frame loop, if any.
    pub fn fatal(&self) -> Option<&EngineError> {
        self.fatal.as_ref()
    }

    /// Runs the compute half of the frame and crosses the frame barrier.
    /// Returns the draw vertex count, already clamped to capacity.
    fn run_extraction(
        state: &mut GpuState,
        sources: &mut FieldSources,
        grid: GridDims,
        elapsed: f32,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
    ) -> Result<u32, EngineError> {
        sources.advance(elapsed)?;

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("blobfield extract encoder"),
        });

        let acquire = state.geometry.acquire_for_compute()?;
        let reset = state.geometry.reset_counter(&mut encoder);
        let upload = state.field.upload(queue, sources)?;

        let grant = state.geometry.begin_extraction(acquire, reset, upload)?;
        let dispatch = state.stage.encode(&mut encoder, grant, grid);

        state.geometry.release_to_render(&dispatch)?;
        state.geometry.encode_count_readback(&mut encoder, &dispatch);

        queue.submit(std::iter::once(encoder.finish()));

        let reported = state.geometry.finish_frame(device)?;
        sources.confirm_upload();

        Ok(state.geometry.draw_vertex_count(reported))
    }
}

impl App for FrameOrchestrator {
    fn on_window_event(&mut self, _window_id: WindowId, event: &WindowEvent) -> AppControl {
        match event {
            WindowEvent::CloseRequested => AppControl::Exit,
            WindowEvent::KeyboardInput { event, .. }
                if event.state.is_pressed()
                    && event.physical_key == PhysicalKey::Code(KeyCode::Escape) =>
            {
                AppControl::Exit
            }
            _ => AppControl::Continue,
        }
    }

    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl {
        let device = ctx.gpu.device().clone();
        let queue = ctx.gpu.queue().clone();

        if self.gpu_state.is_none() {
            match GpuState::new(&device, &self.config, &self.kernel_source, &self.sources) {
                Ok(state) => self.gpu_state = Some(state),
                Err(err) => {
                    log::error!("scene setup failed: {err}");
                    self.fatal = Some(err);
                    return AppControl::Exit;
                }
            }
        }
        let Some(state) = self.gpu_state.as_mut() else {
            return AppControl::Exit;
        };

        let grid = self.config.grid;
        let elapsed = ctx.time.elapsed;

        // A frame whose extraction fails draws nothing from the geometry
        // buffer; the protocol is resynchronized and the next frame starts
        // from a clean render-owned state.
        let draw_count = match Self::run_extraction(
            state,
            &mut self.sources,
            grid,
            elapsed,
            &device,
            &queue,
        ) {
            Ok(count) => count,
            Err(err) => {
                log::warn!("frame extraction failed, skipping draw: {err}");
                state.geometry.resynchronize(&device);
                self.sources.confirm_upload();
                0
            }
        };

        let pvm = orbit_pvm(elapsed, ctx.gpu.aspect_ratio(), grid);

        ctx.render(wgpu::Color::BLACK, |rctx, target| {
            state.wire.render(rctx, target, pvm, grid);

            if draw_count > 0 {
                if let Ok(vertices) = state.geometry.vertex_buffer() {
                    state.mesh.render(rctx, target, vertices, pvm, draw_count);
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_scene() {
        let config = SceneConfig::default();
        assert_eq!(config.grid, GridDims::cubic(64));
        assert_eq!(config.threshold, 0.04);
        assert_eq!(config.max_faces, 250_000);
        assert_eq!(config.source_count, 8);
    }

    #[test]
    fn missing_kernel_file_fails_at_startup() {
        let config = SceneConfig {
            kernel_path: PathBuf::from("/nonexistent/kernel.wgsl"),
            ..SceneConfig::default()
        };
        match FrameOrchestrator::new(config) {
            Ok(_) => panic!("a missing kernel file must fail startup"),
            Err(err) => assert!(matches!(err, EngineError::BuildFailure { .. })),
        }
    }
}
