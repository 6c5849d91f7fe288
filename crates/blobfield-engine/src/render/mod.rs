//! GPU rendering subsystem.
//!
//! The render stage only needs two capabilities from its collaborators: accept
//! a 4x4 transform and draw N vertices from the bound geometry buffer. Each
//! renderer owns its GPU resources (pipeline, uniform buffer) and creates them
//! lazily on first use.

mod camera;
mod ctx;
mod mesh;
mod wire;

pub use camera::orbit_pvm;
pub use ctx::{RenderCtx, RenderTarget};
pub use mesh::MeshRenderer;
pub use wire::WireRenderer;

/// Depth state shared by every 3D pass: standard less-than test with writes.
fn ctx_depth_state(format: wgpu::TextureFormat) -> wgpu::DepthStencilState {
    wgpu::DepthStencilState {
        format,
        depth_write_enabled: true,
        depth_compare: wgpu::CompareFunction::Less,
        stencil: wgpu::StencilState::default(),
        bias: wgpu::DepthBiasState::default(),
    }
}
