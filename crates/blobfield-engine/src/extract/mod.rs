//! The isosurface extraction stage.
//!
//! The stage samples the metaball field over a 3D grid and emits triangles
//! where the field crosses the threshold, writing them plus an atomic
//! triangle count straight into the shared geometry buffer. Its interface is
//! the [`ExtractStage`] trait; the shipped implementation is a single-pass
//! marching-cubes kernel compiled from a WGSL file at startup.

mod stage;

#[cfg(test)]
pub(crate) mod reference;
#[cfg(test)]
pub(crate) mod tables;

pub use stage::MarchingCubesStage;

use crate::geometry::{DispatchSignal, ExtractionGrant};

/// Cell counts of the sampling grid; immutable after startup.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct GridDims {
    pub nx: u32,
    pub ny: u32,
    pub nz: u32,
}

impl GridDims {
    pub fn cubic(n: u32) -> Self {
        Self {
            nx: n,
            ny: n,
            nz: n,
        }
    }

    /// Spatial extent of the sampling domain along its longest axis; the
    /// field and camera both work in grid units.
    pub fn extent(&self) -> f32 {
        self.nx.max(self.ny).max(self.nz) as f32
    }
}

/// Uniform parameter block handed to the extraction kernel.
///
/// Carries the full argument set of the extraction contract: grid
/// dimensions, isovalue threshold, source count, and the triangle capacity
/// as an explicit hard bound on what the kernel may write.
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ExtractParams {
    pub dims: [u32; 3],
    pub source_count: u32,
    pub threshold: f32,
    pub max_faces: u32,
    pub _pad: [u32; 2],
}

impl ExtractParams {
    pub fn new(grid: GridDims, threshold: f32, source_count: u32, max_faces: u32) -> Self {
        Self {
            dims: [grid.nx, grid.ny, grid.nz],
            source_count,
            threshold,
            max_faces,
            _pad: [0; 2],
        }
    }
}

/// Contract the extraction stage must satisfy.
///
/// Invoked once per frame over the full grid. The implementation must be
/// deterministic given identical field sources and threshold, must increment
/// the shared counter exactly once per emitted triangle (atomically), and
/// must never write past the `max_faces` bound: overflowing triangles are
/// dropped, not wrapped.
pub trait ExtractStage {
    /// Encodes the dispatch against the granted geometry buffer. The grant
    /// can only exist once the acquire, reset, and upload dependencies have
    /// been surrendered, and consuming it here produces the signal the rest
    /// of the frame chain depends on.
    fn encode(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        grant: ExtractionGrant<'_>,
        grid: GridDims,
    ) -> DispatchSignal;
}
