//! The shared geometry buffer and its compute/render ownership protocol.
//!
//! One GPU-resident triangle buffer alternates between two owners every
//! frame: the extraction (compute) stage writes it, the render stage draws
//! it. [`protocol`] is the pure state machine governing the hand-off;
//! [`GeometryBuffer`] binds that machine to the actual wgpu resources.

pub mod protocol;

mod buffer;

pub use buffer::{
    ExtractionGrant, GeometryBuffer, TRIANGLE_STRIDE, VERTEX_STRIDE, clamped_vertex_count,
};
pub use protocol::{
    AcquireSignal, DispatchSignal, OwnershipState, ProtocolError, ResetSignal, UploadSignal,
};
