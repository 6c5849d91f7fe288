//! Blobfield engine crate.
//!
//! Real-time GPU metaball renderer. Every frame a compute stage extracts an
//! isosurface triangle mesh into a GPU-resident geometry buffer, which the
//! render stage then rasterizes directly, with no CPU-side vertex processing
//! and no host copy of the geometry. The buffer is handed between the two domains
//! by an explicit ownership protocol (see [`geometry`]).

pub mod core;
pub mod device;
pub mod error;
pub mod extract;
pub mod field;
pub mod geometry;
pub mod orchestrator;
pub mod render;
pub mod time;
pub mod window;

pub mod logging;
