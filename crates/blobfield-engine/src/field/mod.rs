//! The implicit scalar field driving isosurface extraction.
//!
//! A set of moving point sources defines a metaball field; the host side
//! recomputes the sources every frame as a pure function of elapsed time and
//! uploads them to a storage buffer the extraction kernel samples.

mod buffer;
mod sources;

pub use buffer::FieldBuffer;
pub use sources::{FieldSources, PointSource, field_value, sources_at};
