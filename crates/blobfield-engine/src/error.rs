use crate::geometry::ProtocolError;

/// Engine failure taxonomy.
///
/// The first five variants are startup failures: they abort before the frame
/// loop is entered, surfacing whatever diagnostic the platform produced (for
/// `BuildFailure` that is the shader validation log). `EnqueueFailure` and
/// `Protocol` can occur mid-loop; the orchestrator treats them as fatal for
/// the *frame* (the draw is skipped and the device re-synchronized) because
/// a failed step inside the ownership-transfer chain leaves the geometry
/// buffer in an undefined state.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("no graphics platform available: {0}")]
    PlatformUnavailable(String),

    #[error("no suitable GPU device: {0}")]
    DeviceUnavailable(String),

    #[error("failed to create GPU context: {0}")]
    ContextCreationFailure(String),

    /// Extraction kernel failed to load or compile. `log` carries the full
    /// validation output so the shader error is retrievable after abort.
    #[error("extraction kernel build failed:\n{log}")]
    BuildFailure { log: String },

    #[error("failed to allocate GPU buffer: {0}")]
    BufferCreationFailure(String),

    #[error("failed to enqueue GPU work: {0}")]
    EnqueueFailure(String),

    /// The device cannot run the compute stage against render-visible memory.
    #[error("device does not support compute/render buffer sharing")]
    InteropUnsupported,

    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}
