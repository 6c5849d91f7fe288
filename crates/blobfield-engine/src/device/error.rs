/// High-level response after a surface error.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SurfaceErrorAction {
    /// Surface was reconfigured; rendering may resume next frame.
    Reconfigured,
    /// Transient error; skip the current frame.
    SkipFrame,
    /// Fatal error (commonly OOM); terminate gracefully.
    Fatal,
}

/// Descriptive names, indexed by discriminant. Lookup table rather than a
/// match so the formatting concern stays out of the error path itself.
const ACTION_NAMES: [&str; 3] = ["reconfigured", "skip-frame", "fatal"];

impl SurfaceErrorAction {
    pub fn name(self) -> &'static str {
        ACTION_NAMES[self as usize]
    }
}
