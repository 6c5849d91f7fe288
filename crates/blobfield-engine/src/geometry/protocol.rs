//! Ownership-transfer state machine for the shared geometry buffer.
//!
//! The buffer cycles `RenderOwned -> Acquiring -> ComputeOwned -> Releasing ->
//! RenderOwned`, one cycle per frame. Each transfer operation yields a typed,
//! consumable signal; the extraction dispatch cannot be encoded without
//! surrendering the signals it depends on, which makes the per-frame
//! dependency graph explicit in the types rather than implicit in enqueue
//! order. On wgpu's single submission timeline the signals carry no payload
//! (ordering is realized by encoder and submission order), but any misuse of
//! the *protocol* (dispatch before acquire, draw while compute-owned, a second
//! acquire in one frame) is still rejected here.
//!
//! This module is deliberately free of GPU types so the protocol itself is
//! testable in isolation.

/// Which domain may currently access the geometry buffer.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[repr(usize)]
pub enum OwnershipState {
    /// The render domain owns the buffer; drawing from it is legal.
    RenderOwned = 0,
    /// A render -> compute transfer has been requested.
    Acquiring = 1,
    /// The compute domain owns the buffer; the extraction dispatch is encoded.
    ComputeOwned = 2,
    /// A compute -> render transfer is pending the frame barrier.
    Releasing = 3,
}

/// State names, indexed by discriminant. A lookup table keeps the formatting
/// concern out of the protocol logic itself.
const STATE_NAMES: [&str; 4] = ["render-owned", "acquiring", "compute-owned", "releasing"];

impl OwnershipState {
    pub fn name(self) -> &'static str {
        STATE_NAMES[self as usize]
    }
}

/// Protocol violations.
///
/// Any of these mid-frame means the ownership state can no longer be trusted;
/// the orchestrator must abandon the frame (skip the draw) and
/// re-synchronize before touching the buffer again.
#[derive(Debug, Clone, Eq, PartialEq, thiserror::Error)]
pub enum ProtocolError {
    #[error("geometry buffer is {}, expected {}", actual.name(), expected.name())]
    WrongState {
        expected: OwnershipState,
        actual: OwnershipState,
    },

    #[error("field sources mutated while an upload is still in flight")]
    UploadPending,
}

/// Completion signal of a render -> compute ownership transfer.
#[must_use = "the extraction dispatch must consume this signal"]
#[derive(Debug)]
pub struct AcquireSignal(pub(crate) ());

/// Completion signal of the triangle-counter zeroing write.
///
/// The counter is plain device memory, not subject to the ownership protocol;
/// its reset is ordered against the dispatch only through this signal.
#[must_use = "the extraction dispatch must consume this signal"]
#[derive(Debug)]
pub struct ResetSignal(pub(crate) ());

/// Completion signal of the field-source upload.
#[must_use = "the extraction dispatch must consume this signal"]
#[derive(Debug)]
pub struct UploadSignal(pub(crate) ());

/// Completion signal of the extraction dispatch. Both the transfer-back and
/// the counter read-back depend on this, and only this.
#[must_use = "release and count read-back depend on this signal"]
#[derive(Debug)]
pub struct DispatchSignal(pub(crate) ());

/// The pure transition half of the protocol.
#[derive(Debug)]
pub(crate) struct Ownership {
    state: OwnershipState,
}

impl Ownership {
    pub(crate) fn new() -> Self {
        Self {
            state: OwnershipState::RenderOwned,
        }
    }

    pub(crate) fn state(&self) -> OwnershipState {
        self.state
    }

    fn expect(&self, expected: OwnershipState) -> Result<(), ProtocolError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(ProtocolError::WrongState {
                expected,
                actual: self.state,
            })
        }
    }

    /// Render -> compute transfer request.
    pub(crate) fn acquire(&mut self) -> Result<AcquireSignal, ProtocolError> {
        self.expect(OwnershipState::RenderOwned)?;
        self.state = OwnershipState::Acquiring;
        Ok(AcquireSignal(()))
    }

    /// The dispatch is being encoded; the transfer is considered complete
    /// from the host's point of view once its signal has been surrendered.
    pub(crate) fn begin_dispatch(&mut self) -> Result<(), ProtocolError> {
        self.expect(OwnershipState::Acquiring)?;
        self.state = OwnershipState::ComputeOwned;
        Ok(())
    }

    /// Compute -> render transfer-back request.
    pub(crate) fn release(&mut self) -> Result<(), ProtocolError> {
        self.expect(OwnershipState::ComputeOwned)?;
        self.state = OwnershipState::Releasing;
        Ok(())
    }

    /// The frame barrier has been crossed; the render domain owns the buffer
    /// again.
    pub(crate) fn complete(&mut self) -> Result<(), ProtocolError> {
        self.expect(OwnershipState::Releasing)?;
        self.state = OwnershipState::RenderOwned;
        Ok(())
    }

    /// Forces the state back to `RenderOwned` after a failed frame.
    ///
    /// Only valid once all outstanding GPU work has drained; the caller is
    /// responsible for that synchronization.
    pub(crate) fn force_render_owned(&mut self) {
        self.state = OwnershipState::RenderOwned;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_cycle_round_trips() {
        let mut own = Ownership::new();
        assert_eq!(own.state(), OwnershipState::RenderOwned);

        let _acquire = own.acquire().unwrap();
        assert_eq!(own.state(), OwnershipState::Acquiring);

        own.begin_dispatch().unwrap();
        assert_eq!(own.state(), OwnershipState::ComputeOwned);

        own.release().unwrap();
        assert_eq!(own.state(), OwnershipState::Releasing);

        own.complete().unwrap();
        assert_eq!(own.state(), OwnershipState::RenderOwned);
    }

    #[test]
    fn dispatch_before_acquire_is_rejected() {
        let mut own = Ownership::new();
        assert_eq!(
            own.begin_dispatch(),
            Err(ProtocolError::WrongState {
                expected: OwnershipState::Acquiring,
                actual: OwnershipState::RenderOwned,
            })
        );
    }

    #[test]
    fn release_before_dispatch_is_rejected() {
        let mut own = Ownership::new();
        let _acquire = own.acquire().unwrap();
        assert!(own.release().is_err());
    }

    #[test]
    fn double_acquire_is_rejected() {
        let mut own = Ownership::new();
        let _acquire = own.acquire().unwrap();
        assert!(own.acquire().is_err());
    }

    #[test]
    fn complete_requires_release() {
        let mut own = Ownership::new();
        let _acquire = own.acquire().unwrap();
        own.begin_dispatch().unwrap();
        assert!(own.complete().is_err());
        own.release().unwrap();
        assert!(own.complete().is_ok());
    }

    #[test]
    fn force_render_owned_recovers_any_state() {
        let mut own = Ownership::new();
        let _acquire = own.acquire().unwrap();
        own.begin_dispatch().unwrap();
        own.force_render_owned();
        assert_eq!(own.state(), OwnershipState::RenderOwned);
        // A fresh cycle works after recovery.
        let _acquire = own.acquire().unwrap();
    }

    #[test]
    fn state_names_cover_all_states() {
        for state in [
            OwnershipState::RenderOwned,
            OwnershipState::Acquiring,
            OwnershipState::ComputeOwned,
            OwnershipState::Releasing,
        ] {
            assert!(!state.name().is_empty());
        }
    }
}
