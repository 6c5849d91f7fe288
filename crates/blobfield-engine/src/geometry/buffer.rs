use wgpu::util::DeviceExt;

use crate::error::EngineError;

use super::protocol::{
    AcquireSignal, DispatchSignal, Ownership, OwnershipState, ProtocolError, ResetSignal,
    UploadSignal,
};

/// Bytes per vertex: position vec4 + normal vec4, tightly interleaved.
pub const VERTEX_STRIDE: u64 = 32;

/// Bytes per triangle (3 vertices).
pub const TRIANGLE_STRIDE: u64 = 3 * VERTEX_STRIDE;

/// Draw-call bound: the system never reads past `max_faces` triangles worth
/// of data, no matter what count the extraction stage reports.
pub fn clamped_vertex_count(reported: u32, max_faces: u32) -> u32 {
    reported.min(max_faces) * 3
}

/// The fixed-capacity, GPU-resident triangle buffer shared between the
/// extraction and render stages, together with its triangle counter.
///
/// The vertex buffer carries `STORAGE | VERTEX` usage so both domains can
/// bind it without a copy. Access is mediated by the ownership protocol; the
/// render-facing accessor [`vertex_buffer`](Self::vertex_buffer) refuses to
/// hand the buffer out unless the render domain owns it.
pub struct GeometryBuffer {
    vertices: wgpu::Buffer,
    counter: wgpu::Buffer,
    readback: wgpu::Buffer,
    max_faces: u32,
    ownership: Ownership,
}

/// Permission to encode exactly one extraction dispatch.
///
/// Obtained by surrendering the acquire/reset/upload signals; see
/// [`GeometryBuffer::begin_extraction`].
pub struct ExtractionGrant<'a> {
    buffer: &'a GeometryBuffer,
}

impl ExtractionGrant<'_> {
    /// Marks the dispatch as encoded, producing its completion signal.
    pub(crate) fn dispatched(self) -> DispatchSignal {
        DispatchSignal(())
    }

    pub fn max_faces(&self) -> u32 {
        self.buffer.max_faces
    }
}

impl GeometryBuffer {
    /// Allocates the triangle buffer, counter, and counter read-back staging
    /// buffer. All three live for the process lifetime.
    pub fn new(device: &wgpu::Device, max_faces: u32) -> Result<Self, EngineError> {
        let bytes = u64::from(max_faces) * TRIANGLE_STRIDE;

        let limits = device.limits();
        if bytes > limits.max_buffer_size || bytes > u64::from(limits.max_storage_buffer_binding_size)
        {
            return Err(EngineError::BufferCreationFailure(format!(
                "{max_faces} triangles ({bytes} bytes) exceed device buffer limits",
            )));
        }

        let vertices = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("blobfield geometry"),
            size: bytes,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::VERTEX,
            mapped_at_creation: false,
        });

        let counter = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("blobfield triangle count"),
            contents: bytemuck::bytes_of(&0u32),
            usage: wgpu::BufferUsages::STORAGE
                | wgpu::BufferUsages::COPY_SRC
                | wgpu::BufferUsages::COPY_DST,
        });

        let readback = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("blobfield triangle count readback"),
            size: std::mem::size_of::<u32>() as u64,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        log::debug!("geometry buffer allocated: {max_faces} triangles, {bytes} bytes");

        Ok(Self {
            vertices,
            counter,
            readback,
            max_faces,
            ownership: Ownership::new(),
        })
    }

    pub fn max_faces(&self) -> u32 {
        self.max_faces
    }

    pub fn ownership_state(&self) -> OwnershipState {
        self.ownership.state()
    }

    /// Raw buffer handles for building the extraction bind group. Binding
    /// does not access the memory, so this is legal in any ownership state.
    pub fn compute_bindings(&self) -> (&wgpu::Buffer, &wgpu::Buffer) {
        (&self.vertices, &self.counter)
    }

    /// The vertex buffer, for drawing. Only available while the render
    /// domain owns the buffer; a draw encoded in any other state would race
    /// the extraction dispatch.
    pub fn vertex_buffer(&self) -> Result<&wgpu::Buffer, ProtocolError> {
        match self.ownership.state() {
            OwnershipState::RenderOwned => Ok(&self.vertices),
            actual => Err(ProtocolError::WrongState {
                expected: OwnershipState::RenderOwned,
                actual,
            }),
        }
    }

    /// Requests the render -> compute ownership transfer.
    pub fn acquire_for_compute(&mut self) -> Result<AcquireSignal, ProtocolError> {
        self.ownership.acquire()
    }

    /// Encodes the triangle-counter zeroing write.
    ///
    /// The counter sits outside the ownership protocol (plain device
    /// memory), so this needs no particular ownership state; it is ordered
    /// against the dispatch purely through the returned signal.
    pub fn reset_counter(&self, encoder: &mut wgpu::CommandEncoder) -> ResetSignal {
        encoder.clear_buffer(&self.counter, 0, None);
        ResetSignal(())
    }

    /// Completes the transfer by surrendering every signal the dispatch
    /// depends on, yielding the grant the extraction stage encodes against.
    ///
    /// Consuming the signals by value is the point: a dispatch cannot be
    /// encoded while any of its dependencies is missing, and no signal can
    /// be reused for a second dispatch.
    pub fn begin_extraction(
        &mut self,
        _acquire: AcquireSignal,
        _reset: ResetSignal,
        _upload: UploadSignal,
    ) -> Result<ExtractionGrant<'_>, ProtocolError> {
        self.ownership.begin_dispatch()?;
        Ok(ExtractionGrant { buffer: self })
    }

    /// Requests the compute -> render transfer-back. Depends on dispatch
    /// completion only.
    pub fn release_to_render(&mut self, _after: &DispatchSignal) -> Result<(), ProtocolError> {
        self.ownership.release()
    }

    /// Encodes the counter read-back copy.
    ///
    /// Depends on the dispatch signal directly, not on the transfer-back,
    /// because the counter is not part of the shared-ownership resource.
    pub fn encode_count_readback(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        _after: &DispatchSignal,
    ) {
        encoder.copy_buffer_to_buffer(
            &self.counter,
            0,
            &self.readback,
            0,
            std::mem::size_of::<u32>() as u64,
        );
    }

    /// Crosses the per-frame barrier: blocks until every enqueued operation
    /// (reset, acquire, dispatch, release, read-back) has completed, then
    /// returns the reported triangle count and hands ownership back to the
    /// render domain.
    ///
    /// Must be called after the frame's compute submission.
    pub fn finish_frame(&mut self, device: &wgpu::Device) -> Result<u32, EngineError> {
        let slice = self.readback.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });

        device
            .poll(wgpu::PollType::wait_indefinitely())
            .map_err(|e| EngineError::EnqueueFailure(format!("frame barrier poll failed: {e}")))?;

        rx.recv()
            .map_err(|_| EngineError::EnqueueFailure("count read-back never resolved".into()))?
            .map_err(|e| EngineError::EnqueueFailure(format!("count read-back map failed: {e}")))?;

        let reported = {
            let mapped = slice.get_mapped_range();
            let value: u32 = *bytemuck::from_bytes(&mapped);
            drop(mapped);
            self.readback.unmap();
            value
        };

        self.ownership.complete()?;
        Ok(reported)
    }

    /// How many vertices the frame's single draw call may request.
    pub fn draw_vertex_count(&self, reported: u32) -> u32 {
        clamped_vertex_count(reported, self.max_faces)
    }

    /// Recovers from a failed frame: drains all outstanding GPU work, then
    /// forces ownership back to the render domain. The frame's draw must be
    /// skipped by the caller; the buffer contents are unspecified until the
    /// next successful extraction.
    pub fn resynchronize(&mut self, device: &wgpu::Device) {
        if let Err(e) = device.poll(wgpu::PollType::wait_indefinitely()) {
            log::error!("resynchronize poll failed: {e}");
        }
        log::warn!(
            "geometry buffer resynchronized from state {}",
            self.ownership.state().name()
        );
        self.ownership.force_render_owned();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_is_identity_below_capacity() {
        assert_eq!(clamped_vertex_count(0, 250_000), 0);
        assert_eq!(clamped_vertex_count(1, 250_000), 3);
        assert_eq!(clamped_vertex_count(250_000, 250_000), 750_000);
    }

    #[test]
    fn clamp_bounds_overflowing_counts() {
        // An unclamped extraction of 1000 triangles against a 10-triangle
        // buffer must draw exactly 30 vertices.
        assert_eq!(clamped_vertex_count(1000, 10), 30);
        assert_eq!(clamped_vertex_count(u32::MAX, 250_000), 750_000);
    }

    #[test]
    fn stride_matches_interleaved_layout() {
        // position (4 f32) + normal (4 f32), no padding.
        assert_eq!(VERTEX_STRIDE, 8 * 4);
        assert_eq!(TRIANGLE_STRIDE, 3 * VERTEX_STRIDE);
    }
}
