use wgpu::util::DeviceExt;

use crate::error::EngineError;
use crate::geometry::{ProtocolError, UploadSignal};

use super::sources::FieldSources;

/// GPU-side storage buffer holding the point sources.
pub struct FieldBuffer {
    buffer: wgpu::Buffer,
}

impl FieldBuffer {
    /// Allocates the buffer sized for `sources` and seeds it with the
    /// current values.
    pub fn new(device: &wgpu::Device, sources: &FieldSources) -> Result<Self, EngineError> {
        if sources.count() == 0 {
            return Err(EngineError::BufferCreationFailure(
                "field needs at least one source".into(),
            ));
        }

        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("blobfield sources"),
            contents: bytemuck::cast_slice(sources.current()),
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
        });

        Ok(Self { buffer })
    }

    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }

    /// Stages the upload of the current source values and marks the host
    /// array in flight until the frame barrier confirms completion.
    ///
    /// `write_buffer` itself is asynchronous (the data lands on the queue's
    /// timeline at the next submit), which is why the host array is guarded
    /// rather than freely reused.
    pub fn upload(
        &self,
        queue: &wgpu::Queue,
        sources: &mut FieldSources,
    ) -> Result<UploadSignal, ProtocolError> {
        let staged = sources.begin_upload()?;
        queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(staged));
        Ok(UploadSignal(()))
    }
}
