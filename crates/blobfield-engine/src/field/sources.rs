use crate::geometry::ProtocolError;

/// One metaball point source: position plus an implicit weight.
///
/// Layout matches the kernel's `array<vec4<f32>>` binding: xyz position,
/// w weight.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct PointSource {
    pub position: [f32; 3],
    pub weight: f32,
}

/// Field strength at `p`: sum of inverse-square contributions.
///
/// The WGSL kernel evaluates the same function on the GPU; keep the two in
/// sync (including the distance clamp that avoids a singularity at a source
/// center).
pub fn field_value(p: [f32; 3], sources: &[PointSource]) -> f32 {
    let mut sum = 0.0;
    for s in sources {
        let dx = p[0] - s.position[0];
        let dy = p[1] - s.position[1];
        let dz = p[2] - s.position[2];
        let d2 = (dx * dx + dy * dy + dz * dz).max(1e-6);
        sum += s.weight / d2;
    }
    sum
}

/// Source positions at time `t`, for `count` sources inside a cubic domain
/// of the given extent.
///
/// Pure in `t`: no state is carried between frames, so identical times give
/// bitwise-identical sources and the extraction output is reproducible. Each
/// source wanders the domain on its own phase-shifted closed orbit.
pub fn sources_at(count: u32, t: f32, extent: f32) -> Vec<PointSource> {
    let center = extent * 0.5;
    let radius = extent * 0.3;

    (0..count)
        .map(|i| {
            let phase = i as f32 * std::f32::consts::TAU / count.max(1) as f32;
            let (sa, ca) = (t * 0.7 + phase).sin_cos();
            let (sb, cb) = (t * 0.43 + phase * 2.0).sin_cos();

            PointSource {
                position: [
                    center + radius * sa * cb,
                    center + radius * sb,
                    center + radius * ca * cb,
                ],
                weight: 1.0,
            }
        })
        .collect()
}

/// Host-side source array with the upload re-use guard.
///
/// The array is handed to the queue by pointer at upload time; mutating it
/// again before that upload is confirmed complete would be a data race the
/// moment queue latency exceeds one frame. `advance` therefore refuses to
/// touch the array while an upload is in flight, and the orchestrator
/// confirms the upload at the frame barrier.
#[derive(Debug)]
pub struct FieldSources {
    count: u32,
    extent: f32,
    host: Vec<PointSource>,
    in_flight: bool,
}

impl FieldSources {
    pub fn new(count: u32, extent: f32) -> Self {
        Self {
            count,
            extent,
            host: sources_at(count, 0.0, extent),
            in_flight: false,
        }
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    /// Recomputes all sources for time `t`. Rejected while the previous
    /// upload is unconfirmed.
    pub fn advance(&mut self, t: f32) -> Result<(), ProtocolError> {
        if self.in_flight {
            return Err(ProtocolError::UploadPending);
        }
        self.host = sources_at(self.count, t, self.extent);
        Ok(())
    }

    /// Hands the array out for upload and marks it in flight.
    pub(crate) fn begin_upload(&mut self) -> Result<&[PointSource], ProtocolError> {
        if self.in_flight {
            return Err(ProtocolError::UploadPending);
        }
        self.in_flight = true;
        Ok(&self.host)
    }

    /// Confirms the upload has completed (the frame barrier has been
    /// crossed); the array may be mutated again.
    pub fn confirm_upload(&mut self) {
        self.in_flight = false;
    }

    /// Current host values, for diagnostics and tests.
    pub fn current(&self) -> &[PointSource] {
        &self.host
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sources_are_pure_in_time() {
        let a = sources_at(8, 3.25, 64.0);
        let b = sources_at(8, 3.25, 64.0);
        assert_eq!(a, b);

        // And actually move over time.
        let c = sources_at(8, 3.26, 64.0);
        assert_ne!(a, c);
    }

    #[test]
    fn sources_stay_inside_the_domain() {
        for step in 0..100 {
            let t = step as f32 * 0.37;
            for s in sources_at(8, t, 64.0) {
                for axis in s.position {
                    assert!(axis > 0.0 && axis < 64.0, "source left domain at t={t}");
                }
                assert!(s.weight > 0.0);
            }
        }
    }

    #[test]
    fn field_value_is_symmetric_around_a_source() {
        let sources = [PointSource {
            position: [10.0, 10.0, 10.0],
            weight: 1.0,
        }];
        let a = field_value([15.0, 10.0, 10.0], &sources);
        let b = field_value([10.0, 15.0, 10.0], &sources);
        assert!((a - b).abs() < 1e-6);
        // Inverse-square: strength 1/25 at distance 5.
        assert!((a - 0.04).abs() < 1e-6);
    }

    #[test]
    fn advance_is_rejected_while_upload_in_flight() {
        let mut sources = FieldSources::new(8, 64.0);
        sources.advance(1.0).unwrap();

        let _staged = sources.begin_upload().unwrap();
        assert_eq!(sources.advance(2.0), Err(ProtocolError::UploadPending));

        // A second upload of the same array is equally illegal.
        assert!(sources.begin_upload().is_err());

        sources.confirm_upload();
        sources.advance(2.0).unwrap();
    }
}
