use glam::{Mat4, Vec3};

use crate::extract::GridDims;

/// Combined projection-view matrix for the orbiting camera.
///
/// The camera circles the grid center at a fixed radius and height, looking
/// at the center; `elapsed` drives the orbit directly, so the view is a pure
/// function of time and two frames at the same timestamp render identically.
pub fn orbit_pvm(elapsed: f32, aspect: f32, grid: GridDims) -> Mat4 {
    let extent = grid.extent();
    let target = Vec3::new(
        grid.nx as f32 * 0.5,
        grid.ny as f32 * 0.5,
        grid.nz as f32 * 0.5,
    );

    let radius = extent * 2.0;
    let height = extent * 0.4;
    let eye = target + Vec3::new(elapsed.sin() * radius, height, elapsed.cos() * radius);

    let proj = Mat4::perspective_rh(90f32.to_radians(), aspect, 0.1, 2000.0);
    let view = Mat4::look_at_rh(eye, target, Vec3::Y);
    proj * view
}
