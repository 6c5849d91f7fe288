//! GPU device + surface management.
//!
//! This module is responsible for:
//! - creating the wgpu Instance/Adapter/Device/Queue
//! - creating & configuring the Surface (swapchain) and depth buffer
//! - acquiring frames and providing encoders/views for rendering
//!
//! All process-wide GPU handles live in [`Gpu`], one explicitly owned
//! aggregate passed by reference through the frame loop. Nothing here is
//! global state; dropping the `Gpu` releases everything on any exit path.

mod error;
mod frame;
mod gpu;
mod init;
mod surface;

pub use error::SurfaceErrorAction;
pub use frame::GpuFrame;
pub use gpu::Gpu;
pub use init::GpuInit;
