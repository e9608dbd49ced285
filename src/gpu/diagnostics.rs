//! Device error scopes.
//!
//! Pipeline creation is always checked, because a captured validation error
//! there decides whether a feature is degraded. Whole frames are only checked
//! in debug builds, and what they catch is logged, never raised.

use crate::error::GpuError;

/// Run `create` inside a validation scope and fail if the device reported an error.
pub fn capture<T>(
    device: &wgpu::Device,
    label: &'static str,
    create: impl FnOnce() -> T,
) -> Result<T, GpuError> {
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let value = create();
    match pollster::block_on(device.pop_error_scope()) {
        Some(source) => Err(GpuError::Pipeline { label, source }),
        None => Ok(value),
    }
}

/// Open the per-frame scope (debug builds only).
pub fn begin_frame(device: &wgpu::Device) {
    if cfg!(debug_assertions) {
        device.push_error_scope(wgpu::ErrorFilter::Validation);
    }
}

/// Close the per-frame scope and log whatever it caught (debug builds only).
pub fn end_frame(device: &wgpu::Device) {
    if cfg!(debug_assertions) {
        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            log::warn!("device reported an error this frame: {}", err);
        }
    }
}
