//! Conversions between epoch seconds and positions inside a viewport.
//!
//! Every function returns `None` when its input falls outside the viewport, which callers
//! use to skip off-screen markers.
use crate::sigpro::TimeRange;
/// Position of `time` in the viewport as a fraction in `[0, 1]`.
pub fn time_to_fraction(time: f64, viewport: &TimeRange) -> Option<f64> {
    if !time.is_finite() || !viewport.contains(time) {
        return None;
    }
    let duration = viewport.duration_secs();
    if duration <= 0.0 {
        return Some(0.0);
    }
    Some((time - viewport.start_time_secs) / duration)
}
pub fn fraction_to_time(fraction: f64, viewport: &TimeRange) -> Option<f64> {
    if !(0.0..=1.0).contains(&fraction) {
        return None;
    }
    Some(viewport.start_time_secs + fraction * viewport.duration_secs())
}
pub fn time_to_pixel(time: f64, viewport: &TimeRange, width_px: u32) -> Option<f64> {
    if width_px == 0 {
        return None;
    }
    time_to_fraction(time, viewport).map(|f| f * width_px as f64)
}
pub fn pixel_to_time(pixel_x: f64, viewport: &TimeRange, width_px: u32) -> Option<f64> {
    if width_px == 0 || !pixel_x.is_finite() {
        return None;
    }
    fraction_to_time(pixel_x / width_px as f64, viewport)
}
/// Clip-space position in `[0, 100]`, the range the vertex shader scales from.
pub fn time_to_gl(time: f64, viewport: &TimeRange) -> Option<f64> {
    time_to_fraction(time, viewport).map(|f| f * 100.0)
}
/// Seconds covered by one pixel.
pub fn seconds_per_pixel(viewport: &TimeRange, width_px: u32) -> Option<f64> {
    (width_px > 0).then(|| viewport.duration_secs() / width_px as f64)
}
/// Unchecked linear projection; callers guarantee `time` lies in the viewport.
pub(crate) fn project(time: f64, viewport: &TimeRange, width_px: u32) -> f64 {
    let duration = viewport.duration_secs();
    if duration <= 0.0 {
        return 0.0;
    }
    ((time - viewport.start_time_secs) / duration * width_px as f64).clamp(0.0, width_px as f64)
}
