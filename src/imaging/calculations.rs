//! Pure calculation functions for thumbnail dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

/// Upper bound on divisor steps. Anything beyond this points at bogus
/// dimensions in the EXIF data rather than a real photo.
pub const MAX_DIVISOR_STEPS: u32 = 50;

/// Find the smallest integer divisor that brings the longer edge down to
/// `max_edge` or below.
///
/// Divisors are tried in order `1, 2, 3, ...` up to [`MAX_DIVISOR_STEPS`].
/// Returns `None` when no divisor in range satisfies the bound.
///
/// # Examples
/// ```
/// # use gallery_datamodel::imaging::thumbnail_divisor;
/// // 4000x3000 with a 400px limit → divide by 10 (4000 / 10 = 400)
/// assert_eq!(thumbnail_divisor(4000, 3000, 400), Some(10));
///
/// // Already small enough → divisor 1
/// assert_eq!(thumbnail_divisor(300, 200, 400), Some(1));
/// ```
pub fn thumbnail_divisor(width: u32, height: u32, max_edge: u32) -> Option<u32> {
    let longer = u64::from(width.max(height));
    (1..=MAX_DIVISOR_STEPS).find(|&i| longer <= u64::from(max_edge) * u64::from(i))
}

/// Calculate thumbnail dimensions: both edges divided by
/// [`thumbnail_divisor`], rounded, never below 1px.
///
/// # Returns
/// * `Some((width, height))` - Thumbnail dimensions
/// * `None` - No divisor within [`MAX_DIVISOR_STEPS`] works
pub fn thumbnail_dimensions(width: u32, height: u32, max_edge: u32) -> Option<(u32, u32)> {
    let divisor = thumbnail_divisor(width, height, max_edge)?;
    let scale = |edge: u32| ((f64::from(edge) / f64::from(divisor)).round() as u32).max(1);
    Some((scale(width), scale(height)))
}
