//! Fill percentage of a horizontal cylindrical tank.
//!
//! A horizontal cylinder's liquid volume is proportional to the area of the
//! circular segment below the liquid surface, so the fill percentage only
//! depends on the liquid height and the tank radius.

use std::f64::consts::PI;

/// Area of the circular segment cut off by a chord `offset` away from the centre.
fn segment_area(offset: f64, r: f64) -> f64 {
    let theta = 2.0 * (offset / r).acos();
    0.5 * r.powi(2) * (theta - theta.sin())
}

/// Percentage (0-100) of a circle's area that lies below a chord `liquid_height`
/// above the bottom of the circle.
///
/// `liquid_height` and `radius` must use the same unit. Callers clamp the height
/// to `[0, 2 * radius]`; anything outside that range (or a non-positive radius)
/// yields NaN.
///
/// # Example
/// ```
/// use mopeka_listener::geometry::percent_full;
///
/// assert_eq!(percent_full(18.5, 18.5), 50.0);
/// assert!((percent_full(13.0, 18.5) - 31.356090324437847).abs() < 1e-9);
/// ```
pub fn percent_full(liquid_height: f64, radius: f64) -> f64 {
    debug_assert!(radius > 0.0, "tank radius must be positive");

    let full_area = PI * radius.powi(2);

    if liquid_height == radius {
        return 50.0;
    }

    if liquid_height < radius {
        return segment_area(radius - liquid_height, radius) / full_area * 100.0;
    }

    // Above the midpoint the empty space forms the mirrored segment.
    let empty = segment_area(liquid_height - radius, radius);
    (full_area - empty) / full_area * 100.0
}
