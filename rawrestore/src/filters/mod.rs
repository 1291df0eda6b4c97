//! Numeric filter primitives used by the Retinex stages.
//!
//! All filters take owned [`Buffer2`] planes and work row-parallel through
//! rayon. Outputs never depend on the thread count.

mod gaussian;
mod guided;
mod median;


pub use gaussian::{gaussian_blur, gaussian_blur_in_place, gaussian_kernel_1d};
pub use guided::{box_mean, guided_filter, resize_bilinear};
pub use median::median_filter_3x3_interior;
