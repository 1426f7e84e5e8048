//! Geometry kernel backends

#[cfg(feature = "truck")]
mod placement;
mod traits;
#[cfg(feature = "truck")]
mod truck;

pub use traits::*;
#[cfg(feature = "truck")]
pub use truck::TruckKernel;
