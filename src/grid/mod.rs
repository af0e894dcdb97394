// Wrap-flowed icon grid: pure layout math in `layout`, item state in
// `projection`.

pub mod layout;
pub mod projection;

pub use layout::{CellRect, GridGeometry};
pub use projection::{GridItem, GridProjection, GridSource};
