//! Rectangular cell ranges and their algebra
//!
//! - [`Bound`] - an explicit "index or unbounded" range edge
//! - [`CellRangeAddress`] - an immutable rectangle of cells
//! - [`CellRangeUtil`] - intersection classification and merging

mod address;
mod bound;
mod util;

pub use address::CellRangeAddress;
pub use bound::Bound;
pub use util::{CellRangeUtil, RangeRelation};
