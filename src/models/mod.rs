pub mod dataset;
pub mod table;

pub use dataset::*;
pub use table::*;
