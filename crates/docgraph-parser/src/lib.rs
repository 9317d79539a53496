pub mod adapters;
pub mod registry;

pub use registry::*;
