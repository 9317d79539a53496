pub mod parse_cache;
pub mod snapshot;

pub use parse_cache::*;
pub use snapshot::*;
