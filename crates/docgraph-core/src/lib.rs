pub mod config;
pub mod error;
pub mod hash;
pub mod traits;
pub mod types;

pub use config::*;
pub use error::*;
pub use hash::*;
pub use traits::*;
pub use types::*;
