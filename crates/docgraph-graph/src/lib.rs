pub mod builder;
pub mod complexity;
pub mod cycles;
pub mod graph;
pub mod module_map;
pub mod resolver;

pub use builder::*;
pub use complexity::*;
pub use cycles::*;
pub use graph::*;
pub use module_map::*;
pub use resolver::*;
