pub mod citation;
pub mod identifiers;

pub use citation::*;
pub use identifiers::*;
