pub mod csl;

pub use csl::{to_csl_json, write_csl_json};
