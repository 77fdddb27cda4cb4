//! Human- and machine-readable rendering of probe results and samples.

pub mod json;
pub mod terminal;

pub use json::{to_json, to_json_pretty};
pub use terminal::{format_capabilities, format_sample};
