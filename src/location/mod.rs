//! Location domain: mounted location tree and location path rendering.

pub mod path;
pub mod tree;

pub use path::{location_path, PATH_SEPARATOR};
pub use tree::{LocationNode, LocationTree};
