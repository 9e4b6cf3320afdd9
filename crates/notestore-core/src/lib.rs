pub mod error;
mod path;
pub mod types;

pub use error::*;
pub use path::{is_same_location, normalize_path, validate_path_syntax};
pub use types::*;
