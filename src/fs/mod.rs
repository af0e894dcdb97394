pub mod filter;
pub mod local;
pub mod types;

pub use local::{validate_name, LocalFs};
pub use types::*;
