pub mod errors;
pub mod linking;
pub mod types;
pub mod utils;

pub use errors::{Error, Result, WithContext};
