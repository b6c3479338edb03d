pub mod utils;

mod program_bindings;

pub use program_bindings::*;
