pub use ident::{ident, is_valid_ident};

mod ident;
