use std::fmt::Display;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid ABI: {0}")]
    InvalidAbi(String),
    #[error("unsupported type `{0}`")]
    UnsupportedType(String),
    #[error("name collision: {kind} `{first}` and `{second}` both resolve to `{exported}`")]
    NameCollision {
        kind: String,
        first: String,
        second: String,
        exported: String,
    },
    #[error("unresolved library placeholder `__${fingerprint}$__` at byte offset {offset}")]
    UnresolvedLibraryPlaceholder { fingerprint: String, offset: usize },
    #[error("ambiguous overload of `{raw_name}`: signature `{signature}` is declared more than once")]
    AmbiguousOverload { raw_name: String, signature: String },
    #[error("library dependency cycle: {}", .0.join(" -> "))]
    LibraryCycle(Vec<String>),
    #[error("invalid bytecode: {0}")]
    InvalidBytecode(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("failed to decode log: {0}")]
    Decode(String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("serialization error: {0}")]
    SerdeJson(#[from] serde_json::Error),
    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Wraps `self` with a description of what was being processed when it occurred.
    pub fn context(self, context: impl Display) -> Self {
        Self::Context {
            context: context.to_string(),
            source: Box::new(self),
        }
    }

    /// The innermost error, with every [`Error::Context`] layer removed.
    pub fn root_cause(&self) -> &Error {
        match self {
            Self::Context { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Extension for attaching context to the error of a `Result`.
pub trait WithContext<T> {
    fn with_context<C: Display>(self, context: impl FnOnce() -> C) -> Result<T>;
}

impl<T> WithContext<T> for Result<T> {
    fn with_context<C: Display>(self, context: impl FnOnce() -> C) -> Result<T> {
        self.map_err(|err| err.context(context()))
    }
}

/// This macro can only be used for `Error` variants that have a `String` field.
/// Those are: `InvalidAbi`, `UnsupportedType`, `InvalidBytecode`,
/// `InvalidConfig`, `Decode`, `Transport`
#[macro_export]
macro_rules! error {
   ($err_variant:ident, $fmt_str: literal $(,$arg: expr)*) => {
       $crate::errors::Error::$err_variant(format!($fmt_str,$($arg),*))
   }
}
pub use error;

macro_rules! impl_error_from {
    ($err_variant:ident, $err_type:ty ) => {
        impl From<$err_type> for Error {
            fn from(err: $err_type) -> Error {
                Error::$err_variant(err.to_string())
            }
        }
    };
}

impl_error_from!(InvalidBytecode, hex::FromHexError);
