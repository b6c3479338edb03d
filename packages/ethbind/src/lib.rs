//! # ethbind
//!
//! Builds the binding model of EVM contracts from their JSON ABI and bytecode,
//! and provides the runtime pieces the generated bindings are written against.
//!
//! ## Quickstart: `prelude`
//!
//! ```no_run
//! # #[allow(unused)]
//! use ethbind::prelude::*;
//! ```

pub mod types {
    pub use ethbind_core::types::*;
}

pub mod core {
    pub use ethbind_core::*;
}

pub mod code_gen {
    pub use ethbind_code_gen::*;
}

pub mod programs {
    pub use ethbind_programs::*;
}

/// Easy imports of frequently used
#[doc(hidden)]
pub mod prelude {
    //! The ethbind prelude
    //!
    //! ```
    //! # #![allow(unused_imports)]
    //! use ethbind::prelude::*;
    //! ```
    pub use super::{
        code_gen::{Abigen, AbigenTarget, BindgenOptions, Bindings, ContractBinding},
        core::{
            errors::{Error, Result},
            linking::Libraries,
        },
        programs::{
            deploy::{deploy_with_libraries, Deployer, Deployment, LibraryArtifact},
            logs::{
                watch, DecodeLog, DecodedLog, IntoTopic, LogIterator, LogQuery, RawLog,
                Subscription,
            },
        },
        types::{Address, Selector, H256, I256, U256},
    };
}
