pub(crate) use contract::contract_bindings;

use crate::program_bindings::{
    identifiers::IdentifierResolver, overloads::OverloadResolver, type_mapper::TypeMapper,
};

mod contract;
mod function_generator;

/// State shared by every contract of one generation run.
pub(crate) struct BindingContext<'o> {
    pub mapper: TypeMapper,
    pub names: IdentifierResolver<'o>,
    pub overloads: OverloadResolver,
}
