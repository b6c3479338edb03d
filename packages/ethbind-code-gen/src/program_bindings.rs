mod abi_types;
mod abigen;
mod custom_types;
mod events;
mod generated_bindings;
mod identifiers;
mod overloads;
mod sol_type;
mod type_mapper;

pub use abi_types::{AbiParam, StateMutability};
pub use abigen::{Abigen, AbigenTarget, BindgenOptions};
pub use custom_types::{StructField, StructId, StructOwner, StructType};
pub use generated_bindings::{
    ArgSpec, Bindings, CallMode, ConstructorSpec, ContractBinding, ErrorSpec, EventConsumers,
    EventSpec, FunctionSpec, LibraryRef, ReturnShape, ReturnStruct, TopicFilter, TopicSlot,
};
pub use identifiers::{IdentifierResolver, IdentifierTable, NameSource, Scope, SymbolKind};
pub use overloads::{OverloadCandidate, OverloadResolver, ResolvedOverload};
pub use sol_type::{SolType, TupleComponent, TupleType};
pub use type_mapper::{MappedType, StructRef, TypeMapper, TypeMapping};
