use ethbind_core::types::{Selector, H256};

use crate::program_bindings::{
    abi_types::StateMutability,
    custom_types::{StructId, StructOwner, StructType},
    sol_type::SolType,
    type_mapper::MappedType,
};

/// A function, event or error parameter, or a field of a return struct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgSpec {
    pub raw_name: String,
    pub exported_name: String,
    pub sol_type: SolType,
    pub ty: MappedType,
    pub indexed: bool,
}

/// How a function is invoked on chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallMode {
    /// `view` and `pure`: read through a call, never sent as a transaction.
    Call,
    /// State changing with nothing to return.
    Transact,
    /// State changing with outputs that can be previewed with a call first.
    CallAndTransact,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReturnStruct {
    pub name: String,
    pub fields: Vec<ArgSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReturnShape {
    Unit,
    Single(MappedType),
    /// Two or more outputs, grouped into a generated struct.
    Struct(ReturnStruct),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionSpec {
    pub raw_name: String,
    pub exported_name: String,
    /// Canonical signature, e.g. `transfer(address,uint256)`.
    pub signature: String,
    pub selector: Selector,
    pub selector_overridden: bool,
    pub inputs: Vec<ArgSpec>,
    pub outputs: Vec<ArgSpec>,
    pub returns: ReturnShape,
    pub state_mutability: StateMutability,
    pub call_mode: CallMode,
}

impl FunctionSpec {
    pub fn is_payable(&self) -> bool {
        self.state_mutability == StateMutability::Payable
    }
}

/// What an indexed parameter can be filtered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopicFilter {
    Value,
    /// Only the keccak-256 hash of the value is in the topic.
    Hash,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TopicSlot {
    /// Topic index, 1 to 3 for regular events and 0 to 3 for anonymous ones.
    pub position: usize,
    /// Index into the event's `inputs`.
    pub input: usize,
    pub filter: TopicFilter,
}

/// Names of the generated members through which an event is consumed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventConsumers {
    pub filter_fn: String,
    pub watch_fn: String,
    pub parse_fn: String,
    pub iterator_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventSpec {
    pub raw_name: String,
    pub exported_name: String,
    pub signature: String,
    /// `None` for anonymous events.
    pub topic0: Option<H256>,
    pub anonymous: bool,
    pub inputs: Vec<ArgSpec>,
    pub topics: Vec<TopicSlot>,
    /// Anonymous events cannot be told apart by topic0 and get no consumers.
    pub consumers: Option<EventConsumers>,
}

impl EventSpec {
    pub fn indexed_inputs(&self) -> impl Iterator<Item = &ArgSpec> {
        self.inputs.iter().filter(|input| input.indexed)
    }

    pub fn data_inputs(&self) -> impl Iterator<Item = &ArgSpec> {
        self.inputs.iter().filter(|input| !input.indexed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorSpec {
    pub raw_name: String,
    pub exported_name: String,
    pub signature: String,
    pub selector: Selector,
    pub inputs: Vec<ArgSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstructorSpec {
    pub inputs: Vec<ArgSpec>,
    pub payable: bool,
}

/// A library placeholder found in a contract's bytecode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryRef {
    pub fingerprint: String,
    /// The configured library the fingerprint belongs to, if known.
    pub library: Option<String>,
    /// Byte offsets of every occurrence.
    pub offsets: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractBinding {
    pub raw_name: String,
    pub exported_name: String,
    pub constructor: Option<ConstructorSpec>,
    pub functions: Vec<FunctionSpec>,
    pub events: Vec<EventSpec>,
    pub errors: Vec<ErrorSpec>,
    pub has_fallback: bool,
    pub has_receive: bool,
    pub bytecode: Option<String>,
    pub library_refs: Vec<LibraryRef>,
    /// Libraries to deploy before this contract, dependencies first.
    pub library_deploy_order: Vec<String>,
}

impl ContractBinding {
    pub fn function(&self, exported_name: &str) -> Option<&FunctionSpec> {
        self.functions
            .iter()
            .find(|function| function.exported_name == exported_name)
    }

    pub fn event(&self, exported_name: &str) -> Option<&EventSpec> {
        self.events
            .iter()
            .find(|event| event.exported_name == exported_name)
    }

    pub fn error(&self, exported_name: &str) -> Option<&ErrorSpec> {
        self.errors
            .iter()
            .find(|error| error.exported_name == exported_name)
    }

    pub fn requires_linking(&self) -> bool {
        !self.library_refs.is_empty()
    }
}

/// The binding model of a whole generation run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bindings {
    pub contracts: Vec<ContractBinding>,
    pub structs: Vec<StructType>,
}

impl Bindings {
    pub fn contract(&self, raw_name: &str) -> Option<&ContractBinding> {
        self.contracts
            .iter()
            .find(|contract| contract.raw_name == raw_name)
    }

    pub fn struct_type(&self, id: StructId) -> Option<&StructType> {
        self.structs.get(id.0)
    }

    pub fn struct_named(&self, name: &str) -> Option<&StructType> {
        self.structs.iter().find(|s| s.name == name)
    }

    pub fn shared_structs(&self) -> impl Iterator<Item = &StructType> {
        self.structs.iter().filter(|s| s.is_shared())
    }

    pub fn structs_of<'a>(&'a self, contract: &'a str) -> impl Iterator<Item = &'a StructType> + 'a {
        self.structs
            .iter()
            .filter(move |s| matches!(&s.owner, StructOwner::Contract(owner) if owner == contract))
    }
}
