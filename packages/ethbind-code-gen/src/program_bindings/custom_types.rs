use std::collections::{BTreeMap, BTreeSet};

use crate::program_bindings::{sol_type::SolType, type_mapper::MappedType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StructId(pub usize);

/// Where a struct's definition lives in the bindings.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StructOwner {
    /// Used by more than one contract, generated once and re-exported into each.
    Shared,
    Contract(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructField {
    pub raw_name: String,
    pub exported_name: String,
    pub sol_type: SolType,
    pub ty: MappedType,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructType {
    pub id: StructId,
    pub name: String,
    pub qualified_name: Option<String>,
    /// Canonical tuple signature, e.g. `(uint256,address)`.
    pub signature: String,
    pub fields: Vec<StructField>,
    pub owner: StructOwner,
}

impl StructType {
    pub fn is_shared(&self) -> bool {
        self.owner == StructOwner::Shared
    }
}

/// Structs are deduplicated by their `internalType` name when the compiler
/// gave one. Unnamed tuples are only deduplicated within a single contract.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) enum StructKey {
    Qualified(String),
    Positional { contract: String, signature: String },
}

#[derive(Debug, Default)]
pub(crate) struct StructRegistry {
    structs: Vec<StructType>,
    ids: BTreeMap<StructKey, StructId>,
    users: BTreeMap<StructId, BTreeSet<String>>,
}

impl StructRegistry {
    pub(crate) fn lookup(&self, key: &StructKey) -> Option<&StructType> {
        self.ids.get(key).map(|id| &self.structs[id.0])
    }

    pub(crate) fn next_id(&self) -> StructId {
        StructId(self.structs.len())
    }

    pub(crate) fn insert(&mut self, key: StructKey, struct_type: StructType) -> StructId {
        let id = struct_type.id;
        debug_assert_eq!(id, self.next_id());

        self.ids.insert(key, id);
        self.structs.push(struct_type);
        id
    }

    pub(crate) fn record_use(&mut self, id: StructId, contract: &str) {
        self.users
            .entry(id)
            .or_default()
            .insert(contract.to_string());
    }

    /// Records `contract` as a user of `id` and of every struct reachable
    /// through its fields.
    pub(crate) fn record_use_with_nested(&mut self, id: StructId, contract: &str) {
        let mut pending = vec![id];
        while let Some(id) = pending.pop() {
            let newly_used = self
                .users
                .entry(id)
                .or_default()
                .insert(contract.to_string());
            if newly_used {
                pending.extend(
                    self.structs[id.0]
                        .fields
                        .iter()
                        .filter_map(|field| field.ty.struct_id()),
                );
            }
        }
    }

    /// All registered structs in registration order, with the owner settled
    /// from the contracts that ended up using them.
    pub(crate) fn finish(self) -> Vec<StructType> {
        let Self {
            mut structs, users, ..
        } = self;

        for struct_type in &mut structs {
            let used_by = users.get(&struct_type.id);
            if used_by.map_or(0, BTreeSet::len) > 1 {
                struct_type.owner = StructOwner::Shared;
            } else if let Some(contract) = used_by.and_then(|users| users.iter().next()) {
                struct_type.owner = StructOwner::Contract(contract.clone());
            }

            if struct_type.is_shared() {
                tracing::debug!(name = %struct_type.name, "struct is shared between contracts");
            }
        }

        structs
    }
}
