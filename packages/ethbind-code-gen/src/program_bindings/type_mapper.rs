use std::fmt::{Display, Formatter};

use ethbind_core::{error, Result};
use proc_macro2::{Literal, TokenStream};
use quote::{quote, ToTokens};

use crate::{
    program_bindings::{
        custom_types::{StructField, StructId, StructKey, StructOwner, StructRegistry, StructType},
        identifiers::{IdentifierResolver, NameSource, Scope, SymbolKind},
        sol_type::{SolType, TupleType},
    },
    utils::ident,
};

/// Integers up to this width map onto a native Rust integer.
const NATIVE_INT_BITS: usize = 64;

/// The Rust side of a Solidity type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MappedType {
    Bool,
    /// A native integer. `bits` is already rounded up to 8, 16, 32 or 64.
    Int {
        signed: bool,
        bits: usize,
    },
    /// `U256` or `I256`, for anything wider than 64 bits.
    BigInt {
        signed: bool,
    },
    Address,
    FixedBytes(usize),
    /// The keccak-256 hash standing in for an indexed dynamic value.
    Hash,
    Bytes,
    String,
    FixedArray {
        len: usize,
        element: Box<MappedType>,
    },
    Array(Box<MappedType>),
    Struct(StructRef),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StructRef {
    pub id: StructId,
    pub name: String,
}

impl MappedType {
    pub fn requires_struct(&self) -> bool {
        self.struct_id().is_some()
    }

    /// The struct this type refers to, looking through arrays.
    pub fn struct_id(&self) -> Option<StructId> {
        match self {
            Self::Struct(reference) => Some(reference.id),
            Self::FixedArray { element, .. } | Self::Array(element) => element.struct_id(),
            _ => None,
        }
    }
}

impl ToTokens for MappedType {
    fn to_tokens(&self, tokens: &mut TokenStream) {
        let type_tokens = match self {
            Self::Bool => quote! { ::core::primitive::bool },
            Self::Int { signed, bits } => {
                let name = ident(&format!("{}{bits}", if *signed { "i" } else { "u" }));
                quote! { ::core::primitive::#name }
            }
            Self::BigInt { signed: false } => quote! { ::ethbind::types::U256 },
            Self::BigInt { signed: true } => quote! { ::ethbind::types::I256 },
            Self::Address => quote! { ::ethbind::types::Address },
            Self::FixedBytes(len) => {
                let len = Literal::usize_unsuffixed(*len);
                quote! { [::core::primitive::u8; #len] }
            }
            Self::Hash => quote! { ::ethbind::types::H256 },
            Self::Bytes => quote! { ::std::vec::Vec<::core::primitive::u8> },
            Self::String => quote! { ::std::string::String },
            Self::FixedArray { len, element } => {
                let len = Literal::usize_unsuffixed(*len);
                quote! { [#element; #len] }
            }
            Self::Array(element) => quote! { ::std::vec::Vec<#element> },
            // Shared structs are re-exported into every contract module that uses them.
            Self::Struct(reference) => {
                let name = ident(&reference.name);
                quote! { self::#name }
            }
        };

        tokens.extend(type_tokens)
    }
}

impl Display for MappedType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_token_stream())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeMapping {
    pub ty: MappedType,
    pub requires_struct: bool,
}

type MappingRule =
    fn(&mut TypeMapper, &SolType, &str, &mut IdentifierResolver<'_>) -> Option<Result<MappedType>>;

/// Maps Solidity types to Rust ones, registering a struct for every tuple it
/// comes across.
#[derive(Debug, Default)]
pub struct TypeMapper {
    registry: StructRegistry,
}

impl TypeMapper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Maps `ty` as used by `contract`.
    pub fn map(
        &mut self,
        ty: &SolType,
        contract: &str,
        names: &mut IdentifierResolver<'_>,
    ) -> Result<TypeMapping> {
        let ty = self.map_type(ty, contract, names)?;

        Ok(TypeMapping {
            requires_struct: ty.requires_struct(),
            ty,
        })
    }

    /// The structs registered so far, with their owners settled.
    pub fn finish(self) -> Vec<StructType> {
        self.registry.finish()
    }

    fn map_type(
        &mut self,
        ty: &SolType,
        contract: &str,
        names: &mut IdentifierResolver<'_>,
    ) -> Result<MappedType> {
        let rules: [MappingRule; 3] = [Self::to_scalar, Self::to_array, Self::to_struct];

        rules
            .into_iter()
            .find_map(|rule| rule(self, ty, contract, names))
            .unwrap_or_else(|| Err(error!(UnsupportedType, "{ty}")))
    }

    fn to_scalar(
        &mut self,
        ty: &SolType,
        _: &str,
        _: &mut IdentifierResolver<'_>,
    ) -> Option<Result<MappedType>> {
        let mapped = match ty {
            SolType::Bool => MappedType::Bool,
            SolType::Uint(bits) => integer(false, *bits),
            SolType::Int(bits) => integer(true, *bits),
            SolType::Address => MappedType::Address,
            SolType::FixedBytes(len) => MappedType::FixedBytes(*len),
            SolType::Bytes => MappedType::Bytes,
            SolType::String => MappedType::String,
            // 20-byte address followed by the 4-byte selector.
            SolType::Function => MappedType::FixedBytes(24),
            _ => return None,
        };

        Some(Ok(mapped))
    }

    fn to_array(
        &mut self,
        ty: &SolType,
        contract: &str,
        names: &mut IdentifierResolver<'_>,
    ) -> Option<Result<MappedType>> {
        let mapped = match ty {
            SolType::FixedArray(len, element) => self
                .map_type(element, contract, names)
                .map(|element| MappedType::FixedArray {
                    len: *len,
                    element: Box::new(element),
                }),
            SolType::Array(element) => self
                .map_type(element, contract, names)
                .map(|element| MappedType::Array(Box::new(element))),
            _ => return None,
        };

        Some(mapped)
    }

    fn to_struct(
        &mut self,
        ty: &SolType,
        contract: &str,
        names: &mut IdentifierResolver<'_>,
    ) -> Option<Result<MappedType>> {
        let SolType::Tuple(tuple) = ty else {
            return None;
        };

        Some(self.struct_for(tuple, contract, names))
    }

    fn struct_for(
        &mut self,
        tuple: &TupleType,
        contract: &str,
        names: &mut IdentifierResolver<'_>,
    ) -> Result<MappedType> {
        let signature = tuple.canonical();
        let key = match &tuple.qualified_name {
            Some(qualified_name) => StructKey::Qualified(qualified_name.clone()),
            None => StructKey::Positional {
                contract: contract.to_string(),
                signature: signature.clone(),
            },
        };

        if let Some(existing) = self.registry.lookup(&key) {
            if existing.signature != signature {
                return Err(error!(
                    InvalidAbi,
                    "struct `{}` is declared with conflicting fields: `{}` and `{signature}`",
                    existing.qualified_name.as_deref().unwrap_or(&existing.name),
                    existing.signature
                ));
            }

            let reference = StructRef {
                id: existing.id,
                name: existing.name.clone(),
            };
            // The fields were mapped when the struct was first seen; the
            // structs they reach are now used by `contract` too.
            self.registry.record_use_with_nested(reference.id, contract);
            return Ok(MappedType::Struct(reference));
        }

        let field_types = tuple
            .components
            .iter()
            .map(|component| self.map_type(&component.ty, contract, names))
            .collect::<Result<Vec<_>>>()?;

        let id = self.registry.next_id();
        let name = match &tuple.qualified_name {
            Some(qualified_name) => {
                let short_name = qualified_name
                    .rsplit('.')
                    .next()
                    .unwrap_or(qualified_name);
                names.resolve_with(
                    SymbolKind::Struct,
                    &Scope::Global,
                    qualified_name,
                    &signature,
                    NameSource::Raw(short_name),
                )?
            }
            None => names.resolve_with(
                SymbolKind::Struct,
                &Scope::Global,
                "",
                &format!("{contract}{signature}"),
                NameSource::Derived(format!("Struct{}", id.0)),
            )?,
        };

        let field_scope = Scope::Member(format!("struct {name}"));
        let fields = tuple
            .components
            .iter()
            .zip(field_types)
            .enumerate()
            .map(|(position, (component, ty))| {
                Ok(StructField {
                    exported_name: names.resolve_member(
                        SymbolKind::Field,
                        &field_scope,
                        &component.name,
                        position,
                        "field",
                    )?,
                    raw_name: component.name.clone(),
                    sol_type: component.ty.clone(),
                    ty,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        tracing::debug!(%name, %signature, contract, "registered struct");

        self.registry.insert(
            key,
            StructType {
                id,
                name: name.clone(),
                qualified_name: tuple.qualified_name.clone(),
                signature,
                fields,
                owner: StructOwner::Contract(contract.to_string()),
            },
        );
        self.registry.record_use(id, contract);

        Ok(MappedType::Struct(StructRef { id, name }))
    }
}

fn integer(signed: bool, bits: usize) -> MappedType {
    if bits > NATIVE_INT_BITS {
        MappedType::BigInt { signed }
    } else {
        MappedType::Int {
            signed,
            bits: bits.next_power_of_two().max(8),
        }
    }
}
