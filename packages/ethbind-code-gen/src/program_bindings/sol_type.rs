use std::fmt::{Display, Formatter};

use ethbind_core::{error, Result};
use itertools::Itertools;

use crate::program_bindings::abi_types::AbiParam;

/// A parsed Solidity type descriptor.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SolType {
    Bool,
    Uint(usize),
    Int(usize),
    Address,
    FixedBytes(usize),
    Bytes,
    String,
    Function,
    FixedArray(usize, Box<SolType>),
    Array(Box<SolType>),
    Tuple(TupleType),
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TupleType {
    /// The struct name from `internalType`, e.g. `Lib.Point`, if the compiler emitted one.
    pub qualified_name: Option<String>,
    pub components: Vec<TupleComponent>,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TupleComponent {
    pub name: String,
    pub ty: SolType,
}

impl SolType {
    /// Parses the `type` of `param`, descending into `components` for tuples.
    pub fn parse(param: &AbiParam) -> Result<Self> {
        let (base, dimensions) = split_dimensions(&param.ty)?;

        let element = if base == "tuple" {
            if param.components.is_empty() {
                return Err(error!(InvalidAbi, "`{}` has no components", param.ty));
            }

            let components = param
                .components
                .iter()
                .map(|component| {
                    Ok(TupleComponent {
                        name: component.name.clone(),
                        ty: Self::parse(component)?,
                    })
                })
                .collect::<Result<Vec<_>>>()?;

            Self::Tuple(TupleType {
                qualified_name: param.struct_name().map(ToString::to_string),
                components,
            })
        } else {
            parse_elementary(base)?
        };

        Ok(dimensions
            .into_iter()
            .fold(element, |ty, dimension| match dimension {
                Some(len) => Self::FixedArray(len, Box::new(ty)),
                None => Self::Array(Box::new(ty)),
            }))
    }

    /// The canonical form used in signatures, e.g. `(uint256,address)[]`.
    pub fn canonical(&self) -> String {
        match self {
            Self::Bool => "bool".to_string(),
            Self::Uint(bits) => format!("uint{bits}"),
            Self::Int(bits) => format!("int{bits}"),
            Self::Address => "address".to_string(),
            Self::FixedBytes(len) => format!("bytes{len}"),
            Self::Bytes => "bytes".to_string(),
            Self::String => "string".to_string(),
            Self::Function => "function".to_string(),
            Self::FixedArray(len, element) => format!("{}[{len}]", element.canonical()),
            Self::Array(element) => format!("{}[]", element.canonical()),
            Self::Tuple(tuple) => tuple.canonical(),
        }
    }

    /// Indexed values of these types are stored in the topic as their keccak-256 hash.
    pub fn is_hashed_when_indexed(&self) -> bool {
        matches!(
            self,
            Self::Bytes | Self::String | Self::FixedArray(..) | Self::Array(_) | Self::Tuple(_)
        )
    }
}

impl TupleType {
    pub fn canonical(&self) -> String {
        format!(
            "({})",
            self.components.iter().map(|c| c.ty.canonical()).join(",")
        )
    }
}

impl Display for SolType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.canonical())
    }
}

/// `name(type,...)` built from the canonical types of `params`.
pub fn canonical_signature(name: &str, params: &[AbiParam]) -> Result<String> {
    let types = params
        .iter()
        .map(|param| SolType::parse(param).map(|ty| ty.canonical()))
        .collect::<Result<Vec<_>>>()?;

    Ok(format!("{name}({})", types.join(",")))
}

/// Like [`canonical_signature`] but function-typed parameters are spelled with
/// their full `internalType`, which tells apart overloads that only differ in
/// the shape of a callback.
pub fn detailed_signature(name: &str, params: &[AbiParam]) -> Result<String> {
    let types = params
        .iter()
        .map(|param| {
            let ty = SolType::parse(param)?;
            Ok(match (&ty, param.internal_type.as_deref()) {
                (SolType::Function, Some(internal)) => internal.to_string(),
                _ => ty.canonical(),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(format!("{name}({})", types.join(",")))
}

// Dimensions are returned left to right as written, so `uint8[3][]` yields
// `[Some(3), None]` and the last one is the outermost.
fn split_dimensions(descriptor: &str) -> Result<(&str, Vec<Option<usize>>)> {
    let mut base = descriptor.trim();
    let mut dimensions = vec![];

    while let Some(rest) = base.strip_suffix(']') {
        let (element, len) = rest
            .rsplit_once('[')
            .ok_or_else(|| error!(InvalidAbi, "malformed type `{descriptor}`"))?;

        let dimension = if len.is_empty() {
            None
        } else {
            match len.parse::<usize>() {
                Ok(len) if len > 0 => Some(len),
                _ => {
                    return Err(error!(
                        InvalidAbi,
                        "invalid array length `{len}` in `{descriptor}`"
                    ))
                }
            }
        };

        dimensions.push(dimension);
        base = element;
    }
    dimensions.reverse();

    Ok((base, dimensions))
}

fn parse_elementary(descriptor: &str) -> Result<SolType> {
    let ty = match descriptor {
        "bool" => SolType::Bool,
        "address" | "address payable" => SolType::Address,
        "string" => SolType::String,
        "bytes" => SolType::Bytes,
        "byte" => SolType::FixedBytes(1),
        "function" => SolType::Function,
        "uint" => SolType::Uint(256),
        "int" => SolType::Int(256),
        "tuple" => return Err(error!(InvalidAbi, "`tuple` has no components")),
        _ if descriptor.is_empty()
            || !descriptor
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == ' ') =>
        {
            return Err(error!(InvalidAbi, "malformed type `{descriptor}`"));
        }
        _ => {
            if let Some(bits) = descriptor.strip_prefix("uint") {
                SolType::Uint(integer_bits(descriptor, bits)?)
            } else if let Some(bits) = descriptor.strip_prefix("int") {
                SolType::Int(integer_bits(descriptor, bits)?)
            } else if let Some(len) = descriptor.strip_prefix("bytes") {
                SolType::FixedBytes(fixed_bytes_len(descriptor, len)?)
            } else {
                return Err(error!(UnsupportedType, "{descriptor}"));
            }
        }
    };

    Ok(ty)
}

fn integer_bits(descriptor: &str, bits: &str) -> Result<usize> {
    match bits.parse::<usize>() {
        Ok(bits) if bits % 8 == 0 && (8..=256).contains(&bits) => Ok(bits),
        _ => Err(error!(UnsupportedType, "{descriptor}")),
    }
}

fn fixed_bytes_len(descriptor: &str, len: &str) -> Result<usize> {
    match len.parse::<usize>() {
        Ok(len) if (1..=32).contains(&len) => Ok(len),
        _ => Err(error!(UnsupportedType, "{descriptor}")),
    }
}
