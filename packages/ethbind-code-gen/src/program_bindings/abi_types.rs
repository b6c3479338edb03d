use ethbind_core::{error, Result};
use serde::Deserialize;
use serde_json::Value;

/// A single input, output or tuple component as found in the JSON ABI.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AbiParam {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(default)]
    pub internal_type: Option<String>,
    #[serde(default)]
    pub components: Vec<AbiParam>,
    #[serde(default)]
    pub indexed: bool,
}

impl AbiParam {
    pub fn new(name: impl Into<String>, ty: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: ty.into(),
            ..Default::default()
        }
    }

    /// Name of the struct this parameter (or its array element) was declared
    /// as, e.g. `Lib.Point` for an internal type of `struct Lib.Point[2][]`.
    pub fn struct_name(&self) -> Option<&str> {
        let mut name = self.internal_type.as_deref()?.strip_prefix("struct ")?.trim();
        while let Some(stripped) = name.strip_suffix(']') {
            name = stripped.rsplit_once('[')?.0;
        }

        Some(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StateMutability {
    Pure,
    View,
    #[serde(alias = "non-payable")]
    Nonpayable,
    Payable,
}

impl StateMutability {
    /// Old compilers only emitted the `constant` and `payable` flags.
    fn from_legacy_flags(constant: bool, payable: bool) -> Self {
        if constant {
            Self::View
        } else if payable {
            Self::Payable
        } else {
            Self::Nonpayable
        }
    }

    pub fn is_read_only(&self) -> bool {
        matches!(self, Self::Pure | Self::View)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionEntry {
    pub name: String,
    pub inputs: Vec<AbiParam>,
    pub outputs: Vec<AbiParam>,
    pub state_mutability: StateMutability,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventEntry {
    pub name: String,
    pub inputs: Vec<AbiParam>,
    pub anonymous: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorEntry {
    pub name: String,
    pub inputs: Vec<AbiParam>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstructorEntry {
    pub inputs: Vec<AbiParam>,
    pub state_mutability: StateMutability,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbiEntry {
    Function(FunctionEntry),
    Event(EventEntry),
    Error(ErrorEntry),
    Constructor(ConstructorEntry),
    Fallback { state_mutability: StateMutability },
    Receive,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAbiEntry {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    inputs: Vec<AbiParam>,
    #[serde(default)]
    outputs: Vec<AbiParam>,
    #[serde(default)]
    state_mutability: Option<StateMutability>,
    #[serde(default)]
    anonymous: bool,
    #[serde(default)]
    constant: bool,
    #[serde(default)]
    payable: bool,
}

impl TryFrom<RawAbiEntry> for AbiEntry {
    type Error = ethbind_core::Error;

    fn try_from(raw: RawAbiEntry) -> Result<Self> {
        let state_mutability = raw
            .state_mutability
            .unwrap_or_else(|| StateMutability::from_legacy_flags(raw.constant, raw.payable));

        let kind = raw.kind.as_deref().unwrap_or("function");
        let named = |what: &str| -> Result<String> {
            match raw.name.as_deref() {
                Some(name) if !name.is_empty() => Ok(name.to_string()),
                _ => Err(error!(InvalidAbi, "{what} entry without a name")),
            }
        };

        let entry = match kind {
            "function" => AbiEntry::Function(FunctionEntry {
                name: named("function")?,
                inputs: raw.inputs,
                outputs: raw.outputs,
                state_mutability,
            }),
            "event" => AbiEntry::Event(EventEntry {
                name: named("event")?,
                inputs: raw.inputs,
                anonymous: raw.anonymous,
            }),
            "error" => AbiEntry::Error(ErrorEntry {
                name: named("error")?,
                inputs: raw.inputs,
            }),
            "constructor" => AbiEntry::Constructor(ConstructorEntry {
                inputs: raw.inputs,
                state_mutability,
            }),
            "fallback" => AbiEntry::Fallback { state_mutability },
            "receive" => AbiEntry::Receive,
            other => return Err(error!(InvalidAbi, "unknown entry type `{other}`")),
        };

        Ok(entry)
    }
}

/// A parsed contract ABI. Accepts either the bare entry array or a compiler
/// artifact carrying `abi` and, optionally, `bytecode`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgramAbi {
    pub entries: Vec<AbiEntry>,
    pub bytecode: Option<String>,
}

impl ProgramAbi {
    pub fn from_json_abi(abi: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(abi)
            .map_err(|err| error!(InvalidAbi, "malformed JSON: {err}"))?;

        let (raw_entries, bytecode) = match value {
            Value::Array(_) => (value, None),
            Value::Object(mut artifact) => {
                let entries = artifact
                    .remove("abi")
                    .ok_or_else(|| error!(InvalidAbi, "artifact has no `abi` field"))?;
                let bytecode = artifact.remove("bytecode").and_then(artifact_bytecode);
                (entries, bytecode)
            }
            _ => {
                return Err(error!(
                    InvalidAbi,
                    "expected an array of entries or an artifact object"
                ))
            }
        };

        let entries = serde_json::from_value::<Vec<RawAbiEntry>>(raw_entries)
            .map_err(|err| error!(InvalidAbi, "{err}"))?
            .into_iter()
            .map(AbiEntry::try_from)
            .collect::<Result<Vec<_>>>()?;

        let constructors = entries
            .iter()
            .filter(|entry| matches!(entry, AbiEntry::Constructor(_)))
            .count();
        if constructors > 1 {
            return Err(error!(
                InvalidAbi,
                "{constructors} constructors declared, at most one is allowed"
            ));
        }

        Ok(Self { entries, bytecode })
    }

    pub fn functions(&self) -> impl Iterator<Item = &FunctionEntry> {
        self.entries.iter().filter_map(|entry| match entry {
            AbiEntry::Function(function) => Some(function),
            _ => None,
        })
    }

    pub fn events(&self) -> impl Iterator<Item = &EventEntry> {
        self.entries.iter().filter_map(|entry| match entry {
            AbiEntry::Event(event) => Some(event),
            _ => None,
        })
    }

    pub fn errors(&self) -> impl Iterator<Item = &ErrorEntry> {
        self.entries.iter().filter_map(|entry| match entry {
            AbiEntry::Error(error) => Some(error),
            _ => None,
        })
    }

    pub fn constructor(&self) -> Option<&ConstructorEntry> {
        self.entries.iter().find_map(|entry| match entry {
            AbiEntry::Constructor(constructor) => Some(constructor),
            _ => None,
        })
    }

    pub fn fallback(&self) -> Option<StateMutability> {
        self.entries.iter().find_map(|entry| match entry {
            AbiEntry::Fallback { state_mutability } => Some(*state_mutability),
            _ => None,
        })
    }

    pub fn has_receive(&self) -> bool {
        self.entries.iter().any(|entry| matches!(entry, AbiEntry::Receive))
    }
}

// Hardhat stores the code as a plain string, solc's standard JSON nests it
// under `object`.
fn artifact_bytecode(value: Value) -> Option<String> {
    let code = match value {
        Value::String(code) => code,
        Value::Object(mut object) => match object.remove("object") {
            Some(Value::String(code)) => code,
            _ => return None,
        },
        _ => return None,
    };

    let bare = code.trim().trim_start_matches("0x");
    (!bare.is_empty()).then_some(code)
}
