use std::{collections::BTreeMap, convert::TryFrom};

use ethbind_core::{error, Error, Result, WithContext};
use serde::Deserialize;

use crate::program_bindings::abi_types::ProgramAbi;

/// One contract to generate bindings for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AbigenTarget {
    pub name: String,
    /// The JSON ABI, either a bare entry array or a compiler artifact.
    pub abi: String,
    /// Unlinked creation bytecode. Takes precedence over one found in the artifact.
    pub bytecode: Option<String>,
}

impl AbigenTarget {
    pub fn new(name: impl Into<String>, abi: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            abi: abi.into(),
            bytecode: None,
        }
    }

    pub fn with_bytecode(mut self, bytecode: impl Into<String>) -> Self {
        self.bytecode = Some(bytecode.into());
        self
    }
}

/// Knobs for a generation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct BindgenOptions {
    /// Raw name or canonical signature to the identifier to export it as.
    pub aliases: BTreeMap<String, String>,
    /// Signature to the 4-byte selector (hex) to use instead of the computed one.
    pub signature_overrides: BTreeMap<String, String>,
    /// Library name to placeholder fingerprint. An empty fingerprint is derived
    /// from the name, which then has to be fully qualified, e.g.
    /// `contracts/Math.sol:Math`.
    pub libraries: BTreeMap<String, String>,
}

impl BindgenOptions {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|err| error!(InvalidConfig, "{err}"))
    }

    pub fn with_alias(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.aliases.insert(from.into(), to.into());
        self
    }

    pub fn with_signature_override(
        mut self,
        signature: impl Into<String>,
        selector: impl Into<String>,
    ) -> Self {
        self.signature_overrides
            .insert(signature.into(), selector.into());
        self
    }

    pub fn with_library(mut self, name: impl Into<String>, fingerprint: impl Into<String>) -> Self {
        self.libraries.insert(name.into(), fingerprint.into());
        self
    }
}

pub(crate) struct ParsedAbigenTarget {
    pub name: String,
    pub abi: ProgramAbi,
    pub bytecode: Option<String>,
}

impl TryFrom<AbigenTarget> for ParsedAbigenTarget {
    type Error = Error;

    fn try_from(target: AbigenTarget) -> Result<Self> {
        if target.name.trim().is_empty() {
            return Err(error!(InvalidConfig, "target without a name"));
        }

        let abi = ProgramAbi::from_json_abi(&target.abi)
            .with_context(|| format!("ABI of `{}`", target.name))?;
        let bytecode = target.bytecode.or_else(|| abi.bytecode.clone());

        Ok(Self {
            name: target.name,
            abi,
            bytecode,
        })
    }
}
