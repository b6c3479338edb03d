use std::collections::{BTreeMap, BTreeSet};

use ethbind_core::{
    error,
    linking::{deploy_order, library_fingerprint, scan, FINGERPRINT_LEN},
    Result, WithContext,
};

use crate::program_bindings::{
    abigen::abigen_target::ParsedAbigenTarget, generated_bindings::LibraryRef,
};

/// Placeholder fingerprints of the configured libraries.
#[derive(Debug, Default)]
pub(crate) struct LibraryIndex {
    by_fingerprint: BTreeMap<String, String>,
}

impl LibraryIndex {
    pub(crate) fn new(libraries: &BTreeMap<String, String>) -> Result<Self> {
        let mut by_fingerprint = BTreeMap::new();
        for (name, fingerprint) in libraries {
            let fingerprint = if fingerprint.is_empty() {
                library_fingerprint(name)
            } else {
                fingerprint.to_ascii_lowercase()
            };

            if fingerprint.len() != FINGERPRINT_LEN
                || !fingerprint.chars().all(|c| c.is_ascii_hexdigit())
            {
                return Err(error!(
                    InvalidConfig,
                    "fingerprint `{fingerprint}` of library `{name}` is not {FINGERPRINT_LEN} hex characters"
                ));
            }

            if let Some(other) = by_fingerprint.insert(fingerprint.clone(), name.clone()) {
                return Err(error!(
                    InvalidConfig,
                    "libraries `{other}` and `{name}` share the fingerprint `{fingerprint}`"
                ));
            }
        }

        Ok(Self { by_fingerprint })
    }

    pub(crate) fn library_refs(&self, bytecode: &str) -> Result<Vec<LibraryRef>> {
        let refs = scan(bytecode)?
            .into_iter()
            .map(|placeholder| LibraryRef {
                library: self.by_fingerprint.get(&placeholder.fingerprint).cloned(),
                fingerprint: placeholder.fingerprint,
                offsets: placeholder.offsets,
            })
            .collect();

        Ok(refs)
    }

    /// The configured library a target provides, if any. `Math` provides both
    /// `Math` and `contracts/Math.sol:Math`.
    fn provided_by(&self, target: &str) -> Option<&str> {
        self.by_fingerprint
            .values()
            .find(|library| {
                *library == target
                    || library
                        .rsplit_once(':')
                        .is_some_and(|(_, short_name)| short_name == target)
            })
            .map(String::as_str)
    }
}

/// Library references and deploy order of every target.
#[derive(Debug, Default)]
pub(crate) struct LinkPlan {
    pub refs: BTreeMap<String, Vec<LibraryRef>>,
    pub deploy_orders: BTreeMap<String, Vec<String>>,
}

impl LinkPlan {
    pub(crate) fn new(targets: &[ParsedAbigenTarget], index: &LibraryIndex) -> Result<Self> {
        let mut refs = BTreeMap::new();
        let mut dependencies: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        let mut nodes = BTreeMap::new();

        for target in targets {
            let target_refs = match &target.bytecode {
                Some(bytecode) => index
                    .library_refs(bytecode)
                    .with_context(|| format!("bytecode of `{}`", target.name))?,
                None => vec![],
            };

            let node = index
                .provided_by(&target.name)
                .unwrap_or(target.name.as_str())
                .to_string();
            dependencies.entry(node.clone()).or_default().extend(
                target_refs
                    .iter()
                    .filter_map(|library_ref| library_ref.library.clone()),
            );

            nodes.insert(target.name.clone(), node);
            refs.insert(target.name.clone(), target_refs);
        }

        // Surfaces cycles even between libraries no contract links against.
        deploy_order(dependencies.keys().map(String::as_str), &dependencies)?;

        let deploy_orders = nodes
            .into_iter()
            .map(|(target, node)| {
                let mut order = deploy_order([node.as_str()], &dependencies)?;
                order.retain(|library| *library != node);
                Ok((target, order))
            })
            .collect::<Result<_>>()?;

        Ok(Self {
            refs,
            deploy_orders,
        })
    }
}
