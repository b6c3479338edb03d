//! Detection and substitution of library placeholders in unlinked bytecode.
//!
//! The compiler leaves a `__$<fingerprint>$__` marker wherever a deployed
//! library's address has to be spliced in. The fingerprint is the first 34 hex
//! characters of the keccak-256 hash of the library's fully qualified name
//! (e.g. `contracts/Math.sol:Math`), so a marker occupies exactly the 40 hex
//! characters of the 20-byte address replacing it.

use std::collections::{BTreeMap, BTreeSet};

use itertools::Itertools;
use lazy_static::lazy_static;
use regex::Regex;

use crate::{
    errors::{error, Error, Result},
    types::Address,
    utils::keccak256,
};

pub const FINGERPRINT_LEN: usize = 34;
pub const PLACEHOLDER_LEN: usize = 40;

lazy_static! {
    static ref PLACEHOLDER: Regex = Regex::new(r"__\$([0-9a-fA-F]{34})\$__").unwrap();
}

pub fn library_fingerprint(fully_qualified_name: &str) -> String {
    let mut fingerprint = hex::encode(keccak256(fully_qualified_name));
    fingerprint.truncate(FINGERPRINT_LEN);
    fingerprint
}

pub fn placeholder(fingerprint: &str) -> String {
    format!("__${fingerprint}$__")
}

/// Every occurrence of one library's placeholder. Offsets are in bytes from the
/// start of the code (the `0x` prefix is not counted).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryPlaceholder {
    pub fingerprint: String,
    pub offsets: Vec<usize>,
}

/// Addresses of deployed libraries, keyed by lowercase placeholder fingerprint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Libraries {
    addresses: BTreeMap<String, Address>,
}

impl Libraries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_fingerprint(&mut self, fingerprint: &str, address: Address) -> &mut Self {
        self.addresses
            .insert(fingerprint.to_ascii_lowercase(), address);
        self
    }

    pub fn insert_qualified_name(&mut self, fully_qualified_name: &str, address: Address) -> &mut Self {
        self.insert_fingerprint(&library_fingerprint(fully_qualified_name), address)
    }

    pub fn address_of(&self, fingerprint: &str) -> Option<Address> {
        self.addresses
            .get(&fingerprint.to_ascii_lowercase())
            .copied()
    }

    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }
}

fn split_hex_prefix(bytecode: &str) -> (&str, &str) {
    let trimmed = bytecode.trim();
    match trimmed.get(..2) {
        Some("0x" | "0X") => trimmed.split_at(2),
        _ => ("", trimmed),
    }
}

fn ensure_hex(code: &str, start: usize, end: usize) -> Result<()> {
    match code[start..end]
        .char_indices()
        .find(|(_, c)| !c.is_ascii_hexdigit())
    {
        Some((idx, c)) => Err(error!(
            InvalidBytecode,
            "unexpected character `{c}` at byte offset {}",
            (start + idx) / 2
        )),
        None => Ok(()),
    }
}

/// Finds all library placeholders in `bytecode`, grouped by fingerprint in order
/// of first appearance.
pub fn scan(bytecode: &str) -> Result<Vec<LibraryPlaceholder>> {
    let (_, code) = split_hex_prefix(bytecode);

    let mut found: Vec<LibraryPlaceholder> = vec![];
    let mut cursor = 0;
    for captures in PLACEHOLDER.captures_iter(code) {
        let marker = captures.get(0).expect("group 0 is always present");
        ensure_hex(code, cursor, marker.start())?;

        if marker.start() % 2 != 0 {
            return Err(error!(
                InvalidBytecode,
                "library placeholder at hex position {} is not byte aligned",
                marker.start()
            ));
        }

        let fingerprint = captures[1].to_ascii_lowercase();
        let offset = marker.start() / 2;
        match found.iter_mut().find(|p| p.fingerprint == fingerprint) {
            Some(existing) => existing.offsets.push(offset),
            None => found.push(LibraryPlaceholder {
                fingerprint,
                offsets: vec![offset],
            }),
        }

        cursor = marker.end();
    }
    ensure_hex(code, cursor, code.len())?;

    if code.len() % 2 != 0 {
        return Err(error!(
            InvalidBytecode,
            "odd number of hex characters ({})",
            code.len()
        ));
    }

    Ok(found)
}

/// Substitutes the address of every referenced library in place. The result has
/// the same length as the input; bytecode without placeholders comes back
/// unchanged. Fails before touching anything if a placeholder has no address.
pub fn link(bytecode: &str, libraries: &Libraries) -> Result<String> {
    let placeholders = scan(bytecode)?;
    let (prefix, code) = split_hex_prefix(bytecode);

    let substitutions = placeholders
        .iter()
        .map(|placeholder| {
            let address = libraries.address_of(&placeholder.fingerprint).ok_or_else(|| {
                Error::UnresolvedLibraryPlaceholder {
                    fingerprint: placeholder.fingerprint.clone(),
                    offset: placeholder.offsets[0],
                }
            })?;
            tracing::trace!(
                fingerprint = %placeholder.fingerprint,
                %address,
                occurrences = placeholder.offsets.len(),
                "substituting library address"
            );
            Ok::<_, Error>(
                placeholder
                    .offsets
                    .iter()
                    .map(move |offset| (offset * 2, address.to_hex_string())),
            )
        })
        .flatten_ok()
        .collect::<Result<Vec<_>>>()?
        .into_iter()
        .sorted_by_key(|(position, _)| *position);

    let mut linked = String::with_capacity(prefix.len() + code.len());
    linked.push_str(prefix);

    let mut cursor = 0;
    for (position, address) in substitutions {
        linked.push_str(&code[cursor..position]);
        linked.push_str(&address);
        cursor = position + PLACEHOLDER_LEN;
    }
    linked.push_str(&code[cursor..]);

    debug_assert_eq!(linked.len(), prefix.len() + code.len());
    tracing::debug!(libraries = placeholders.len(), "linked bytecode");

    Ok(linked)
}

/// Orders `roots` and everything they transitively depend on so that every
/// library comes after its own dependencies. Names that only appear as
/// dependencies are treated as leaves. Any cycle is an error.
pub fn deploy_order<'a>(
    roots: impl IntoIterator<Item = &'a str>,
    dependencies: &BTreeMap<String, BTreeSet<String>>,
) -> Result<Vec<String>> {
    #[derive(Clone, Copy, PartialEq, Eq)]
    enum Mark {
        InProgress,
        Done,
    }

    fn visit(
        node: &str,
        dependencies: &BTreeMap<String, BTreeSet<String>>,
        marks: &mut BTreeMap<String, Mark>,
        path: &mut Vec<String>,
        order: &mut Vec<String>,
    ) -> Result<()> {
        match marks.get(node) {
            Some(Mark::Done) => return Ok(()),
            Some(Mark::InProgress) => {
                let start = path.iter().position(|n| n == node).unwrap_or(0);
                let mut cycle = path[start..].to_vec();
                cycle.push(node.to_string());
                return Err(Error::LibraryCycle(cycle));
            }
            None => {}
        }

        marks.insert(node.to_string(), Mark::InProgress);
        path.push(node.to_string());

        for dependency in dependencies.get(node).into_iter().flatten() {
            visit(dependency, dependencies, marks, path, order)?;
        }

        path.pop();
        marks.insert(node.to_string(), Mark::Done);
        order.push(node.to_string());

        Ok(())
    }

    let mut marks = BTreeMap::new();
    let mut order = vec![];
    for root in roots {
        visit(root, dependencies, &mut marks, &mut vec![], &mut order)?;
    }

    Ok(order)
}
