use std::collections::BTreeMap;

use ethbind_core::{error, types::Selector, Error, Result, WithContext};
use itertools::Itertools;

use crate::program_bindings::{
    abi_types::AbiParam,
    identifiers::{IdentifierResolver, Scope, SymbolKind},
    sol_type::{canonical_signature, detailed_signature},
};

/// A function, event or error awaiting a name.
#[derive(Debug, Clone, Copy)]
pub struct OverloadCandidate<'a> {
    pub raw_name: &'a str,
    pub inputs: &'a [AbiParam],
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedOverload {
    pub exported_name: String,
    /// The signature identifying this member. Differs from `canonical_signature`
    /// only when an override was keyed by the detailed signature.
    pub signature: String,
    pub canonical_signature: String,
    pub selector_override: Option<Selector>,
}

/// Gives every member of an overload group a distinct exported name.
///
/// The first declared member keeps the plain name, later ones are suffixed
/// with their position in the group starting from zero: `transfer`,
/// `transfer0`, `transfer1`. Aliases are claimed before any other name of the
/// group list, so an alias keyed by a member's signature is used verbatim and a
/// raw name it collides with is the one suffixed.
#[derive(Debug, Clone, Default)]
pub struct OverloadResolver {
    overrides: BTreeMap<String, Selector>,
}

impl OverloadResolver {
    /// `overrides` maps a signature onto the selector to use instead of the
    /// computed one.
    pub fn new(overrides: &BTreeMap<String, String>) -> Result<Self> {
        let overrides = overrides
            .iter()
            .map(|(signature, selector)| {
                let selector = parse_selector(selector).with_context(|| {
                    format!("signature override for `{signature}`")
                })?;
                Ok((signature.clone(), selector))
            })
            .collect::<Result<_>>()?;

        Ok(Self { overrides })
    }

    pub fn resolve(
        &self,
        kind: SymbolKind,
        scope: &Scope,
        candidates: &[OverloadCandidate<'_>],
        names: &mut IdentifierResolver<'_>,
    ) -> Result<Vec<ResolvedOverload>> {
        let signatures = candidates
            .iter()
            .map(|candidate| self.signatures_of(candidate))
            .collect::<Result<Vec<_>>>()?;

        let groups = candidates
            .iter()
            .enumerate()
            .into_group_map_by(|(_, candidate)| candidate.raw_name);
        let groups = candidates
            .iter()
            .map(|candidate| candidate.raw_name)
            .unique()
            .map(|raw_name| {
                let members = groups[raw_name].iter().map(|(idx, _)| *idx).collect_vec();
                (raw_name, members)
            })
            .collect_vec();

        for (raw_name, members) in &groups {
            if let Some(duplicate) = members
                .iter()
                .map(|idx| &signatures[*idx].0)
                .duplicates()
                .next()
            {
                return Err(Error::AmbiguousOverload {
                    raw_name: raw_name.to_string(),
                    signature: duplicate.clone(),
                });
            }
        }

        let mut exported: Vec<Option<String>> = vec![None; candidates.len()];

        // Aliases are used verbatim, so they are claimed before any raw name
        // of the scope can take them regardless of declaration order.
        for (raw_name, members) in &groups {
            for (position, idx) in members.iter().enumerate() {
                let signature = &signatures[*idx].0;
                let aliased = names.alias_for_signature(kind, signature).is_some()
                    || (position == 0 && names.alias_for_name(kind, raw_name).is_some());
                if aliased {
                    exported[*idx] = Some(names.resolve(kind, scope, raw_name, signature)?);
                }
            }
        }

        // Plain names next so a suffixed overload never takes the base name
        // of a group declared after it.
        for (raw_name, members) in &groups {
            let first = members[0];
            if exported[first].is_none() {
                exported[first] = Some(names.resolve(kind, scope, raw_name, &signatures[first].0)?);
            }
        }

        for (raw_name, members) in &groups {
            for (position, idx) in members.iter().enumerate().skip(1) {
                if exported[*idx].is_some() {
                    continue;
                }
                let signature = &signatures[*idx].0;
                let base = names.base_name(kind, raw_name);
                let name = names.resolve_derived(
                    kind,
                    scope,
                    raw_name,
                    signature,
                    format!("{base}{}", position - 1),
                )?;
                exported[*idx] = Some(name);
            }
        }

        let resolved = exported
            .into_iter()
            .zip(signatures)
            .map(|(exported_name, (signature, canonical_signature, selector_override))| {
                let exported_name = exported_name.ok_or_else(|| {
                    error!(InvalidAbi, "`{canonical_signature}` was left without a name")
                })?;
                tracing::debug!(%kind, %canonical_signature, %exported_name, "resolved overload");

                Ok(ResolvedOverload {
                    exported_name,
                    signature,
                    canonical_signature,
                    selector_override,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(resolved)
    }

    // (identity, canonical, selector override)
    fn signatures_of(
        &self,
        candidate: &OverloadCandidate<'_>,
    ) -> Result<(String, String, Option<Selector>)> {
        let canonical = canonical_signature(candidate.raw_name, candidate.inputs)
            .with_context(|| format!("signature of `{}`", candidate.raw_name))?;
        let detailed = detailed_signature(candidate.raw_name, candidate.inputs)?;

        let resolved = if let Some(selector) = self.overrides.get(&detailed) {
            (detailed, canonical, Some(*selector))
        } else if let Some(selector) = self.overrides.get(&canonical) {
            (canonical.clone(), canonical, Some(*selector))
        } else {
            (canonical.clone(), canonical, None)
        };

        Ok(resolved)
    }
}

fn parse_selector(selector: &str) -> Result<Selector> {
    let mut bytes = [0u8; 4];
    hex::decode_to_slice(selector.trim().trim_start_matches("0x"), &mut bytes)
        .map_err(|err| error!(InvalidConfig, "`{selector}` is not a 4-byte selector: {err}"))?;

    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn scope() -> Scope {
        Scope::Contract("Token".to_string())
    }

    fn params(types: &[&str]) -> Vec<AbiParam> {
        types.iter().map(|ty| AbiParam::new("", *ty)).collect()
    }

    #[test]
    fn later_overloads_get_zero_based_suffixes() -> Result<()> {
        let (one, two, three) = (params(&["address"]), params(&["address", "uint256"]), params(&[]));
        let candidates = [
            OverloadCandidate { raw_name: "transfer", inputs: &one },
            OverloadCandidate { raw_name: "transfer", inputs: &two },
            OverloadCandidate { raw_name: "transfer", inputs: &three },
        ];
        let aliases = BTreeMap::new();
        let mut names = IdentifierResolver::new(&aliases);

        let resolved = OverloadResolver::default().resolve(SymbolKind::Function, &scope(), &candidates, &mut names)?;

        let exported = resolved.iter().map(|r| r.exported_name.as_str()).collect::<Vec<_>>();
        assert_eq!(exported, ["transfer", "transfer0", "transfer1"]);
        assert_eq!(resolved[1].canonical_signature, "transfer(address,uint256)");

        Ok(())
    }

    #[test]
    fn plain_names_are_claimed_before_suffixed_ones() -> Result<()> {
        let (none, one) = (params(&[]), params(&["uint8"]));
        let candidates = [
            OverloadCandidate { raw_name: "foo", inputs: &none },
            OverloadCandidate { raw_name: "foo", inputs: &one },
            OverloadCandidate { raw_name: "foo0", inputs: &none },
        ];
        let aliases = BTreeMap::new();
        let mut names = IdentifierResolver::new(&aliases);

        let resolved = OverloadResolver::default().resolve(SymbolKind::Function, &scope(), &candidates, &mut names)?;

        let exported = resolved.iter().map(|r| r.exported_name.as_str()).collect::<Vec<_>>();
        assert_eq!(exported, ["foo", "foo0_1", "foo0"]);

        Ok(())
    }

    #[test]
    fn signature_alias_is_used_verbatim() -> Result<()> {
        let (one, two) = (params(&["address"]), params(&["address", "uint256"]));
        let candidates = [
            OverloadCandidate { raw_name: "transfer", inputs: &one },
            OverloadCandidate { raw_name: "transfer", inputs: &two },
        ];
        let aliases = BTreeMap::from([
            ("transfer".to_string(), "send".to_string()),
            ("transfer(address,uint256)".to_string(), "send_amount".to_string()),
        ]);
        let mut names = IdentifierResolver::new(&aliases);

        let resolved = OverloadResolver::default().resolve(SymbolKind::Function, &scope(), &candidates, &mut names)?;

        let exported = resolved.iter().map(|r| r.exported_name.as_str()).collect::<Vec<_>>();
        assert_eq!(exported, ["send", "send_amount"]);

        Ok(())
    }

    #[test]
    fn name_alias_replaces_the_group_base() -> Result<()> {
        let (one, two) = (params(&["address"]), params(&["address", "uint256"]));
        let candidates = [
            OverloadCandidate { raw_name: "transfer", inputs: &one },
            OverloadCandidate { raw_name: "transfer", inputs: &two },
        ];
        let aliases = BTreeMap::from([("transfer".to_string(), "send".to_string())]);
        let mut names = IdentifierResolver::new(&aliases);

        let resolved = OverloadResolver::default().resolve(SymbolKind::Function, &scope(), &candidates, &mut names)?;

        let exported = resolved.iter().map(|r| r.exported_name.as_str()).collect::<Vec<_>>();
        assert_eq!(exported, ["send", "send0"]);

        Ok(())
    }

    #[test]
    fn aliases_are_claimed_before_raw_names_in_either_order() -> Result<()> {
        let none = params(&[]);
        let issue = OverloadCandidate { raw_name: "issue", inputs: &none };
        let mint = OverloadCandidate { raw_name: "mint", inputs: &none };
        let aliases = BTreeMap::from([("issue".to_string(), "mint".to_string())]);

        for candidates in [[issue, mint], [mint, issue]] {
            let mut names = IdentifierResolver::new(&aliases);

            let resolved = OverloadResolver::default().resolve(SymbolKind::Function, &scope(), &candidates, &mut names)?;

            let exported = candidates
                .iter()
                .zip(&resolved)
                .map(|(candidate, resolved)| (candidate.raw_name, resolved.exported_name.as_str()))
                .collect::<BTreeMap<_, _>>();
            assert_eq!(exported, BTreeMap::from([("issue", "mint"), ("mint", "mint_1")]));
        }

        Ok(())
    }

    #[test]
    fn signature_alias_of_a_later_overload_beats_an_earlier_plain_name() -> Result<()> {
        let (none, one) = (params(&[]), params(&["uint256"]));
        let candidates = [
            OverloadCandidate { raw_name: "burn", inputs: &none },
            OverloadCandidate { raw_name: "burnAll", inputs: &none },
            OverloadCandidate { raw_name: "burn", inputs: &one },
        ];
        let aliases = BTreeMap::from([("burn(uint256)".to_string(), "burn_all".to_string())]);
        let mut names = IdentifierResolver::new(&aliases);

        let resolved = OverloadResolver::default().resolve(SymbolKind::Function, &scope(), &candidates, &mut names)?;

        let exported = resolved.iter().map(|r| r.exported_name.as_str()).collect::<Vec<_>>();
        assert_eq!(exported, ["burn", "burn_all_1", "burn_all"]);

        Ok(())
    }

    #[test]
    fn identical_signatures_are_ambiguous() {
        let one = params(&["address"]);
        let candidates = [
            OverloadCandidate { raw_name: "approve", inputs: &one },
            OverloadCandidate { raw_name: "approve", inputs: &one },
        ];
        let aliases = BTreeMap::new();
        let mut names = IdentifierResolver::new(&aliases);

        let err = OverloadResolver::default()
            .resolve(SymbolKind::Function, &scope(), &candidates, &mut names)
            .expect_err("should have failed");

        let Error::AmbiguousOverload { raw_name, signature } = err else {
            panic!("expected an ambiguous overload, got {err:?}");
        };
        assert_eq!(raw_name, "approve");
        assert_eq!(signature, "approve(address)");
    }

    #[test]
    fn detailed_signature_override_tells_callbacks_apart() -> Result<()> {
        let callback = |internal: &str| AbiParam {
            internal_type: Some(internal.to_string()),
            ..AbiParam::new("cb", "function")
        };
        let (one, two) = (
            vec![callback("function (uint256) external")],
            vec![callback("function (address) external")],
        );
        let candidates = [
            OverloadCandidate { raw_name: "hook", inputs: &one },
            OverloadCandidate { raw_name: "hook", inputs: &two },
        ];
        let overrides = BTreeMap::from([(
            "hook(function (address) external)".to_string(),
            "0xdeadbeef".to_string(),
        )]);
        let aliases = BTreeMap::new();
        let mut names = IdentifierResolver::new(&aliases);

        let resolved = OverloadResolver::new(&overrides)?.resolve(SymbolKind::Function, &scope(), &candidates, &mut names)?;

        assert_eq!(resolved[0].selector_override, None);
        assert_eq!(resolved[1].selector_override, Some([0xde, 0xad, 0xbe, 0xef]));
        assert_eq!(resolved[1].canonical_signature, "hook(function)");
        assert_eq!(resolved[1].exported_name, "hook0");

        Ok(())
    }

    #[test]
    fn malformed_override_selector_is_a_config_error() {
        let overrides = BTreeMap::from([("f()".to_string(), "0x1234".to_string())]);

        let err = OverloadResolver::new(&overrides).expect_err("should have failed");

        assert!(matches!(err.root_cause(), Error::InvalidConfig(_)), "got {err:?}");
    }
}
