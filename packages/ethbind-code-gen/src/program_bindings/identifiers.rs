use std::{
    collections::BTreeMap,
    fmt::{Display, Formatter},
};

use ethbind_core::{error, Error, Result};
use inflector::Inflector;

use crate::utils::is_valid_ident;

/// What a resolved identifier names. Decides its casing and namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SymbolKind {
    Contract,
    Struct,
    Event,
    Error,
    Function,
    /// Methods the bindings add on their own, e.g. `deploy` or `filter_transfer`.
    GeneratedMethod,
    /// Types the bindings add on their own, e.g. `TransferIterator`.
    GeneratedType,
    Field,
    Argument,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
enum Namespace {
    Type,
    Value,
    Member,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Casing {
    Pascal,
    Snake,
}

impl SymbolKind {
    fn namespace(self) -> Namespace {
        match self {
            Self::Contract | Self::Struct | Self::Event | Self::Error | Self::GeneratedType => {
                Namespace::Type
            }
            Self::Function | Self::GeneratedMethod => Namespace::Value,
            Self::Field | Self::Argument => Namespace::Member,
        }
    }

    fn casing(self) -> Casing {
        match self.namespace() {
            Namespace::Type => Casing::Pascal,
            Namespace::Value | Namespace::Member => Casing::Snake,
        }
    }

    /// Whether user supplied aliases may rename symbols of this kind.
    pub fn is_aliasable(self) -> bool {
        matches!(
            self,
            Self::Contract | Self::Event | Self::Error | Self::Function
        )
    }
}

impl Display for SymbolKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Contract => "contract",
            Self::Struct => "struct",
            Self::Event => "event",
            Self::Error => "error",
            Self::Function => "function",
            Self::GeneratedMethod => "generated method",
            Self::GeneratedType => "generated type",
            Self::Field => "field",
            Self::Argument => "argument",
        };
        write!(f, "{name}")
    }
}

/// Where an identifier has to be unique. Type names declared inside a contract
/// also conflict with the global ones since shared structs are re-exported
/// into every contract module.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Scope {
    Global,
    Contract(String),
    /// Parameters of a single function, event or error, or fields of a struct.
    Member(String),
}

/// How to come up with an identifier for a symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameSource<'a> {
    /// Case-convert the raw ABI name.
    Raw(&'a str),
    /// Use verbatim. Only gives way to a name handed out earlier by a
    /// non-verbatim source; a clash with another verbatim name is an error.
    Alias(&'a str),
    /// Already in the right case, e.g. `transfer0` or `BalanceOfOutput`.
    Derived(String),
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
struct SymbolKey {
    kind: SymbolKind,
    scope: Scope,
    raw_name: String,
    signature: String,
}

/// Every identifier handed out during one generation run.
///
/// Resolution is memoized: asking again for the same symbol returns the same
/// name, and a later symbol never changes a name given out earlier.
#[derive(Debug, Default)]
pub struct IdentifierTable {
    resolved: BTreeMap<SymbolKey, String>,
    /// Collision key to whoever claimed it.
    claims: BTreeMap<(Namespace, Scope), BTreeMap<String, Claim>>,
}

#[derive(Debug, Clone)]
struct Claim {
    raw_name: String,
    /// Claimed through an alias or a reserved name, so it cannot be suffixed.
    verbatim: bool,
}

impl IdentifierTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.resolved.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolved.is_empty()
    }

    pub fn get(&self, kind: SymbolKind, scope: &Scope, raw_name: &str, signature: &str) -> Option<&str> {
        let key = SymbolKey {
            kind,
            scope: scope.clone(),
            raw_name: raw_name.to_string(),
            signature: signature.to_string(),
        };
        self.resolved.get(&key).map(String::as_str)
    }

    pub fn resolve(
        &mut self,
        kind: SymbolKind,
        scope: &Scope,
        raw_name: &str,
        signature: &str,
        source: NameSource<'_>,
    ) -> Result<String> {
        let key = SymbolKey {
            kind,
            scope: scope.clone(),
            raw_name: raw_name.to_string(),
            signature: signature.to_string(),
        };
        if let Some(existing) = self.resolved.get(&key) {
            return Ok(existing.clone());
        }

        let namespace = kind.namespace();
        let verbatim = matches!(source, NameSource::Alias(_));
        let exported = match source {
            NameSource::Alias(alias) => {
                if !is_valid_ident(alias) {
                    return Err(error!(
                        InvalidConfig,
                        "alias `{alias}` for {kind} `{raw_name}` is not a valid identifier"
                    ));
                }
                match self.conflict(namespace, scope, alias) {
                    None => alias.to_string(),
                    Some(first) if first.verbatim => {
                        return Err(Error::NameCollision {
                            kind: kind.to_string(),
                            first: first.raw_name.clone(),
                            second: raw_name.to_string(),
                            exported: alias.to_string(),
                        });
                    }
                    // Names handed out never change. `IdentifierResolver`
                    // callers claim aliases first, so this only happens across
                    // kinds resolved in a fixed order.
                    Some(first) => {
                        tracing::warn!(%kind, raw_name, alias, taken_by = %first.raw_name, "alias already taken, suffixing it");
                        self.disambiguate(kind, scope, alias.to_string())
                    }
                }
            }
            NameSource::Raw(raw) => {
                let candidate = escape(&capitalize(kind, raw))?;
                self.disambiguate(kind, scope, candidate)
            }
            NameSource::Derived(derived) => {
                let candidate = escape(&derived)?;
                self.disambiguate(kind, scope, candidate)
            }
        };

        self.claims
            .entry((namespace, scope.clone()))
            .or_default()
            .insert(
                collision_key(&exported),
                Claim {
                    raw_name: raw_name.to_string(),
                    verbatim,
                },
            );
        self.resolved.insert(key, exported.clone());

        tracing::trace!(%kind, raw_name, signature, exported, "resolved identifier");

        Ok(exported)
    }

    fn disambiguate(&self, kind: SymbolKind, scope: &Scope, candidate: String) -> String {
        let namespace = kind.namespace();
        if self.conflict(namespace, scope, &candidate).is_none() {
            return candidate;
        }

        (1..)
            .map(|n| match kind.casing() {
                Casing::Snake => format!("{candidate}_{n}"),
                Casing::Pascal => format!("{candidate}{n}"),
            })
            .find(|suffixed| self.conflict(namespace, scope, suffixed).is_none())
            .expect("an unused suffix always exists")
    }

    fn conflict(&self, namespace: Namespace, scope: &Scope, name: &str) -> Option<&Claim> {
        let key = collision_key(name);

        self.claims
            .iter()
            .filter(|((claimed_namespace, claimed_scope), _)| {
                *claimed_namespace == namespace && scopes_overlap(namespace, scope, claimed_scope)
            })
            .find_map(|(_, claims)| claims.get(&key))
    }
}

fn scopes_overlap(namespace: Namespace, scope: &Scope, other: &Scope) -> bool {
    if scope == other {
        return true;
    }

    namespace == Namespace::Type
        && matches!(
            (scope, other),
            (Scope::Global, Scope::Contract(_)) | (Scope::Contract(_), Scope::Global)
        )
}

// `_value` and `Value` would end up as the same field once cased, and some
// generated code compares identifiers case-insensitively.
fn collision_key(name: &str) -> String {
    name.trim_start_matches('_').to_lowercase()
}

/// The raw ABI name converted to the casing `kind` is exported with.
pub fn capitalize(kind: SymbolKind, raw_name: &str) -> String {
    let sanitized: String = raw_name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    let stripped = sanitized.trim_start_matches('_');
    if stripped.is_empty() {
        return sanitized;
    }

    let cased = match kind.casing() {
        Casing::Pascal => stripped.to_pascal_case(),
        Casing::Snake => snake_case(stripped),
    };

    if cased.is_empty() {
        stripped.to_string()
    } else {
        cased
    }
}

// Inflector puts a word break before every digit run (`foo0` -> `foo_0`). A
// digit stays attached to the word before it unless the raw name itself
// separates them with an underscore.
fn snake_case(name: &str) -> String {
    name.split('_')
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            segment
                .to_snake_case()
                .split('_')
                .fold(String::new(), |mut joined, word| {
                    if !joined.is_empty() && !word.starts_with(|c: char| c.is_ascii_digit()) {
                        joined.push('_');
                    }
                    joined.push_str(word);
                    joined
                })
        })
        .collect::<Vec<_>>()
        .join("_")
}

fn escape(candidate: &str) -> Result<String> {
    let mut escaped = if candidate.starts_with(|c: char| c.is_ascii_digit()) {
        format!("_{candidate}")
    } else {
        candidate.to_string()
    };

    if !is_valid_ident(&escaped) {
        escaped.push('_');
    }

    if is_valid_ident(&escaped) {
        Ok(escaped)
    } else {
        Err(error!(
            InvalidAbi,
            "`{candidate}` cannot be turned into an identifier"
        ))
    }
}

/// Resolves ABI names into exported identifiers, honoring user aliases.
///
/// Aliases are looked up by canonical signature first and by raw name second,
/// and only apply to the kinds reported by [`SymbolKind::is_aliasable`].
#[derive(Debug)]
pub struct IdentifierResolver<'a> {
    table: IdentifierTable,
    aliases: &'a BTreeMap<String, String>,
}

impl<'a> IdentifierResolver<'a> {
    pub fn new(aliases: &'a BTreeMap<String, String>) -> Self {
        Self {
            table: IdentifierTable::new(),
            aliases,
        }
    }

    pub fn table(&self) -> &IdentifierTable {
        &self.table
    }

    pub fn alias_for_signature(&self, kind: SymbolKind, signature: &str) -> Option<&'a str> {
        kind.is_aliasable()
            .then(|| self.aliases.get(signature))
            .flatten()
            .map(String::as_str)
    }

    pub fn alias_for_name(&self, kind: SymbolKind, raw_name: &str) -> Option<&'a str> {
        kind.is_aliasable()
            .then(|| self.aliases.get(raw_name))
            .flatten()
            .map(String::as_str)
    }

    /// Name an overload group is based on: the name alias if one is given,
    /// else the cased raw name.
    pub fn base_name(&self, kind: SymbolKind, raw_name: &str) -> String {
        self.alias_for_name(kind, raw_name)
            .map(ToString::to_string)
            .unwrap_or_else(|| capitalize(kind, raw_name))
    }

    /// Resolves `raw_name`, using an alias if one exists.
    pub fn resolve(
        &mut self,
        kind: SymbolKind,
        scope: &Scope,
        raw_name: &str,
        signature: &str,
    ) -> Result<String> {
        let source = match self
            .alias_for_signature(kind, signature)
            .or_else(|| self.alias_for_name(kind, raw_name))
        {
            Some(alias) => NameSource::Alias(alias),
            None => NameSource::Raw(raw_name),
        };

        self.table.resolve(kind, scope, raw_name, signature, source)
    }

    /// Resolves a member (argument or field) at `position`, naming it
    /// `{fallback}{position}` when the ABI left it unnamed.
    pub fn resolve_member(
        &mut self,
        kind: SymbolKind,
        scope: &Scope,
        raw_name: &str,
        position: usize,
        fallback: &str,
    ) -> Result<String> {
        let source = if raw_name.trim_start_matches('_').is_empty() {
            NameSource::Derived(format!("{fallback}{position}"))
        } else {
            NameSource::Raw(raw_name)
        };

        self.table
            .resolve(kind, scope, raw_name, &position.to_string(), source)
    }

    pub fn resolve_derived(
        &mut self,
        kind: SymbolKind,
        scope: &Scope,
        raw_name: &str,
        signature: &str,
        derived: String,
    ) -> Result<String> {
        self.table.resolve(
            kind,
            scope,
            raw_name,
            signature,
            NameSource::Derived(derived),
        )
    }

    pub fn resolve_with(
        &mut self,
        kind: SymbolKind,
        scope: &Scope,
        raw_name: &str,
        signature: &str,
        source: NameSource<'_>,
    ) -> Result<String> {
        self.table.resolve(kind, scope, raw_name, signature, source)
    }

    /// Claims a name the bindings themselves need, e.g. `deploy`. Reserved
    /// names are verbatim: an alias asking for one is a collision.
    pub fn reserve(&mut self, kind: SymbolKind, scope: &Scope, name: &str) -> Result<String> {
        self.table
            .resolve(kind, scope, name, "", NameSource::Alias(name))
    }
}
