use std::collections::BTreeSet;

pub use abigen_target::{AbigenTarget, BindgenOptions};
use ethbind_core::{error, Result, WithContext};

use crate::program_bindings::{
    abigen::{
        abigen_target::ParsedAbigenTarget,
        bindings::{contract_bindings, BindingContext},
        libraries::{LibraryIndex, LinkPlan},
    },
    generated_bindings::Bindings,
    identifiers::IdentifierResolver,
    overloads::OverloadResolver,
    type_mapper::TypeMapper,
};

mod abigen_target;
mod bindings;
mod libraries;

pub struct Abigen;

impl Abigen {
    /// Builds the binding model of every target in one run. Structs used by
    /// more than one target end up shared.
    ///
    /// Identical inputs produce identical output. Nothing is returned unless
    /// every target resolves; the error carries the contract and member that
    /// failed.
    pub fn generate(targets: Vec<AbigenTarget>, options: &BindgenOptions) -> Result<Bindings> {
        let parsed_targets = Self::parse_targets(targets)?;

        let library_index = LibraryIndex::new(&options.libraries)?;
        let link_plan = LinkPlan::new(&parsed_targets, &library_index)?;

        let mut ctx = BindingContext {
            mapper: TypeMapper::new(),
            names: IdentifierResolver::new(&options.aliases),
            overloads: OverloadResolver::new(&options.signature_overrides)?,
        };

        let contracts = parsed_targets
            .iter()
            .map(|target| {
                contract_bindings(target, &link_plan, &mut ctx)
                    .with_context(|| format!("contract `{}`", target.name))
            })
            .collect::<Result<Vec<_>>>()?;

        let structs = ctx.mapper.finish();

        tracing::debug!(
            contracts = contracts.len(),
            structs = structs.len(),
            identifiers = ctx.names.table().len(),
            "generated bindings"
        );

        Ok(Bindings { contracts, structs })
    }

    fn parse_targets(targets: Vec<AbigenTarget>) -> Result<Vec<ParsedAbigenTarget>> {
        let mut seen = BTreeSet::new();
        if let Some(duplicate) = targets.iter().find(|target| !seen.insert(&target.name)) {
            return Err(error!(
                InvalidConfig,
                "`{}` is given as a target more than once",
                duplicate.name
            ));
        }

        targets
            .into_iter()
            .map(ParsedAbigenTarget::try_from)
            .collect()
    }
}
