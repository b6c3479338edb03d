use ethbind_core::{Result, WithContext};
use itertools::Itertools;

use crate::program_bindings::{
    abigen::{
        abigen_target::ParsedAbigenTarget,
        bindings::{
            function_generator::{constructor_spec, error_spec, function_spec},
            BindingContext,
        },
        libraries::LinkPlan,
    },
    events::{event_consumers, event_spec},
    generated_bindings::ContractBinding,
    identifiers::{Scope, SymbolKind},
    overloads::OverloadCandidate,
};

/// Methods every generated contract type carries.
const RESERVED_METHODS: [&str; 3] = ["new", "deploy", "address"];

#[tracing::instrument(skip_all, fields(contract = %target.name))]
pub(crate) fn contract_bindings(
    target: &ParsedAbigenTarget,
    link_plan: &LinkPlan,
    ctx: &mut BindingContext<'_>,
) -> Result<ContractBinding> {
    let name = target.name.as_str();
    let abi = &target.abi;

    let exported_name = ctx
        .names
        .resolve(SymbolKind::Contract, &Scope::Global, name, "")?;
    let scope = Scope::Contract(name.to_string());
    for method in RESERVED_METHODS {
        ctx.names
            .reserve(SymbolKind::GeneratedMethod, &scope, method)?;
    }

    let constructor = abi
        .constructor()
        .map(|constructor| constructor_spec(name, constructor, ctx))
        .transpose()
        .with_context(|| "constructor")?;

    // Event helpers are part of the generated API, so they are claimed before
    // any ABI function can take their names.
    let events = abi.events().collect_vec();
    let candidates = events
        .iter()
        .map(|event| OverloadCandidate {
            raw_name: &event.name,
            inputs: &event.inputs,
        })
        .collect_vec();
    let resolved_events = ctx
        .overloads
        .resolve(SymbolKind::Event, &scope, &candidates, &mut ctx.names)?;
    for (event, resolved) in events.iter().zip(&resolved_events) {
        if !event.anonymous {
            event_consumers(name, resolved, &mut ctx.names)?;
        }
    }

    let functions = abi.functions().collect_vec();
    let candidates = functions
        .iter()
        .map(|function| OverloadCandidate {
            raw_name: &function.name,
            inputs: &function.inputs,
        })
        .collect_vec();
    let resolved = ctx
        .overloads
        .resolve(SymbolKind::Function, &scope, &candidates, &mut ctx.names)?;
    let functions = functions
        .into_iter()
        .zip(resolved)
        .map(|(function, resolved)| {
            let signature = resolved.canonical_signature.clone();
            function_spec(name, function, resolved, ctx)
                .with_context(|| format!("function `{signature}`"))
        })
        .collect::<Result<Vec<_>>>()?;

    let events = events
        .into_iter()
        .zip(resolved_events)
        .map(|(event, resolved)| {
            let signature = resolved.canonical_signature.clone();
            event_spec(name, event, resolved, &mut ctx.mapper, &mut ctx.names)
                .with_context(|| format!("event `{signature}`"))
        })
        .collect::<Result<Vec<_>>>()?;

    let errors = abi.errors().collect_vec();
    let candidates = errors
        .iter()
        .map(|error| OverloadCandidate {
            raw_name: &error.name,
            inputs: &error.inputs,
        })
        .collect_vec();
    let resolved = ctx
        .overloads
        .resolve(SymbolKind::Error, &scope, &candidates, &mut ctx.names)?;
    let errors = errors
        .into_iter()
        .zip(resolved)
        .map(|(error, resolved)| {
            let signature = resolved.canonical_signature.clone();
            error_spec(name, error, resolved, ctx).with_context(|| format!("error `{signature}`"))
        })
        .collect::<Result<Vec<_>>>()?;

    let library_refs = link_plan.refs.get(name).cloned().unwrap_or_default();
    let library_deploy_order = link_plan
        .deploy_orders
        .get(name)
        .cloned()
        .unwrap_or_default();

    tracing::debug!(
        functions = functions.len(),
        events = events.len(),
        errors = errors.len(),
        libraries = library_refs.len(),
        "assembled contract binding"
    );

    Ok(ContractBinding {
        raw_name: name.to_string(),
        exported_name,
        constructor,
        functions,
        events,
        errors,
        has_fallback: abi.fallback().is_some(),
        has_receive: abi.has_receive(),
        bytecode: target.bytecode.clone(),
        library_refs,
        library_deploy_order,
    })
}
