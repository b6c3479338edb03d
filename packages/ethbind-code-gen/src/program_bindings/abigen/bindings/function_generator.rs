use ethbind_core::{utils::selector_of, Result, WithContext};
use inflector::Inflector;

use crate::program_bindings::{
    abi_types::{AbiParam, ConstructorEntry, ErrorEntry, FunctionEntry, StateMutability},
    abigen::bindings::BindingContext,
    generated_bindings::{
        ArgSpec, CallMode, ConstructorSpec, ErrorSpec, FunctionSpec, ReturnShape, ReturnStruct,
    },
    identifiers::{Scope, SymbolKind},
    overloads::ResolvedOverload,
    sol_type::SolType,
};

pub(crate) fn function_spec(
    contract: &str,
    function: &FunctionEntry,
    resolved: ResolvedOverload,
    ctx: &mut BindingContext<'_>,
) -> Result<FunctionSpec> {
    let inputs = arg_specs(
        contract,
        &function.inputs,
        &Scope::Member(format!("{contract}::fn {}", resolved.signature)),
        SymbolKind::Argument,
        "arg",
        ctx,
    )?;
    // Outputs become fields of the return struct, so they are named as such.
    let outputs = arg_specs(
        contract,
        &function.outputs,
        &Scope::Member(format!("{contract}::fn {} returns", resolved.signature)),
        SymbolKind::Field,
        "ret",
        ctx,
    )?;

    let returns = match outputs.as_slice() {
        [] => ReturnShape::Unit,
        [single] => ReturnShape::Single(single.ty.clone()),
        _ => {
            let name = ctx.names.resolve_derived(
                SymbolKind::GeneratedType,
                &Scope::Contract(contract.to_string()),
                &format!("{} output", resolved.exported_name),
                &resolved.signature,
                format!("{}Output", resolved.exported_name.to_pascal_case()),
            )?;
            ReturnShape::Struct(ReturnStruct {
                name,
                fields: outputs.clone(),
            })
        }
    };

    let call_mode = if function.state_mutability.is_read_only() {
        CallMode::Call
    } else if outputs.is_empty() {
        CallMode::Transact
    } else {
        CallMode::CallAndTransact
    };

    Ok(FunctionSpec {
        raw_name: function.name.clone(),
        exported_name: resolved.exported_name,
        selector: resolved
            .selector_override
            .unwrap_or_else(|| selector_of(&resolved.canonical_signature)),
        selector_overridden: resolved.selector_override.is_some(),
        signature: resolved.canonical_signature,
        inputs,
        outputs,
        returns,
        state_mutability: function.state_mutability,
        call_mode,
    })
}

/// Errors are modeled like functions without outputs.
pub(crate) fn error_spec(
    contract: &str,
    error: &ErrorEntry,
    resolved: ResolvedOverload,
    ctx: &mut BindingContext<'_>,
) -> Result<ErrorSpec> {
    let inputs = arg_specs(
        contract,
        &error.inputs,
        &Scope::Member(format!("{contract}::error {}", resolved.signature)),
        SymbolKind::Field,
        "arg",
        ctx,
    )?;

    Ok(ErrorSpec {
        raw_name: error.name.clone(),
        exported_name: resolved.exported_name,
        selector: resolved
            .selector_override
            .unwrap_or_else(|| selector_of(&resolved.canonical_signature)),
        signature: resolved.canonical_signature,
        inputs,
    })
}

pub(crate) fn constructor_spec(
    contract: &str,
    constructor: &ConstructorEntry,
    ctx: &mut BindingContext<'_>,
) -> Result<ConstructorSpec> {
    let inputs = arg_specs(
        contract,
        &constructor.inputs,
        &Scope::Member(format!("{contract}::constructor")),
        SymbolKind::Argument,
        "arg",
        ctx,
    )?;

    Ok(ConstructorSpec {
        inputs,
        payable: constructor.state_mutability == StateMutability::Payable,
    })
}

fn arg_specs(
    contract: &str,
    params: &[AbiParam],
    scope: &Scope,
    kind: SymbolKind,
    fallback: &str,
    ctx: &mut BindingContext<'_>,
) -> Result<Vec<ArgSpec>> {
    params
        .iter()
        .enumerate()
        .map(|(position, param)| {
            let describe = || match param.name.as_str() {
                "" => format!("parameter {position}"),
                name => format!("parameter `{name}`"),
            };

            let sol_type = SolType::parse(param).with_context(describe)?;
            let mapping = ctx
                .mapper
                .map(&sol_type, contract, &mut ctx.names)
                .with_context(describe)?;

            Ok(ArgSpec {
                exported_name: ctx.names.resolve_member(
                    kind,
                    scope,
                    &param.name,
                    position,
                    fallback,
                )?,
                raw_name: param.name.clone(),
                sol_type,
                ty: mapping.ty,
                indexed: param.indexed,
            })
        })
        .collect()
}
