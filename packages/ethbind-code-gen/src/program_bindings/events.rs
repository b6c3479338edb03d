use ethbind_core::{error, utils::event_topic, Result, WithContext};

use crate::program_bindings::{
    abi_types::EventEntry,
    generated_bindings::{ArgSpec, EventConsumers, EventSpec, TopicFilter, TopicSlot},
    identifiers::{capitalize, IdentifierResolver, Scope, SymbolKind},
    overloads::ResolvedOverload,
    sol_type::SolType,
    type_mapper::{MappedType, TypeMapper},
};

/// Topics 1 to 3 are left for indexed parameters once topic0 holds the event signature.
const MAX_INDEXED: usize = 3;
const MAX_INDEXED_ANONYMOUS: usize = 4;

/// Builds the model of one event of `contract`, whose name was already settled
/// by the overload resolution.
pub(crate) fn event_spec(
    contract: &str,
    event: &EventEntry,
    resolved: ResolvedOverload,
    mapper: &mut TypeMapper,
    names: &mut IdentifierResolver<'_>,
) -> Result<EventSpec> {
    let max_indexed = if event.anonymous {
        MAX_INDEXED_ANONYMOUS
    } else {
        MAX_INDEXED
    };
    let indexed_count = event.inputs.iter().filter(|input| input.indexed).count();
    if indexed_count > max_indexed {
        return Err(error!(
            InvalidAbi,
            "event `{}` has {indexed_count} indexed parameters, at most {max_indexed} are allowed",
            resolved.canonical_signature
        ));
    }

    let scope = Scope::Member(format!("{contract}::event {}", resolved.signature));
    let first_topic = if event.anonymous { 0 } else { 1 };

    let mut inputs = Vec::with_capacity(event.inputs.len());
    let mut topics = vec![];
    for (position, input) in event.inputs.iter().enumerate() {
        let sol_type = SolType::parse(input)
            .with_context(|| format!("parameter {position} of `{}`", resolved.canonical_signature))?;

        let (ty, filter) = if input.indexed && sol_type.is_hashed_when_indexed() {
            (MappedType::Hash, TopicFilter::Hash)
        } else {
            let mapping = mapper.map(&sol_type, contract, names)?;
            (mapping.ty, TopicFilter::Value)
        };

        if input.indexed {
            topics.push(TopicSlot {
                position: first_topic + topics.len(),
                input: position,
                filter,
            });
        }

        inputs.push(ArgSpec {
            exported_name: names.resolve_member(
                SymbolKind::Argument,
                &scope,
                &input.name,
                position,
                "arg",
            )?,
            raw_name: input.name.clone(),
            sol_type,
            ty,
            indexed: input.indexed,
        });
    }

    let (topic0, consumers) = if event.anonymous {
        (None, None)
    } else {
        let consumers = event_consumers(contract, &resolved, names)?;
        (Some(event_topic(&resolved.canonical_signature)), Some(consumers))
    };

    Ok(EventSpec {
        raw_name: event.name.clone(),
        exported_name: resolved.exported_name,
        signature: resolved.canonical_signature,
        topic0,
        anonymous: event.anonymous,
        inputs,
        topics,
        consumers,
    })
}

/// Names of the helpers generated for a non-anonymous event. Memoized, so
/// resolving them ahead of [`event_spec`] claims the same names it will use.
pub(crate) fn event_consumers(
    contract: &str,
    resolved: &ResolvedOverload,
    names: &mut IdentifierResolver<'_>,
) -> Result<EventConsumers> {
    let scope = Scope::Contract(contract.to_string());
    let snake_name = capitalize(SymbolKind::GeneratedMethod, &resolved.exported_name);

    let mut method = |prefix: &str| {
        names.resolve_derived(
            SymbolKind::GeneratedMethod,
            &scope,
            &format!("{prefix}{}", resolved.exported_name),
            &resolved.signature,
            format!("{prefix}{snake_name}"),
        )
    };

    Ok(EventConsumers {
        filter_fn: method("filter_")?,
        watch_fn: method("watch_")?,
        parse_fn: method("parse_")?,
        iterator_type: names.resolve_derived(
            SymbolKind::GeneratedType,
            &scope,
            &resolved.exported_name,
            &resolved.signature,
            format!("{}Iterator", resolved.exported_name),
        )?,
    })
}
