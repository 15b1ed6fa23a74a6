//! ABI decoder implementation using alloy-dyn-abi

use alloy_dyn_abi::{DynSolType, DynSolValue};
use alloy_primitives::{Bytes, B256};

use crate::domain::abi::{AbiDecoder, ArgValue, DecodedArg, ParamSpec, RecordField, StructuralError};

/// ABI decoder implementation using alloy-dyn-abi
#[derive(Debug, Clone, Copy, Default)]
pub struct AlloyAbiDecoder;

impl AlloyAbiDecoder {
    pub fn new() -> Self {
        Self
    }
}

impl AbiDecoder for AlloyAbiDecoder {
    fn decode_params(
        &self,
        inputs: &[ParamSpec],
        data: &[u8],
        strict: bool,
    ) -> Result<Vec<DecodedArg>, StructuralError> {
        let types = parse_types(inputs)?;

        let decoded_values = if types.is_empty() {
            if strict && !data.is_empty() {
                return Err(StructuralError::NonCanonical {
                    actual: data.len(),
                    canonical: 0,
                });
            }
            Vec::new()
        } else {
            // Decode as a parameter list (no outer offset word)
            let tuple_type = DynSolType::Tuple(types);
            let decoded = tuple_type
                .abi_decode_params(data)
                .map_err(|err| StructuralError::Decode(err.to_string()))?;

            if strict {
                let canonical = decoded.abi_encode_params();
                if canonical.as_slice() != data {
                    return Err(StructuralError::NonCanonical {
                        actual: data.len(),
                        canonical: canonical.len(),
                    });
                }
            }

            match decoded {
                DynSolValue::Tuple(values) => values,
                other => vec![other],
            }
        };

        Ok(build_args(inputs, decoded_values))
    }

    fn decode_log(
        &self,
        inputs: &[ParamSpec],
        topics: &[B256],
        data: &[u8],
    ) -> Result<Vec<DecodedArg>, StructuralError> {
        let indexed: Vec<&ParamSpec> = inputs.iter().filter(|p| p.indexed).collect();
        let body: Vec<ParamSpec> = inputs.iter().filter(|p| !p.indexed).cloned().collect();

        // topics[0] is the event signature
        let expected = indexed.len() + 1;
        if topics.len() != expected {
            return Err(StructuralError::TopicCount {
                expected,
                actual: topics.len(),
            });
        }

        let mut topic_values = Vec::with_capacity(indexed.len());
        for (param, topic) in indexed.iter().zip(topics.iter().skip(1)) {
            let ty = parse_type(param)?;
            let value = if is_hashed_when_indexed(&ty) {
                // Reference types are stored as their keccak hash
                ArgValue::FixedBytes(Bytes::copy_from_slice(topic.as_slice()))
            } else {
                let decoded = ty
                    .abi_decode(topic.as_slice())
                    .map_err(|err| StructuralError::Decode(err.to_string()))?;
                convert_value(&decoded, &param.components)
            };
            topic_values.push(value);
        }

        let mut body_args = self.decode_params(&body, data, false)?.into_iter();
        let mut topic_values = topic_values.into_iter();

        let args = inputs
            .iter()
            .enumerate()
            .filter_map(|(idx, param)| {
                let value = if param.indexed {
                    topic_values.next()?
                } else {
                    body_args.next()?.value
                };
                Some(DecodedArg::new(param.display_name(idx), param.kind.clone(), value))
            })
            .collect();

        Ok(args)
    }
}

fn parse_type(param: &ParamSpec) -> Result<DynSolType, StructuralError> {
    DynSolType::parse(&param.kind).map_err(|err| StructuralError::Type {
        name: param.name.clone(),
        kind: param.kind.clone(),
        reason: err.to_string(),
    })
}

fn parse_types(inputs: &[ParamSpec]) -> Result<Vec<DynSolType>, StructuralError> {
    inputs.iter().map(parse_type).collect()
}

fn is_hashed_when_indexed(ty: &DynSolType) -> bool {
    matches!(
        ty,
        DynSolType::String
            | DynSolType::Bytes
            | DynSolType::Array(_)
            | DynSolType::FixedArray(..)
            | DynSolType::Tuple(_)
    )
}

fn build_args(inputs: &[ParamSpec], values: Vec<DynSolValue>) -> Vec<DecodedArg> {
    inputs
        .iter()
        .zip(values.iter())
        .enumerate()
        .map(|(idx, (param, value))| {
            DecodedArg::new(
                param.display_name(idx),
                param.kind.clone(),
                convert_value(value, &param.components),
            )
        })
        .collect()
}

/// Convert a DynSolValue into the domain value, naming tuple fields from `components`
fn convert_value(value: &DynSolValue, components: &[ParamSpec]) -> ArgValue {
    match value {
        DynSolValue::Bool(b) => ArgValue::Bool(*b),
        DynSolValue::Int(i, _) => ArgValue::Int(*i),
        DynSolValue::Uint(u, _) => ArgValue::Uint(*u),
        DynSolValue::FixedBytes(word, size) => {
            let bytes = &word.as_slice()[..(*size).min(32)];
            ArgValue::FixedBytes(Bytes::copy_from_slice(bytes))
        }
        DynSolValue::Address(addr) => ArgValue::Address(*addr),
        DynSolValue::Function(func) => ArgValue::FixedBytes(Bytes::copy_from_slice(func.as_slice())),
        DynSolValue::Bytes(bytes) => ArgValue::Bytes(Bytes::copy_from_slice(bytes)),
        DynSolValue::String(s) => ArgValue::String(s.clone()),
        DynSolValue::Array(items) | DynSolValue::FixedArray(items) => {
            // Array elements share the element type's components
            ArgValue::List(items.iter().map(|item| convert_value(item, components)).collect())
        }
        DynSolValue::Tuple(fields) => ArgValue::Record(
            fields
                .iter()
                .enumerate()
                .map(|(idx, field)| {
                    let spec = components.get(idx);
                    RecordField {
                        name: spec.map(|s| s.display_name(idx)).unwrap_or_else(|| format!("arg{}", idx)),
                        value: convert_value(field, spec.map(|s| s.components.as_slice()).unwrap_or(&[])),
                    }
                })
                .collect(),
        ),
        #[allow(unreachable_patterns)]
        other => ArgValue::String(format!("{:?}", other)),
    }
}
