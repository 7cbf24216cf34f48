//! Example, wrong-type, and boundary values derived from parameter schemas.

use serde_json::{json, Value};

use crate::catalog::{Constraints, ParamType, Parameter};

/// Longest string written out literally. Longer boundary strings are
/// described by their length instead of being materialized.
pub(crate) const MAX_LITERAL_LENGTH: u64 = 4096;

/// A value that either satisfies or violates one declared constraint.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct BoundaryVariant {
    pub label: String,
    pub value: VariantValue,
    pub valid: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum VariantValue {
    Literal(Value),
    /// A string of `length` characters, longer than [`MAX_LITERAL_LENGTH`].
    Oversized { length: u64 },
}

impl VariantValue {
    pub(crate) fn literal(&self) -> Option<&Value> {
        match self {
            Self::Literal(value) => Some(value),
            Self::Oversized { .. } => None,
        }
    }
}

/// A plausible valid value for `param`.
pub(crate) fn example_value(param: &Parameter) -> Value {
    if let Some(first) = param.constraints.enum_values.first() {
        return first.clone();
    }
    typed_example(param.param_type, param, &param.constraints)
}

fn typed_example(param_type: ParamType, param: &Parameter, constraints: &Constraints) -> Value {
    match param_type {
        ParamType::String => Value::String(example_string(param, constraints)),
        ParamType::Integer => Value::from(in_range_integer(constraints)),
        ParamType::Number => number(in_range_number(constraints)),
        ParamType::Boolean => Value::Bool(true),
        ParamType::Array => {
            let item_type = param.item_type.unwrap_or(ParamType::String);
            let item = match item_type {
                ParamType::Array => json!([]),
                other => typed_example(other, param, &Constraints::default()),
            };
            Value::Array(vec![item])
        }
        ParamType::Object => json!({}),
    }
}

fn example_string(param: &Parameter, constraints: &Constraints) -> String {
    let base = match param.format.as_deref() {
        Some("uuid") => "3fa85f64-5717-4562-b3fc-2c963f66afa6".to_string(),
        Some("email") => "user@example.com".to_string(),
        Some("date") => "2024-01-15".to_string(),
        Some("date-time") => "2024-01-15T09:30:00Z".to_string(),
        Some("uri" | "url") => "https://example.com/resource".to_string(),
        Some("hostname") => "api.example.com".to_string(),
        Some("ipv4") => "192.0.2.10".to_string(),
        _ => format!("sample-{}", param.name),
    };
    fit_length(base, constraints.min_length, constraints.max_length)
}

/// Pad with `a` or truncate so the length sits inside the declared bounds.
///
/// Padding stops at [`MAX_LITERAL_LENGTH`]. When `min > max` the minimum wins.
fn fit_length(mut value: String, min: Option<u64>, max: Option<u64>) -> String {
    let len = value.chars().count() as u64;
    if let Some(max) = max {
        if len > max {
            value = value.chars().take(literal_len(max)).collect();
        }
    }
    if let Some(min) = min {
        let len = value.chars().count() as u64;
        let target = min.min(MAX_LITERAL_LENGTH);
        if len < target {
            value.extend(std::iter::repeat('a').take(literal_len(target - len)));
        }
    }
    if value.is_empty() && max != Some(0) {
        value.push('a');
    }
    value
}

fn literal_len(len: u64) -> usize {
    len.min(MAX_LITERAL_LENGTH) as usize
}

fn repeated(length: u64) -> VariantValue {
    if length > MAX_LITERAL_LENGTH {
        VariantValue::Oversized { length }
    } else {
        VariantValue::Literal(Value::String("a".repeat(length as usize)))
    }
}

fn in_range_integer(constraints: &Constraints) -> i64 {
    let mut candidate = 1_i64;
    if let Some(min) = constraints.minimum {
        candidate = candidate.max(min.ceil() as i64);
    }
    if let Some(max) = constraints.maximum {
        candidate = candidate.min(max.floor() as i64);
    }
    candidate
}

fn in_range_number(constraints: &Constraints) -> f64 {
    let mut candidate = 1.5_f64;
    if let Some(min) = constraints.minimum {
        candidate = candidate.max(min);
    }
    if let Some(max) = constraints.maximum {
        candidate = candidate.min(max);
    }
    candidate
}

fn number(value: f64) -> Value {
    serde_json::Number::from_f64(value)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

/// A value of the wrong JSON type for `param`.
pub(crate) fn wrong_type_value(param: &Parameter) -> Value {
    match param.param_type {
        ParamType::String => json!(12345),
        ParamType::Integer | ParamType::Number => json!("not-a-number"),
        ParamType::Boolean => json!("not-a-boolean"),
        ParamType::Array => json!("not-an-array"),
        ParamType::Object => json!("not-an-object"),
    }
}

/// An identifier that should not match any existing resource.
pub(crate) fn nonexistent_value(param: &Parameter) -> Value {
    match (param.param_type, param.format.as_deref()) {
        (ParamType::Integer | ParamType::Number, _) => json!(999_999_999),
        (_, Some("uuid")) => json!("00000000-0000-0000-0000-000000000000"),
        _ => Value::String(format!("nonexistent-{}", param.name)),
    }
}

/// Whether `param` carries constraints the boundary rules can exercise.
pub(crate) fn is_constrained(param: &Parameter) -> bool {
    let c = &param.constraints;
    !c.enum_values.is_empty()
        || (param.param_type == ParamType::String && c.has_length())
        || (param.param_type.is_numeric() && c.has_range())
}

/// Satisfying and violating values for each declared bound, in a fixed order:
/// minimum length, maximum length, minimum, maximum, enumeration.
///
/// A violating variant is left out when the bound sits at the edge of the
/// representable range and no value beyond it exists.
pub(crate) fn boundary_variants(param: &Parameter) -> Vec<BoundaryVariant> {
    let c = &param.constraints;
    let mut variants = Vec::new();

    if param.param_type == ParamType::String {
        if let Some(min) = c.min_length {
            variants.push(variant(format!("length {} (minLength)", min), repeated(min), true));
            if let Some(below) = min.checked_sub(1) {
                variants.push(variant(
                    format!("length {} (below minLength)", below),
                    repeated(below),
                    false,
                ));
            }
        }
        if let Some(max) = c.max_length {
            variants.push(variant(format!("length {} (maxLength)", max), repeated(max), true));
            if let Some(above) = max.checked_add(1) {
                variants.push(variant(
                    format!("length {} (above maxLength)", above),
                    repeated(above),
                    false,
                ));
            }
        }
    }

    match param.param_type {
        ParamType::Integer => integer_variants(c, &mut variants),
        ParamType::Number => number_variants(c, &mut variants),
        _ => {}
    }

    if let Some(first) = c.enum_values.first() {
        variants.push(variant(
            "allowed enum value".to_string(),
            VariantValue::Literal(first.clone()),
            true,
        ));
        variants.push(variant(
            "value outside enum".to_string(),
            VariantValue::Literal(outside_enum(param, &c.enum_values)),
            false,
        ));
    }

    variants
}

fn integer_variants(c: &Constraints, variants: &mut Vec<BoundaryVariant>) {
    let literal = |v: i64| VariantValue::Literal(Value::from(v));
    // Float to int casts saturate, so out-of-range bounds land on i64::MIN/MAX.
    if let Some(min) = c.minimum {
        let min = min.ceil() as i64;
        variants.push(variant(format!("{} (minimum)", min), literal(min), true));
        if let Some(below) = min.checked_sub(1) {
            variants.push(variant(format!("{} (below minimum)", below), literal(below), false));
        }
    }
    if let Some(max) = c.maximum {
        let max = max.floor() as i64;
        variants.push(variant(format!("{} (maximum)", max), literal(max), true));
        if let Some(above) = max.checked_add(1) {
            variants.push(variant(format!("{} (above maximum)", above), literal(above), false));
        }
    }
}

fn number_variants(c: &Constraints, variants: &mut Vec<BoundaryVariant>) {
    let literal = |v: f64| VariantValue::Literal(number(v));
    if let Some(min) = c.minimum.filter(|v| v.is_finite()) {
        variants.push(variant(format!("{} (minimum)", min), literal(min), true));
        let below = min - 1.0;
        if below < min {
            variants.push(variant(format!("{} (below minimum)", below), literal(below), false));
        }
    }
    if let Some(max) = c.maximum.filter(|v| v.is_finite()) {
        variants.push(variant(format!("{} (maximum)", max), literal(max), true));
        let above = max + 1.0;
        if above > max && above.is_finite() {
            variants.push(variant(format!("{} (above maximum)", above), literal(above), false));
        }
    }
}

fn outside_enum(param: &Parameter, allowed: &[Value]) -> Value {
    if param.param_type.is_numeric() {
        let taken: Vec<i64> = allowed.iter().filter_map(Value::as_i64).collect();
        let above = taken.iter().max().copied().unwrap_or(0).checked_add(1);
        let candidate = above
            .or_else(|| (i64::MIN..).find(|n| !taken.contains(n)))
            .unwrap_or_default();
        return json!(candidate);
    }
    let mut candidate = "not-an-allowed-value".to_string();
    while allowed.iter().any(|v| v.as_str() == Some(candidate.as_str())) {
        candidate.push('x');
    }
    Value::String(candidate)
}

fn variant(label: String, value: VariantValue, valid: bool) -> BoundaryVariant {
    BoundaryVariant {
        label,
        value,
        valid,
    }
}
