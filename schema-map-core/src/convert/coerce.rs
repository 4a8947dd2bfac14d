use serde_json::{Number, Value};

use crate::error::{ConvertError, FieldPath};
use crate::schema::ScalarType;
use crate::value::Scalar;

/// Read a JSON leaf as a scalar of the declared type.
///
/// Upstream JSON is loose about numbers: integers may arrive as floats with
/// an integral value or as numeric strings, and toggles as `enable`/`disable`.
pub(crate) fn scalar_from_json(
    value: &Value,
    declared: ScalarType,
    path: &FieldPath,
) -> Result<Scalar, ConvertError> {
    let coerced = match (declared, value) {
        (ScalarType::String, Value::String(s)) => Some(Scalar::String(s.clone())),
        (ScalarType::String, Value::Number(n)) => Some(Scalar::String(n.to_string())),
        (ScalarType::Integer, Value::Number(n)) => number_to_i64(n).map(Scalar::Integer),
        (ScalarType::Integer, Value::String(s)) => s.trim().parse().ok().map(Scalar::Integer),
        (ScalarType::Float, Value::Number(n)) => n.as_f64().map(Scalar::Float),
        (ScalarType::Float, Value::String(s)) => s.trim().parse().ok().map(Scalar::Float),
        (ScalarType::Bool, Value::Bool(b)) => Some(Scalar::Bool(*b)),
        (ScalarType::Bool, Value::String(s)) => parse_toggle(s).map(Scalar::Bool),
        _ => None,
    };
    coerced.ok_or_else(|| ConvertError::mismatch(path, declared, describe(value)))
}

/// Render a local scalar as JSON, checking it against the declared type.
pub(crate) fn scalar_to_json(
    scalar: &Scalar,
    declared: ScalarType,
    path: &FieldPath,
) -> Result<Value, ConvertError> {
    match (declared, scalar) {
        (ScalarType::String, Scalar::String(s)) => Ok(Value::String(s.clone())),
        (ScalarType::Integer, Scalar::Integer(n)) => Ok(Value::from(*n)),
        (ScalarType::Float, Scalar::Float(n)) => float_to_json(*n, path),
        (ScalarType::Bool, Scalar::Bool(b)) => Ok(Value::Bool(*b)),
        _ => Err(ConvertError::mismatch(path, declared, scalar.scalar_type())),
    }
}

/// Bring a scalar to the declared type, e.g. `"1"` to `1` for an integer key.
pub(crate) fn normalize_scalar(
    scalar: &Scalar,
    declared: ScalarType,
    path: &FieldPath,
) -> Result<Scalar, ConvertError> {
    if scalar.scalar_type() == declared {
        return Ok(scalar.clone());
    }
    let json = match scalar {
        Scalar::Bool(b) => Value::Bool(*b),
        Scalar::Integer(n) => Value::from(*n),
        Scalar::Float(n) => Number::from_f64(*n).map(Value::Number).unwrap_or(Value::Null),
        Scalar::String(s) => Value::String(s.clone()),
    };
    scalar_from_json(&json, declared, path)
}

fn number_to_i64(n: &Number) -> Option<i64> {
    if let Some(v) = n.as_i64() {
        return Some(v);
    }
    let f = n.as_f64()?;
    if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

fn float_to_json(value: f64, path: &FieldPath) -> Result<Value, ConvertError> {
    Number::from_f64(value)
        .map(Value::Number)
        .ok_or_else(|| ConvertError::mismatch(path, ScalarType::Float, "non-finite float"))
}

fn parse_toggle(raw: &str) -> Option<bool> {
    match raw.trim() {
        "true" | "enable" => Some(true),
        "false" | "disable" => Some(false),
        _ => None,
    }
}

pub(crate) fn describe(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => format!("bool {b}"),
        Value::Number(n) => format!("number {n}"),
        Value::String(s) => format!("string {s:?}"),
        Value::Array(_) => "list".to_string(),
        Value::Object(_) => "object".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{normalize_scalar, scalar_from_json, scalar_to_json};
    use crate::error::{ConvertError, FieldPath};
    use crate::schema::ScalarType;
    use crate::value::Scalar;

    fn path() -> FieldPath {
        FieldPath::root().field("x")
    }

    #[test]
    fn integers_accept_integral_floats_and_numeric_strings() {
        assert_eq!(
            scalar_from_json(&json!(7.0), ScalarType::Integer, &path()),
            Ok(Scalar::Integer(7))
        );
        assert_eq!(
            scalar_from_json(&json!(" 42 "), ScalarType::Integer, &path()),
            Ok(Scalar::Integer(42))
        );
        assert!(matches!(
            scalar_from_json(&json!(7.5), ScalarType::Integer, &path()),
            Err(ConvertError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn toggles_read_as_bools() {
        assert_eq!(
            scalar_from_json(&json!("enable"), ScalarType::Bool, &path()),
            Ok(Scalar::Bool(true))
        );
        assert_eq!(
            scalar_from_json(&json!(false), ScalarType::Bool, &path()),
            Ok(Scalar::Bool(false))
        );
    }

    #[test]
    fn to_json_rejects_wrong_type() {
        assert!(matches!(
            scalar_to_json(&Scalar::Integer(3), ScalarType::Float, &path()),
            Err(ConvertError::TypeMismatch { ref found, .. }) if found == "integer"
        ));
        assert_eq!(
            scalar_to_json(&Scalar::Float(3.0), ScalarType::Float, &path()),
            Ok(json!(3.0))
        );
        let err = scalar_to_json(&Scalar::from("3"), ScalarType::Integer, &path())
            .expect_err("string is not an integer");
        assert_eq!(
            err,
            ConvertError::TypeMismatch {
                path: "x".to_string(),
                expected: "integer".to_string(),
                found: "string".to_string(),
            }
        );
    }

    #[test]
    fn integers_reject_floats_beyond_i64() {
        let two_pow_63 = 9_223_372_036_854_775_808.0_f64;
        assert!(scalar_from_json(&json!(two_pow_63), ScalarType::Integer, &path()).is_err());
        assert_eq!(
            scalar_from_json(&json!(-two_pow_63), ScalarType::Integer, &path()),
            Ok(Scalar::Integer(i64::MIN))
        );
    }

    #[test]
    fn normalize_brings_string_keys_to_integers() {
        assert_eq!(
            normalize_scalar(&Scalar::from("1"), ScalarType::Integer, &path()),
            Ok(Scalar::Integer(1))
        );
        assert!(normalize_scalar(&Scalar::from("one"), ScalarType::Integer, &path()).is_err());
    }
}
