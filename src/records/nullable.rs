use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Folds JSON null and blank strings into `None`.
pub fn blank_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}

/// Folds JSON null, blank strings and non-finite numbers into `None`.
/// Numeric strings ("37.77") are accepted.
pub fn finite_or_none<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let number = match Value::deserialize(deserializer)? {
        Value::Null => None,
        Value::Number(n) => n.as_f64(),
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(
            s.trim()
                .parse::<f64>()
                .map_err(|_| D::Error::custom(format!("expected a number, got '{s}'")))?,
        ),
        other => return Err(D::Error::custom(format!("expected a number, got {other}"))),
    };
    Ok(number.filter(|n| n.is_finite()))
}

/// Integer identifiers that arrive either as numbers or numeric strings.
/// An empty string (logged-out user) is `None`.
pub fn flexible_id<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        Value::Number(n) => n
            .as_i64()
            .map(Some)
            .ok_or_else(|| D::Error::custom(format!("expected an integer id, got {n}"))),
        Value::String(s) if s.trim().is_empty() => Ok(None),
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map(Some)
            .map_err(|_| D::Error::custom(format!("expected an integer id, got '{s}'"))),
        other => Err(D::Error::custom(format!(
            "expected an integer id, got {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Probe {
        #[serde(default, deserialize_with = "blank_as_none")]
        text: Option<String>,
        #[serde(default, deserialize_with = "finite_or_none")]
        number: Option<f64>,
        #[serde(default, deserialize_with = "flexible_id")]
        id: Option<i64>,
    }

    fn probe(json: &str) -> Probe {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_blank_and_null_strings_become_none() {
        assert_eq!(probe(r#"{"text": ""}"#).text, None);
        assert_eq!(probe(r#"{"text": "   "}"#).text, None);
        assert_eq!(probe(r#"{"text": null}"#).text, None);
        assert_eq!(probe(r#"{}"#).text, None);
        assert_eq!(probe(r#"{"text": "Berlin"}"#).text.as_deref(), Some("Berlin"));
    }

    #[test]
    fn test_numbers_accept_strings_and_reject_nan() {
        assert_eq!(probe(r#"{"number": 35.14968}"#).number, Some(35.14968));
        assert_eq!(probe(r#"{"number": "-90.04892"}"#).number, Some(-90.04892));
        assert_eq!(probe(r#"{"number": "NaN"}"#).number, None);
        assert_eq!(probe(r#"{"number": ""}"#).number, None);
        assert_eq!(probe(r#"{"number": null}"#).number, None);
    }

    #[test]
    fn test_ids_from_numbers_or_strings() {
        assert_eq!(probe(r#"{"id": 26}"#).id, Some(26));
        assert_eq!(probe(r#"{"id": "26"}"#).id, Some(26));
        assert_eq!(probe(r#"{"id": ""}"#).id, None);
        assert!(serde_json::from_str::<Probe>(r#"{"id": "abc"}"#).is_err());
    }
}
