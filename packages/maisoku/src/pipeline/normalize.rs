//! Field normalization - raw service output to schema-typed values.
//!
//! Each schema field is normalized according to its [`FieldKind`]; names
//! outside the schema pass through unchanged. A JSON `null` is always
//! kept as a missing value, so normalization never turns "nothing" into a
//! scored value.

use serde_json::{Map, Value};

use crate::error::{MaisokuError, Result};
use crate::types::{
    field::{clamp_confidence, Evidence, EvidenceScoredField, FieldValue},
    listing::{FieldKind, ListingField, PropertyListing},
};

/// Normalize a service response object into a listing.
///
/// Entries that are not objects carrying a `value` key are skipped.
/// Fails only when the response itself is not a JSON object.
pub fn normalize_listing(raw: &Value, page_index: usize) -> Result<PropertyListing> {
    let object = raw.as_object().ok_or_else(|| MaisokuError::InvalidResponse {
        reason: format!("expected a JSON object, got {}", json_type_name(raw)),
    })?;

    Ok(normalize_fields(object, page_index))
}

fn normalize_fields(object: &Map<String, Value>, page_index: usize) -> PropertyListing {
    let mut listing = PropertyListing::new();

    for (name, entry) in object {
        let Some(entry) = entry.as_object() else {
            continue;
        };
        let Some(raw_value) = entry.get("value") else {
            continue;
        };

        let value = match ListingField::from_name(name) {
            Some(field) => normalize_value(field, raw_value),
            None => pass_through(raw_value),
        };
        let confidence = entry
            .get("confidence")
            .and_then(Value::as_f64)
            .map(clamp_confidence)
            .unwrap_or(0.0);
        let evidence = Evidence::new(page_index, evidence_snippet(entry.get("evidence"), page_index));

        listing.insert_named(name.clone(), EvidenceScoredField::new(value, confidence, evidence));
    }

    listing
}

/// Normalize one raw value for a schema field.
pub fn normalize_value(field: ListingField, raw: &Value) -> Option<FieldValue> {
    if raw.is_null() {
        return None;
    }

    match field.kind() {
        FieldKind::Integer { zero_default } => {
            normalize_integer(raw).or_else(|| zero_default.then_some(FieldValue::Integer(0)))
        }
        FieldKind::Decimal { zero_default } => {
            normalize_decimal(raw).or_else(|| zero_default.then_some(FieldValue::Decimal(0.0)))
        }
        FieldKind::Text => normalize_text(raw),
        FieldKind::Tags => Some(normalize_tags(raw)),
    }
}

/// Strip every non-digit and parse. Numbers are accepted as-is.
pub fn normalize_integer(raw: &Value) -> Option<FieldValue> {
    match raw {
        Value::String(s) => parse_digits(s).map(FieldValue::Integer),
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))
            .map(FieldValue::Integer),
        _ => None,
    }
}

/// Keep digits and the decimal point, then parse. Numbers are accepted as-is.
pub fn normalize_decimal(raw: &Value) -> Option<FieldValue> {
    match raw {
        Value::String(s) => parse_decimal(s).map(FieldValue::Decimal),
        Value::Number(n) => n.as_f64().filter(|f| f.is_finite()).map(FieldValue::Decimal),
        _ => None,
    }
}

/// Trim strings; anything else is missing.
pub fn normalize_text(raw: &Value) -> Option<FieldValue> {
    raw.as_str().map(|s| FieldValue::Text(s.trim().to_string()))
}

/// Arrays pass through, a bare string becomes a singleton, anything else is empty.
pub fn normalize_tags(raw: &Value) -> FieldValue {
    let tags = match raw {
        Value::Array(items) => items
            .iter()
            .filter(|item| !item.is_null())
            .map(|item| match item {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect(),
        Value::String(s) => vec![s.clone()],
        _ => Vec::new(),
    };
    FieldValue::Tags(tags)
}

fn pass_through(raw: &Value) -> Option<FieldValue> {
    (!raw.is_null()).then(|| FieldValue::Raw(raw.clone()))
}

/// Parse the digits of a currency or count string: `"120,000円"` → 120000.
pub fn parse_digits(s: &str) -> Option<i64> {
    let digits: String = s.chars().filter(char::is_ascii_digit).collect();
    digits.parse().ok()
}

/// Parse the numeric part of a decimal string: `"25.5㎡"` → 25.5.
///
/// Only the first decimal point counts; `"1.5.2"` reads as 1.5. Digit runs
/// too long for an `f64` are unparseable.
pub fn parse_decimal(s: &str) -> Option<f64> {
    let kept: String = s
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();

    let numeric = match kept.match_indices('.').nth(1) {
        Some((second_dot, _)) => &kept[..second_dot],
        None => kept.as_str(),
    };

    if !numeric.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }
    numeric.parse().ok().filter(|f: &f64| f.is_finite())
}

fn evidence_snippet(raw: Option<&Value>, page_index: usize) -> String {
    let snippet = match raw {
        Some(Value::String(s)) => Some(s.as_str()),
        Some(Value::Object(obj)) => obj.get("snippet").and_then(Value::as_str),
        _ => None,
    };

    match snippet {
        Some(s) => s.to_string(),
        None => format!("ページ{}から抽出", page_index + 1),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_currency_string() {
        assert_eq!(
            normalize_value(ListingField::Rent, &json!("120,000円")),
            Some(FieldValue::Integer(120000))
        );
        assert_eq!(
            normalize_value(ListingField::Station1WalkMinutes, &json!("徒歩5分")),
            Some(FieldValue::Integer(5))
        );
    }

    #[test]
    fn test_integer_failure_defaults() {
        // Nullable field
        assert_eq!(normalize_value(ListingField::Rent, &json!("応相談")), None);
        // Natural zero default
        assert_eq!(
            normalize_value(ListingField::ManagementFee, &json!("なし")),
            Some(FieldValue::Integer(0))
        );
        assert_eq!(
            normalize_value(ListingField::KeyExchangeFee, &json!(true)),
            Some(FieldValue::Integer(0))
        );
    }

    #[test]
    fn test_null_is_never_defaulted() {
        assert_eq!(normalize_value(ListingField::ManagementFee, &Value::Null), None);
        assert_eq!(normalize_value(ListingField::DepositMonths, &Value::Null), None);
    }

    #[test]
    fn test_numbers_pass_through() {
        assert_eq!(
            normalize_value(ListingField::Rent, &json!(98000)),
            Some(FieldValue::Integer(98000))
        );
        assert_eq!(
            normalize_value(ListingField::FloorArea, &json!(25.5)),
            Some(FieldValue::Decimal(25.5))
        );
    }

    #[test]
    fn test_decimal_strings() {
        assert_eq!(
            normalize_value(ListingField::FloorArea, &json!("25.5㎡")),
            Some(FieldValue::Decimal(25.5))
        );
        assert_eq!(
            normalize_value(ListingField::DepositMonths, &json!("1ヶ月")),
            Some(FieldValue::Decimal(1.0))
        );
        assert_eq!(normalize_value(ListingField::FloorArea, &json!("不明")), None);
        assert_eq!(
            normalize_value(ListingField::KeyMoneyMonths, &json!("なし")),
            Some(FieldValue::Decimal(0.0))
        );
        assert_eq!(parse_decimal("1.5.2"), Some(1.5));
        assert_eq!(parse_decimal("."), None);
    }

    #[test]
    fn test_overlong_decimal_is_unparseable() {
        let digits = "1".repeat(400);
        assert_eq!(parse_decimal(&digits), None);

        let raw = json!({
            "専有面積": {"value": digits, "confidence": 0.9},
            "敷金月数": {"value": format!("{}ヶ月", digits), "confidence": 0.9}
        });
        let listing = normalize_listing(&raw, 0).unwrap();

        let area = listing.get(ListingField::FloorArea).unwrap();
        assert_eq!(area.value(), None);
        assert_eq!(area.confidence(), 0.0);
        assert_eq!(
            listing.get(ListingField::DepositMonths).unwrap().value(),
            Some(&FieldValue::Decimal(0.0))
        );
    }

    #[test]
    fn test_text_and_tags() {
        assert_eq!(
            normalize_value(ListingField::PropertyName, &json!("  レジデンス新宿 ")),
            Some(FieldValue::Text("レジデンス新宿".into()))
        );
        assert_eq!(normalize_value(ListingField::Address, &json!(42)), None);
        assert_eq!(
            normalize_value(ListingField::EquipmentTags, &json!("オートロック")),
            Some(FieldValue::Tags(vec!["オートロック".into()]))
        );
        assert_eq!(
            normalize_value(ListingField::EquipmentTags, &json!(["エアコン", "宅配ボックス"])),
            Some(FieldValue::Tags(vec!["エアコン".into(), "宅配ボックス".into()]))
        );
        assert_eq!(
            normalize_value(ListingField::EquipmentTags, &json!({"a": 1})),
            Some(FieldValue::Tags(vec![]))
        );
    }

    #[test]
    fn test_normalize_listing() {
        let raw = json!({
            "物件名": {"value": "パークマンション青山", "confidence": 0.95, "evidence": "物件名: パークマンション青山"},
            "賃料": {"value": "120,000円", "confidence": 1.4},
            "管理費共益費": {"value": null, "confidence": 0.6, "evidence": "記載なし"},
            "バルコニー": {"value": "南向き", "confidence": -1},
            "ignored": "not an object",
            "also_ignored": {"confidence": 0.5}
        });

        let listing = normalize_listing(&raw, 0).unwrap();

        assert_eq!(listing.len(), 4);
        let rent = listing.get(ListingField::Rent).unwrap();
        assert_eq!(rent.value(), Some(&FieldValue::Integer(120000)));
        assert_eq!(rent.confidence(), 1.0);
        assert_eq!(rent.evidence().snippet, "ページ1から抽出");

        let fee = listing.get(ListingField::ManagementFee).unwrap();
        assert_eq!(fee.value(), None);
        assert_eq!(fee.confidence(), 0.0);

        let extra = listing.get_named("バルコニー").unwrap();
        assert_eq!(extra.value(), Some(&FieldValue::Raw(json!("南向き"))));
        assert_eq!(extra.confidence(), 0.0);
    }

    #[test]
    fn test_evidence_truncated() {
        let long = "x".repeat(400);
        let raw = json!({"所在地": {"value": "東京都", "confidence": 0.5, "evidence": long}});
        let listing = normalize_listing(&raw, 3).unwrap();
        let address = listing.get(ListingField::Address).unwrap();
        assert_eq!(address.evidence().snippet.len(), 150);
        assert_eq!(address.evidence().page_index, 3);
    }

    #[test]
    fn test_non_object_response_rejected() {
        assert!(normalize_listing(&json!([1, 2]), 0).is_err());
        assert!(normalize_listing(&json!("text"), 0).is_err());
    }

    proptest! {
        #[test]
        fn prop_confidence_always_in_unit_range(c in proptest::num::f64::ANY) {
            let raw = json!({"物件名": {"value": "x", "confidence": c}});
            let listing = normalize_listing(&raw, 0).unwrap();
            let conf = listing.get(ListingField::PropertyName).unwrap().confidence();
            prop_assert!((0.0..=1.0).contains(&conf));
            if c.is_finite() {
                prop_assert_eq!(conf, c.clamp(0.0, 1.0));
            }
        }

        #[test]
        fn prop_grouped_currency_parses(thousands in 1u32..1000, rest in 0u32..1000) {
            let text = format!("{},{:03}円", thousands, rest);
            let expected = i64::from(thousands) * 1000 + i64::from(rest);
            prop_assert_eq!(parse_digits(&text), Some(expected));
        }
    }
}
