//! Shape validation for preset configs.
//!
//! Works on raw JSON so an admin gets every problem in one pass. Never
//! fails; problems are collected into a [`ValidationReport`].

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::error::{Error, Result};
use crate::models::PricingModel;

/// A single problem with a config, addressed by a JSON path such as
/// `tiers[0].upToSqft`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Outcome of [`validate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<FieldError>,
}

impl ValidationReport {
    pub(crate) fn from_errors(errors: Vec<FieldError>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
        }
    }

    /// Whether any error targets exactly `field`.
    pub fn has_error_on(&self, field: &str) -> bool {
        self.errors.iter().any(|e| e.field == field)
    }
}

/// Validate `config` against the shape `model` requires.
pub fn validate(model: &str, config: &JsonValue) -> ValidationReport {
    let Ok(model) = model.parse::<PricingModel>() else {
        return ValidationReport::from_errors(vec![FieldError::new(
            "model",
            format!("unknown pricing model '{}'", model),
        )]);
    };
    validate_model(model, config)
}

/// Validate against an already-resolved model tag.
pub fn validate_model(model: PricingModel, config: &JsonValue) -> ValidationReport {
    let Some(obj) = config.as_object() else {
        return ValidationReport::from_errors(vec![FieldError::new(
            "config",
            "must be a JSON object",
        )]);
    };

    let mut errors = Vec::new();
    check_common(obj, &mut errors);

    match model {
        PricingModel::AreaTiered => {
            if let Some(tiers) = required_array(obj, "tiers", "tiers", &mut errors) {
                for (i, tier) in tiers.iter().enumerate() {
                    let path = format!("tiers[{}]", i);
                    if let Some(tier) = object_at(tier, &path, &mut errors) {
                        check_positive(tier, "upToSqft", &path, &mut errors);
                        check_positive(tier, "rate", &path, &mut errors);
                    }
                }
            }
        }
        PricingModel::QtyTiered => {
            if let Some(tiers) = required_array(obj, "tiers", "tiers", &mut errors) {
                for (i, tier) in tiers.iter().enumerate() {
                    let path = format!("tiers[{}]", i);
                    if let Some(tier) = object_at(tier, &path, &mut errors) {
                        check_positive_integer(tier, "minQty", &path, &mut errors);
                        check_positive(tier, "unitPrice", &path, &mut errors);
                    }
                }
            }
        }
        PricingModel::QtyOptions => {
            if let Some(sizes) = required_array(obj, "sizes", "sizes", &mut errors) {
                for (i, size) in sizes.iter().enumerate() {
                    let path = format!("sizes[{}]", i);
                    let Some(size) = object_at(size, &path, &mut errors) else {
                        continue;
                    };
                    match size.get("label").and_then(JsonValue::as_str) {
                        Some(label) if !label.trim().is_empty() => {}
                        _ => errors.push(FieldError::new(
                            format!("{}.label", path),
                            "must be a non-empty string",
                        )),
                    }
                    check_optional_positive(size, "widthIn", &path, &mut errors);
                    check_optional_positive(size, "heightIn", &path, &mut errors);

                    let tiers_path = format!("{}.tiers", path);
                    if let Some(tiers) = required_array(size, "tiers", &tiers_path, &mut errors) {
                        for (j, tier) in tiers.iter().enumerate() {
                            let tier_path = format!("{}[{}]", tiers_path, j);
                            if let Some(tier) = object_at(tier, &tier_path, &mut errors) {
                                check_positive(tier, "qty", &tier_path, &mut errors);
                                check_positive(tier, "unitPrice", &tier_path, &mut errors);
                            }
                        }
                    }
                }
            }
        }
    }

    ValidationReport::from_errors(errors)
}

/// Validate and convert a failing report into [`Error::InvalidConfig`].
pub fn ensure_valid(model: PricingModel, config: &JsonValue) -> Result<()> {
    let report = validate_model(model, config);
    if report.valid {
        Ok(())
    } else {
        Err(Error::InvalidConfig(report))
    }
}

// Optional fields shared by every model.
fn check_common(obj: &Map<String, JsonValue>, errors: &mut Vec<FieldError>) {
    for field in ["fileFee", "minimumPrice"] {
        match obj.get(field) {
            None | Some(JsonValue::Null) => {}
            Some(v) => match v.as_f64() {
                Some(n) if n >= 0.0 && n.is_finite() => {}
                _ => errors.push(FieldError::new(field, "must be a non-negative number")),
            },
        }
    }

    for list in ["addons", "accessories"] {
        match obj.get(list) {
            None | Some(JsonValue::Null) => {}
            Some(JsonValue::Array(items)) => {
                for (i, item) in items.iter().enumerate() {
                    let path = format!("{}[{}]", list, i);
                    if let Some(item) = object_at(item, &path, errors) {
                        check_addon(item, &path, errors);
                    }
                }
            }
            Some(_) => errors.push(FieldError::new(list, "must be an array")),
        }
    }
}

fn check_addon(item: &Map<String, JsonValue>, path: &str, errors: &mut Vec<FieldError>) {
    match item.get("id").and_then(JsonValue::as_str) {
        Some(id) if !id.trim().is_empty() => {}
        _ => errors.push(FieldError::new(
            format!("{}.id", path),
            "must be a non-empty string",
        )),
    }
    match item.get("type").and_then(JsonValue::as_str) {
        Some("per_unit") | Some("flat") => {}
        _ => errors.push(FieldError::new(
            format!("{}.type", path),
            "must be \"per_unit\" or \"flat\"",
        )),
    }
    match item.get("price").and_then(JsonValue::as_f64) {
        Some(n) if n >= 0.0 && n.is_finite() => {}
        _ => errors.push(FieldError::new(
            format!("{}.price", path),
            "must be a non-negative number",
        )),
    }
}

fn required_array<'a>(
    obj: &'a Map<String, JsonValue>,
    key: &str,
    path: &str,
    errors: &mut Vec<FieldError>,
) -> Option<&'a Vec<JsonValue>> {
    match obj.get(key).and_then(JsonValue::as_array) {
        Some(items) if !items.is_empty() => Some(items),
        _ => {
            errors.push(FieldError::new(path, "must be a non-empty array"));
            None
        }
    }
}

fn object_at<'a>(
    value: &'a JsonValue,
    path: &str,
    errors: &mut Vec<FieldError>,
) -> Option<&'a Map<String, JsonValue>> {
    let obj = value.as_object();
    if obj.is_none() {
        errors.push(FieldError::new(path, "must be an object"));
    }
    obj
}

fn check_positive(
    obj: &Map<String, JsonValue>,
    key: &str,
    path: &str,
    errors: &mut Vec<FieldError>,
) {
    match obj.get(key).and_then(JsonValue::as_f64) {
        Some(n) if n > 0.0 && n.is_finite() => {}
        _ => errors.push(FieldError::new(
            format!("{}.{}", path, key),
            "must be a number greater than 0",
        )),
    }
}

fn check_optional_positive(
    obj: &Map<String, JsonValue>,
    key: &str,
    path: &str,
    errors: &mut Vec<FieldError>,
) {
    if matches!(obj.get(key), None | Some(JsonValue::Null)) {
        return;
    }
    check_positive(obj, key, path, errors);
}

fn check_positive_integer(
    obj: &Map<String, JsonValue>,
    key: &str,
    path: &str,
    errors: &mut Vec<FieldError>,
) {
    let ok = match obj.get(key) {
        Some(v) => match v.as_u64() {
            Some(n) => n > 0 && n <= u32::MAX as u64,
            // 100.0 is still a whole number
            None => v
                .as_f64()
                .is_some_and(|n| n >= 1.0 && n.fract() == 0.0 && n <= u32::MAX as f64),
        },
        None => false,
    };
    if !ok {
        errors.push(FieldError::new(
            format!("{}.{}", path, key),
            "must be a positive integer",
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_area_tiered_valid() {
        let report = validate(
            "AREA_TIERED",
            &json!({
                "tiers": [{ "upToSqft": 4, "rate": 2.5 }, { "upToSqft": 12, "rate": 2.0 }],
                "fileFee": 5,
                "minimumPrice": 25
            }),
        );
        assert!(report.valid, "{:?}", report.errors);
        assert!(report.errors.is_empty());
    }

    #[test]
    fn test_area_tiered_negative_threshold_names_field() {
        let report = validate(
            "AREA_TIERED",
            &json!({ "tiers": [{ "upToSqft": -1, "rate": 2 }] }),
        );
        assert!(!report.valid);
        assert!(report.has_error_on("tiers[0].upToSqft"));
        assert_eq!(report.errors.len(), 1);
    }

    #[test]
    fn test_unknown_model_single_error() {
        let report = validate("PER_INCH", &json!({ "tiers": "nonsense" }));
        assert!(!report.valid);
        assert_eq!(report.errors, vec![FieldError::new("model", "unknown pricing model 'PER_INCH'")]);
    }

    #[test]
    fn test_errors_are_collected_not_fail_fast() {
        let report = validate(
            "QTY_TIERED",
            &json!({
                "tiers": [
                    { "minQty": 0, "unitPrice": 1.2 },
                    { "minQty": 2.5, "unitPrice": 0 },
                    "bogus"
                ],
                "fileFee": -3,
                "minimumPrice": "ten"
            }),
        );
        assert!(!report.valid);
        assert!(report.has_error_on("fileFee"));
        assert!(report.has_error_on("minimumPrice"));
        assert!(report.has_error_on("tiers[0].minQty"));
        assert!(report.has_error_on("tiers[1].minQty"));
        assert!(report.has_error_on("tiers[1].unitPrice"));
        assert!(report.has_error_on("tiers[2]"));
        assert_eq!(report.errors.len(), 6);
    }

    #[test]
    fn test_qty_tiered_accepts_whole_float_min_qty() {
        let report = validate(
            "QTY_TIERED",
            &json!({ "tiers": [{ "minQty": 100.0, "unitPrice": 0.95 }] }),
        );
        assert!(report.valid, "{:?}", report.errors);
    }

    #[test]
    fn test_empty_tiers_rejected() {
        let report = validate("QTY_TIERED", &json!({ "tiers": [] }));
        assert!(report.has_error_on("tiers"));

        let report = validate("AREA_TIERED", &json!({}));
        assert!(report.has_error_on("tiers"));
    }

    #[test]
    fn test_qty_options_nested_paths() {
        let report = validate(
            "QTY_OPTIONS",
            &json!({
                "sizes": [
                    { "label": "3.5x2", "tiers": [{ "qty": 250, "unitPrice": 0.12 }] },
                    { "label": "", "tiers": [] },
                    { "label": "4x6", "tiers": [{ "qty": -5, "unitPrice": 0.3 }] }
                ]
            }),
        );
        assert!(!report.valid);
        assert!(report.has_error_on("sizes[1].label"));
        assert!(report.has_error_on("sizes[1].tiers"));
        assert!(report.has_error_on("sizes[2].tiers[0].qty"));
        assert_eq!(report.errors.len(), 3);
    }

    #[test]
    fn test_qty_options_requires_sizes() {
        let report = validate("QTY_OPTIONS", &json!({ "tiers": [] }));
        assert!(report.has_error_on("sizes"));
    }

    #[test]
    fn test_addon_shape_checked() {
        let report = validate(
            "QTY_TIERED",
            &json!({
                "tiers": [{ "minQty": 1, "unitPrice": 1 }],
                "addons": [
                    { "id": "lamination", "type": "per_unit", "price": 0.05 },
                    { "id": "", "type": "each", "price": -1 }
                ],
                "accessories": {}
            }),
        );
        assert!(report.has_error_on("addons[1].id"));
        assert!(report.has_error_on("addons[1].type"));
        assert!(report.has_error_on("addons[1].price"));
        assert!(report.has_error_on("accessories"));
        assert_eq!(report.errors.len(), 4);
    }

    #[test]
    fn test_non_object_config() {
        let report = validate("QTY_TIERED", &json!([1, 2, 3]));
        assert!(report.has_error_on("config"));
    }

    #[test]
    fn test_null_common_fields_are_absent() {
        let config = json!({
            "tiers": [{ "minQty": 1, "unitPrice": 1 }],
            "fileFee": null,
            "minimumPrice": null,
            "addons": null,
            "accessories": null
        });
        let report = validate("QTY_TIERED", &config);
        assert!(report.valid);

        let parsed = crate::pricing::PricingConfig::parse(PricingModel::QtyTiered, &config).unwrap();
        let common = parsed.common();
        assert_eq!(common.file_fee, 0.0);
        assert_eq!(common.minimum_price, 0.0);
        assert!(common.addons.is_empty());
        assert!(common.accessories.is_empty());
    }

    #[test]
    fn test_ensure_valid_wraps_report() {
        let err = ensure_valid(PricingModel::QtyTiered, &json!({})).unwrap_err();
        match err {
            Error::InvalidConfig(report) => assert!(report.has_error_on("tiers")),
            other => panic!("Expected InvalidConfig, got {:?}", other),
        }
    }
}
