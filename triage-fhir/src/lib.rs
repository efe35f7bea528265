//! JSON intake for the triage engine: plain vitals records and FHIR R4
//! bundles of vital-sign `Observation`s.

use std::collections::{hash_map::Entry, HashMap};

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;
use triage_core::{
    assess, TriageAssessment, TriageConfig, TriageError, VitalField, VitalValue, VitalsInput,
};

/// Assess a JSON document, accepting either a FHIR `Bundle` or a plain
/// vitals record such as `{"sbp": "120", "hr": 88}`.
pub fn assess_json_str(
    json: &str,
    config: &TriageConfig,
) -> Result<TriageAssessment, TriageError> {
    let value: Value =
        serde_json::from_str(json).map_err(|err| TriageError::Parse(err.to_string()))?;
    assess_json_value(&value, config)
}

pub fn assess_json_value(
    value: &Value,
    config: &TriageConfig,
) -> Result<TriageAssessment, TriageError> {
    if value.get("resourceType").is_some() {
        assess_bundle_value(value, config)
    } else {
        assess_record_value(value, config)
    }
}

/// Assess a plain vitals record from a JSON string.
pub fn assess_record_str(
    json: &str,
    config: &TriageConfig,
) -> Result<TriageAssessment, TriageError> {
    let value: Value =
        serde_json::from_str(json).map_err(|err| TriageError::Parse(err.to_string()))?;
    assess_record_value(&value, config)
}

fn assess_record_value(
    value: &Value,
    config: &TriageConfig,
) -> Result<TriageAssessment, TriageError> {
    config.validate()?;
    let vitals = vitals_from_record_value(value)?;
    Ok(assess(&vitals, config))
}

/// Read a plain vitals record. Fields of unsupported JSON types fold to
/// their defaults; only a non-object document is an error.
pub fn vitals_from_record_value(value: &Value) -> Result<VitalsInput, TriageError> {
    if !value.is_object() {
        return Err(TriageError::Parse(
            "vitals record must be a JSON object".to_string(),
        ));
    }
    VitalsInput::deserialize(value).map_err(|err| TriageError::Parse(err.to_string()))
}

/// Assess a FHIR bundle from a JSON string.
pub fn assess_bundle_str(
    bundle_json: &str,
    config: &TriageConfig,
) -> Result<TriageAssessment, TriageError> {
    let value: Value =
        serde_json::from_str(bundle_json).map_err(|err| TriageError::Parse(err.to_string()))?;
    assess_bundle_value(&value, config)
}

pub fn assess_bundle_value(
    bundle: &Value,
    config: &TriageConfig,
) -> Result<TriageAssessment, TriageError> {
    config.validate()?;
    let vitals = vitals_from_bundle_value(bundle)?;
    Ok(assess(&vitals, config))
}

/// Collect the most recent reading of each vital from a FHIR bundle.
pub fn vitals_from_bundle_value(bundle: &Value) -> Result<VitalsInput, TriageError> {
    let bundle_type = bundle
        .get("resourceType")
        .and_then(Value::as_str)
        .ok_or(TriageError::MissingData)?;

    if bundle_type != "Bundle" {
        return Err(TriageError::Parse(format!(
            "Expected resourceType Bundle, received {bundle_type}"
        )));
    }

    let entries = bundle
        .get("entry")
        .and_then(Value::as_array)
        .ok_or(TriageError::MissingData)?;

    let mut readings = LatestReadings::default();

    for entry in entries {
        let Some(resource) = entry.get("resource") else {
            continue;
        };

        match resource
            .get("resourceType")
            .and_then(Value::as_str)
            .unwrap_or_default()
        {
            "Observation" => readings.handle_observation(resource),
            other => debug!(resource_type = other, "skipping non-observation resource"),
        }
    }

    Ok(readings.finalize())
}

struct Reading {
    value: VitalValue,
    recorded_at: Option<DateTime<Utc>>,
}

#[derive(Default)]
struct LatestReadings {
    slots: HashMap<VitalField, Reading>,
}

impl LatestReadings {
    fn handle_observation(&mut self, resource: &Value) {
        if let Some(status) = resource.get("status").and_then(Value::as_str) {
            if matches!(status, "entered-in-error" | "cancelled") {
                let id = resource.get("id").and_then(Value::as_str).unwrap_or_default();
                debug!(id, status, "ignoring retracted observation");
                return;
            }
        }

        let recorded_at = extract_observation_timestamp(resource);

        // A valued observation is the reading itself; its components are
        // sub-scores or breakdowns (GCS eye/verbal/motor) and are not read.
        if let Some(field) = resource.get("code").and_then(match_vital_field) {
            if let Some(value) = observation_value(resource, field) {
                self.offer(field, value, recorded_at);
                return;
            }
        }

        // Panels such as 85354-9 carry their readings in coded components only.
        let mut matched = false;
        if let Some(components) = resource.get("component").and_then(Value::as_array) {
            for component in components {
                let Some(field) = component.get("code").and_then(match_loinc_field) else {
                    continue;
                };
                if let Some(value) = observation_value(component, field) {
                    self.offer(field, value, recorded_at);
                    matched = true;
                }
            }
        }

        if !matched {
            let code = resource
                .get("code")
                .and_then(extract_codeable_text)
                .unwrap_or_default();
            debug!(code = %code, "observation is not a triage vital");
        }
    }

    fn offer(&mut self, field: VitalField, value: VitalValue, recorded_at: Option<DateTime<Utc>>) {
        match self.slots.entry(field) {
            Entry::Occupied(mut entry) => {
                let existing = entry.get_mut();
                if is_more_recent(recorded_at, existing.recorded_at) {
                    *existing = Reading { value, recorded_at };
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(Reading { value, recorded_at });
            }
        }
    }

    fn finalize(mut self) -> VitalsInput {
        let mut vitals = VitalsInput::default();
        for field in VitalField::ALL {
            if let Some(reading) = self.slots.remove(&field) {
                vitals.set(field, reading.value);
            }
        }
        vitals
    }
}

const LOINC_VITALS: [(&str, VitalField); 9] = [
    ("8480-6", VitalField::Sbp),
    ("8867-4", VitalField::Hr),
    ("59408-5", VitalField::Spo2),
    ("2708-6", VitalField::Spo2),
    ("9279-1", VitalField::Rr),
    ("8310-5", VitalField::Temp),
    ("8331-1", VitalField::Temp),
    ("9269-2", VitalField::Gcs),
    ("35088-4", VitalField::Gcs),
];

fn match_vital_field(code: &Value) -> Option<VitalField> {
    match_loinc_field(code).or_else(|| infer_vital_field(&extract_codeable_text(code)?))
}

fn match_loinc_field(code: &Value) -> Option<VitalField> {
    let codings = code.get("coding").and_then(Value::as_array)?;
    codings
        .iter()
        .filter_map(|coding| coding.get("code").and_then(Value::as_str))
        .find_map(|code| {
            LOINC_VITALS
                .iter()
                .find(|(loinc, _)| *loinc == code.trim())
                .map(|(_, field)| *field)
        })
}

/// Name-based fallback for observations without a known LOINC code.
fn infer_vital_field(name: &str) -> Option<VitalField> {
    let lower = name.to_lowercase();
    let tokens = tokenize(name);
    let has_token = |needle: &str| tokens.iter().any(|token| token == needle);

    if lower.contains("diastolic") {
        None
    } else if lower.contains("systolic") || has_token("sbp") {
        Some(VitalField::Sbp)
    } else if lower.contains("blood pressure") || lower.contains("arterial pressure") {
        // A bare panel name still routes to its systolic component; a mean is never SBP.
        if has_token("mean") || has_token("arterial") {
            None
        } else {
            Some(VitalField::Sbp)
        }
    } else if lower.contains("heart rate") || lower.contains("pulse rate") {
        Some(VitalField::Hr)
    } else if lower.contains("oxygen saturation") || has_token("spo2") {
        Some(VitalField::Spo2)
    } else if lower.contains("respiratory rate") || has_token("rr") {
        Some(VitalField::Rr)
    } else if lower.contains("temperature") || has_token("temp") {
        Some(VitalField::Temp)
    } else if lower.contains("glasgow") || has_token("gcs") {
        // Eye, verbal and motor sub-scores are not the total.
        if ["eye", "verbal", "motor"].iter().any(|part| has_token(*part)) {
            None
        } else {
            Some(VitalField::Gcs)
        }
    } else {
        None
    }
}

fn observation_value(node: &Value, field: VitalField) -> Option<VitalValue> {
    if let Some(quantity) = node.get("valueQuantity") {
        let magnitude = quantity.get("value").and_then(Value::as_f64)?;
        if field == VitalField::Temp && quantity_is_fahrenheit(quantity) {
            return Some(VitalValue::Number((magnitude - 32.0) * 5.0 / 9.0));
        }
        return Some(VitalValue::Number(magnitude));
    }
    if let Some(value) = node.get("valueInteger").and_then(Value::as_i64) {
        return Some(VitalValue::from(value));
    }
    if let Some(text) = node.get("valueString").and_then(Value::as_str) {
        if !text.trim().is_empty() {
            return Some(VitalValue::from(text));
        }
    }
    None
}

fn quantity_is_fahrenheit(quantity: &Value) -> bool {
    ["code", "unit"].iter().any(|key| {
        quantity
            .get(*key)
            .and_then(Value::as_str)
            .map(|unit| matches!(unit.trim(), "[degF]" | "degF" | "°F" | "F"))
            .unwrap_or(false)
    })
}

fn extract_codeable_text(value: &Value) -> Option<String> {
    if let Some(text) = value.get("text").and_then(Value::as_str) {
        if !text.trim().is_empty() {
            return Some(text.trim().to_string());
        }
    }

    if let Some(codings) = value.get("coding").and_then(Value::as_array) {
        for coding in codings {
            if let Some(display) = coding.get("display").and_then(Value::as_str) {
                if !display.trim().is_empty() {
                    return Some(display.trim().to_string());
                }
            }
        }
    }

    None
}

fn extract_observation_timestamp(resource: &Value) -> Option<DateTime<Utc>> {
    for field in [
        "effectiveDateTime",
        "effectiveInstant",
        "effectivePeriod",
        "issued",
    ] {
        let Some(value) = resource.get(field) else {
            continue;
        };

        if let Some(dt) = value.as_str().and_then(parse_datetime) {
            return Some(dt);
        }

        if let Some(start) = value.get("start").and_then(Value::as_str) {
            if let Some(dt) = parse_datetime(start) {
                return Some(dt);
            }
        }
    }
    None
}

fn parse_datetime(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}

fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(|part| part.to_string())
        .collect()
}

fn is_more_recent(candidate: Option<DateTime<Utc>>, current: Option<DateTime<Utc>>) -> bool {
    match (candidate, current) {
        (Some(a), Some(b)) => a > b,
        (Some(_), None) => true,
        _ => false,
    }
}
