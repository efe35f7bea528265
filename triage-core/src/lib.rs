//! Core TTAS triage engine: vitals parsing, acuity classification and
//! clinical alert derivation.
//!
//! Every operation here is a pure function of its input. Malformed readings
//! never produce an error; they fold into the per-field default and the
//! classifier always lands on exactly one [`AcuityLevel`].

use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::{self, Deserializer, IgnoredAny, MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Serialize};

mod alerts;
mod classify;
mod parse;

pub use alerts::{derive_alerts_from_parsed, derive_clinical_alerts, derive_clinical_alerts_with};
pub use classify::{classify_parsed, classify_triage, classify_triage_with};
pub use parse::parse_vital_int;

/// One raw reading as supplied by a form or API payload.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum VitalValue {
    Number(f64),
    Text(String),
    /// Any payload shape that cannot carry a reading (booleans, arrays, objects).
    Unsupported,
}

impl From<f64> for VitalValue {
    fn from(value: f64) -> Self {
        VitalValue::Number(value)
    }
}

impl From<i64> for VitalValue {
    fn from(value: i64) -> Self {
        VitalValue::Number(value as f64)
    }
}

impl From<i32> for VitalValue {
    fn from(value: i32) -> Self {
        VitalValue::Number(f64::from(value))
    }
}

impl From<&str> for VitalValue {
    fn from(value: &str) -> Self {
        VitalValue::Text(value.to_string())
    }
}

impl From<String> for VitalValue {
    fn from(value: String) -> Self {
        VitalValue::Text(value)
    }
}

impl<'de> Deserialize<'de> for VitalValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(VitalValueVisitor)
    }
}

struct VitalValueVisitor;

impl<'de> Visitor<'de> for VitalValueVisitor {
    type Value = VitalValue;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a vital-sign reading (number or string)")
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> Result<VitalValue, E> {
        Ok(VitalValue::Number(value as f64))
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<VitalValue, E> {
        Ok(VitalValue::Number(value as f64))
    }

    fn visit_f64<E: de::Error>(self, value: f64) -> Result<VitalValue, E> {
        Ok(VitalValue::Number(value))
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<VitalValue, E> {
        Ok(VitalValue::Text(value.to_string()))
    }

    fn visit_string<E: de::Error>(self, value: String) -> Result<VitalValue, E> {
        Ok(VitalValue::Text(value))
    }

    fn visit_bool<E: de::Error>(self, _value: bool) -> Result<VitalValue, E> {
        Ok(VitalValue::Unsupported)
    }

    fn visit_unit<E: de::Error>(self) -> Result<VitalValue, E> {
        Ok(VitalValue::Unsupported)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<VitalValue, A::Error> {
        while seq.next_element::<IgnoredAny>()?.is_some() {}
        Ok(VitalValue::Unsupported)
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<VitalValue, A::Error> {
        while map.next_entry::<IgnoredAny, IgnoredAny>()?.is_some() {}
        Ok(VitalValue::Unsupported)
    }
}

/// Vital-sign fields understood by the engine.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum VitalField {
    Sbp,
    Hr,
    Spo2,
    Rr,
    Temp,
    Gcs,
}

impl VitalField {
    pub const ALL: [VitalField; 6] = [
        VitalField::Sbp,
        VitalField::Hr,
        VitalField::Spo2,
        VitalField::Rr,
        VitalField::Temp,
        VitalField::Gcs,
    ];

    /// Value used when the reading is absent or unparseable.
    ///
    /// GCS falls back to 15 (fully alert); every other field to 0, which the
    /// rules read as "not provided".
    pub fn default_value(self) -> f64 {
        match self {
            VitalField::Gcs => 15.0,
            _ => 0.0,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            VitalField::Sbp => "SBP",
            VitalField::Hr => "HR",
            VitalField::Spo2 => "SpO2",
            VitalField::Rr => "RR",
            VitalField::Temp => "TEMP",
            VitalField::Gcs => "GCS",
        }
    }

    pub fn unit(self) -> Option<&'static str> {
        match self {
            VitalField::Sbp => Some("mmHg"),
            VitalField::Hr => Some("bpm"),
            VitalField::Spo2 => Some("%"),
            VitalField::Rr => Some("/min"),
            VitalField::Temp => Some("°C"),
            VitalField::Gcs => None,
        }
    }
}

/// Raw vitals record handed in by the caller. Every field is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct VitalsInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sbp: Option<VitalValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hr: Option<VitalValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spo2: Option<VitalValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rr: Option<VitalValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temp: Option<VitalValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gcs: Option<VitalValue>,
}

/// Blank intake form: every vital empty, consciousness recorded as GCS 15.
pub const DEFAULT_FORM_VITALS: VitalsInput = VitalsInput {
    sbp: Some(VitalValue::Text(String::new())),
    hr: Some(VitalValue::Text(String::new())),
    spo2: Some(VitalValue::Text(String::new())),
    rr: Some(VitalValue::Text(String::new())),
    temp: Some(VitalValue::Text(String::new())),
    gcs: Some(VitalValue::Number(15.0)),
};

impl VitalsInput {
    pub fn get(&self, field: VitalField) -> Option<&VitalValue> {
        match field {
            VitalField::Sbp => self.sbp.as_ref(),
            VitalField::Hr => self.hr.as_ref(),
            VitalField::Spo2 => self.spo2.as_ref(),
            VitalField::Rr => self.rr.as_ref(),
            VitalField::Temp => self.temp.as_ref(),
            VitalField::Gcs => self.gcs.as_ref(),
        }
    }

    pub fn set(&mut self, field: VitalField, value: impl Into<VitalValue>) {
        let slot = match field {
            VitalField::Sbp => &mut self.sbp,
            VitalField::Hr => &mut self.hr,
            VitalField::Spo2 => &mut self.spo2,
            VitalField::Rr => &mut self.rr,
            VitalField::Temp => &mut self.temp,
            VitalField::Gcs => &mut self.gcs,
        };
        *slot = Some(value.into());
    }

    /// Builder form of [`VitalsInput::set`].
    pub fn with(mut self, field: VitalField, value: impl Into<VitalValue>) -> Self {
        self.set(field, value);
        self
    }
}

/// Numeric projection of [`VitalsInput`] after safe parsing.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ParsedVitals {
    pub sbp: f64,
    pub hr: f64,
    pub spo2: f64,
    pub rr: f64,
    pub temp: f64,
    pub gcs: f64,
}

impl Default for ParsedVitals {
    fn default() -> Self {
        Self::from(&VitalsInput::default())
    }
}

impl From<&VitalsInput> for ParsedVitals {
    fn from(input: &VitalsInput) -> Self {
        let read = |field: VitalField| parse_vital_int(input.get(field), field.default_value());
        Self {
            sbp: read(VitalField::Sbp),
            hr: read(VitalField::Hr),
            spo2: read(VitalField::Spo2),
            rr: read(VitalField::Rr),
            temp: read(VitalField::Temp),
            gcs: read(VitalField::Gcs),
        }
    }
}

impl ParsedVitals {
    pub fn get(&self, field: VitalField) -> f64 {
        match field {
            VitalField::Sbp => self.sbp,
            VitalField::Hr => self.hr,
            VitalField::Spo2 => self.spo2,
            VitalField::Rr => self.rr,
            VitalField::Temp => self.temp,
            VitalField::Gcs => self.gcs,
        }
    }

    /// True when any monitored reading (SBP, HR, RR, SpO2) is positive.
    pub fn has_monitored_reading(&self) -> bool {
        self.sbp > 0.0 || self.hr > 0.0 || self.rr > 0.0 || self.spo2 > 0.0
    }
}

/// TTAS acuity level; `Resuscitation` is the most urgent.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(into = "u8", try_from = "u8")]
pub enum AcuityLevel {
    Resuscitation = 1,
    Emergent = 2,
    Urgent = 3,
    LessUrgent = 4,
    NonUrgent = 5,
}

impl AcuityLevel {
    pub const ALL: [AcuityLevel; 5] = [
        AcuityLevel::Resuscitation,
        AcuityLevel::Emergent,
        AcuityLevel::Urgent,
        AcuityLevel::LessUrgent,
        AcuityLevel::NonUrgent,
    ];

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            AcuityLevel::Resuscitation => "Resuscitation",
            AcuityLevel::Emergent => "Emergent",
            AcuityLevel::Urgent => "Urgent",
            AcuityLevel::LessUrgent => "Less urgent",
            AcuityLevel::NonUrgent => "Non-urgent",
        }
    }

    /// Target time to physician assessment, in minutes (0 = immediate).
    pub fn target_minutes(self) -> u32 {
        match self {
            AcuityLevel::Resuscitation => 0,
            AcuityLevel::Emergent => 10,
            AcuityLevel::Urgent => 30,
            AcuityLevel::LessUrgent => 60,
            AcuityLevel::NonUrgent => 120,
        }
    }

    /// Display colour used by triage boards.
    pub fn color(self) -> &'static str {
        match self {
            AcuityLevel::Resuscitation => "#d32f2f",
            AcuityLevel::Emergent => "#f57c00",
            AcuityLevel::Urgent => "#fbc02d",
            AcuityLevel::LessUrgent => "#388e3c",
            AcuityLevel::NonUrgent => "#1976d2",
        }
    }
}

impl From<AcuityLevel> for u8 {
    fn from(level: AcuityLevel) -> Self {
        level.as_u8()
    }
}

impl TryFrom<u8> for AcuityLevel {
    type Error = TriageError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(AcuityLevel::Resuscitation),
            2 => Ok(AcuityLevel::Emergent),
            3 => Ok(AcuityLevel::Urgent),
            4 => Ok(AcuityLevel::LessUrgent),
            5 => Ok(AcuityLevel::NonUrgent),
            other => Err(TriageError::InvalidLevel(other)),
        }
    }
}

impl fmt::Display for AcuityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Level {} ({})", self.as_u8(), self.name())
    }
}

/// Display severity of a clinical alert.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AlertSeverity {
    Error,
    Warning,
    Success,
}

/// Which rule produced an alert.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    Hypotension,
    HypertensiveEmergency,
    Bradycardia,
    Tachycardia,
    RespiratoryDistress,
    RespiratoryDepression,
    SevereHypoxia,
    HighFever,
    Stable,
}

impl AlertKind {
    pub fn severity(self) -> AlertSeverity {
        match self {
            AlertKind::Hypotension
            | AlertKind::Bradycardia
            | AlertKind::RespiratoryDistress
            | AlertKind::RespiratoryDepression
            | AlertKind::SevereHypoxia => AlertSeverity::Error,
            AlertKind::HypertensiveEmergency | AlertKind::Tachycardia | AlertKind::HighFever => {
                AlertSeverity::Warning
            }
            AlertKind::Stable => AlertSeverity::Success,
        }
    }
}

/// Advisory message derived from a single reading.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClinicalAlert {
    pub severity: AlertSeverity,
    pub kind: AlertKind,
    pub message: String,
}

/// Cut-offs used by the acuity classifier.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TriageThresholds {
    /// SpO2 below this (and above 0) is level 1.
    pub spo2_critical: f64,
    /// SpO2 below this is level 2.
    pub spo2_dangerous: f64,
    /// SpO2 below this is level 3.
    pub spo2_warning: f64,
    /// GCS at or below this is level 1.
    pub gcs_coma: f64,
    pub sbp_critical: f64,
    pub sbp_dangerous: f64,
    pub hr_critical_high: f64,
    pub hr_critical_low: f64,
    pub hr_warning: f64,
}

impl Default for TriageThresholds {
    fn default() -> Self {
        Self {
            spo2_critical: 80.0,
            spo2_dangerous: 90.0,
            spo2_warning: 95.0,
            gcs_coma: 8.0,
            sbp_critical: 220.0,
            sbp_dangerous: 180.0,
            hr_critical_high: 150.0,
            hr_critical_low: 40.0,
            hr_warning: 120.0,
        }
    }
}

impl TriageThresholds {
    pub fn validate(&self) -> Result<(), TriageError> {
        let values = [
            ("spo2_critical", self.spo2_critical),
            ("spo2_dangerous", self.spo2_dangerous),
            ("spo2_warning", self.spo2_warning),
            ("gcs_coma", self.gcs_coma),
            ("sbp_critical", self.sbp_critical),
            ("sbp_dangerous", self.sbp_dangerous),
            ("hr_critical_high", self.hr_critical_high),
            ("hr_critical_low", self.hr_critical_low),
            ("hr_warning", self.hr_warning),
        ];
        ensure_finite(&values)?;

        if !(self.spo2_critical <= self.spo2_dangerous && self.spo2_dangerous <= self.spo2_warning)
        {
            return Err(TriageError::InvalidConfig(format!(
                "SpO2 bands out of order: critical {} / dangerous {} / warning {}",
                self.spo2_critical, self.spo2_dangerous, self.spo2_warning
            )));
        }
        if !(3.0..=15.0).contains(&self.gcs_coma) {
            return Err(TriageError::InvalidConfig(format!(
                "gcs_coma must lie within 3..=15, got {}",
                self.gcs_coma
            )));
        }
        if self.sbp_dangerous > self.sbp_critical {
            return Err(TriageError::InvalidConfig(format!(
                "sbp_dangerous {} exceeds sbp_critical {}",
                self.sbp_dangerous, self.sbp_critical
            )));
        }
        if !(self.hr_critical_low < self.hr_warning && self.hr_warning <= self.hr_critical_high) {
            return Err(TriageError::InvalidConfig(format!(
                "HR bands out of order: critical_low {} / warning {} / critical_high {}",
                self.hr_critical_low, self.hr_warning, self.hr_critical_high
            )));
        }
        Ok(())
    }
}

/// Cut-offs used by the clinical alert deriver.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AlertThresholds {
    pub sbp_low: f64,
    pub sbp_high: f64,
    pub hr_low: f64,
    pub hr_high: f64,
    pub rr_high: f64,
    pub rr_low: f64,
    pub spo2_low: f64,
    pub temp_high: f64,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            sbp_low: 90.0,
            sbp_high: 180.0,
            hr_low: 50.0,
            hr_high: 120.0,
            rr_high: 30.0,
            rr_low: 10.0,
            spo2_low: 90.0,
            temp_high: 39.0,
        }
    }
}

impl AlertThresholds {
    pub fn validate(&self) -> Result<(), TriageError> {
        let values = [
            ("sbp_low", self.sbp_low),
            ("sbp_high", self.sbp_high),
            ("hr_low", self.hr_low),
            ("hr_high", self.hr_high),
            ("rr_high", self.rr_high),
            ("rr_low", self.rr_low),
            ("spo2_low", self.spo2_low),
            ("temp_high", self.temp_high),
        ];
        ensure_finite(&values)?;

        for (low_name, low, high_name, high) in [
            ("sbp_low", self.sbp_low, "sbp_high", self.sbp_high),
            ("hr_low", self.hr_low, "hr_high", self.hr_high),
            ("rr_low", self.rr_low, "rr_high", self.rr_high),
        ] {
            if low >= high {
                return Err(TriageError::InvalidConfig(format!(
                    "{low_name} {low} must be below {high_name} {high}"
                )));
            }
        }
        Ok(())
    }
}

fn ensure_finite(values: &[(&str, f64)]) -> Result<(), TriageError> {
    match values.iter().find(|(_, value)| !value.is_finite()) {
        Some((name, value)) => Err(TriageError::InvalidConfig(format!(
            "{name} must be a finite number, got {value}"
        ))),
        None => Ok(()),
    }
}

/// Full engine configuration.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TriageConfig {
    pub thresholds: TriageThresholds,
    pub alerts: AlertThresholds,
}

impl TriageConfig {
    pub fn validate(&self) -> Result<(), TriageError> {
        self.thresholds.validate()?;
        self.alerts.validate()
    }
}

/// Level and alerts computed for one vitals record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TriageAssessment {
    pub assessed_at: DateTime<Utc>,
    pub level: AcuityLevel,
    pub alerts: Vec<ClinicalAlert>,
    pub vitals: ParsedVitals,
}

impl TriageAssessment {
    pub fn target_minutes(&self) -> u32 {
        self.level.target_minutes()
    }

    /// Alerts of `Error` severity.
    pub fn critical_alerts(&self) -> impl Iterator<Item = &ClinicalAlert> {
        self.alerts
            .iter()
            .filter(|alert| alert.severity == AlertSeverity::Error)
    }
}

/// Classify a record and derive its alerts in one pass.
pub fn assess(input: &VitalsInput, config: &TriageConfig) -> TriageAssessment {
    let vitals = ParsedVitals::from(input);
    TriageAssessment {
        assessed_at: Utc::now(),
        level: classify_parsed(&vitals, &config.thresholds),
        alerts: derive_alerts_from_parsed(&vitals, &config.alerts),
        vitals,
    }
}

/// Errors raised by the layers around the engine. Classification itself
/// never fails.
#[derive(Debug, thiserror::Error)]
pub enum TriageError {
    #[error("input is missing required data")]
    MissingData,
    #[error("could not read input: {0}")]
    Parse(String),
    #[error("invalid triage configuration: {0}")]
    InvalidConfig(String),
    #[error("acuity level must be between 1 and 5, got {0}")]
    InvalidLevel(u8),
}
