//! WASM <-> JavaScript bridge for triage forms, framework agnostic.

use serde::{Deserialize, Serialize};
use serde_wasm_bindgen::{from_value, to_value};
use triage_core::{
    assess, classify_triage_with, derive_clinical_alerts_with, AcuityLevel, TriageConfig,
    TriageError, VitalValue, VitalsInput,
};
use wasm_bindgen::prelude::*;

/// Flat, all-optional config object as passed from JS.
#[derive(Debug, Default, Deserialize)]
struct JsTriageConfig {
    #[serde(default)]
    spo2_critical: Option<f64>,
    #[serde(default)]
    spo2_dangerous: Option<f64>,
    #[serde(default)]
    spo2_warning: Option<f64>,
    #[serde(default)]
    gcs_coma: Option<f64>,
    #[serde(default)]
    sbp_critical: Option<f64>,
    #[serde(default)]
    sbp_dangerous: Option<f64>,
    #[serde(default)]
    hr_critical_high: Option<f64>,
    #[serde(default)]
    hr_critical_low: Option<f64>,
    #[serde(default)]
    hr_warning: Option<f64>,
    #[serde(default)]
    alert_sbp_low: Option<f64>,
    #[serde(default)]
    alert_sbp_high: Option<f64>,
    #[serde(default)]
    alert_hr_low: Option<f64>,
    #[serde(default)]
    alert_hr_high: Option<f64>,
    #[serde(default)]
    alert_rr_high: Option<f64>,
    #[serde(default)]
    alert_rr_low: Option<f64>,
    #[serde(default)]
    alert_spo2_low: Option<f64>,
    #[serde(default)]
    alert_temp_high: Option<f64>,
}

impl From<JsTriageConfig> for TriageConfig {
    fn from(cfg: JsTriageConfig) -> Self {
        let mut base = TriageConfig::default();
        let overrides = [
            (cfg.spo2_critical, &mut base.thresholds.spo2_critical),
            (cfg.spo2_dangerous, &mut base.thresholds.spo2_dangerous),
            (cfg.spo2_warning, &mut base.thresholds.spo2_warning),
            (cfg.gcs_coma, &mut base.thresholds.gcs_coma),
            (cfg.sbp_critical, &mut base.thresholds.sbp_critical),
            (cfg.sbp_dangerous, &mut base.thresholds.sbp_dangerous),
            (cfg.hr_critical_high, &mut base.thresholds.hr_critical_high),
            (cfg.hr_critical_low, &mut base.thresholds.hr_critical_low),
            (cfg.hr_warning, &mut base.thresholds.hr_warning),
            (cfg.alert_sbp_low, &mut base.alerts.sbp_low),
            (cfg.alert_sbp_high, &mut base.alerts.sbp_high),
            (cfg.alert_hr_low, &mut base.alerts.hr_low),
            (cfg.alert_hr_high, &mut base.alerts.hr_high),
            (cfg.alert_rr_high, &mut base.alerts.rr_high),
            (cfg.alert_rr_low, &mut base.alerts.rr_low),
            (cfg.alert_spo2_low, &mut base.alerts.spo2_low),
            (cfg.alert_temp_high, &mut base.alerts.temp_high),
        ];
        for (value, slot) in overrides {
            if let Some(value) = value {
                *slot = value;
            }
        }
        base
    }
}

#[derive(Serialize)]
struct JsLevelInfo {
    level: u8,
    name: &'static str,
    target_minutes: u32,
    color: &'static str,
}

impl From<AcuityLevel> for JsLevelInfo {
    fn from(level: AcuityLevel) -> Self {
        Self {
            level: level.as_u8(),
            name: level.name(),
            target_minutes: level.target_minutes(),
            color: level.color(),
        }
    }
}

/// Acuity level (1-5) for the current form values. Never fails: anything
/// that cannot be read as a vitals record classifies as an empty one.
#[wasm_bindgen]
pub fn classify_triage(vitals: JsValue, config: Option<JsValue>) -> Result<u8, JsValue> {
    init_panic_hook();
    let cfg = read_config(config)?;
    Ok(classify_triage_with(&read_vitals(vitals), &cfg.thresholds).as_u8())
}

#[wasm_bindgen]
pub fn derive_clinical_alerts(
    vitals: JsValue,
    config: Option<JsValue>,
) -> Result<JsValue, JsValue> {
    init_panic_hook();
    let cfg = read_config(config)?;
    let alerts = derive_clinical_alerts_with(&read_vitals(vitals), &cfg.alerts);
    to_value(&alerts).map_err(|err| JsValue::from_str(&format!("Cannot serialize alerts: {err}")))
}

/// Level, alerts and parsed vitals in one object.
#[wasm_bindgen]
pub fn assess_vitals(vitals: JsValue, config: Option<JsValue>) -> Result<JsValue, JsValue> {
    init_panic_hook();
    let cfg = read_config(config)?;
    let assessment = assess(&read_vitals(vitals), &cfg);
    to_value(&assessment)
        .map_err(|err| JsValue::from_str(&format!("Cannot serialize assessment: {err}")))
}

/// Assess a FHIR bundle or plain vitals record passed as a JS object.
#[wasm_bindgen]
pub fn assess_fhir_bundle(bundle: JsValue, config: Option<JsValue>) -> Result<JsValue, JsValue> {
    init_panic_hook();
    let bundle_value = from_value::<serde_json::Value>(bundle)
        .map_err(|err| JsValue::from_str(&format!("Cannot read JSON bundle: {err}")))?;
    let cfg = read_config(config)?;

    let assessment = triage_fhir::assess_json_value(&bundle_value, &cfg)
        .map_err(|err| JsValue::from_str(&format_triage_error(err)))?;

    to_value(&assessment)
        .map_err(|err| JsValue::from_str(&format!("Cannot serialize assessment: {err}")))
}

/// Integer-prefix parse of a single form field.
#[wasm_bindgen]
pub fn parse_vital_int(raw: JsValue, default_value: Option<f64>) -> f64 {
    let value = from_value::<Option<VitalValue>>(raw).unwrap_or(None);
    triage_core::parse_vital_int(value.as_ref(), default_value.unwrap_or(0.0))
}

/// Name, target time and colour for a level number.
#[wasm_bindgen]
pub fn level_info(level: u8) -> Result<JsValue, JsValue> {
    let level =
        AcuityLevel::try_from(level).map_err(|err| JsValue::from_str(&format_triage_error(err)))?;
    to_value(&JsLevelInfo::from(level))
        .map_err(|err| JsValue::from_str(&format!("Cannot serialize level info: {err}")))
}

fn read_vitals(vitals: JsValue) -> VitalsInput {
    from_value::<VitalsInput>(vitals).unwrap_or_default()
}

fn read_config(config: Option<JsValue>) -> Result<TriageConfig, JsValue> {
    let cfg = match config {
        Some(js_cfg) if !js_cfg.is_undefined() && !js_cfg.is_null() => {
            let cfg: JsTriageConfig = from_value(js_cfg)
                .map_err(|err| JsValue::from_str(&format!("Cannot read config: {err}")))?;
            TriageConfig::from(cfg)
        }
        _ => TriageConfig::default(),
    };
    cfg.validate()
        .map_err(|err| JsValue::from_str(&format_triage_error(err)))?;
    Ok(cfg)
}

fn init_panic_hook() {
    #[cfg(target_arch = "wasm32")]
    console_error_panic_hook::set_once();
}

fn format_triage_error(err: TriageError) -> String {
    format!("Triage error: {err}")
}
