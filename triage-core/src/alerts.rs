use tracing::trace;

use crate::{AlertKind, AlertThresholds, ClinicalAlert, ParsedVitals, VitalsInput};

/// Derive advisory alerts for a raw vitals record with the standard cut-offs.
///
/// Each rule fires independently, so several alerts can co-occur. The result
/// is display-only and never feeds into [`crate::classify_triage`].
pub fn derive_clinical_alerts(input: &VitalsInput) -> Vec<ClinicalAlert> {
    derive_clinical_alerts_with(input, &AlertThresholds::default())
}

pub fn derive_clinical_alerts_with(
    input: &VitalsInput,
    thresholds: &AlertThresholds,
) -> Vec<ClinicalAlert> {
    derive_alerts_from_parsed(&ParsedVitals::from(input), thresholds)
}

/// Alert rules over already-parsed vitals.
///
/// When nothing fires but at least one monitored reading is present, a single
/// `Stable` alert is returned. No readings at all yields an empty list.
pub fn derive_alerts_from_parsed(
    v: &ParsedVitals,
    t: &AlertThresholds,
) -> Vec<ClinicalAlert> {
    let mut alerts = Vec::new();

    if v.sbp > 0.0 && v.sbp < t.sbp_low {
        alerts.push(alert(
            AlertKind::Hypotension,
            format!("SBP < {}: hypotension, risk of shock.", format_numeric(t.sbp_low)),
        ));
    }
    if v.sbp > t.sbp_high {
        alerts.push(alert(
            AlertKind::HypertensiveEmergency,
            format!(
                "SBP > {}: risk of hypertensive emergency.",
                format_numeric(t.sbp_high)
            ),
        ));
    }

    if v.hr > 0.0 && v.hr < t.hr_low {
        alerts.push(alert(
            AlertKind::Bradycardia,
            format!(
                "HR < {}: bradycardia, assess level of consciousness.",
                format_numeric(t.hr_low)
            ),
        ));
    }
    if v.hr > t.hr_high {
        alerts.push(alert(
            AlertKind::Tachycardia,
            format!("HR > {}: tachycardia.", format_numeric(t.hr_high)),
        ));
    }

    if v.rr > t.rr_high {
        alerts.push(alert(
            AlertKind::RespiratoryDistress,
            format!(
                "RR > {}: respiratory distress, intervene immediately.",
                format_numeric(t.rr_high)
            ),
        ));
    }
    if v.rr > 0.0 && v.rr < t.rr_low {
        alerts.push(alert(
            AlertKind::RespiratoryDepression,
            format!(
                "RR < {}: risk of respiratory depression.",
                format_numeric(t.rr_low)
            ),
        ));
    }

    if v.spo2 > 0.0 && v.spo2 < t.spo2_low {
        alerts.push(alert(
            AlertKind::SevereHypoxia,
            format!("SpO2 < {}%: severe hypoxia.", format_numeric(t.spo2_low)),
        ));
    }
    if v.temp > t.temp_high {
        alerts.push(alert(
            AlertKind::HighFever,
            format!(
                "Temp > {}°C: high fever, watch level of consciousness.",
                format_numeric(t.temp_high)
            ),
        ));
    }

    if alerts.is_empty() && v.has_monitored_reading() {
        alerts.push(alert(
            AlertKind::Stable,
            "Monitored vitals are stable within the defined ranges.".to_string(),
        ));
    }

    trace!(count = alerts.len(), "clinical alerts derived");
    alerts
}

fn alert(kind: AlertKind, message: String) -> ClinicalAlert {
    ClinicalAlert {
        severity: kind.severity(),
        kind,
        message,
    }
}

fn format_numeric(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        format!("{value}")
    }
}
