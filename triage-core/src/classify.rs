use tracing::debug;

use crate::{AcuityLevel, ParsedVitals, TriageThresholds, VitalsInput};

/// Classify a raw vitals record with the standard TTAS cut-offs.
///
/// Total: every input, including an empty record or one made only of
/// unparseable strings, maps to exactly one level.
pub fn classify_triage(input: &VitalsInput) -> AcuityLevel {
    classify_triage_with(input, &TriageThresholds::default())
}

/// Classify a raw vitals record with caller-supplied cut-offs.
pub fn classify_triage_with(input: &VitalsInput, thresholds: &TriageThresholds) -> AcuityLevel {
    classify_parsed(&ParsedVitals::from(input), thresholds)
}

/// Run the tier cascade over already-parsed vitals.
///
/// Tiers are checked from most to least urgent and the first match wins.
pub fn classify_parsed(vitals: &ParsedVitals, thresholds: &TriageThresholds) -> AcuityLevel {
    let (level, trigger) = decide(vitals, thresholds);
    debug!(acuity = level.as_u8(), trigger, "triage level assigned");
    level
}

fn decide(v: &ParsedVitals, t: &TriageThresholds) -> (AcuityLevel, &'static str) {
    // 0 means "not provided", hence the positive guards on SpO2 and low HR.
    let spo2_given = v.spo2 > 0.0;

    if spo2_given && v.spo2 < t.spo2_critical {
        return (AcuityLevel::Resuscitation, "spo2");
    }
    if v.gcs <= t.gcs_coma {
        return (AcuityLevel::Resuscitation, "gcs");
    }

    if v.spo2 >= t.spo2_critical && v.spo2 < t.spo2_dangerous {
        return (AcuityLevel::Emergent, "spo2");
    }
    if v.sbp > t.sbp_critical {
        return (AcuityLevel::Emergent, "sbp");
    }
    if v.hr > t.hr_critical_high || (v.hr > 0.0 && v.hr < t.hr_critical_low) {
        return (AcuityLevel::Emergent, "hr");
    }

    if v.spo2 >= t.spo2_dangerous && v.spo2 < t.spo2_warning {
        return (AcuityLevel::Urgent, "spo2");
    }
    if v.sbp > t.sbp_dangerous && v.sbp <= t.sbp_critical {
        return (AcuityLevel::Urgent, "sbp");
    }
    if v.hr > t.hr_warning && v.hr <= t.hr_critical_high {
        return (AcuityLevel::Urgent, "hr");
    }

    if v.sbp > 0.0 || v.hr > 0.0 {
        return (AcuityLevel::LessUrgent, "vitals_present");
    }

    (AcuityLevel::NonUrgent, "default")
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;
    use crate::{derive_clinical_alerts, VitalField, VitalValue};

    fn record(pairs: &[(VitalField, &str)]) -> VitalsInput {
        pairs
            .iter()
            .fold(VitalsInput::default(), |input, (field, value)| {
                input.with(*field, *value)
            })
    }

    fn level_of(pairs: &[(VitalField, &str)]) -> u8 {
        classify_triage(&record(pairs)).as_u8()
    }

    #[test]
    fn empty_record_is_level_five() {
        assert_eq!(classify_triage(&VitalsInput::default()), AcuityLevel::NonUrgent);
    }

    #[test]
    fn all_invalid_strings_fall_to_level_five() {
        let input = record(&[
            (VitalField::Spo2, "abc"),
            (VitalField::Sbp, "def"),
            (VitalField::Hr, "ghi"),
            (VitalField::Gcs, "15"),
        ]);
        assert_eq!(classify_triage(&input), AcuityLevel::NonUrgent);
    }

    #[test]
    fn valid_spo2_wins_over_invalid_neighbours() {
        let input = record(&[
            (VitalField::Spo2, "75"),
            (VitalField::Sbp, "invalid"),
            (VitalField::Hr, ""),
        ]);
        assert_eq!(classify_triage(&input), AcuityLevel::Resuscitation);
    }

    #[test_case(&[(VitalField::Spo2, "75"), (VitalField::Sbp, "250"), (VitalField::Hr, "160"), (VitalField::Gcs, "7")], 1 ; "level one beats level two")]
    #[test_case(&[(VitalField::Spo2, "85"), (VitalField::Sbp, "190"), (VitalField::Hr, "125"), (VitalField::Gcs, "15")], 2 ; "level two beats level three")]
    #[test_case(&[(VitalField::Spo2, "92"), (VitalField::Sbp, "150"), (VitalField::Hr, "100")], 3 ; "level three beats level four")]
    fn most_urgent_tier_wins(pairs: &[(VitalField, &str)], expected: u8) {
        assert_eq!(level_of(pairs), expected);
    }

    #[test_case("79", 1)]
    #[test_case("80", 2)]
    #[test_case("85", 2)]
    #[test_case("89", 2)]
    #[test_case("90", 3)]
    #[test_case("92", 3)]
    #[test_case("94", 3)]
    #[test_case("95", 5 ; "spo2 95 triggers no tier")]
    #[test_case("0", 5 ; "spo2 zero reads as absent")]
    fn spo2_boundaries(spo2: &str, expected: u8) {
        assert_eq!(level_of(&[(VitalField::Spo2, spo2)]), expected);
    }

    #[test_case("221", 2)]
    #[test_case("230", 2)]
    #[test_case("220", 3 ; "sbp 220 stays below level two")]
    #[test_case("190", 3)]
    #[test_case("181", 3)]
    #[test_case("180", 4 ; "sbp 180 stays below level three")]
    #[test_case("120", 4)]
    fn sbp_boundaries(sbp: &str, expected: u8) {
        assert_eq!(level_of(&[(VitalField::Sbp, sbp)]), expected);
    }

    #[test_case("151", 2)]
    #[test_case("160", 2)]
    #[test_case("150", 3 ; "hr 150 stays below level two")]
    #[test_case("140", 3)]
    #[test_case("121", 3)]
    #[test_case("120", 4 ; "hr 120 stays below level three")]
    #[test_case("80", 4)]
    #[test_case("40", 4 ; "hr 40 is not bradycardic enough for level two")]
    #[test_case("39", 2)]
    #[test_case("35", 2)]
    fn hr_boundaries(hr: &str, expected: u8) {
        assert_eq!(level_of(&[(VitalField::Hr, hr)]), expected);
    }

    #[test_case("8", 1)]
    #[test_case("5", 1)]
    #[test_case("3", 1)]
    #[test_case("9", 5 ; "gcs 9 is not coma")]
    #[test_case("15", 5)]
    #[test_case("", 5 ; "blank gcs defaults to alert")]
    #[test_case("n/a", 5 ; "garbage gcs defaults to alert")]
    fn gcs_boundaries(gcs: &str, expected: u8) {
        assert_eq!(level_of(&[(VitalField::Gcs, gcs)]), expected);
    }

    #[test]
    fn normal_vitals_with_spo2_only_stay_level_five() {
        assert_eq!(level_of(&[(VitalField::Spo2, "98")]), 5);
        assert_eq!(
            level_of(&[
                (VitalField::Spo2, "98"),
                (VitalField::Sbp, "120"),
                (VitalField::Hr, "75"),
            ]),
            4
        );
    }

    #[test]
    fn numeric_readings_classify_like_strings() {
        let input = VitalsInput::default()
            .with(VitalField::Spo2, 85)
            .with(VitalField::Gcs, VitalValue::Number(15.0));
        assert_eq!(classify_triage(&input), AcuityLevel::Emergent);
    }

    #[test]
    fn rr_and_temp_never_move_the_level() {
        let input = record(&[(VitalField::Rr, "40"), (VitalField::Temp, "41")]);
        assert_eq!(classify_triage(&input), AcuityLevel::NonUrgent);
    }

    #[test]
    fn alerts_do_not_influence_level() {
        // Hypotension, tachypnoea and fever all alert, yet no tier above 4 fires.
        let input = record(&[
            (VitalField::Sbp, "85"),
            (VitalField::Rr, "35"),
            (VitalField::Temp, "40"),
        ]);
        assert!(derive_clinical_alerts(&input).len() >= 3);
        assert_eq!(classify_triage(&input), AcuityLevel::LessUrgent);
    }

    #[test]
    fn repeated_calls_are_identical() {
        let input = record(&[(VitalField::Spo2, "91"), (VitalField::Hr, "130")]);
        let first = classify_triage(&input);
        for _ in 0..10 {
            assert_eq!(classify_triage(&input), first);
        }
    }

    #[test]
    fn custom_thresholds_shift_tiers() {
        let thresholds = TriageThresholds {
            sbp_critical: 240.0,
            ..TriageThresholds::default()
        };
        let input = record(&[(VitalField::Sbp, "230")]);
        assert_eq!(classify_triage(&input), AcuityLevel::Emergent);
        assert_eq!(
            classify_triage_with(&input, &thresholds),
            AcuityLevel::Urgent
        );
    }
}
