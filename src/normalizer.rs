//! Normalizer: folds heterogeneous fan-out outcomes into the canonical
//! record.
//!
//! A pure function of the outcome sequence plus the fixed bureau/attribute
//! mappings. Failed outcomes and unrecognized identities are skipped with a
//! diagnostic log; they stay inspectable in the outcome vector, which this
//! module only borrows. When two successful outcomes target the same cell,
//! the later one in the batch wins.

use serde_json::Value;
use tracing::{debug, warn};

use crate::fanout::FanOutOutcome;
use crate::models::{Attribute, Bureau, CanonicalRecord};

/// Build a fully populated canonical record from a settled fan-out batch.
/// Cells with no matching successful outcome keep their documented
/// defaults.
pub fn normalize(outcomes: &[FanOutOutcome]) -> CanonicalRecord {
    let mut record = CanonicalRecord::with_defaults();

    for outcome in outcomes {
        let Some(payload) = outcome.payload() else {
            debug!("Skipping failed outcome from {}", outcome.endpoint);
            continue;
        };
        apply_payload(&mut record, &outcome.endpoint, payload);
    }

    record
}

/// Apply one successful payload, expected to carry
/// `{"data": {"bureau": ..., "field": ..., "value": ...}}`.
fn apply_payload(record: &mut CanonicalRecord, endpoint: &str, payload: &Value) {
    let data = &payload["data"];

    let Some(bureau_name) = data["bureau"].as_str() else {
        warn!("Payload from {} has no bureau identity, dropping", endpoint);
        return;
    };
    let Some(field) = data["field"].as_str() else {
        warn!("Payload from {} has no field name, dropping", endpoint);
        return;
    };
    let Some(value) = data["value"].as_f64() else {
        warn!("Payload from {} has a non-numeric value, dropping", endpoint);
        return;
    };

    let Some(bureau) = Bureau::from_name(bureau_name) else {
        warn!(
            "Payload from {} names unrecognized bureau {:?}, dropping",
            endpoint, bureau_name
        );
        return;
    };
    let Some(attribute) = Attribute::from_field(field) else {
        warn!(
            "Payload from {} names unrecognized field {:?}, dropping",
            endpoint, field
        );
        return;
    };

    record.set(bureau, attribute, value);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fanout::CallFailure;
    use serde_json::json;

    fn success(endpoint: &str, bureau: &str, field: &str, value: f64) -> FanOutOutcome {
        FanOutOutcome {
            endpoint: endpoint.to_string(),
            result: Ok(json!({
                "data": { "bureau": bureau, "field": field, "value": value }
            })),
        }
    }

    fn failure(endpoint: &str) -> FanOutOutcome {
        FanOutOutcome {
            endpoint: endpoint.to_string(),
            result: Err(CallFailure {
                reason: "timed out".into(),
                connection_failure: true,
            }),
        }
    }

    #[test]
    fn test_empty_batch_yields_pure_defaults() {
        let record = normalize(&[]);
        assert_eq!(record, CanonicalRecord::with_defaults());
    }

    #[test]
    fn test_single_outcome_round_trip() {
        let outcomes = vec![success("http://test/alpha/credit", "Alpha", "credit", 750.0)];
        let record = normalize(&outcomes);

        assert_eq!(record.get(Bureau::Alpha, Attribute::CreditScore), 750.0);

        // Every other cell stays at its default, score bounds included.
        let defaults = CanonicalRecord::with_defaults();
        for bureau in Bureau::ALL {
            for attribute in Attribute::ALL {
                if bureau == Bureau::Alpha && attribute == Attribute::CreditScore {
                    continue;
                }
                assert_eq!(
                    record.get(bureau, attribute),
                    defaults.get(bureau, attribute)
                );
            }
        }
        assert_eq!(record.bureaus[&Bureau::Beta].score_range_max, 1000.0);
    }

    #[test]
    fn test_failed_outcomes_leave_defaults() {
        let outcomes = vec![
            success("http://test/alpha/credit", "Alpha", "credit", 700.0),
            failure("http://test/beta/credit"),
        ];
        let record = normalize(&outcomes);

        assert_eq!(record.get(Bureau::Alpha, Attribute::CreditScore), 700.0);
        assert_eq!(record.get(Bureau::Beta, Attribute::CreditScore), 0.0);
    }

    #[test]
    fn test_unrecognized_bureau_is_dropped() {
        let outcomes = vec![success("http://test/x", "Omega", "credit", 500.0)];
        let record = normalize(&outcomes);
        assert_eq!(record, CanonicalRecord::with_defaults());
    }

    #[test]
    fn test_unrecognized_field_is_dropped() {
        let outcomes = vec![success("http://test/x", "Alpha", "shoe_size", 43.0)];
        let record = normalize(&outcomes);
        assert_eq!(record, CanonicalRecord::with_defaults());
    }

    #[test]
    fn test_malformed_payload_is_dropped() {
        let outcomes = vec![FanOutOutcome {
            endpoint: "http://test/x".into(),
            result: Ok(json!({ "unexpected": true })),
        }];
        let record = normalize(&outcomes);
        assert_eq!(record, CanonicalRecord::with_defaults());
    }

    #[test]
    fn test_later_outcome_wins_for_same_cell() {
        let outcomes = vec![
            success("http://test/a", "Gamma", "employment", 0.0),
            success("http://test/b", "Gamma", "employment", 1.0),
        ];
        let record = normalize(&outcomes);
        assert_eq!(record.get(Bureau::Gamma, Attribute::Employment), 1.0);
    }

    #[test]
    fn test_all_attributes_map_to_cells() {
        let outcomes = vec![
            success("http://t/1", "Beta", "credit", 812.0),
            success("http://t/2", "Beta", "employment", 1.0),
            success("http://t/3", "Beta", "payment_history", 0.97),
            success("http://t/4", "Beta", "credit_utilization", 0.31),
            success("http://t/5", "Beta", "debt_to_income_ratio", 0.22),
        ];
        let record = normalize(&outcomes);

        assert_eq!(record.get(Bureau::Beta, Attribute::CreditScore), 812.0);
        assert_eq!(record.get(Bureau::Beta, Attribute::Employment), 1.0);
        assert_eq!(record.get(Bureau::Beta, Attribute::PaymentHistory), 0.97);
        assert_eq!(record.get(Bureau::Beta, Attribute::CreditUtilization), 0.31);
        assert_eq!(record.get(Bureau::Beta, Attribute::DebtToIncomeRatio), 0.22);
    }
}
