//! Consensus reconciliation of the rule and model votes.
//!
//! Per row: mean of the two votes, re-quantized by sign. Agreement or a
//! one-sided split keeps the leaning direction; exact cancellation (Buy with
//! Sell, or Hold with Hold) resolves to Hold.

use crate::domain::error::SigtraderError;
use crate::domain::vote::Vote;

/// Reconcile one row. Depends on nothing but the two votes.
pub fn reconcile(rule: Vote, model: Vote) -> Vote {
    let mean = (rule.value() as f64 + model.value() as f64) / 2.0;
    Vote::from_sign(mean)
}

/// Reconcile two row-aligned vote columns.
pub fn reconcile_all(rule: &[Vote], model: &[Vote]) -> Result<Vec<Vote>, SigtraderError> {
    if rule.len() != model.len() {
        return Err(SigtraderError::alignment("consensus", rule.len(), model.len()));
    }
    Ok(rule
        .iter()
        .zip(model)
        .map(|(&r, &m)| reconcile(r, m))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Vote; 3] = [Vote::Sell, Vote::Hold, Vote::Buy];

    #[test]
    fn full_truth_table() {
        let expected = [
            // rule, model, consensus
            (Vote::Sell, Vote::Sell, Vote::Sell),
            (Vote::Sell, Vote::Hold, Vote::Sell),
            (Vote::Sell, Vote::Buy, Vote::Hold),
            (Vote::Hold, Vote::Sell, Vote::Sell),
            (Vote::Hold, Vote::Hold, Vote::Hold),
            (Vote::Hold, Vote::Buy, Vote::Buy),
            (Vote::Buy, Vote::Sell, Vote::Hold),
            (Vote::Buy, Vote::Hold, Vote::Buy),
            (Vote::Buy, Vote::Buy, Vote::Buy),
        ];
        for (rule, model, consensus) in expected {
            assert_eq!(reconcile(rule, model), consensus, "{rule} + {model}");
        }
    }

    #[test]
    fn symmetric_in_arguments() {
        for a in ALL {
            for b in ALL {
                assert_eq!(reconcile(a, b), reconcile(b, a));
            }
        }
    }

    #[test]
    fn zero_mean_resolves_to_hold() {
        assert_eq!(reconcile(Vote::Buy, Vote::Sell), Vote::Hold);
        assert_eq!(reconcile(Vote::Sell, Vote::Buy), Vote::Hold);
        assert_eq!(reconcile(Vote::Hold, Vote::Hold), Vote::Hold);
    }

    #[test]
    fn reconcile_all_matches_rowwise() {
        let rule = [Vote::Buy, Vote::Buy, Vote::Sell];
        let model = [Vote::Buy, Vote::Sell, Vote::Sell];
        assert_eq!(
            reconcile_all(&rule, &model).unwrap(),
            vec![Vote::Buy, Vote::Hold, Vote::Sell]
        );
    }

    #[test]
    fn reconcile_all_is_idempotent() {
        let rule = [Vote::Buy, Vote::Hold, Vote::Sell, Vote::Hold];
        let model = [Vote::Hold, Vote::Sell, Vote::Sell, Vote::Buy];
        let first = reconcile_all(&rule, &model).unwrap();
        let second = reconcile_all(&rule, &model).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn reconcile_all_rejects_length_mismatch() {
        let err = reconcile_all(&[Vote::Buy, Vote::Hold], &[Vote::Buy]).unwrap_err();
        assert!(matches!(
            err,
            SigtraderError::Alignment {
                expected: 2,
                actual: 1,
                ..
            }
        ));
    }

    #[test]
    fn reconcile_all_empty() {
        assert!(reconcile_all(&[], &[]).unwrap().is_empty());
    }
}
