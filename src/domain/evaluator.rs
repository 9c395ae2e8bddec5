//! Agreement of each vote source with the consensus decision.

use crate::domain::error::SigtraderError;
use crate::domain::vote::Vote;

/// Exact-match agreement ratios, each in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalAgreement {
    pub rule_agreement: f64,
    pub model_agreement: f64,
}

fn agreement(votes: &[Vote], consensus: &[Vote]) -> f64 {
    let matches = votes
        .iter()
        .zip(consensus)
        .filter(|(v, c)| v == c)
        .count();
    matches as f64 / consensus.len() as f64
}

/// Score how often the rule and model votes match the consensus.
pub fn evaluate_signals(
    rule: &[Vote],
    model: &[Vote],
    consensus: &[Vote],
) -> Result<SignalAgreement, SigtraderError> {
    if rule.len() != consensus.len() {
        return Err(SigtraderError::alignment(
            "evaluation rule votes",
            consensus.len(),
            rule.len(),
        ));
    }
    if model.len() != consensus.len() {
        return Err(SigtraderError::alignment(
            "evaluation model votes",
            consensus.len(),
            model.len(),
        ));
    }
    if consensus.is_empty() {
        return Err(SigtraderError::DegenerateData {
            reason: "no rows to evaluate".into(),
        });
    }

    Ok(SignalAgreement {
        rule_agreement: agreement(rule, consensus),
        model_agreement: agreement(model, consensus),
    })
}
