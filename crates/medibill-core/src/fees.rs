//! Consultation fee selection.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::money::Money;
use crate::settings::ConsultationFees;

/// Named tiers of the consultation fee schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FeeTier {
    Standard,
    FollowUp,
    Specialist,
    Emergency,
}

impl FeeTier {
    pub const fn label(&self) -> &'static str {
        match self {
            FeeTier::Standard => "Standard",
            FeeTier::FollowUp => "Follow-up",
            FeeTier::Specialist => "Specialist",
            FeeTier::Emergency => "Emergency",
        }
    }
}

impl fmt::Display for FeeTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Picks the fee tier for an appointment category label.
///
/// Case-insensitive substring match, first hit wins in the order
/// follow-up, specialist, emergency; anything else is standard.
///
/// ```rust
/// use medibill_core::fees::{select_consultation_fee, FeeTier};
/// use medibill_core::settings::ConsultationFees;
///
/// let fees = ConsultationFees::default();
/// let (tier, fee) = select_consultation_fee(&fees, "Specialist Follow Up");
/// assert_eq!(tier, FeeTier::FollowUp);
/// assert_eq!(fee, fees.follow_up);
/// ```
pub fn select_consultation_fee(fees: &ConsultationFees, category: &str) -> (FeeTier, Money) {
    let tier = classify(category);
    let fee = match tier {
        FeeTier::Standard => fees.standard,
        FeeTier::FollowUp => fees.follow_up,
        FeeTier::Specialist => fees.specialist,
        FeeTier::Emergency => fees.emergency,
    };
    (tier, fee)
}

fn classify(category: &str) -> FeeTier {
    let label = category.to_lowercase();

    if ["follow-up", "follow up", "followup", "follow_up"]
        .iter()
        .any(|needle| label.contains(needle))
    {
        FeeTier::FollowUp
    } else if label.contains("specialist") {
        FeeTier::Specialist
    } else if label.contains("emergency") {
        FeeTier::Emergency
    } else {
        FeeTier::Standard
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_order() {
        let fees = ConsultationFees::default();

        assert_eq!(select_consultation_fee(&fees, "follow-up").0, FeeTier::FollowUp);
        assert_eq!(select_consultation_fee(&fees, "FollowUp visit").0, FeeTier::FollowUp);
        assert_eq!(select_consultation_fee(&fees, "Emergency specialist").0, FeeTier::Specialist);
        assert_eq!(select_consultation_fee(&fees, "EMERGENCY").0, FeeTier::Emergency);
        assert_eq!(select_consultation_fee(&fees, "General").0, FeeTier::Standard);
        assert_eq!(select_consultation_fee(&fees, "").0, FeeTier::Standard);
    }

    #[test]
    fn test_amount_comes_from_schedule() {
        let fees = ConsultationFees {
            standard: Money::from_major(400),
            follow_up: Money::from_major(300),
            specialist: Money::from_major(900),
            emergency: Money::from_major(1200),
        };
        assert_eq!(select_consultation_fee(&fees, "follow up").1, Money::from_major(300));
        assert_eq!(select_consultation_fee(&fees, "checkup").1, Money::from_major(400));
    }
}
