//! Reservation admission arithmetic.
//!
//! The decision here is pure; the atomicity that makes it safe lives in the
//! orchestration layer, which holds a per-product lock across the
//! availability read and the cart write.

/// What the caller wants done with their cart line. The engine never infers
/// intent from the current line state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReserveIntent {
    /// Add this many units to the existing line (or create one).
    Add(i64),
    /// Replace the line's quantity outright.
    Set(i64),
}

impl ReserveIntent {
    /// The quantity the line would hold if this intent were applied to a
    /// line currently holding `own_quantity` units.
    pub fn resulting_quantity(&self, own_quantity: i64) -> i64 {
        match self {
            ReserveIntent::Add(delta) => own_quantity.saturating_add(*delta),
            ReserveIntent::Set(quantity) => *quantity,
        }
    }
}

/// Outcome of the admission arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// The request fits; the line should hold `new_quantity` units.
    Admitted { new_quantity: i64 },
    /// The request does not fit. `available` is the most this identity
    /// could hold in total right now.
    Rejected { available: i64 },
    /// The request would leave the line with a non-positive quantity.
    Invalid { resulting: i64 },
}

/// Decide whether a reservation request fits the available stock.
///
/// `available` is the product's stock minus every other identity's live
/// reservations; the caller's own line is excluded from that sum, so the
/// resulting quantity is compared against it directly. This keeps one
/// invariant: after an admitted write, own + others never exceeds stock.
pub fn decide(available: i64, own_quantity: i64, intent: ReserveIntent) -> Decision {
    let resulting = intent.resulting_quantity(own_quantity);

    if resulting <= 0 {
        return Decision::Invalid { resulting };
    }

    if resulting > available {
        return Decision::Rejected { available };
    }

    Decision::Admitted {
        new_quantity: resulting,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_to_empty_line_admitted() {
        assert_eq!(
            decide(5, 0, ReserveIntent::Add(3)),
            Decision::Admitted { new_quantity: 3 }
        );
    }

    #[test]
    fn test_add_exhausting_stock_admitted() {
        assert_eq!(
            decide(5, 0, ReserveIntent::Add(5)),
            Decision::Admitted { new_quantity: 5 }
        );
    }

    #[test]
    fn test_add_beyond_available_rejected_with_count() {
        assert_eq!(
            decide(0, 0, ReserveIntent::Add(1)),
            Decision::Rejected { available: 0 }
        );
        assert_eq!(
            decide(2, 0, ReserveIntent::Add(3)),
            Decision::Rejected { available: 2 }
        );
    }

    #[test]
    fn test_add_on_top_of_own_line_counts_own_units() {
        // stock 5, nobody else holds any: available excluding own = 5.
        // Own line already holds 4, so adding 2 would need 6 total.
        assert_eq!(
            decide(5, 4, ReserveIntent::Add(2)),
            Decision::Rejected { available: 5 }
        );
        assert_eq!(
            decide(5, 4, ReserveIntent::Add(1)),
            Decision::Admitted { new_quantity: 5 }
        );
    }

    #[test]
    fn test_set_evaluated_against_others_only() {
        // stock 5, others hold 3, own line holds 2: available excluding
        // own = 2, so the shopper can keep at most 2 in total.
        assert_eq!(
            decide(2, 2, ReserveIntent::Set(2)),
            Decision::Admitted { new_quantity: 2 }
        );
        assert_eq!(
            decide(2, 2, ReserveIntent::Set(3)),
            Decision::Rejected { available: 2 }
        );
    }

    #[test]
    fn test_set_shrink_always_fits() {
        assert_eq!(
            decide(1, 5, ReserveIntent::Set(1)),
            Decision::Admitted { new_quantity: 1 }
        );
    }

    #[test]
    fn test_negative_delta_reducing_line_admitted() {
        assert_eq!(
            decide(5, 4, ReserveIntent::Add(-2)),
            Decision::Admitted { new_quantity: 2 }
        );
    }

    #[test]
    fn test_resulting_zero_or_negative_invalid() {
        assert_eq!(
            decide(5, 2, ReserveIntent::Add(-2)),
            Decision::Invalid { resulting: 0 }
        );
        assert_eq!(
            decide(5, 2, ReserveIntent::Add(-3)),
            Decision::Invalid { resulting: -1 }
        );
        assert_eq!(
            decide(5, 0, ReserveIntent::Set(0)),
            Decision::Invalid { resulting: 0 }
        );
        assert_eq!(
            decide(5, 0, ReserveIntent::Set(-1)),
            Decision::Invalid { resulting: -1 }
        );
    }

    #[test]
    fn test_invalid_takes_precedence_over_rejected() {
        // Even with nothing available, a non-positive result is an input
        // error, not a stock problem.
        assert_eq!(
            decide(0, 0, ReserveIntent::Set(0)),
            Decision::Invalid { resulting: 0 }
        );
    }

    #[test]
    fn test_negative_available_rejects_any_positive_request() {
        // Restock shrinkage can leave more reserved than stocked.
        assert_eq!(
            decide(-2, 0, ReserveIntent::Add(1)),
            Decision::Rejected { available: -2 }
        );
    }
}
