use rust_decimal::Decimal;

/// Cancellation is blocked once donations reach this share of the target.
pub const CANCELLATION_THRESHOLD_PERCENT: u32 = 25;

/// Cumulative donations as a percentage of the target.
///
/// A non-positive target yields zero rather than dividing by it; the DTO
/// validation should have rejected such a target long before this point.
pub fn donation_percentage(total_donations: Decimal, total_target: Decimal) -> Decimal {
    if total_target > Decimal::ZERO {
        total_donations / total_target * Decimal::from(100)
    } else {
        Decimal::ZERO
    }
}

/// A creator may cancel while the donation percentage is strictly below the
/// threshold.
pub fn can_cancel(total_donations: Decimal, total_target: Decimal) -> bool {
    donation_percentage(total_donations, total_target)
        < Decimal::from(CANCELLATION_THRESHOLD_PERCENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentage_of_partially_funded_project() {
        let pct = donation_percentage(Decimal::from(200), Decimal::from(1000));
        assert_eq!(pct, Decimal::from(20));
    }

    #[test]
    fn percentage_with_zero_target_is_zero() {
        assert_eq!(
            donation_percentage(Decimal::from(50), Decimal::ZERO),
            Decimal::ZERO
        );
    }

    #[test]
    fn cancel_allowed_below_threshold() {
        // 200 / 1000 = 20% < 25%
        assert!(can_cancel(Decimal::from(200), Decimal::from(1000)));
    }

    #[test]
    fn cancel_rejected_at_or_above_threshold() {
        // 300 / 1000 = 30%
        assert!(!can_cancel(Decimal::from(300), Decimal::from(1000)));
        // exactly 25% is also rejected
        assert!(!can_cancel(Decimal::from(250), Decimal::from(1000)));
    }

    #[test]
    fn fractional_amounts_are_handled() {
        let total = Decimal::new(2499, 1); // 249.9
        assert!(can_cancel(total, Decimal::from(1000)));
    }
}
