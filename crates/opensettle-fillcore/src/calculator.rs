//! Fill computation for a single order.
//!
//! Given the order, its cumulative fill and the taker's request, produce the
//! exact amounts to settle. Pure: no ledger access, no transfers.

use opensettle_types::{Address, Amount, FillResult, FillStatus, OpensettleError, Order, Result};

use crate::math::{is_rounding_error_excessive, proportional_amount, safe_sub};

/// Compute the fill of `order` requested by `caller`.
///
/// Hard failures (taker restriction, non-positive request, arithmetic) are
/// returned as `Err`. A rounding error above 0.1% is a soft outcome:
/// `(RoundingErrorTooLarge, FillResult::ZERO)`.
pub fn compute_fill(
    order: &Order,
    filled_amount: Amount,
    requested_taker_amount: Amount,
    caller: &Address,
) -> Result<(FillStatus, FillResult)> {
    if order.taker_address.is_some_and(|taker| taker != *caller) {
        return Err(OpensettleError::TakerInvalid(order.hash()));
    }
    if requested_taker_amount == 0 {
        return Err(OpensettleError::InvalidTakerAmount(order.hash()));
    }

    let remaining = safe_sub(order.taker_asset_amount, filled_amount)?;
    let taker_asset_filled_amount = requested_taker_amount.min(remaining);

    if is_rounding_error_excessive(
        taker_asset_filled_amount,
        order.taker_asset_amount,
        order.maker_asset_amount,
    )? {
        tracing::debug!(
            order = %order.hash(),
            taker_asset_filled_amount,
            "Fill rejected: rounding error too large"
        );
        return Ok((FillStatus::RoundingErrorTooLarge, FillResult::ZERO));
    }

    let scale = |target: Amount| {
        proportional_amount(taker_asset_filled_amount, order.taker_asset_amount, target)
    };

    Ok((
        FillStatus::Success,
        FillResult {
            maker_asset_filled_amount: scale(order.maker_asset_amount)?,
            taker_asset_filled_amount,
            maker_fee_paid: scale(order.maker_fee)?,
            taker_fee_paid: scale(order.taker_fee)?,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_order(maker_amount: Amount, taker_amount: Amount) -> Order {
        Order::dummy(Address([1u8; 32]), vec![0; 36], maker_amount, vec![1; 36], taker_amount)
    }

    const TAKER: Address = Address([2u8; 32]);

    #[test]
    fn full_fill() {
        let mut order = make_order(100, 200);
        order.maker_fee = 10;
        order.taker_fee = 20;
        let (status, fill) = compute_fill(&order, 0, 200, &TAKER).unwrap();
        assert_eq!(status, FillStatus::Success);
        assert_eq!(
            fill,
            FillResult {
                maker_asset_filled_amount: 100,
                taker_asset_filled_amount: 200,
                maker_fee_paid: 10,
                taker_fee_paid: 20,
            }
        );
    }

    #[test]
    fn partial_fill_scales_every_amount() {
        let mut order = make_order(100, 200);
        order.maker_fee = 10;
        order.taker_fee = 20;
        let (_, fill) = compute_fill(&order, 0, 50, &TAKER).unwrap();
        assert_eq!(fill.maker_asset_filled_amount, 25);
        assert_eq!(fill.taker_asset_filled_amount, 50);
        assert_eq!(fill.maker_fee_paid, 2);
        assert_eq!(fill.taker_fee_paid, 5);
    }

    #[test]
    fn request_clamped_to_remaining() {
        let order = make_order(100, 200);
        let (_, fill) = compute_fill(&order, 150, 1_000, &TAKER).unwrap();
        assert_eq!(fill.taker_asset_filled_amount, 50);
        assert_eq!(fill.maker_asset_filled_amount, 25);
    }

    #[test]
    fn taker_restriction_enforced() {
        let mut order = make_order(100, 200);
        order.taker_address = Some(Address([9u8; 32]));
        let err = compute_fill(&order, 0, 10, &TAKER).unwrap_err();
        assert!(matches!(err, OpensettleError::TakerInvalid(h) if h == order.hash()));

        order.taker_address = Some(TAKER);
        assert!(compute_fill(&order, 0, 10, &TAKER).is_ok());
    }

    #[test]
    fn zero_request_rejected() {
        let order = make_order(100, 200);
        assert!(matches!(
            compute_fill(&order, 0, 0, &TAKER),
            Err(OpensettleError::InvalidTakerAmount(_))
        ));
    }

    #[test]
    fn overfilled_ledger_underflows() {
        let order = make_order(100, 200);
        assert!(matches!(
            compute_fill(&order, 201, 1, &TAKER),
            Err(OpensettleError::ArithmeticUnderflow)
        ));
    }

    #[test]
    fn rounding_error_is_soft() {
        // 3/7 of 100 truncates 300/7 = 42.857 → 2% error.
        let order = make_order(100, 7);
        let (status, fill) = compute_fill(&order, 0, 3, &TAKER).unwrap();
        assert_eq!(status, FillStatus::RoundingErrorTooLarge);
        assert!(fill.is_zero());
    }

    #[test]
    fn eighteen_decimal_half_fill() {
        const ONE: Amount = 1_000_000_000_000_000_000;
        let mut order = make_order(1_000 * ONE, 1_000 * ONE);
        order.maker_fee = 10 * ONE;
        let (status, fill) = compute_fill(&order, 0, 500 * ONE, &TAKER).unwrap();
        assert_eq!(status, FillStatus::Success);
        assert_eq!(fill.maker_asset_filled_amount, 500 * ONE);
        assert_eq!(fill.taker_asset_filled_amount, 500 * ONE);
        assert_eq!(fill.maker_fee_paid, 5 * ONE);
    }

    #[test]
    fn scaling_never_exceeds_target() {
        let mut order = make_order(2, 2);
        order.maker_fee = Amount::MAX;
        let (_, fill) = compute_fill(&order, 0, 2, &TAKER).unwrap();
        assert_eq!(fill.maker_fee_paid, Amount::MAX);
    }
}
