//! Overflow-checked integer arithmetic for proportional fills.
//!
//! Amounts are `u128`, but every product is formed in 256-bit width before
//! the divide, so `numerator * target` never overflows on its own. Only a
//! final quotient that does not fit in an [`Amount`] fails with
//! [`OpensettleError::ArithmeticOverflow`].

use alloy_primitives::U256;
use opensettle_types::{constants, Amount, OpensettleError, Result};

pub fn safe_sub(a: Amount, b: Amount) -> Result<Amount> {
    a.checked_sub(b).ok_or(OpensettleError::ArithmeticUnderflow)
}

/// `floor(numerator * target / denominator)`.
pub fn proportional_amount(
    numerator: Amount,
    denominator: Amount,
    target: Amount,
) -> Result<Amount> {
    if denominator == 0 {
        return Err(OpensettleError::DivisionByZero);
    }
    narrow(wide_product(numerator, target)? / U256::from(denominator))
}

/// Relative truncation error of `numerator * target / denominator`, in parts
/// per million of the exact product.
///
/// `remainder = (target * numerator) mod denominator`; zero remainder means
/// no error, otherwise `remainder * 1_000_000 / (numerator * target)`.
pub fn relative_rounding_error(
    numerator: Amount,
    denominator: Amount,
    target: Amount,
) -> Result<Amount> {
    if denominator == 0 {
        return Err(OpensettleError::DivisionByZero);
    }
    let product = wide_product(target, numerator)?;
    let remainder = product % U256::from(denominator);
    if remainder.is_zero() {
        return Ok(0);
    }
    let scaled = remainder
        .checked_mul(U256::from(constants::ROUNDING_ERROR_SCALE))
        .ok_or(OpensettleError::ArithmeticOverflow)?;
    narrow(scaled / product)
}

/// Whether truncating `numerator * target / denominator` distorts the result
/// by more than 0.1%.
pub fn is_rounding_error_excessive(
    numerator: Amount,
    denominator: Amount,
    target: Amount,
) -> Result<bool> {
    Ok(relative_rounding_error(numerator, denominator, target)? > constants::MAX_ROUNDING_ERROR)
}

fn wide_product(a: Amount, b: Amount) -> Result<U256> {
    U256::from(a)
        .checked_mul(U256::from(b))
        .ok_or(OpensettleError::ArithmeticOverflow)
}

fn narrow(value: U256) -> Result<Amount> {
    Amount::try_from(value).map_err(|_| OpensettleError::ArithmeticOverflow)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn proportional_floor() {
        assert_eq!(proportional_amount(3, 7, 100).unwrap(), 42);
        assert_eq!(proportional_amount(7, 7, 100).unwrap(), 100);
        assert_eq!(proportional_amount(0, 7, 100).unwrap(), 0);
    }

    #[test]
    fn proportional_overflow_only_when_quotient_does_not_fit() {
        assert_eq!(proportional_amount(Amount::MAX, 2, 2).unwrap(), Amount::MAX);
        let err = proportional_amount(Amount::MAX, 1, 2).unwrap_err();
        assert!(matches!(err, OpensettleError::ArithmeticOverflow));
    }

    #[test]
    fn eighteen_decimal_amounts() {
        const ONE: Amount = 1_000_000_000_000_000_000;
        // 1e21 * 1e21 exceeds u128; the quotient does not.
        assert_eq!(
            proportional_amount(1_000 * ONE, 2_000 * ONE, 1_000 * ONE).unwrap(),
            500 * ONE
        );
        assert_eq!(
            proportional_amount(333 * ONE, 1_000 * ONE, 7_000 * ONE).unwrap(),
            2_331 * ONE
        );
        assert!(!is_rounding_error_excessive(500 * ONE, 1_000 * ONE, 1_000 * ONE).unwrap());
        assert_eq!(
            relative_rounding_error(500 * ONE, 1_000 * ONE, 1_000 * ONE).unwrap(),
            0
        );
    }

    #[test]
    fn rounding_error_at_full_width() {
        // product = 3 * Amount::MAX, remainder 3 * Amount::MAX mod 7 is tiny
        // relative to the product, so the error rounds down to zero ppm.
        assert_eq!(relative_rounding_error(3, 7, Amount::MAX).unwrap(), 0);
        assert!(!is_rounding_error_excessive(3, 7, Amount::MAX).unwrap());
    }

    #[test]
    fn proportional_zero_denominator() {
        assert!(matches!(
            proportional_amount(1, 0, 1),
            Err(OpensettleError::DivisionByZero)
        ));
    }

    #[test]
    fn rounding_error_uses_remainder_of_product() {
        // 300 mod 7 = 6; 6 * 1_000_000 / 300 = 20_000 ppm (2%).
        assert_eq!(relative_rounding_error(3, 7, 100).unwrap(), 20_000);
        assert!(is_rounding_error_excessive(3, 7, 100).unwrap());
    }

    #[test]
    fn exact_division_has_no_error() {
        assert_eq!(relative_rounding_error(5, 10, 20).unwrap(), 0);
        assert!(!is_rounding_error_excessive(5, 10, 20).unwrap());
    }

    #[test]
    fn small_error_within_bound() {
        // 1001 * 1000 = 1_001_000; mod 3 = 2; 2e6 / 1_001_000 = 1 ppm.
        assert_eq!(relative_rounding_error(1001, 3, 1000).unwrap(), 1);
        assert!(!is_rounding_error_excessive(1001, 3, 1000).unwrap());
    }

    #[test]
    fn bound_is_exclusive() {
        // remainder 1 over product 1000 is exactly 1000 ppm: allowed.
        assert_eq!(relative_rounding_error(1000, 999, 1).unwrap(), 1000);
        assert!(!is_rounding_error_excessive(1000, 999, 1).unwrap());
        // remainder 1 over product 999 is 1001 ppm: rejected.
        assert_eq!(relative_rounding_error(999, 998, 1).unwrap(), 1001);
        assert!(is_rounding_error_excessive(999, 998, 1).unwrap());
    }

    #[test]
    fn checked_sub() {
        assert_eq!(safe_sub(3, 2).unwrap(), 1);
        assert!(matches!(
            safe_sub(1, 2),
            Err(OpensettleError::ArithmeticUnderflow)
        ));
    }
}
