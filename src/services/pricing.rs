//! Pure money math for order lines.
//!
//! Every persisted amount is rounded to 2 decimal places, half-up. Base and
//! GST are rounded independently before the total is formed; deriving them
//! from an unrounded total would shift pennies between the two fields.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Half-up rounding to 2 decimal places.
pub fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineAmounts {
    pub base: Decimal,
    pub gst_amount: Decimal,
    pub total: Decimal,
}

/// Computes the persisted amounts for one order line.
pub fn line_amounts(unit_price: Decimal, quantity: i32, gst_percent: Decimal) -> LineAmounts {
    let base = round2(unit_price * Decimal::from(quantity));
    let gst_amount = round2(base * gst_percent / Decimal::from(100));
    let total = round2(base + gst_amount);
    LineAmounts {
        base,
        gst_amount,
        total,
    }
}

/// Splits a strip count into full boxes plus loose strips.
///
/// A non-positive box size yields `(0, quantity)`.
pub fn split_strips(quantity: i32, box_size: i32) -> (i32, i32) {
    if box_size <= 0 {
        return (0, quantity);
    }
    let boxes = quantity / box_size;
    (boxes, quantity - boxes * box_size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    #[test]
    fn line_amounts_reference_case() {
        // price 100.00, qty 10, GST 18%
        let amounts = line_amounts(dec!(100.00), 10, dec!(18));
        assert_eq!(amounts.base, dec!(1000.00));
        assert_eq!(amounts.gst_amount, dec!(180.00));
        assert_eq!(amounts.total, dec!(1180.00));
    }

    #[test]
    fn gst_is_rounded_from_the_rounded_base() {
        // base 3.33 (not 3.330), 18% of 3.33 = 0.5994 -> 0.60
        let amounts = line_amounts(dec!(0.333), 10, dec!(18));
        assert_eq!(amounts.base, dec!(3.33));
        assert_eq!(amounts.gst_amount, dec!(0.60));
        assert_eq!(amounts.total, dec!(3.93));
    }

    #[test]
    fn rounding_is_half_up() {
        assert_eq!(round2(dec!(2.345)), dec!(2.35));
        assert_eq!(round2(dec!(2.344)), dec!(2.34));
        assert_eq!(round2(dec!(0.005)), dec!(0.01));
    }

    #[test]
    fn zero_gst_lines_have_no_tax() {
        let amounts = line_amounts(dec!(45.50), 3, dec!(0));
        assert_eq!(amounts.base, dec!(136.50));
        assert_eq!(amounts.gst_amount, dec!(0.00));
        assert_eq!(amounts.total, dec!(136.50));
    }

    #[test]
    fn split_strips_basic() {
        assert_eq!(split_strips(25, 12), (2, 1));
        assert_eq!(split_strips(12, 12), (1, 0));
        assert_eq!(split_strips(5, 12), (0, 5));
    }

    #[test]
    fn split_strips_degenerate_box_size() {
        assert_eq!(split_strips(7, 0), (0, 7));
        assert_eq!(split_strips(7, -3), (0, 7));
    }

    proptest! {
        #[test]
        fn split_strips_reassembles(quantity in 0i32..100_000, box_size in 1i32..500) {
            let (boxes, remainder) = split_strips(quantity, box_size);
            prop_assert_eq!(boxes * box_size + remainder, quantity);
            prop_assert!(remainder >= 0 && remainder < box_size);
        }

        #[test]
        fn line_total_is_base_plus_gst(
            price_paise in 0i64..10_000_00,
            quantity in 1i32..10_000,
            gst_percent in 0u32..=40u32,
        ) {
            let unit_price = Decimal::new(price_paise, 2);
            let amounts = line_amounts(unit_price, quantity, Decimal::from(gst_percent));
            prop_assert_eq!(amounts.total, amounts.base + amounts.gst_amount);
            prop_assert_eq!(amounts.base, round2(amounts.base));
            prop_assert_eq!(amounts.gst_amount, round2(amounts.gst_amount));
        }
    }
}
