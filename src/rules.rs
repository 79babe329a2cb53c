//! Pricing and inventory policy, kept free of any persistence so the
//! order workflow and the cart preview agree on the same numbers.

/// Orders at or above this merchandise subtotal ship free.
pub const FREE_SHIPPING_THRESHOLD: i64 = 200_000;

/// Flat shipping fee below the threshold.
pub const SHIPPING_FEE: i64 = 30_000;

/// Stock value marking a product as unlimited.
pub const UNLIMITED_STOCK: i32 = -1;

pub fn compute_shipping_fee(subtotal: i64) -> i64 {
    if subtotal >= FREE_SHIPPING_THRESHOLD {
        0
    } else {
        SHIPPING_FEE
    }
}

/// Subtotal, shipping fee and grand total for a set of (price, qty) lines.
pub fn order_totals(lines: impl IntoIterator<Item = (i64, i32)>) -> (i64, i64, i64) {
    let subtotal: i64 = lines
        .into_iter()
        .map(|(price, qty)| price * i64::from(qty))
        .sum();
    let shipping_fee = compute_shipping_fee(subtotal);
    (subtotal, shipping_fee, subtotal + shipping_fee)
}

/// New stock level after selling `qty` units. The -1 unlimited sentinel and
/// an already-empty 0 pass through untouched; finite stock clamps at 0.
pub fn apply_stock_decrement(current_stock: i32, qty: i32) -> i32 {
    if current_stock <= 0 {
        current_stock
    } else {
        (current_stock - qty).max(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shipping_fee_threshold() {
        assert_eq!(compute_shipping_fee(0), 30_000);
        assert_eq!(compute_shipping_fee(199_999), 30_000);
        assert_eq!(compute_shipping_fee(200_000), 0);
        assert_eq!(compute_shipping_fee(1_000_000), 0);
    }

    #[test]
    fn totals_include_shipping() {
        let (subtotal, fee, grand) = order_totals([(50_000, 2), (25_000, 1)]);
        assert_eq!(subtotal, 125_000);
        assert_eq!(fee, 30_000);
        assert_eq!(grand, 155_000);

        // exactly at the threshold: free shipping, grand total == subtotal
        let (subtotal, fee, grand) = order_totals([(100_000, 2)]);
        assert_eq!(subtotal, 200_000);
        assert_eq!(fee, 0);
        assert_eq!(grand, 200_000);
    }

    #[test]
    fn empty_order_still_charges_shipping() {
        let (subtotal, fee, grand) = order_totals(Vec::<(i64, i32)>::new());
        assert_eq!(subtotal, 0);
        assert_eq!(fee, 30_000);
        assert_eq!(grand, 30_000);
    }

    #[test]
    fn stock_decrement_clamps_and_skips_sentinels() {
        assert_eq!(apply_stock_decrement(-1, 5), -1);
        assert_eq!(apply_stock_decrement(0, 5), 0);
        assert_eq!(apply_stock_decrement(3, 5), 0);
        assert_eq!(apply_stock_decrement(10, 3), 7);
    }
}
