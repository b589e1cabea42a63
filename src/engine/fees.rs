//! Pure fee arithmetic. This is the one place fractional cents are
//! discarded, so the rounding policy is fixed here and nowhere else:
//! round-half-up to the nearest cent, applied to each fee component
//! independently before summing.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

use crate::models::{PaymentConfig, PaymentModel};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FeeBreakdown {
    pub platform_fee_cents: i64,
    pub processing_fee_cents: i64,
    pub total_cents: i64,
}

/// Round-half-up on non-negative amounts. Amounts in this module are never
/// negative, so midpoint-away-from-zero and half-up coincide.
pub(crate) fn round_half_up(amount: Decimal) -> i64 {
    amount
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .expect("rounded cent amount fits in i64")
}

/// `subtotal * percent / 100`, rounded half-up to whole cents.
fn percent_of(subtotal_cents: i64, percent: Decimal) -> i64 {
    round_half_up(Decimal::from(subtotal_cents) * percent / Decimal::from(100))
}

/// Compute the fee breakdown for a subtotal under the event's payment
/// configuration.
///
/// CARD: platform fee is percent-of-subtotal plus a fixed component, each
/// rounded independently; the charity discount halves both platform
/// components (again rounding each on its own) and never touches the
/// processing fee. PREPAID: no fees at all, settlement debits credits
/// instead.
pub fn compute(subtotal_cents: i64, config: &PaymentConfig) -> FeeBreakdown {
    debug_assert!(subtotal_cents >= 0, "subtotal must be non-negative");

    match config.model {
        PaymentModel::Prepaid => FeeBreakdown {
            platform_fee_cents: 0,
            processing_fee_cents: 0,
            total_cents: subtotal_cents,
        },
        PaymentModel::Card => {
            let two = Decimal::from(2);

            let (platform_percent, platform_fixed) = if config.charity_discount {
                (
                    config.platform_fee_percent / two,
                    round_half_up(Decimal::from(config.platform_fee_fixed_cents) / two),
                )
            } else {
                (config.platform_fee_percent, config.platform_fee_fixed_cents)
            };

            let platform_fee_cents = percent_of(subtotal_cents, platform_percent) + platform_fixed;
            let processing_fee_cents = percent_of(subtotal_cents, config.processing_fee_percent)
                + config.processing_fee_fixed_cents;

            FeeBreakdown {
                platform_fee_cents,
                processing_fee_cents,
                total_cents: subtotal_cents + platform_fee_cents + processing_fee_cents,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn card_config(
        platform_percent: &str,
        platform_fixed: i64,
        processing_percent: &str,
        processing_fixed: i64,
        charity: bool,
    ) -> PaymentConfig {
        PaymentConfig {
            event_id: Uuid::new_v4(),
            organizer_id: Uuid::new_v4(),
            model: PaymentModel::Card,
            platform_fee_percent: dec(platform_percent),
            platform_fee_fixed_cents: platform_fixed,
            processing_fee_percent: dec(processing_percent),
            processing_fee_fixed_cents: processing_fixed,
            charity_discount: charity,
        }
    }

    #[test]
    fn worked_example_from_fee_policy() {
        // 333 cents at 3.7% + 179 platform, 2.9% + 30 processing.
        let config = card_config("3.7", 179, "2.9", 30, false);
        let fees = compute(333, &config);
        assert_eq!(fees.platform_fee_cents, 191); // round(12.321) + 179
        assert_eq!(fees.processing_fee_cents, 40); // round(9.657) + 30
        assert_eq!(fees.total_cents, 564);
    }

    #[test]
    fn total_identity_holds_for_zero_subtotal() {
        let config = card_config("3.7", 179, "2.9", 30, false);
        let fees = compute(0, &config);
        assert_eq!(fees.platform_fee_cents, 179);
        assert_eq!(fees.processing_fee_cents, 30);
        assert_eq!(fees.total_cents, 209);
    }

    #[test]
    fn total_identity_holds_across_subtotals() {
        let config = card_config("2.5", 50, "2.9", 30, false);
        for subtotal in [1, 99, 100, 333, 12_345, 1_000_000] {
            let fees = compute(subtotal, &config);
            assert_eq!(
                fees.total_cents,
                subtotal + fees.platform_fee_cents + fees.processing_fee_cents
            );
        }
    }

    #[test]
    fn rounding_is_half_up_per_component() {
        // 250 * 2.5% = 6.25 -> 6; 250 * 1.8% = 4.5 -> 5 (half rounds up).
        let config = card_config("2.5", 0, "1.8", 0, false);
        let fees = compute(250, &config);
        assert_eq!(fees.platform_fee_cents, 6);
        assert_eq!(fees.processing_fee_cents, 5);
    }

    #[test]
    fn charity_halves_platform_components_independently() {
        let config = card_config("3.7", 179, "2.9", 30, true);
        let fees = compute(333, &config);
        // round(333 * 1.85%) = round(6.1605) = 6; round(179 / 2) = 90.
        assert_eq!(fees.platform_fee_cents, 96);
        // Processing fee is never discounted.
        assert_eq!(fees.processing_fee_cents, 40);
        assert_eq!(fees.total_cents, 333 + 96 + 40);
    }

    #[test]
    fn charity_halves_before_rounding_not_after() {
        // 333 * 0.3% = 0.999 rounds to 1 undiscounted; halving that rounded
        // value would give round(0.5) = 1, but the contract halves the
        // percent first: 333 * 0.15% = 0.4995 -> 0.
        let config = card_config("0.3", 0, "0", 0, true);
        assert_eq!(compute(333, &config).platform_fee_cents, 0);
    }

    #[test]
    fn prepaid_orders_carry_no_fees() {
        let config = PaymentConfig {
            model: PaymentModel::Prepaid,
            ..card_config("3.7", 179, "2.9", 30, false)
        };
        let fees = compute(4200, &config);
        assert_eq!(fees.platform_fee_cents, 0);
        assert_eq!(fees.processing_fee_cents, 0);
        assert_eq!(fees.total_cents, 4200);
    }
}
