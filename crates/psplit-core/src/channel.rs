//! Two-tier settlement: cash in round denominations, digital carries the rest.

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::debug;

use crate::model::PaymentChannel;
use crate::rounding::RoundingPolicy;

/// Granularity of each payment channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChannelRules {
    /// Cash shares are floored to a multiple of this amount.
    pub cash_multiple: Decimal,
    /// Decimal places kept on digital shares.
    pub digital_decimals: u32,
}

impl Default for ChannelRules {
    fn default() -> Self {
        Self {
            cash_multiple: Decimal::ONE_HUNDRED,
            digital_decimals: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelSettlement {
    pub amounts: Vec<Decimal>,
    /// Floored cash that no digital participant could take over.
    pub unrecovered: Decimal,
}

/// Re-round reconciled shares by payment channel.
///
/// `shares` should already sum to `total`. Cash shares are floored to
/// `rules.cash_multiple`. The floored-away total is handed to digital
/// participants in proportion to their own share (evenly if none of them has
/// a positive share), and the digital amounts are then reconciled by `policy`
/// at `rules.digital_decimals` so the grand total still equals `total`.
/// Without digital participants whatever cash does not cover stays
/// unrecovered, so `sum(amounts) + unrecovered == total` either way.
pub fn settle_channels(
    shares: &[Decimal],
    channels: &[PaymentChannel],
    total: Decimal,
    rules: &ChannelRules,
    policy: &dyn RoundingPolicy,
) -> ChannelSettlement {
    let multiple = if rules.cash_multiple > Decimal::ZERO {
        rules.cash_multiple
    } else {
        Decimal::ONE
    };

    let mut amounts = shares.to_vec();
    let mut remainder = Decimal::ZERO;
    let mut cash_total = Decimal::ZERO;
    let mut digital = Vec::new();

    for (index, (value, channel)) in shares.iter().zip(channels).enumerate() {
        match channel {
            PaymentChannel::Cash => {
                let floored = (*value / multiple).floor() * multiple;
                remainder += *value - floored;
                cash_total += floored;
                amounts[index] = floored;
            }
            PaymentChannel::Digital => digital.push(index),
        }
    }

    if digital.is_empty() {
        debug!(%remainder, "No digital participant to absorb cash rounding");
        return ChannelSettlement {
            amounts,
            unrecovered: total - cash_total,
        };
    }

    let digital_base: Decimal = digital.iter().map(|&index| shares[index]).sum();
    let even_part = remainder / Decimal::from(digital.len());
    let topped_up: Vec<Decimal> = digital
        .iter()
        .map(|&index| {
            if digital_base > Decimal::ZERO {
                shares[index] + remainder * shares[index] / digital_base
            } else {
                shares[index] + even_part
            }
        })
        .collect();

    let reconciled = policy.reconcile(&topped_up, total - cash_total, rules.digital_decimals);
    for (&index, amount) in digital.iter().zip(reconciled.amounts) {
        amounts[index] = amount;
    }

    debug!(
        %remainder,
        %cash_total,
        digital = digital.len(),
        "Redistributed cash rounding to digital participants"
    );

    ChannelSettlement {
        amounts,
        unrecovered: Decimal::ZERO,
    }
}
