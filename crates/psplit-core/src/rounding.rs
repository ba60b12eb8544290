//! Policies that turn exact shares into currency amounts summing to a target.

use std::fmt;
use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Rounded amounts plus the drift the policy had to absorb.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciled {
    pub amounts: Vec<Decimal>,
    /// `target` minus the sum of every amount rounded on its own.
    pub delta: Decimal,
}

/// Strategy for rounding a list of exact amounts at `scale` decimal places so
/// that the result sums to exactly `target`.
///
/// Implementations must return one amount per input, in input order.
pub trait RoundingPolicy: fmt::Debug + Send + Sync {
    fn name(&self) -> &'static str;

    fn reconcile(&self, exact: &[Decimal], target: Decimal, scale: u32) -> Reconciled;
}

/// Round half to even at `scale` decimal places.
pub fn round_half_even(value: Decimal, scale: u32) -> Decimal {
    value.round_dp_with_strategy(scale, RoundingStrategy::MidpointNearestEven)
}

fn drift(exact: &[Decimal], target: Decimal, scale: u32) -> Decimal {
    target
        - exact
            .iter()
            .map(|value| round_half_even(*value, scale))
            .sum::<Decimal>()
}

/// Round every amount except the last, then hand the last one whatever is
/// left of the target. The last entry absorbs all cumulative drift.
#[derive(Debug, Clone, Copy, Default)]
pub struct ForcedResidualPolicy;

impl RoundingPolicy for ForcedResidualPolicy {
    fn name(&self) -> &'static str {
        "forced-residual"
    }

    fn reconcile(&self, exact: &[Decimal], target: Decimal, scale: u32) -> Reconciled {
        let mut amounts = Vec::with_capacity(exact.len());
        if let Some((_, head)) = exact.split_last() {
            let mut so_far = Decimal::ZERO;
            for value in head {
                let rounded = round_half_even(*value, scale);
                so_far += rounded;
                amounts.push(rounded);
            }
            amounts.push(target - so_far);
        }

        Reconciled {
            amounts,
            delta: drift(exact, target, scale),
        }
    }
}

/// Floor every amount, then give the missing currency units to the entries
/// with the largest fractional remainders (declaration order breaks ties).
///
/// When the exact amounts do not add up to the target (idle court time under
/// segment split), the gap is spread evenly before the remainder ranking is
/// applied. Precision finer than `scale` in the target lands on the last entry.
#[derive(Debug, Clone, Copy, Default)]
pub struct LargestRemainderPolicy;

impl RoundingPolicy for LargestRemainderPolicy {
    fn name(&self) -> &'static str {
        "largest-remainder"
    }

    fn reconcile(&self, exact: &[Decimal], target: Decimal, scale: u32) -> Reconciled {
        let delta = drift(exact, target, scale);
        if exact.is_empty() {
            return Reconciled {
                amounts: Vec::new(),
                delta,
            };
        }

        let unit = Decimal::new(1, scale);
        let mut amounts: Vec<Decimal> = exact
            .iter()
            .map(|value| value.round_dp_with_strategy(scale, RoundingStrategy::ToNegativeInfinity))
            .collect();

        let mut order: Vec<usize> = (0..exact.len()).collect();
        order.sort_by(|&a, &b| (exact[b] - amounts[b]).cmp(&(exact[a] - amounts[a])));

        let shortfall = target - amounts.iter().sum::<Decimal>();
        let units = (shortfall / unit).trunc();
        let count = Decimal::from(exact.len());
        let per_entry = (units / count).trunc();
        let extra = units - per_entry * count;

        if !per_entry.is_zero() {
            for amount in amounts.iter_mut() {
                *amount += per_entry * unit;
            }
        }

        let extra_count = extra.abs().to_usize().unwrap_or(0);
        if extra.is_sign_negative() {
            for &index in order.iter().rev().take(extra_count) {
                amounts[index] -= unit;
            }
        } else {
            for &index in order.iter().take(extra_count) {
                amounts[index] += unit;
            }
        }

        let leftover = target - amounts.iter().sum::<Decimal>();
        if !leftover.is_zero() {
            if let Some(last) = amounts.last_mut() {
                *last += leftover;
            }
        }

        Reconciled { amounts, delta }
    }
}

/// Serializable selector for the built-in policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RoundingMode {
    #[default]
    ForcedResidual,
    LargestRemainder,
}

impl RoundingMode {
    pub fn policy(self) -> &'static dyn RoundingPolicy {
        match self {
            RoundingMode::ForcedResidual => &ForcedResidualPolicy,
            RoundingMode::LargestRemainder => &LargestRemainderPolicy,
        }
    }
}

impl fmt::Display for RoundingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.policy().name())
    }
}

impl FromStr for RoundingMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "forced-residual" | "residual" => Ok(RoundingMode::ForcedResidual),
            "largest-remainder" | "remainder" => Ok(RoundingMode::LargestRemainder),
            other => Err(format!(
                "unknown rounding policy '{other}' (expected forced-residual or largest-remainder)"
            )),
        }
    }
}
