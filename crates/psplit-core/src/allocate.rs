//! Proration and reconciliation: segments in, total-preserving shares out.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::TimeDelta;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::channel::{ChannelRules, settle_channels};
use crate::error::SplitError;
use crate::model::{
    Allocation, ChannelMap, Participant, PaymentChannel, Segment, Share, Window, name_key,
};
use crate::partition::partition;
use crate::rounding::RoundingMode;

/// How exact shares are derived from the segment list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CostModel {
    /// Every segment costs `duration * total / window`, split evenly among
    /// the players on court at that time. Idle time is attributed to nobody.
    #[default]
    SegmentSplit,
    /// Shares proportional to each player's presence over the sum of all
    /// presences (person-hours).
    PresenceWeighted,
}

impl fmt::Display for CostModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CostModel::SegmentSplit => write!(f, "segment-split"),
            CostModel::PresenceWeighted => write!(f, "presence-weighted"),
        }
    }
}

impl FromStr for CostModel {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "segment-split" | "segment" => Ok(CostModel::SegmentSplit),
            "presence-weighted" | "presence" => Ok(CostModel::PresenceWeighted),
            other => Err(format!(
                "unknown cost model '{other}' (expected segment-split or presence-weighted)"
            )),
        }
    }
}

/// Configurable proration engine. Holds no state between calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Allocator {
    pub cost_model: CostModel,
    pub rounding: RoundingMode,
    /// Decimal places of the currency unit used when no channels apply.
    pub currency_decimals: u32,
    pub channel_rules: ChannelRules,
}

impl Default for Allocator {
    fn default() -> Self {
        Self {
            cost_model: CostModel::default(),
            rounding: RoundingMode::default(),
            currency_decimals: 0,
            channel_rules: ChannelRules::default(),
        }
    }
}

impl Allocator {
    /// Prorate `total_cost` over `segments` and round the result.
    ///
    /// Shares come back in the order of `participants`. When `channels` is
    /// given, the rounded shares are then settled per payment channel.
    pub fn allocate(
        &self,
        segments: &[Segment],
        total_cost: Decimal,
        window: &Window,
        participants: &[Participant],
        channels: Option<&ChannelMap>,
    ) -> Result<Allocation, SplitError> {
        if total_cost < Decimal::ZERO {
            return Err(SplitError::InvalidTotal(total_cost));
        }
        window.validate()?;

        let (exact, presence) = self.exact_shares(segments, total_cost, window, participants);
        let policy = self.rounding.policy();

        // Channel settlement starts from the reconciled shares so that idle
        // court time is already charged to someone before cash is floored.
        let reconciled = policy.reconcile(&exact, total_cost, self.currency_decimals);
        let reconciliation_delta = reconciled.delta;
        let (rounded, unrecovered_remainder, tags) = match channels {
            None => (
                reconciled.amounts,
                Decimal::ZERO,
                vec![None; participants.len()],
            ),
            Some(map) => {
                let tags: Vec<PaymentChannel> = participants
                    .iter()
                    .map(|participant| map.channel_for(&participant.name))
                    .collect();
                let settlement = settle_channels(
                    &reconciled.amounts,
                    &tags,
                    total_cost,
                    &self.channel_rules,
                    policy,
                );
                (
                    settlement.amounts,
                    settlement.unrecovered,
                    tags.into_iter().map(Some).collect(),
                )
            }
        };

        if !unrecovered_remainder.is_zero() {
            warn!(
                %unrecovered_remainder,
                "Cash rounding could not be recovered; collected total is short"
            );
        }

        let shares = participants
            .iter()
            .zip(exact)
            .zip(rounded)
            .zip(presence)
            .zip(tags)
            .map(
                |((((participant, exact_amount), rounded_amount), presence), channel)| Share {
                    name: participant.name.clone(),
                    exact_amount,
                    rounded_amount,
                    presence,
                    channel,
                },
            )
            .collect::<Vec<_>>();

        debug!(
            shares = shares.len(),
            %total_cost,
            %reconciliation_delta,
            cost_model = %self.cost_model,
            rounding = %self.rounding,
            "Allocated court cost"
        );

        Ok(Allocation {
            shares,
            total_cost,
            window: *window,
            cost_model: self.cost_model,
            rounding: self.rounding,
            reconciliation_delta,
            unrecovered_remainder,
        })
    }

    /// Partition then allocate in one step.
    pub fn split(
        &self,
        window: &Window,
        total_cost: Decimal,
        participants: &[Participant],
        channels: Option<&ChannelMap>,
    ) -> Result<Allocation, SplitError> {
        if total_cost < Decimal::ZERO {
            return Err(SplitError::InvalidTotal(total_cost));
        }
        let segments = partition(window, participants)?;
        self.allocate(&segments, total_cost, window, participants, channels)
    }

    fn exact_shares(
        &self,
        segments: &[Segment],
        total_cost: Decimal,
        window: &Window,
        participants: &[Participant],
    ) -> (Vec<Decimal>, Vec<TimeDelta>) {
        let lookup: HashMap<String, usize> = participants
            .iter()
            .enumerate()
            .map(|(index, participant)| (name_key(&participant.name), index))
            .collect();

        let mut exact = vec![Decimal::ZERO; participants.len()];
        let mut presence = vec![TimeDelta::zero(); participants.len()];
        let window_seconds = Decimal::from(window.duration().num_seconds());

        for segment in segments {
            let members: Vec<usize> = segment
                .occupants
                .iter()
                .filter_map(|name| {
                    let index = lookup.get(&name_key(name)).copied();
                    if index.is_none() {
                        warn!(occupant = %name, "Segment occupant is not a listed participant");
                    }
                    index
                })
                .collect();
            if members.is_empty() {
                continue;
            }

            for &index in &members {
                presence[index] = presence[index] + segment.duration;
            }

            if self.cost_model == CostModel::SegmentSplit && !window_seconds.is_zero() {
                let segment_cost =
                    prorate(total_cost, segment.duration.num_seconds(), window_seconds);
                let each = segment_cost / Decimal::from(members.len());
                for &index in &members {
                    exact[index] += each;
                }
            }
        }

        if self.cost_model == CostModel::PresenceWeighted {
            let total_seconds: i64 = presence.iter().map(TimeDelta::num_seconds).sum();
            if total_seconds > 0 {
                let total_seconds = Decimal::from(total_seconds);
                for (amount, stay) in exact.iter_mut().zip(&presence) {
                    *amount = prorate(total_cost, stay.num_seconds(), total_seconds);
                }
            }
        }

        (exact, presence)
    }
}

/// `total * part / whole` for `part <= whole`. Multiplying first keeps the
/// common case exact; totals too large for that divide first instead.
fn prorate(total: Decimal, part: i64, whole: Decimal) -> Decimal {
    let part = Decimal::from(part);
    match total.checked_mul(part) {
        Some(product) => product / whole,
        None => total * (part / whole),
    }
}

/// [`Allocator::allocate`] with the default cost model and rounding policy.
pub fn allocate(
    segments: &[Segment],
    total_cost: Decimal,
    window: &Window,
    participants: &[Participant],
    channels: Option<&ChannelMap>,
) -> Result<Allocation, SplitError> {
    Allocator::default().allocate(segments, total_cost, window, participants, channels)
}

/// [`partition`] followed by [`allocate`], with default settings.
pub fn split(
    window: &Window,
    total_cost: Decimal,
    participants: &[Participant],
    channels: Option<&ChannelMap>,
) -> Result<Allocation, SplitError> {
    Allocator::default().split(window, total_cost, participants, channels)
}
