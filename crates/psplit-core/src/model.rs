//! Plain data exchanged between the partitioner, the proration engine and callers.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::TimeDelta;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize, Serializer};

use crate::allocate::CostModel;
use crate::error::SplitError;
use crate::rounding::RoundingMode;
use crate::time::{self, ClockTime};

/// The rented period the total cost applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Window {
    pub start: ClockTime,
    pub end: ClockTime,
}

impl Window {
    /// Build a window without validating it; [`Window::validate`] runs at the
    /// engine boundary.
    pub const fn new(start: ClockTime, end: ClockTime) -> Self {
        Self { start, end }
    }

    pub fn validate(&self) -> Result<(), SplitError> {
        if self.start > self.end {
            return Err(SplitError::InvalidWindow {
                start: self.start,
                end: self.end,
            });
        }
        Ok(())
    }

    /// Zero for inverted windows.
    pub fn duration(&self) -> TimeDelta {
        if self.start > self.end {
            TimeDelta::zero()
        } else {
            self.end - self.start
        }
    }

    pub fn hours(&self) -> Decimal {
        time::hours(self.duration())
    }

    /// Move `value` to the nearest window bound when it falls outside.
    pub fn clamp(&self, value: ClockTime) -> ClockTime {
        if value < self.start {
            self.start
        } else if value > self.end {
            self.end
        } else {
            value
        }
    }
}

/// A person sharing the court, with their declared presence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Participant {
    pub name: String,
    pub arrival: ClockTime,
    pub departure: ClockTime,
}

impl Participant {
    pub fn new(name: impl Into<String>, arrival: ClockTime, departure: ClockTime) -> Self {
        Self {
            name: name.into(),
            arrival,
            departure,
        }
    }

    /// Presence bounds after clamping to `window`. A departure that lands
    /// before the arrival collapses onto it.
    pub fn clamped(&self, window: &Window) -> (ClockTime, ClockTime) {
        let arrival = window.clamp(self.arrival);
        let departure = window.clamp(self.departure).max(arrival);
        (arrival, departure)
    }

    pub fn clamped_presence(&self, window: &Window) -> TimeDelta {
        let (arrival, departure) = self.clamped(window);
        departure - arrival
    }
}

/// A maximal stretch of the window during which the set of players on court
/// does not change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Segment {
    pub start: ClockTime,
    pub end: ClockTime,
    #[serde(rename = "duration_minutes", serialize_with = "serialize_minutes")]
    pub duration: TimeDelta,
    /// Names in declaration order.
    pub occupants: Vec<String>,
}

impl Segment {
    pub fn new(start: ClockTime, end: ClockTime, occupants: Vec<String>) -> Self {
        Self {
            start,
            end,
            duration: end - start,
            occupants,
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        let key = name_key(name);
        self.occupants
            .iter()
            .any(|occupant| name_key(occupant) == key)
    }
}

/// How a participant settles their share.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PaymentChannel {
    /// Physical money; settled in whole denominations.
    #[default]
    Cash,
    /// Transfers that can carry fractional amounts.
    Digital,
}

impl fmt::Display for PaymentChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentChannel::Cash => write!(f, "cash"),
            PaymentChannel::Digital => write!(f, "digital"),
        }
    }
}

impl FromStr for PaymentChannel {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "cash" => Ok(PaymentChannel::Cash),
            "digital" | "wallet" | "transfer" => Ok(PaymentChannel::Digital),
            other => Err(format!(
                "unknown payment channel '{other}' (expected cash or digital)"
            )),
        }
    }
}

/// Case-insensitive `name -> channel` lookup with a fallback channel.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChannelMap {
    channels: HashMap<String, PaymentChannel>,
    fallback: PaymentChannel,
}

impl ChannelMap {
    pub fn new(fallback: PaymentChannel) -> Self {
        Self {
            channels: HashMap::new(),
            fallback,
        }
    }

    pub fn insert(&mut self, name: &str, channel: PaymentChannel) {
        self.channels.insert(name_key(name), channel);
    }

    pub fn with(mut self, name: &str, channel: PaymentChannel) -> Self {
        self.insert(name, channel);
        self
    }

    pub fn channel_for(&self, name: &str) -> PaymentChannel {
        self.channels
            .get(&name_key(name))
            .copied()
            .unwrap_or(self.fallback)
    }
}

/// One participant's slice of the bill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Share {
    pub name: String,
    /// Unrounded proportional cost.
    pub exact_amount: Decimal,
    /// Amount the participant actually pays.
    pub rounded_amount: Decimal,
    #[serde(rename = "presence_minutes", serialize_with = "serialize_minutes")]
    pub presence: TimeDelta,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<PaymentChannel>,
}

impl Share {
    pub fn presence_hours(&self) -> Decimal {
        time::hours(self.presence)
    }
}

/// Result of one proration run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Allocation {
    /// In the order participants were supplied.
    pub shares: Vec<Share>,
    pub total_cost: Decimal,
    pub window: Window,
    pub cost_model: CostModel,
    pub rounding: RoundingMode,
    /// `total_cost` minus the sum of individually rounded shares, i.e. the
    /// drift absorbed by the reconciling policy.
    pub reconciliation_delta: Decimal,
    /// Cash rounding that no digital participant could take over.
    pub unrecovered_remainder: Decimal,
}

impl Allocation {
    pub fn collected(&self) -> Decimal {
        self.shares.iter().map(|share| share.rounded_amount).sum()
    }

    pub fn is_reconciled(&self) -> bool {
        self.collected() == self.total_cost
    }

    pub fn channel_total(&self, channel: PaymentChannel) -> Decimal {
        self.shares
            .iter()
            .filter(|share| share.channel == Some(channel))
            .map(|share| share.rounded_amount)
            .sum()
    }

    pub fn has_channels(&self) -> bool {
        self.shares.iter().any(|share| share.channel.is_some())
    }

    /// Average price of one court hour, idle time included.
    pub fn cost_per_hour(&self) -> Decimal {
        let hours = self.window.hours();
        if hours.is_zero() {
            Decimal::ZERO
        } else {
            self.total_cost / hours
        }
    }

    /// `(shortest, longest)` presence, or `None` when everybody stayed the
    /// same time.
    pub fn presence_extremes(&self) -> Option<(TimeDelta, TimeDelta)> {
        let shortest = self.shares.iter().map(|share| share.presence).min()?;
        let longest = self.shares.iter().map(|share| share.presence).max()?;
        (shortest != longest).then_some((shortest, longest))
    }
}

pub(crate) fn name_key(name: &str) -> String {
    name.trim().to_lowercase()
}

fn serialize_minutes<S: Serializer>(value: &TimeDelta, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_i64(value.num_minutes())
}
