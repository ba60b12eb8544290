//! Core library for splitting a shared court booking among players who come
//! and go at different times.

pub mod allocate;
pub mod channel;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;
pub mod partition;
pub mod rounding;
pub mod session;
pub mod time;

pub use allocate::{Allocator, CostModel, allocate, split};
pub use channel::{ChannelRules, ChannelSettlement, settle_channels};
pub use config::{
    AllocationOverrides, AllocationPreferences, ConfigError, ConfigLoadResult, ConfigSource,
    CourtPreset, DisplayPreferences, FileConfig, RosterPreferences, apply_allocation_overrides,
    config_directory, config_path, expand_path, load_config_from, save_config_to,
};
pub use error::SplitError;
pub use logging::{LoggingDestination, LoggingError, current_log_path, init_logging};
pub use model::{Allocation, ChannelMap, Participant, PaymentChannel, Segment, Share, Window};
pub use partition::partition;
pub use rounding::{
    ForcedResidualPolicy, LargestRemainderPolicy, Reconciled, RoundingMode, RoundingPolicy,
    round_half_even,
};
pub use session::{
    ClampNotice, PlayerEntry, ResolvedSession, RosterError, Session, load_session,
};
pub use time::{
    ClockTime, TimeParseError, format_duration, format_time, hours, parse_time,
    roll_past_midnight,
};
