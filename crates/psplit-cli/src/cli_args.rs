use clap::{ArgAction, Args, Parser, Subcommand, ValueHint};
use psplit_core::{AllocationOverrides, CostModel, PaymentChannel, RoundingMode};
use rust_decimal::Decimal;

/// Split a shared court booking among players who come and go.
#[derive(Parser, Debug, Clone)]
#[command(name = "psplit", version, about, long_about = None)]
pub struct Cli {
    /// Read configuration from this file instead of the default location.
    #[arg(
        long = "config",
        id = "config_path",
        global = true,
        value_name = "PATH",
        value_hint = ValueHint::FilePath
    )]
    pub config: Option<String>,

    /// Also write JSON logs to the psplit log directory.
    #[arg(long = "log-file", global = true, action = ArgAction::SetTrue)]
    pub log_file: bool,

    /// Increase diagnostic output (-v info, -vv debug).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(flatten)]
    pub split: SplitArgs,

    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Cli {
    /// Log level used when neither `PSPLIT_LOG` nor `RUST_LOG` is set.
    pub fn default_log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        }
    }
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Inspect or create the configuration file.
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Manage saved court bookings.
    #[command(subcommand)]
    Preset(PresetCommand),
}

#[derive(Debug, Clone, Subcommand)]
pub enum ConfigCommand {
    /// Print the effective configuration as TOML.
    Show,
    /// Print the configuration file path.
    Path,
    /// Write a default configuration file.
    Init {
        /// Overwrite an existing file.
        #[arg(long, action = ArgAction::SetTrue)]
        force: bool,
    },
}

#[derive(Debug, Clone, Subcommand)]
pub enum PresetCommand {
    /// List saved presets.
    #[command(alias = "ls")]
    List,
    /// Save a new preset.
    #[command(alias = "create")]
    Add(PresetAddArgs),
    /// Delete a preset by name.
    #[command(alias = "delete")]
    Remove(PresetRemoveArgs),
}

#[derive(Debug, Clone, Args)]
pub struct PresetAddArgs {
    #[arg(long)]
    pub name: String,
    #[arg(long)]
    pub start: String,
    #[arg(long)]
    pub end: String,
    #[arg(long)]
    pub total: Decimal,
}

#[derive(Debug, Clone, Args)]
pub struct PresetRemoveArgs {
    #[arg(long)]
    pub name: String,
}

/// Arguments for the default split flow.
#[derive(Debug, Clone, Args, Default)]
pub struct SplitArgs {
    /// Court start time (18, 18:15, 18.25 or 18,25).
    #[arg(long)]
    pub start: Option<String>,

    /// Court end time.
    #[arg(long)]
    pub end: Option<String>,

    /// Total cost of the booking.
    #[arg(long)]
    pub total: Option<Decimal>,

    /// A player, e.g. `Ana`, `Beto=19-20` or `Carla=18-19.5@digital`. Repeatable.
    #[arg(short = 'p', long = "player", value_name = "NAME[=ARR-DEP][@CHANNEL]")]
    pub players: Vec<String>,

    /// Load the booking and players from a TOML session file.
    #[arg(short, long, value_hint = ValueHint::FilePath)]
    pub session: Option<String>,

    /// Take start, end and total from a saved preset.
    #[arg(long, value_name = "NAME")]
    pub preset: Option<String>,

    /// segment-split or presence-weighted.
    #[arg(long = "cost-model", value_name = "MODEL")]
    pub cost_model: Option<CostModel>,

    /// forced-residual or largest-remainder.
    #[arg(long, value_name = "POLICY")]
    pub rounding: Option<RoundingMode>,

    /// Decimal places of the currency when no payment channels are used.
    #[arg(long = "currency-decimals", value_name = "N")]
    pub currency_decimals: Option<u32>,

    /// Cash shares are floored to a multiple of this amount.
    #[arg(long = "cash-multiple", value_name = "AMOUNT")]
    pub cash_multiple: Option<u32>,

    /// Decimal places kept on digital shares.
    #[arg(long = "digital-decimals", value_name = "N")]
    pub digital_decimals: Option<u32>,

    /// Channel for players who do not name one.
    #[arg(long = "default-channel", value_name = "CHANNEL")]
    pub default_channel: Option<PaymentChannel>,

    /// Print the allocation as JSON instead of a table.
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,
}

impl SplitArgs {
    /// Returns true when no split flags were provided.
    pub fn is_empty(&self) -> bool {
        self.start.is_none()
            && self.end.is_none()
            && self.total.is_none()
            && self.players.is_empty()
            && self.session.is_none()
            && self.preset.is_none()
            && self.to_overrides().is_empty()
            && !self.json
    }

    pub fn to_overrides(&self) -> AllocationOverrides {
        AllocationOverrides {
            cost_model: self.cost_model,
            rounding: self.rounding,
            currency_decimals: self.currency_decimals,
            cash_multiple: self.cash_multiple,
            digital_decimals: self.digital_decimals,
            default_channel: self.default_channel,
        }
    }
}
