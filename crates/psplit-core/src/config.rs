use crate::allocate::{Allocator, CostModel};
use crate::channel::ChannelRules;
use crate::model::PaymentChannel;
use crate::rounding::RoundingMode;
use crate::time::{parse_time, roll_past_midnight};
use dirs::config_dir;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_DIR_NAME: &str = "psplit";
const CONFIG_FILE_NAME: &str = "config.toml";
const CURRENT_SCHEMA_VERSION: u32 = 1;
pub const MAX_DECIMALS: u32 = 4;
pub const DEFAULT_CASH_MULTIPLE: u32 = 100;
pub const WEEKNIGHT_PRESET_NAME: &str = "Weeknight 18-19:30";

/// Result returned by [`load_config_from`], capturing the source and any non-fatal issues.
#[derive(Debug, Clone)]
pub struct ConfigLoadResult {
    pub config: FileConfig,
    pub warnings: Vec<String>,
    pub source: ConfigSource,
}

/// Indicates where the configuration was loaded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSource {
    /// No configuration file was found or usable; defaults were synthesized.
    Default,
    /// Configuration was read from `config.toml`.
    File,
}

/// Errors that can occur when persisting configuration.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Ser(toml::ser::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(err) => write!(f, "IO error: {err}"),
            ConfigError::Ser(err) => write!(f, "TOML serialization error: {err}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<toml::ser::Error> for ConfigError {
    fn from(value: toml::ser::Error) -> Self {
        Self::Ser(value)
    }
}

/// Disk-backed configuration schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default = "FileConfig::schema_version")]
    pub schema_version: u32,
    #[serde(default)]
    pub allocation: AllocationPreferences,
    #[serde(default)]
    pub roster: RosterPreferences,
    #[serde(default)]
    pub display: DisplayPreferences,
    #[serde(default = "default_presets")]
    pub presets: Vec<CourtPreset>,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            schema_version: CURRENT_SCHEMA_VERSION,
            allocation: AllocationPreferences::default(),
            roster: RosterPreferences::default(),
            display: DisplayPreferences::default(),
            presets: default_presets(),
        }
    }
}

impl FileConfig {
    const fn schema_version() -> u32 {
        CURRENT_SCHEMA_VERSION
    }

    /// Look up a preset by name, ignoring case.
    pub fn find_preset(&self, name: &str) -> Option<&CourtPreset> {
        let wanted = name.trim().to_lowercase();
        self.presets
            .iter()
            .find(|preset| preset.name.trim().to_lowercase() == wanted)
    }
}

/// How the bill is prorated and rounded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationPreferences {
    #[serde(default)]
    pub cost_model: CostModel,
    #[serde(default)]
    pub rounding: RoundingMode,
    #[serde(default)]
    pub currency_decimals: u32,
    #[serde(default = "AllocationPreferences::default_cash_multiple")]
    pub cash_multiple: u32,
    #[serde(default = "AllocationPreferences::default_digital_decimals")]
    pub digital_decimals: u32,
    #[serde(default)]
    pub default_channel: PaymentChannel,
}

impl Default for AllocationPreferences {
    fn default() -> Self {
        Self {
            cost_model: CostModel::default(),
            rounding: RoundingMode::default(),
            currency_decimals: 0,
            cash_multiple: DEFAULT_CASH_MULTIPLE,
            digital_decimals: Self::default_digital_decimals(),
            default_channel: PaymentChannel::Cash,
        }
    }
}

impl AllocationPreferences {
    const fn default_cash_multiple() -> u32 {
        DEFAULT_CASH_MULTIPLE
    }

    const fn default_digital_decimals() -> u32 {
        2
    }

    /// Build the proration engine these preferences describe.
    pub fn allocator(&self) -> Allocator {
        Allocator {
            cost_model: self.cost_model,
            rounding: self.rounding,
            currency_decimals: self.currency_decimals,
            channel_rules: ChannelRules {
                cash_multiple: Decimal::from(self.cash_multiple),
                digital_decimals: self.digital_decimals,
            },
        }
    }
}

/// Limits applied when validating the list of players.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterPreferences {
    #[serde(default = "RosterPreferences::default_min_participants")]
    pub min_participants: usize,
    #[serde(default = "RosterPreferences::default_max_participants")]
    pub max_participants: usize,
}

impl Default for RosterPreferences {
    fn default() -> Self {
        Self {
            min_participants: Self::default_min_participants(),
            max_participants: Self::default_max_participants(),
        }
    }
}

impl RosterPreferences {
    const fn default_min_participants() -> usize {
        1
    }

    const fn default_max_participants() -> usize {
        12
    }
}

/// Currency formatting used by the table renderer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayPreferences {
    #[serde(default = "DisplayPreferences::default_currency_symbol")]
    pub currency_symbol: String,
    #[serde(default = "DisplayPreferences::default_thousands_separator")]
    pub thousands_separator: String,
    #[serde(default = "DisplayPreferences::default_decimal_separator")]
    pub decimal_separator: String,
}

impl Default for DisplayPreferences {
    fn default() -> Self {
        Self {
            currency_symbol: Self::default_currency_symbol(),
            thousands_separator: Self::default_thousands_separator(),
            decimal_separator: Self::default_decimal_separator(),
        }
    }
}

impl DisplayPreferences {
    fn default_currency_symbol() -> String {
        "$".to_string()
    }

    fn default_thousands_separator() -> String {
        ".".to_string()
    }

    fn default_decimal_separator() -> String {
        ",".to_string()
    }
}

/// A recurring court booking: window bounds and the usual fee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourtPreset {
    pub name: String,
    pub start: String,
    pub end: String,
    pub total: Decimal,
}

pub(crate) fn default_presets() -> Vec<CourtPreset> {
    vec![CourtPreset {
        name: WEEKNIGHT_PRESET_NAME.to_string(),
        start: "18".to_string(),
        end: "19:30".to_string(),
        total: Decimal::from(10_000),
    }]
}

/// Represents overrides sourced from runtime inputs (CLI flags).
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AllocationOverrides {
    pub cost_model: Option<CostModel>,
    pub rounding: Option<RoundingMode>,
    pub currency_decimals: Option<u32>,
    pub cash_multiple: Option<u32>,
    pub digital_decimals: Option<u32>,
    pub default_channel: Option<PaymentChannel>,
}

impl AllocationOverrides {
    pub fn is_empty(&self) -> bool {
        self.cost_model.is_none()
            && self.rounding.is_none()
            && self.currency_decimals.is_none()
            && self.cash_multiple.is_none()
            && self.digital_decimals.is_none()
            && self.default_channel.is_none()
    }
}

/// Path to the configuration directory.
pub fn config_directory() -> PathBuf {
    config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_DIR_NAME)
}

/// Path to `config.toml`.
pub fn config_path() -> PathBuf {
    config_directory().join(CONFIG_FILE_NAME)
}

/// Expand `~` and environment variables in a user-supplied path.
pub fn expand_path(raw: &str) -> PathBuf {
    let trimmed = raw.trim();
    match shellexpand::full(trimmed) {
        Ok(expanded) => PathBuf::from(expanded.as_ref()),
        Err(_) => PathBuf::from(shellexpand::tilde(trimmed).as_ref()),
    }
}

/// Load the configuration from `path`. Never fails: problems become warnings
/// and the affected values fall back to defaults.
pub fn load_config_from(path: &Path) -> ConfigLoadResult {
    let mut warnings = Vec::new();

    if path.exists() {
        match fs::read_to_string(path) {
            Ok(raw) => match toml::from_str::<FileConfig>(&raw) {
                Ok(cfg) => {
                    let (cfg, mut sanitize_warnings) = sanitize_config(cfg);
                    warnings.append(&mut sanitize_warnings);
                    return ConfigLoadResult {
                        config: cfg,
                        warnings,
                        source: ConfigSource::File,
                    };
                }
                Err(err) => {
                    warnings.push(format!(
                        "Failed to parse {} as TOML: {}. Falling back to defaults.",
                        path.display(),
                        err
                    ));
                }
            },
            Err(err) => {
                warnings.push(format!(
                    "Failed to read {}: {}. Falling back to defaults.",
                    path.display(),
                    err
                ));
            }
        }
    }

    ConfigLoadResult {
        config: FileConfig::default(),
        warnings,
        source: ConfigSource::Default,
    }
}

pub fn save_config_to(config: &FileConfig, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let serialized = toml::to_string_pretty(config)?;
    fs::write(path, serialized)?;
    Ok(())
}

fn sanitize_config(mut config: FileConfig) -> (FileConfig, Vec<String>) {
    let mut warnings = Vec::new();

    if config.schema_version != CURRENT_SCHEMA_VERSION {
        warnings.push(format!(
            "Unknown config schema version {}. Resetting to {}.",
            config.schema_version, CURRENT_SCHEMA_VERSION
        ));
        return (FileConfig::default(), warnings);
    }

    let allocation = &mut config.allocation;
    if allocation.cash_multiple == 0 {
        warnings.push(format!(
            "allocation.cash_multiple must be positive. Resetting to {DEFAULT_CASH_MULTIPLE}."
        ));
        allocation.cash_multiple = DEFAULT_CASH_MULTIPLE;
    }
    if allocation.currency_decimals > MAX_DECIMALS {
        warnings.push(format!(
            "allocation.currency_decimals {} exceeds {MAX_DECIMALS}. Capping.",
            allocation.currency_decimals
        ));
        allocation.currency_decimals = MAX_DECIMALS;
    }
    if allocation.digital_decimals > MAX_DECIMALS {
        warnings.push(format!(
            "allocation.digital_decimals {} exceeds {MAX_DECIMALS}. Capping.",
            allocation.digital_decimals
        ));
        allocation.digital_decimals = MAX_DECIMALS;
    }

    let roster = &mut config.roster;
    if roster.max_participants == 0 {
        warnings.push(format!(
            "roster.max_participants must be positive. Resetting to {}.",
            RosterPreferences::default_max_participants()
        ));
        roster.max_participants = RosterPreferences::default_max_participants();
    }
    if roster.min_participants > roster.max_participants {
        warnings.push(format!(
            "roster.min_participants ({}) exceeds roster.max_participants ({}). Swapping.",
            roster.min_participants, roster.max_participants
        ));
        std::mem::swap(&mut roster.min_participants, &mut roster.max_participants);
    }

    let mut preset_names = HashSet::new();
    let mut duplicates = Vec::new();
    config.presets.retain(|preset| {
        if preset_names.insert(preset.name.trim().to_lowercase()) {
            true
        } else {
            duplicates.push(preset.name.clone());
            false
        }
    });
    if !duplicates.is_empty() {
        warnings.push(format!(
            "Removed duplicate preset names: {}",
            duplicates.join(", ")
        ));
    }

    config.presets.retain(|preset| match validate_preset(preset) {
        Ok(()) => true,
        Err(reason) => {
            warnings.push(format!(
                "Preset '{}' {}. This preset will be removed.",
                preset.name, reason
            ));
            false
        }
    });

    (config, warnings)
}

fn validate_preset(preset: &CourtPreset) -> Result<(), String> {
    if preset.name.trim().is_empty() {
        return Err("has an empty name".to_string());
    }
    let start = parse_time(&preset.start).map_err(|err| format!("has an invalid start: {err}"))?;
    let end = parse_time(&preset.end).map_err(|err| format!("has an invalid end: {err}"))?;
    if roll_past_midnight(start, end) <= start {
        return Err(format!(
            "ends ({}) before it starts ({})",
            preset.end, preset.start
        ));
    }
    if preset.total < Decimal::ZERO {
        return Err(format!("has a negative total ({})", preset.total));
    }
    Ok(())
}

/// Merge runtime overrides into stored allocation preferences.
pub fn apply_allocation_overrides(
    preferences: &mut AllocationPreferences,
    overrides: &AllocationOverrides,
    warnings: &mut Vec<String>,
) {
    if let Some(value) = overrides.cost_model {
        preferences.cost_model = value;
    }
    if let Some(value) = overrides.rounding {
        preferences.rounding = value;
    }
    if let Some(value) = overrides.currency_decimals {
        if value > MAX_DECIMALS {
            warnings.push(format!(
                "Currency decimals must be at most {MAX_DECIMALS}. Ignoring override."
            ));
        } else {
            preferences.currency_decimals = value;
        }
    }
    if let Some(value) = overrides.cash_multiple {
        if value == 0 {
            warnings.push("Cash multiple must be positive. Ignoring override.".to_string());
        } else {
            preferences.cash_multiple = value;
        }
    }
    if let Some(value) = overrides.digital_decimals {
        if value > MAX_DECIMALS {
            warnings.push(format!(
                "Digital decimals must be at most {MAX_DECIMALS}. Ignoring override."
            ));
        } else {
            preferences.digital_decimals = value;
        }
    }
    if let Some(value) = overrides.default_channel {
        preferences.default_channel = value;
    }
}
