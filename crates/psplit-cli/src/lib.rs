//! Command-line front end for `psplit_core`.

pub mod cli_args;
pub mod player_spec;
pub mod report;

use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow, bail};
use cli_args::{Cli, Command, ConfigCommand, PresetCommand, SplitArgs};
use player_spec::parse_player_spec;
use psplit_core::{
    ConfigSource, CourtPreset, FileConfig, LoggingDestination, Session,
    apply_allocation_overrides, config_path, expand_path, init_logging, load_config_from,
    load_session, parse_time, roll_past_midnight, save_config_to,
};
use tracing::{debug, info};

/// Run a parsed command line. Warnings go to stderr, results to stdout.
pub fn run(cli: Cli) -> anyhow::Result<()> {
    let destination = if cli.log_file {
        LoggingDestination::FileAndStderr
    } else {
        LoggingDestination::StderrOnly
    };
    if let Err(err) = init_logging(destination, cli.default_log_level()) {
        eprintln!("Warning: logging disabled: {err}");
    }

    let path = cli
        .config
        .as_deref()
        .map(expand_path)
        .unwrap_or_else(config_path);

    match cli.command {
        Some(Command::Config(command)) => {
            if !cli.split.is_empty() {
                bail!("Split flags cannot be combined with config commands.");
            }
            handle_config_command(command, path)
        }
        Some(Command::Preset(command)) => {
            if !cli.split.is_empty() {
                bail!("Split flags cannot be combined with preset commands.");
            }
            handle_preset_command(command, path)
        }
        None => run_split(&cli.split, path),
    }
}

fn load_with_warnings(path: &Path) -> FileConfig {
    let load = load_config_from(path);
    for warning in &load.warnings {
        eprintln!("Warning: {warning}");
    }
    debug!(path = %path.display(), source = ?load.source, "Loaded configuration");
    load.config
}

fn run_split(args: &SplitArgs, path: PathBuf) -> anyhow::Result<()> {
    let mut config = load_with_warnings(&path);

    let mut warnings = Vec::new();
    apply_allocation_overrides(&mut config.allocation, &args.to_overrides(), &mut warnings);
    for warning in warnings {
        eprintln!("Warning: {warning}");
    }

    let session = build_session(args, &config)?;
    let resolved = session.resolve(&config.roster, config.allocation.default_channel)?;
    for notice in &resolved.notices {
        eprintln!("Warning: {notice}");
    }

    let allocation = config.allocation.allocator().split(
        &resolved.window,
        resolved.total,
        &resolved.participants,
        resolved.channels.as_ref(),
    )?;
    info!(
        players = allocation.shares.len(),
        total = %allocation.total_cost,
        "Split computed"
    );

    if args.json {
        let json = serde_json::to_string_pretty(&allocation)
            .context("failed to serialize allocation")?;
        println!("{json}");
        return Ok(());
    }

    let decimals = if allocation.has_channels() {
        config
            .allocation
            .digital_decimals
            .max(config.allocation.currency_decimals)
    } else {
        config.allocation.currency_decimals
    };
    print!(
        "{}",
        report::render_table(&allocation, decimals, &config.display)
    );
    println!();
    print!(
        "{}",
        report::render_summary(&allocation, decimals, &config.display)
    );
    for warning in report::allocation_warnings(&allocation, decimals, &config.display) {
        eprintln!("Warning: {warning}");
    }
    Ok(())
}

/// Assemble a session from a session file, a preset and explicit flags, in
/// that order of increasing precedence. `--player` entries are appended.
pub fn build_session(args: &SplitArgs, config: &FileConfig) -> anyhow::Result<Session> {
    let mut start = None;
    let mut end = None;
    let mut total = None;
    let mut players = Vec::new();

    if let Some(raw) = args.session.as_deref() {
        let session = load_session(&expand_path(raw))?;
        start = Some(session.start);
        end = Some(session.end);
        total = Some(session.total);
        players = session.players;
    }

    if let Some(name) = args.preset.as_deref() {
        let preset = config.find_preset(name).ok_or_else(|| {
            let known: Vec<&str> = config.presets.iter().map(|p| p.name.as_str()).collect();
            anyhow!(
                "Unknown preset '{name}'. Available presets: {}",
                if known.is_empty() {
                    "none".to_string()
                } else {
                    known.join(", ")
                }
            )
        })?;
        start = Some(preset.start.clone());
        end = Some(preset.end.clone());
        total = Some(preset.total);
    }

    if let Some(value) = &args.start {
        start = Some(value.clone());
    }
    if let Some(value) = &args.end {
        end = Some(value.clone());
    }
    if let Some(value) = args.total {
        total = Some(value);
    }

    for raw in &args.players {
        players.push(parse_player_spec(raw).map_err(|err| anyhow!(err))?);
    }

    Ok(Session {
        start: start.context("missing --start (or use --preset/--session)")?,
        end: end.context("missing --end (or use --preset/--session)")?,
        total: total.context("missing --total (or use --preset/--session)")?,
        players,
    })
}

fn handle_config_command(command: ConfigCommand, path: PathBuf) -> anyhow::Result<()> {
    match command {
        ConfigCommand::Path => {
            println!("{}", path.display());
            Ok(())
        }
        ConfigCommand::Show => {
            let load = load_config_from(&path);
            for warning in &load.warnings {
                eprintln!("Warning: {warning}");
            }
            if load.source == ConfigSource::Default {
                eprintln!("No config file at {}; showing defaults.", path.display());
            }
            print!("{}", toml::to_string_pretty(&load.config)?);
            Ok(())
        }
        ConfigCommand::Init { force } => {
            if path.exists() && !force {
                bail!(
                    "{} already exists. Use --force to overwrite it.",
                    path.display()
                );
            }
            save_config_to(&FileConfig::default(), &path)?;
            println!("Wrote default configuration to {}", path.display());
            Ok(())
        }
    }
}

fn handle_preset_command(command: PresetCommand, path: PathBuf) -> anyhow::Result<()> {
    let mut config = load_with_warnings(&path);

    match command {
        PresetCommand::List => {
            if config.presets.is_empty() {
                println!("No presets saved.");
            }
            for preset in &config.presets {
                println!(
                    "{}: {}-{} for {}",
                    preset.name, preset.start, preset.end, preset.total
                );
            }
            Ok(())
        }
        PresetCommand::Add(args) => {
            if config.find_preset(&args.name).is_some() {
                bail!("Preset '{}' already exists.", args.name);
            }
            let start = parse_time(&args.start).context("invalid --start")?;
            let end = parse_time(&args.end).context("invalid --end")?;
            if roll_past_midnight(start, end) <= start {
                bail!("Preset must end after it starts.");
            }
            if args.total.is_sign_negative() {
                bail!("Preset total must not be negative.");
            }
            config.presets.push(CourtPreset {
                name: args.name.trim().to_string(),
                start: args.start.trim().to_string(),
                end: args.end.trim().to_string(),
                total: args.total,
            });
            config.presets.sort_by(|a, b| a.name.cmp(&b.name));
            save_config_to(&config, &path)?;
            println!("Created preset '{}'", args.name.trim());
            Ok(())
        }
        PresetCommand::Remove(args) => {
            let wanted = args.name.trim().to_lowercase();
            let position = config
                .presets
                .iter()
                .position(|preset| preset.name.trim().to_lowercase() == wanted)
                .ok_or_else(|| anyhow!("Preset '{}' not found.", args.name))?;
            let removed = config.presets.remove(position);
            save_config_to(&config, &path)?;
            println!("Deleted preset '{}'", removed.name);
            Ok(())
        }
    }
}
