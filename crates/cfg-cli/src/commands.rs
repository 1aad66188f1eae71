//! `cfgctl` command definitions and handlers

use crate::store::FileGateway;
use anyhow::{bail, Context};
use cfg_console::{ConfigurationConsole, ConsoleConfig, PersistenceGateway};
use cfg_rules::{humanize_millis, EntityOptions};
use cfg_snapshot::wire::decode_fields;
use cfg_snapshot::{ConfigDomain, FieldValue, SnapshotVersion};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use serde_json::{Map, Value as JsonValue};
use std::fmt::Write as _;
use std::path::PathBuf;
use std::sync::Arc;

/// Default store file
pub const DEFAULT_STORE: &str = "cfgctl.json";

/// Command-line definition
#[must_use]
pub fn build_cli() -> Command {
    let domain = || {
        Arg::new("domain")
            .required(true)
            .value_parser(value_parser!(ConfigDomain))
            .help("Configuration domain: organisation, rbac or retention")
    };

    Command::new("cfgctl")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Inspect and edit configuration domains")
        .arg_required_else_help(true)
        .arg(
            Arg::new("store")
                .long("store")
                .global(true)
                .default_value(DEFAULT_STORE)
                .value_parser(value_parser!(PathBuf))
                .help("JSON file holding every domain"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Console configuration (TOML)"),
        )
        .subcommand(
            Command::new("show")
                .about("Show a domain's committed configuration")
                .arg(domain())
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Output the raw wire payload"),
                ),
        )
        .subcommand(
            Command::new("set")
                .about("Edit one field, validate and save")
                .arg(domain())
                .arg(Arg::new("key").required(true).help("Field key, e.g. readLogRetention"))
                .arg(
                    Arg::new("value")
                        .required(true)
                        .help("JSON value; bare words are taken as identifiers"),
                ),
        )
        .subcommand(
            Command::new("humanize")
                .about("Render a retention duration")
                .arg(
                    Arg::new("millis")
                        .required(true)
                        .allow_negative_numbers(true)
                        .value_parser(value_parser!(i64)),
                ),
        )
}

/// Load the console configuration named on the command line
///
/// # Errors
/// Returns error if the file cannot be read or parsed
pub fn load_config(matches: &ArgMatches) -> anyhow::Result<ConsoleConfig> {
    match matches.get_one::<PathBuf>("config") {
        Some(path) => ConsoleConfig::load(path)
            .with_context(|| format!("loading {}", path.display())),
        None => Ok(ConsoleConfig::default()),
    }
}

/// Run the selected subcommand, returning what to print
///
/// # Errors
/// Returns error if the command fails
pub async fn run(matches: &ArgMatches, config: ConsoleConfig) -> anyhow::Result<String> {
    let store = matches
        .get_one::<PathBuf>("store")
        .cloned()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_STORE));
    let gateway: Arc<dyn PersistenceGateway> = Arc::new(FileGateway::new(store));

    match matches.subcommand() {
        Some(("show", args)) => {
            let domain = domain_arg(args)?;
            let console = ConfigurationConsole::new(domain, gateway).with_config(config);
            show(&console, args.get_flag("json")).await
        }
        Some(("set", args)) => {
            let domain = domain_arg(args)?;
            let key = args.get_one::<String>("key").context("missing key")?;
            let raw = args.get_one::<String>("value").context("missing value")?;
            let value = parse_value(domain, key, raw)?;
            let console = ConfigurationConsole::new(domain, gateway).with_config(config);
            set(&console, key, value).await
        }
        Some(("humanize", args)) => {
            let millis = *args.get_one::<i64>("millis").context("missing millis")?;
            humanize_millis(millis)
                .with_context(|| format!("{millis} is negative; durations must be at least 0"))
        }
        _ => bail!("no subcommand given"),
    }
}

fn domain_arg(args: &ArgMatches) -> anyhow::Result<ConfigDomain> {
    args.get_one::<ConfigDomain>("domain")
        .copied()
        .context("missing domain")
}

async fn show(console: &ConfigurationConsole, json: bool) -> anyhow::Result<String> {
    let state = console.load().await?;
    let committed = state.committed();

    if json {
        let payload = cfg_snapshot::wire::SnapshotPayload::from_snapshot(committed);
        return Ok(serde_json::to_string_pretty(&payload)?);
    }

    let mut out = String::new();
    writeln!(
        out,
        "{} (version {})",
        console.domain(),
        version_text(committed.version())
    )?;
    for field in console.display(&EntityOptions::new())? {
        writeln!(out, "  {:<24} {}", field.key, field.text)?;
    }
    if let Some(stats) = console.statistics().filter(|s| !s.counters.is_empty()) {
        writeln!(out, "statistics")?;
        for (name, value) in &stats.counters {
            writeln!(out, "  {name:<24} {value}")?;
        }
    }
    Ok(out.trim_end().to_string())
}

async fn set(
    console: &ConfigurationConsole,
    key: &str,
    value: FieldValue,
) -> anyhow::Result<String> {
    console.load().await?;
    let edited = console.set_field(key, value)?;
    if !edited.is_dirty() {
        return Ok(format!("{key} unchanged"));
    }

    let changes = edited.changes();
    let saved = console.save().await?;
    let mut out = String::new();
    for change in changes.changes() {
        writeln!(out, "{change}")?;
    }
    write!(
        out,
        "saved {} (version {})",
        console.domain(),
        version_text(saved.committed().version())
    )?;
    Ok(out)
}

/// Parse a command-line value for a declared field
///
/// The text is read as JSON; anything that is not valid JSON is taken as a
/// plain string, so identifiers need no quoting.
///
/// # Errors
/// Returns error if the key is undeclared or the value does not fit its kind
pub fn parse_value(domain: ConfigDomain, key: &str, raw: &str) -> anyhow::Result<FieldValue> {
    let spec = domain
        .field(key)
        .with_context(|| format!("{domain} has no field named {key:?}"))?;
    let json = serde_json::from_str::<JsonValue>(raw)
        .unwrap_or_else(|_| JsonValue::String(raw.to_string()));

    let mut object = Map::new();
    object.insert(spec.key.to_string(), json);
    let mut fields = decode_fields(domain, &object)?;
    fields
        .remove(spec.key)
        .with_context(|| format!("no value decoded for {key}"))
}

fn version_text(version: Option<&SnapshotVersion>) -> String {
    version.map_or_else(|| "never saved".to_string(), ToString::to_string)
}
