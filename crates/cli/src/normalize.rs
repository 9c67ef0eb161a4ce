//! `acctbook normalize`: config-driven account book normalization.

use std::path::{Path, PathBuf};

use acctbook_normalize::engine::validate_table;
use acctbook_normalize::{load_csv_table, normalize, write_csv_table, AssignmentTable, NormalizeConfig};
use clap::Subcommand;

use crate::exit_codes::{EXIT_NORMALIZE_INVALID, EXIT_NORMALIZE_UNASSIGNED, EXIT_NORMALIZE_WRITE};
use crate::CliError;

#[derive(Subcommand)]
pub enum NormalizeCommands {
    /// Normalize an account book from a TOML config file
    #[command(after_help = "\
Examples:
  acctbook normalize run book.normalize.toml
  acctbook normalize run book.normalize.toml --output normalized.csv
  acctbook normalize run book.normalize.toml --json > report.json
  acctbook normalize run book.normalize.toml --input q3.csv --max-accounts 60")]
    Run {
        /// Path to the .normalize.toml config file
        config: PathBuf,

        /// Input CSV (overrides `input` in the config)
        #[arg(long)]
        input: Option<PathBuf>,

        /// Write the normalized CSV here (overrides `output.csv`)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Write the JSON report here (overrides `output.json`)
        #[arg(long)]
        report: Option<PathBuf>,

        /// Print the JSON report to stdout instead of the CSV
        #[arg(long)]
        json: bool,

        /// Per-CSM ceiling (overrides `max_accounts_per_csm`)
        #[arg(long, value_name = "N", allow_negative_numbers = true)]
        max_accounts: Option<i64>,
    },

    /// Validate a config (and its input table, if one is set) without running
    #[command(after_help = "\
Examples:
  acctbook normalize validate book.normalize.toml")]
    Validate {
        /// Path to the .normalize.toml config file
        config: PathBuf,
    },
}

pub fn cmd_normalize(cmd: NormalizeCommands) -> Result<(), CliError> {
    match cmd {
        NormalizeCommands::Run { config, input, output, report, json, max_accounts } => {
            cmd_normalize_run(config, input, output, report, json, max_accounts)
        }
        NormalizeCommands::Validate { config } => cmd_normalize_validate(config),
    }
}

fn normalize_err(code: u8, msg: impl Into<String>) -> CliError {
    CliError { code, message: msg.into(), hint: None }
}

fn read_config(config_path: &Path) -> Result<NormalizeConfig, CliError> {
    let config_str = std::fs::read_to_string(config_path)
        .map_err(|e| CliError::io(format!("cannot read config {}: {e}", config_path.display())))?;
    NormalizeConfig::from_toml(&config_str)
        .map_err(|e| normalize_err(EXIT_NORMALIZE_INVALID, e.to_string()))
}

/// Resolve a config-relative path against the config file's directory.
fn config_relative(config_path: &Path, file: &str) -> PathBuf {
    let base_dir = config_path.parent().unwrap_or_else(|| Path::new("."));
    base_dir.join(file)
}

fn read_table(csv_path: &Path, config: &NormalizeConfig) -> Result<AssignmentTable, CliError> {
    let csv_data = std::fs::read_to_string(csv_path)
        .map_err(|e| CliError::io(format!("cannot read {}: {e}", csv_path.display())))?;
    load_csv_table(&csv_data, &config.columns, &config.null_markers).map_err(|e| {
        normalize_err(EXIT_NORMALIZE_INVALID, format!("{}: {e}", csv_path.display()))
    })
}

fn write_file(path: &Path, contents: &str) -> Result<(), CliError> {
    std::fs::write(path, contents).map_err(|e| {
        normalize_err(EXIT_NORMALIZE_WRITE, format!("cannot write {}: {e}", path.display()))
    })?;
    eprintln!("wrote {}", path.display());
    Ok(())
}

fn cmd_normalize_run(
    config_path: PathBuf,
    input: Option<PathBuf>,
    output: Option<PathBuf>,
    report: Option<PathBuf>,
    json_output: bool,
    max_accounts: Option<i64>,
) -> Result<(), CliError> {
    let mut config = read_config(&config_path)?;

    if let Some(n) = max_accounts {
        config.max_accounts_per_csm = n;
        config
            .validate()
            .map_err(|e| normalize_err(EXIT_NORMALIZE_INVALID, e.to_string()))?;
    }

    let input_path = match (input, config.input.as_deref()) {
        (Some(path), _) => path,
        (None, Some(file)) => config_relative(&config_path, file),
        (None, None) => {
            return Err(CliError::args("no input table")
                .with_hint("set `input` in the config or pass --input <csv>"));
        }
    };

    log::debug!(
        "config '{}': input {}, ceiling {}",
        config.name,
        input_path.display(),
        config.ceiling()
    );
    let table = read_table(&input_path, &config)?;

    let result = normalize(&table, &config)
        .map_err(|e| normalize_err(EXIT_NORMALIZE_INVALID, format!("{}: {e}", input_path.display())))?;

    let csv_out = write_csv_table(&result.table)
        .map_err(|e| normalize_err(EXIT_NORMALIZE_WRITE, e.to_string()))?;
    let json_str = serde_json::to_string_pretty(&result)
        .map_err(|e| normalize_err(EXIT_NORMALIZE_WRITE, format!("JSON serialization error: {e}")))?;

    let csv_path = output.or_else(|| {
        config.output.csv.as_deref().map(|f| config_relative(&config_path, f))
    });
    let report_path = report.or_else(|| {
        config.output.json.as_deref().map(|f| config_relative(&config_path, f))
    });

    if let Some(ref path) = csv_path {
        write_file(path, &csv_out)?;
    }
    if let Some(ref path) = report_path {
        write_file(path, &json_str)?;
    }

    if json_output {
        println!("{json_str}");
    } else if csv_path.is_none() {
        print!("{csv_out}");
    }

    // Human summary to stderr
    let s = &result.summary;
    eprintln!(
        "normalized {} accounts across {} CSMs (ceiling {}): {} moved, {} reassigned, {} placed, {} unassigned",
        s.total_accounts,
        s.owners,
        result.meta.max_accounts_per_csm,
        s.moved,
        s.reassigned,
        s.placed,
        s.unassigned,
    );
    eprintln!(
        "families consolidated: {} -> {} of {}",
        s.families_consolidated_before, s.families_consolidated_after, s.families,
    );

    if s.unassigned > 0 {
        return Err(normalize_err(
            EXIT_NORMALIZE_UNASSIGNED,
            format!(
                "{} account(s) left without a CSM: {}",
                s.unassigned,
                result.unassigned_ids().join(", ")
            ),
        )
        .with_hint("raise max_accounts_per_csm or add CSMs to `roster`"));
    }

    Ok(())
}

fn cmd_normalize_validate(config_path: PathBuf) -> Result<(), CliError> {
    let config = read_config(&config_path)?;

    let mut rows = None;
    if let Some(ref file) = config.input {
        let input_path = config_relative(&config_path, file);
        let table = read_table(&input_path, &config)?;
        validate_table(&table).map_err(|e| {
            normalize_err(EXIT_NORMALIZE_INVALID, format!("{}: {e}", input_path.display()))
        })?;
        rows = Some(table.len());
    }

    eprintln!(
        "config '{}' is valid (ceiling {}, owner column '{}')",
        config.name,
        config.ceiling(),
        config.columns.owner
    );
    if let Some(n) = rows {
        eprintln!("input table: {n} accounts");
    }
    Ok(())
}
