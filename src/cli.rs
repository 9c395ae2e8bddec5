//! CLI definition and dispatch.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info};

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::backtest::{BacktestConfig, DEFAULT_INITIAL_CAPITAL, DEFAULT_RISK_FREE_RATE};
use crate::domain::config_validation::{parse_date, parse_number, parse_number_list, validate_config};
use crate::domain::data_validation::{validate_table, ValidationReport};
use crate::domain::error::SigtraderError;
use crate::domain::feature_table::{columns, FeatureTable};
use crate::domain::pipeline::{run_pipeline, PipelineConfig, PipelineOutput};
use crate::domain::rule_signal::{RuleSignalConfig, DEFAULT_OVERBOUGHT, DEFAULT_OVERSOLD};
use crate::domain::sweep::{
    rank_outcomes, run_sweep, threshold_grid, SweepOutcome, ThresholdVariant,
};
use crate::logging::init_tracing;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(name = "sigtrader", about = "Signal consensus and single-position backtester")]
pub struct Cli {
    /// Also append log events to this file
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the consensus backtest for one symbol
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        code: Option<String>,
        /// Write the augmented table here (overrides [output] path)
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        dry_run: bool,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Load a feature table and report integrity and quality findings
    Inspect {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        code: Option<String>,
    },
    /// Run the [sweep] threshold grid and rank the variants
    Sweep {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        code: Option<String>,
    },
    /// List symbols available in the data directory
    ListSymbols {
        #[arg(short, long)]
        config: PathBuf,
    },
}

/// Inclusive date window from `[data] start_date` / `end_date`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DateWindow {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

pub fn run(cli: Cli) -> ExitCode {
    // Dropping the guard at the end of `run` flushes the log file.
    let _log_guard = match init_tracing(cli.log_file.clone()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("warning: logging not initialized: {e}");
            None
        }
    };

    match dispatch(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            (&e).into()
        }
    }
}

/// Execute one subcommand.
pub fn dispatch(command: Command) -> Result<(), SigtraderError> {
    match command {
        Command::Backtest {
            config,
            code,
            output,
            dry_run,
        } => run_backtest(&config, code.as_deref(), output.as_deref(), dry_run),
        Command::Validate { config } => run_validate(&config),
        Command::Inspect { config, code } => run_inspect(&config, code.as_deref()),
        Command::Sweep { config, code } => run_sweep_command(&config, code.as_deref()),
        Command::ListSymbols { config } => run_list_symbols(&config),
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, SigtraderError> {
    info!("loading config from {}", path.display());
    FileConfigAdapter::from_file(path).map_err(|e| SigtraderError::ConfigParse {
        file: path.display().to_string(),
        reason: e.to_string(),
    })
}

fn load_validated_config(path: &Path) -> Result<FileConfigAdapter, SigtraderError> {
    let adapter = load_config(path)?;
    validate_config(&adapter)?;
    Ok(adapter)
}

pub fn build_backtest_config(config: &dyn ConfigPort) -> Result<BacktestConfig, SigtraderError> {
    Ok(BacktestConfig {
        initial_capital: parse_number(config, "backtest", "initial_capital")?
            .unwrap_or(DEFAULT_INITIAL_CAPITAL),
        risk_free_rate: parse_number(config, "backtest", "risk_free_rate")?
            .unwrap_or(DEFAULT_RISK_FREE_RATE),
    })
}

pub fn build_rule_config(config: &dyn ConfigPort) -> Result<RuleSignalConfig, SigtraderError> {
    let defaults = RuleSignalConfig::default();
    let column = |key: &str, default: String| {
        config
            .get_string("rules", key)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or(default)
    };

    Ok(RuleSignalConfig {
        momentum_column: column("momentum_column", defaults.momentum_column),
        trend_column: column("trend_column", defaults.trend_column),
        trend_signal_column: column("trend_signal_column", defaults.trend_signal_column),
        bullish_column: column("bullish_column", defaults.bullish_column),
        bearish_column: column("bearish_column", defaults.bearish_column),
        oversold: parse_number(config, "rules", "oversold")?.unwrap_or(DEFAULT_OVERSOLD),
        overbought: parse_number(config, "rules", "overbought")?.unwrap_or(DEFAULT_OVERBOUGHT),
    })
}

pub fn build_pipeline_config(config: &dyn ConfigPort) -> Result<PipelineConfig, SigtraderError> {
    let model_vote_column = config
        .get_string("columns", "model_vote")
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| columns::MODEL_SIGNAL.to_string());

    Ok(PipelineConfig {
        rules: build_rule_config(config)?,
        backtest: build_backtest_config(config)?,
        model_vote_column,
    })
}

pub fn build_date_window(config: &dyn ConfigPort) -> Result<DateWindow, SigtraderError> {
    Ok(DateWindow {
        start: parse_date(config, "data", "start_date")?,
        end: parse_date(config, "data", "end_date")?,
    })
}

pub fn resolve_code(
    code_override: Option<&str>,
    config: &dyn ConfigPort,
) -> Result<String, SigtraderError> {
    code_override
        .map(str::to_string)
        .or_else(|| config.get_string("data", "code"))
        .map(|c| c.trim().to_uppercase())
        .filter(|c| !c.is_empty())
        .ok_or_else(|| SigtraderError::ConfigMissing {
            section: "data".into(),
            key: "code".into(),
        })
}

fn data_adapter(config: &dyn ConfigPort) -> Result<CsvAdapter, SigtraderError> {
    config
        .get_string("data", "path")
        .map(|p| CsvAdapter::new(PathBuf::from(p.trim())))
        .ok_or_else(|| SigtraderError::ConfigMissing {
            section: "data".into(),
            key: "path".into(),
        })
}

/// Load one symbol's table and run the full pipeline over it.
pub fn run_backtest_pipeline(
    data_port: &dyn DataPort,
    code: &str,
    window: DateWindow,
    config: &PipelineConfig,
) -> Result<(FeatureTable, PipelineOutput), SigtraderError> {
    let mut table = data_port.fetch_table(code, window.start, window.end)?;
    info!(code, rows = table.len(), "feature table loaded");

    let output = run_pipeline(&mut table, config)?;
    Ok((table, output))
}

fn run_backtest(
    config_path: &Path,
    code_override: Option<&str>,
    output_override: Option<&Path>,
    dry_run: bool,
) -> Result<(), SigtraderError> {
    let adapter = load_validated_config(config_path)?;
    let pipeline_config = build_pipeline_config(&adapter)?;
    let window = build_date_window(&adapter)?;
    let code = resolve_code(code_override, &adapter)?;
    let output_path = output_override
        .map(Path::to_path_buf)
        .or_else(|| adapter.get_string("output", "path").map(PathBuf::from));

    if dry_run {
        print_dry_run(&code, window, &pipeline_config, output_path.as_deref());
        return Ok(());
    }

    let data_port = data_adapter(&adapter)?;
    let (table, output) = run_backtest_pipeline(&data_port, &code, window, &pipeline_config)?;

    print_summary(&code, &output);

    if let Some(path) = output_path {
        CsvReportAdapter.write_table(&table, &path)?;
        println!("\nAugmented table written to: {}", path.display());
    }
    Ok(())
}

fn print_dry_run(
    code: &str,
    window: DateWindow,
    config: &PipelineConfig,
    output_path: Option<&Path>,
) {
    let fmt_date = |d: Option<NaiveDate>| d.map(|d| d.to_string()).unwrap_or_else(|| "-".into());

    println!("Symbol:           {}", code);
    println!("Window:           {} to {}", fmt_date(window.start), fmt_date(window.end));
    println!("Initial Capital:  {:.2}", config.backtest.initial_capital);
    println!("Risk-Free Rate:   {}", config.backtest.risk_free_rate);
    println!(
        "Rules:            {} < {} / > {}, {} vs {}, patterns {} / {}",
        config.rules.momentum_column,
        config.rules.oversold,
        config.rules.overbought,
        config.rules.trend_column,
        config.rules.trend_signal_column,
        config.rules.bullish_column,
        config.rules.bearish_column,
    );
    println!("Model Vote:       {}", config.model_vote_column);
    if let Some(path) = output_path {
        println!("Output:           {}", path.display());
    }
    println!("\nDry run complete: configuration is valid");
}

fn print_summary(code: &str, output: &PipelineOutput) {
    let m = &output.metrics;
    println!("\n=== {} ===", code);
    println!("Rows:             {}", output.backtest.balances.len());
    println!("Position Changes: {}", m.transitions);
    println!("Final Position:   {}", output.backtest.final_position);
    println!("Initial Capital:  {:.2}", m.initial_capital);
    println!("Final Balance:    {:.2}", m.final_balance);
    println!("Total Return:     {:.2}%", m.total_return * 100.0);
    println!(
        "Max Drawdown:     -{:.1}% over {} rows",
        m.max_drawdown * 100.0,
        m.max_drawdown_duration
    );
    match m.sharpe_ratio {
        Some(s) => println!("Sharpe Ratio:     {:.2}", s),
        None => println!("Sharpe Ratio:     n/a"),
    }
    println!("\n=== Signal Agreement ===");
    println!("Rule vs Consensus:  {:.2}", output.agreement.rule_agreement);
    println!("Model vs Consensus: {:.2}", output.agreement.model_agreement);
}

fn run_validate(config_path: &Path) -> Result<(), SigtraderError> {
    let adapter = load_validated_config(config_path)?;
    let pipeline_config = build_pipeline_config(&adapter)?;

    println!("Required columns:");
    for column in pipeline_config.required_columns() {
        println!("  {}", column);
    }
    if adapter.has_section("sweep") {
        let grid = build_sweep_grid(&adapter)?;
        println!("Sweep variants:   {}", grid.len());
    }
    println!("\nConfiguration is valid.");
    Ok(())
}

fn print_report(code: &str, table: &FeatureTable, report: &ValidationReport) {
    println!("=== {} ===", code);
    println!("Rows:     {}", report.rows);
    if let (Some(first), Some(last)) = (table.bars().first(), table.bars().last()) {
        println!("Range:    {} to {}", first.date, last.date);
    }
    println!("Columns:  {}", table.columns().join(", "));

    if report.is_clean() {
        println!("\nNo missing values or outliers found.");
        return;
    }
    if !report.missing_values.is_empty() {
        println!("\nMissing values:");
        for (column, count) in &report.missing_values {
            println!("  {:<20} {}", column, count);
        }
    }
    if !report.outliers.is_empty() {
        println!("\nOutliers (1.5 IQR):");
        for (column, count) in &report.outliers {
            println!("  {:<20} {}", column, count);
        }
    }
}

fn run_inspect(config_path: &Path, code_override: Option<&str>) -> Result<(), SigtraderError> {
    let adapter = load_validated_config(config_path)?;
    let pipeline_config = build_pipeline_config(&adapter)?;
    let window = build_date_window(&adapter)?;
    let code = resolve_code(code_override, &adapter)?;

    let table = data_adapter(&adapter)?.fetch_table(&code, window.start, window.end)?;
    let report = validate_table(&table, &pipeline_config.required_columns())?;
    print_report(&code, &table, &report);
    Ok(())
}

pub fn build_sweep_grid(config: &dyn ConfigPort) -> Result<Vec<ThresholdVariant>, SigtraderError> {
    if !config.has_section("sweep") {
        return Err(SigtraderError::ConfigMissing {
            section: "sweep".into(),
            key: "oversold".into(),
        });
    }
    let oversold = parse_number_list(config, "sweep", "oversold")?;
    let overbought = parse_number_list(config, "sweep", "overbought")?;
    Ok(threshold_grid(&oversold, &overbought))
}

fn print_sweep(code: &str, initial_capital: f64, outcomes: &[SweepOutcome]) {
    println!("=== {} sweep ===", code);
    println!(
        "{:>9} {:>11} {:>14} {:>9} {:>7} {:>8}",
        "oversold", "overbought", "final", "return", "sharpe", "changes"
    );
    for outcome in outcomes {
        let v = outcome.variant;
        match &outcome.result {
            Ok(out) => {
                let sharpe = out
                    .metrics
                    .sharpe_ratio
                    .map(|s| format!("{:.2}", s))
                    .unwrap_or_else(|| "n/a".into());
                println!(
                    "{:>9} {:>11} {:>14.2} {:>8.2}% {:>7} {:>8}",
                    v.oversold,
                    v.overbought,
                    out.backtest.final_balance,
                    (out.backtest.final_balance - initial_capital) / initial_capital * 100.0,
                    sharpe,
                    out.metrics.transitions,
                );
            }
            Err(e) => println!("{:>9} {:>11}  failed: {}", v.oversold, v.overbought, e),
        }
    }
}

fn run_sweep_command(config_path: &Path, code_override: Option<&str>) -> Result<(), SigtraderError> {
    let adapter = load_validated_config(config_path)?;
    let pipeline_config = build_pipeline_config(&adapter)?;
    let window = build_date_window(&adapter)?;
    let code = resolve_code(code_override, &adapter)?;
    let grid = build_sweep_grid(&adapter)?;

    let table = data_adapter(&adapter)?.fetch_table(&code, window.start, window.end)?;
    info!(code = %code, variants = grid.len(), "running sweep");

    let mut outcomes = run_sweep(&table, &pipeline_config, &grid);
    rank_outcomes(&mut outcomes);
    print_sweep(&code, pipeline_config.backtest.initial_capital, &outcomes);

    // Ranking sinks failures to the end, so a failed head means every variant failed.
    match outcomes.into_iter().next() {
        Some(SweepOutcome { result: Err(e), .. }) => Err(e),
        _ => Ok(()),
    }
}

fn run_list_symbols(config_path: &Path) -> Result<(), SigtraderError> {
    let adapter = load_config(config_path)?;
    let symbols = data_adapter(&adapter)?.list_symbols()?;

    if symbols.is_empty() {
        info!("no symbols found");
    }
    for symbol in &symbols {
        println!("{}", symbol);
    }
    info!(count = symbols.len(), "symbols listed");
    Ok(())
}
