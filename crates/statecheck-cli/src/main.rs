// crates/statecheck-cli/src/main.rs
// ============================================================================
// Module: Statecheck CLI Entry Point
// Description: Command dispatcher for verification runs, plans, and config checks.
// Purpose: Resolve layered configuration, run the verifier, and map exit codes.
// Dependencies: clap, statecheck-config, statecheck-core, statecheck-probes, thiserror
// ============================================================================

//! ## Overview
//! The `verify` binary resolves configuration in layers (preset, file,
//! `STATECHECK_*` environment, flags), builds the built-in probe registry, and
//! hands the flat settings to the core orchestrator. All user-facing strings
//! are routed through the message catalog.
//!
//! Exit codes: `0` success (warnings allowed), `1` at least one FAIL, `2`
//! fatal configuration error, `3` the report could not be written.

// ============================================================================
// SECTION: Modules
// ============================================================================


// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::ArgAction;
use clap::Args;
use clap::CommandFactory;
use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use statecheck_cli::output::OutputError;
use statecheck_cli::output::PlanOutput;
use statecheck_cli::output::RenderFormat;
use statecheck_cli::output::render_plan;
use statecheck_cli::output::render_report;
use statecheck_cli::output::write_report;
use statecheck_cli::t;
use statecheck_config::LogSinkKind;
use statecheck_config::LoggingConfig;
use statecheck_config::VerifierConfig;
use statecheck_config::env_overrides_from_process;
use statecheck_core::ExitStatus;
use statecheck_core::FileRunLogSink;
use statecheck_core::NoopRunLogSink;
use statecheck_core::Orchestrator;
use statecheck_core::RunLogSink;
use statecheck_core::RunSettings;
use statecheck_core::StderrRunLogSink;
use statecheck_core::core::settings::KEY_NAMESPACE;
use statecheck_core::core::settings::KEY_ONLY;
use statecheck_core::core::settings::KEY_PARALLELISM;
use statecheck_core::core::settings::KEY_RUN_TIMEOUT_MS;
use statecheck_core::core::settings::KEY_SUBSET;
use statecheck_probes::ProbeRegistry;
use statecheck_probes::SystemCommandRunner;
use thiserror::Error;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "verify", disable_help_subcommand = true, disable_version_flag = true)]
struct Cli {
    /// Print version information and exit.
    #[arg(long = "version", action = ArgAction::SetTrue, global = true)]
    show_version: bool,
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Probe the target and grade every selected expectation.
    Run(RunCommand),
    /// Validate configuration and print the execution order without probing.
    Plan(PlanCommand),
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

/// Configuration subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Validate a configuration file and its probe sections.
    Validate(ConfigValidateCommand),
}

/// Configuration source and run selection shared by `run` and `plan`.
#[derive(Args, Debug, Default)]
struct SelectionArgs {
    /// Config file path (defaults to statecheck.toml or `STATECHECK_CONFIG`).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Bundled preset used as the base layer.
    #[arg(long, value_name = "NAME")]
    preset: Option<String>,
    /// Subset tag to run (`full` runs everything).
    #[arg(long, value_name = "NAME")]
    subset: Option<String>,
    /// Comma-separated expectation ids to run.
    #[arg(long, value_name = "IDS")]
    only: Option<String>,
    /// Global run timeout in seconds.
    #[arg(long, value_name = "SECONDS")]
    timeout: Option<u64>,
    /// Default namespace handed to probes.
    #[arg(long, value_name = "NAME")]
    target_namespace: Option<String>,
    /// Worker count for independent expectations.
    #[arg(long, value_name = "N")]
    parallelism: Option<usize>,
    /// Additional setting override (repeatable), for example `vars.release=grafana`.
    #[arg(long = "set", value_name = "KEY=VALUE", action = ArgAction::Append)]
    set: Vec<String>,
}

/// Arguments for `run`.
#[derive(Args, Debug)]
struct RunCommand {
    /// Configuration and selection.
    #[command(flatten)]
    selection: SelectionArgs,
    /// Write the report to a file instead of stdout.
    #[arg(long, value_name = "FILE")]
    output: Option<PathBuf>,
    /// Report format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

/// Arguments for `plan`.
#[derive(Args, Debug)]
struct PlanCommand {
    /// Configuration and selection.
    #[command(flatten)]
    selection: SelectionArgs,
    /// Plan format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

/// Arguments for config validation.
#[derive(Args, Debug)]
struct ConfigValidateCommand {
    /// Config file path (defaults to statecheck.toml or `STATECHECK_CONFIG`).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Bundled preset used as the base layer.
    #[arg(long, value_name = "NAME")]
    preset: Option<String>,
}

/// Output formats.
#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
enum OutputFormat {
    /// Human-readable text.
    Text,
    /// Canonical JSON.
    Json,
}

impl From<OutputFormat> for RenderFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Text => Self::Text,
            OutputFormat::Json => Self::Json,
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error carrying a catalog message and the exit status it maps to.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
    /// Process exit status.
    status: ExitStatus,
}

impl CliError {
    /// Fatal configuration error (exit 2).
    const fn config(message: String) -> Self {
        Self {
            message,
            status: ExitStatus::ConfigError,
        }
    }

    /// Report sink error (exit 3).
    const fn sink(message: String) -> Self {
        Self {
            message,
            status: ExitStatus::SinkError,
        }
    }
}

impl From<OutputError> for CliError {
    fn from(err: OutputError) -> Self {
        Self::sink(err.to_string())
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => emit_error(&err),
    }
}

/// Executes the CLI command dispatcher.
fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();

    if cli.show_version {
        let version = env!("CARGO_PKG_VERSION");
        write_stdout(&t!("main.version", version = version))?;
        return Ok(ExitCode::SUCCESS);
    }

    let Some(command) = cli.command else {
        show_help()?;
        return Ok(ExitCode::SUCCESS);
    };

    match command {
        Commands::Run(command) => command_run(&command),
        Commands::Plan(command) => command_plan(&command),
        Commands::Config {
            command,
        } => command_config(&command),
    }
}

/// Emits the top-level help message for the CLI.
fn show_help() -> CliResult<()> {
    let mut command = Cli::command();
    command.print_help().map_err(|err| CliError::sink(output_error("stdout", &err)))?;
    write_stdout("")
}

// ============================================================================
// SECTION: Run Command
// ============================================================================

/// Executes a verification run.
fn command_run(command: &RunCommand) -> CliResult<ExitCode> {
    let resolved = resolve(&command.selection)?;
    let log = open_log_sink(&resolved.config.logging)?;
    let mut orchestrator = Orchestrator::new(Arc::new(resolved.registry)).with_log_sink(log);
    let report = orchestrator
        .run(&resolved.settings, resolved.config.expectations)
        .map_err(|err| CliError::config(t!("run.fatal", error = err)))?;

    let bytes = render_report(&report, command.format.into())?;
    match &command.output {
        Some(path) => {
            write_report(path, &bytes)?;
            write_stdout(&t!(
                "report.written",
                path = path.display(),
                verdict = report.verdict.label()
            ))?;
        }
        None => write_stdout_bytes(&bytes)?,
    }
    Ok(ExitCode::from(ExitStatus::from_report(&report).code()))
}

// ============================================================================
// SECTION: Plan Command
// ============================================================================

/// Prints the execution order without probing.
fn command_plan(command: &PlanCommand) -> CliResult<ExitCode> {
    let resolved = resolve(&command.selection)?;
    let mut orchestrator = Orchestrator::new(Arc::new(resolved.registry));
    let (config, plan) = orchestrator
        .prepare(&resolved.settings, resolved.config.expectations)
        .map_err(|err| CliError::config(t!("run.fatal", error = err)))?;
    let bytes = render_plan(&PlanOutput::new(&config, &plan), command.format.into())?;
    write_stdout_bytes(&bytes)?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Config Commands
// ============================================================================

/// Dispatches config subcommands.
fn command_config(command: &ConfigCommand) -> CliResult<ExitCode> {
    match command {
        ConfigCommand::Validate(command) => command_config_validate(command),
    }
}

/// Executes the config validation command.
fn command_config_validate(command: &ConfigValidateCommand) -> CliResult<ExitCode> {
    let config = load_config(command.config.as_deref(), command.preset.as_deref())?;
    build_registry(&config)?;
    let preset = config.run.preset.clone().unwrap_or_else(|| t!("config.validate.no_preset"));
    write_stdout(&t!("config.validate.ok", count = config.expectations.len(), preset = preset))?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Configuration Resolution
// ============================================================================

/// Fully layered configuration for one invocation.
struct Resolved {
    /// Merged file and preset configuration.
    config: VerifierConfig,
    /// Flat settings after environment and flag overrides.
    settings: RunSettings,
    /// Built-in probes configured from `[probes]`.
    registry: ProbeRegistry,
}

/// Resolves configuration layers, settings overrides, and probes.
fn resolve(selection: &SelectionArgs) -> CliResult<Resolved> {
    let config = load_config(selection.config.as_deref(), selection.preset.as_deref())?;
    if config.expectations.is_empty() {
        return Err(CliError::config(t!("run.no_expectations")));
    }
    let mut settings = config.settings();
    let env = env_overrides_from_process()
        .map_err(|err| CliError::config(t!("config.env_failed", error = err)))?;
    settings.overlay(&env);
    settings.overlay(&flag_overrides(selection)?);
    let registry = build_registry(&config)?;
    Ok(Resolved {
        config,
        settings,
        registry,
    })
}

/// Loads the config file and applies the preset layer.
fn load_config(path: Option<&Path>, preset: Option<&str>) -> CliResult<VerifierConfig> {
    VerifierConfig::load(path)
        .and_then(|config| config.with_preset(preset))
        .map_err(|err| CliError::config(t!("config.load_failed", error = err)))
}

/// Builds the built-in probe registry.
fn build_registry(config: &VerifierConfig) -> CliResult<ProbeRegistry> {
    ProbeRegistry::with_builtin_probes(
        config.probe_configs(),
        Arc::new(SystemCommandRunner::default()),
    )
    .map_err(|err| CliError::config(t!("config.probes_failed", error = err)))
}

/// Converts command-line flags into settings overrides.
fn flag_overrides(selection: &SelectionArgs) -> CliResult<RunSettings> {
    let mut settings = RunSettings::new();
    if let Some(namespace) = &selection.target_namespace {
        settings.set(KEY_NAMESPACE, namespace.as_str());
    }
    if let Some(subset) = &selection.subset {
        settings.set(KEY_SUBSET, subset.as_str());
        settings.set(KEY_ONLY, "");
    }
    if let Some(only) = &selection.only {
        if only.split(',').all(|id| id.trim().is_empty()) {
            return Err(CliError::config(t!("args.only_empty")));
        }
        settings.set(KEY_ONLY, only.as_str());
    }
    if let Some(timeout) = selection.timeout {
        if timeout == 0 {
            return Err(CliError::config(t!("args.timeout_invalid")));
        }
        settings.set(KEY_RUN_TIMEOUT_MS, timeout.saturating_mul(1000).to_string());
    }
    if let Some(parallelism) = selection.parallelism {
        settings.set(KEY_PARALLELISM, parallelism.to_string());
    }
    for pair in &selection.set {
        let (key, value) = parse_set(pair)?;
        settings.set(key, value);
    }
    Ok(settings)
}

/// Parses a `KEY=VALUE` override.
fn parse_set(pair: &str) -> CliResult<(&str, &str)> {
    match pair.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => Ok((key.trim(), value)),
        _ => Err(CliError::config(t!("args.set_invalid", value = pair))),
    }
}

/// Opens the configured run log sink.
fn open_log_sink(logging: &LoggingConfig) -> CliResult<Arc<dyn RunLogSink>> {
    match logging.sink {
        LogSinkKind::Disabled => Ok(Arc::new(NoopRunLogSink)),
        LogSinkKind::Stderr => Ok(Arc::new(StderrRunLogSink)),
        LogSinkKind::File => {
            let path = logging
                .path
                .as_deref()
                .ok_or_else(|| CliError::config(t!("log.path_missing")))?;
            let sink = FileRunLogSink::new(path).map_err(|err| {
                CliError::config(t!("log.open_failed", path = path.display(), error = err))
            })?;
            Ok(Arc::new(sink))
        }
    }
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Writes a line to stdout.
fn write_stdout(message: &str) -> CliResult<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}").map_err(|err| CliError::sink(output_error("stdout", &err)))
}

/// Writes raw bytes to stdout.
fn write_stdout_bytes(bytes: &[u8]) -> CliResult<()> {
    let mut stdout = std::io::stdout();
    stdout.write_all(bytes).map_err(|err| CliError::sink(output_error("stdout", &err)))
}

/// Writes a line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Formats an output error message.
fn output_error(stream: &str, error: &std::io::Error) -> String {
    let stream_label = match stream {
        "stdout" => t!("output.stream.stdout"),
        "stderr" => t!("output.stream.stderr"),
        _ => t!("output.stream.unknown"),
    };
    t!("output.write_failed", stream = stream_label, error = error)
}

/// Emits an error message to stderr and returns its exit code.
fn emit_error(err: &CliError) -> ExitCode {
    let _ = write_stderr_line(&err.message);
    ExitCode::from(err.status.code())
}
