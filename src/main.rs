// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result, anyhow};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, error, info, warn};
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::{Path, PathBuf};

use traductal::app_config::{self, Config};
use traductal::app_controller::Controller;
use traductal::providers::BackendId;
use traductal::translation::{TranslateOptions, TranslationResult};

/// CLI Wrapper for BackendId to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliEngine {
    Nllb,
    Apertus,
}

impl From<CliEngine> for BackendId {
    fn from(cli_engine: CliEngine) -> Self {
        match cli_engine {
            CliEngine::Nllb => BackendId::Nllb,
            CliEngine::Apertus => BackendId::Apertus,
        }
    }
}

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Translate a text or a text file
    Translate(TranslateArgs),

    /// List supported language codes and the engines accepting them
    Languages {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// List the models each engine can use
    Models {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Translate with every engine and show the results side by side
    Compare {
        /// Text to translate
        text: String,

        /// Source language code
        #[arg(short, long)]
        source_language: Option<String>,

        /// Target language code
        #[arg(short, long)]
        target_language: Option<String>,

        /// Print JSON instead of plain text
        #[arg(long)]
        json: bool,
    },

    /// Check that the Prolog interpreter and the Coptic parser are usable
    CheckValidator,

    /// Generate shell completions for traductal
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Parser, Debug)]
struct TranslateArgs {
    /// Text to translate (reads stdin when neither TEXT nor --input is given)
    #[arg(value_name = "TEXT", conflicts_with = "input")]
    text: Option<String>,

    /// Input text file
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Output file (defaults to `<input>.<target>.<ext>` for file input, stdout otherwise)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Source language code (e.g., 'de', 'en', 'rm-vallader')
    #[arg(short, long)]
    source_language: Option<String>,

    /// Target language code (e.g., 'de', 'en', 'rm-vallader')
    #[arg(short, long)]
    target_language: Option<String>,

    /// Force an engine instead of automatic selection
    #[arg(short, long, value_enum)]
    engine: Option<CliEngine>,

    /// Model of the selected engine (see `traductal models`)
    #[arg(short, long)]
    model: Option<String>,

    /// Skip validation and correction
    #[arg(long)]
    no_validate: bool,

    /// Chunks translated in parallel when the engine allows it
    #[arg(long)]
    max_concurrent_chunks: Option<usize>,

    /// Print the full result as JSON
    #[arg(long)]
    json: bool,

    /// Force overwrite of existing output files
    #[arg(short, long)]
    force_overwrite: bool,
}

/// TraductAL - translation router for low-resource languages
///
/// Routes each request to the NLLB-200 or Apertus engine, splits long texts
/// into chunks, and validates the output with language-specific checkers.
#[derive(Parser, Debug)]
#[command(name = "traductal")]
#[command(version)]
#[command(about = "Translation router with Romansh, Swiss German and Coptic validation")]
#[command(long_about = "TraductAL picks a translation engine per language pair, translates text chunk by chunk and validates the result.

EXAMPLES:
    traductal translate -s de -t rm-vallader \"Guten Morgen\"   # Translate a text
    traductal translate -s en -t fr -i letter.txt              # Translate a file to letter.fr.txt
    traductal translate -s en -t fr --engine apertus --json    # Force an engine, JSON output (stdin input)
    traductal compare -s de -t rm \"Wie geht es dir?\"           # Compare both engines
    traductal translate -s en -t de -m facebook/nllb-200-3.3B \"Hi\" # Use a larger NLLB model
    traductal languages                                         # List supported languages
    traductal models                                            # List engine models
    traductal check-validator                                   # Check the Coptic parser setup
    traductal completions bash > traductal.bash                 # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config-path. If the config file doesn't exist, a default one
    will be created automatically. TREALLA_PATH, NLLB_ENDPOINT and APERTUS_ENDPOINT
    override the matching settings.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json", global = true)]
    config_path: String,

    /// Set logging level
    #[arg(short, long, value_enum, global = true)]
    log_level: Option<CliLogLevel>,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger::new(level));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: Emoji for log level
    fn get_emoji_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "❌ ",
            Level::Warn => "🚧 ",
            Level::Info => " ",
            Level::Debug => "🔍 ",
            Level::Trace => "📋 ",
        }
    }

    // @returns: ANSI colour for log level
    fn get_color_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "\x1B[1;31m",
            Level::Warn => "\x1B[1;33m",
            Level::Info => "\x1B[1;32m",
            Level::Debug => "\x1B[1;36m",
            Level::Trace => "\x1B[1;35m",
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let level = record.level();

            let mut stderr = std::io::stderr();
            let _ = writeln!(
                stderr,
                "{}{} {} {}\x1B[0m",
                Self::get_color_for_level(level),
                now,
                Self::get_emoji_for_level(level),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize the logger with the most verbose level; the effective level
    // is set with log::set_max_level once the config is known
    CustomLogger::init(LevelFilter::Trace)?;
    log::set_max_level(LevelFilter::Info);

    // Parse command line arguments using clap
    let cli = CommandLineOptions::parse();

    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = CommandLineOptions::command();
        generate(*shell, &mut cmd, "traductal", &mut std::io::stdout());
        return Ok(());
    }

    let config = load_config(&cli.config_path, cli.log_level.clone())?;
    log::set_max_level(config.log_level.to_level_filter());

    let controller = Controller::with_config(config.clone())?;

    match cli.command {
        Commands::Translate(args) => run_translate(&controller, args).await,
        Commands::Languages { json } => run_languages(&controller, json),
        Commands::Models { json } => run_models(&controller, json),
        Commands::Compare {
            text,
            source_language,
            target_language,
            json,
        } => {
            let source = source_language.unwrap_or_else(|| config.source_language.clone());
            let target = target_language.unwrap_or_else(|| config.target_language.clone());
            run_compare(&controller, &text, &source, &target, json).await
        }
        Commands::CheckValidator => run_check_validator(&controller).await,
        Commands::Completions { .. } => Ok(()),
    }
}

/// Load the configuration file (creating it with defaults when missing),
/// then apply environment and command line overrides and validate
fn load_config(config_path: &str, log_level: Option<CliLogLevel>) -> Result<Config> {
    let mut config = if Path::new(config_path).exists() {
        // Load existing configuration
        let file = File::open(config_path).context(format!("Failed to open config file: {}", config_path))?;

        let reader = BufReader::new(file);
        serde_json::from_reader(reader).context(format!("Failed to parse config file: {}", config_path))?
    } else {
        // Create default configuration if not exists
        warn!("Config file not found at '{}', creating default config.", config_path);

        let config = Config::default();
        let config_json =
            serde_json::to_string_pretty(&config).context("Failed to serialize default config to JSON")?;

        std::fs::write(config_path, config_json)
            .context(format!("Failed to write default config to file: {}", config_path))?;

        config
    };

    config.apply_env_overrides();

    // Update log level in config if specified via command line
    if let Some(log_level) = log_level {
        config.log_level = log_level.into();
    }

    // Validate the configuration after loading and overriding
    config.validate().context("Configuration validation failed")?;

    Ok(config)
}

async fn run_translate(controller: &Controller, args: TranslateArgs) -> Result<()> {
    let config = controller.config();
    let source = args.source_language.unwrap_or_else(|| config.source_language.clone());
    let target = args.target_language.unwrap_or_else(|| config.target_language.clone());

    let mut options = TranslateOptions::new()
        .with_engine(args.engine.map(BackendId::from))
        .with_model(args.model);
    if args.no_validate {
        options = options.with_validation(false);
    }
    if let Some(limit) = args.max_concurrent_chunks {
        options = options.with_max_concurrent_chunks(limit);
    }

    if let Some(input) = &args.input {
        let (output_path, result) = controller
            .translate_file(input, args.output.as_deref(), &source, &target, &options, args.force_overwrite)
            .await?;

        if args.json {
            print_json(&result)?;
        } else {
            report_verdict(&result);
            info!("Success: {:?}", output_path);
        }
        return Ok(());
    }

    let text = match args.text {
        Some(text) => text,
        None => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .context("Failed to read text from stdin")?;
            buffer
        }
    };

    let result = controller.translate_text(&text, &source, &target, &options).await?;

    if let Some(output) = &args.output {
        if output.exists() && !args.force_overwrite {
            return Err(anyhow!(
                "Output file already exists: {:?}. Use -f to force overwrite.",
                output
            ));
        }
        traductal::file_utils::FileManager::write_to_file(output, &result.translation)?;
        info!("Success: {:?}", output);
    }

    if args.json {
        print_json(&result)?;
    } else {
        report_verdict(&result);
        if args.output.is_none() {
            println!("{}", result.translation);
        }
    }

    Ok(())
}

fn run_languages(controller: &Controller, json: bool) -> Result<()> {
    let languages = controller.list_languages();

    if json {
        return print_json(&languages);
    }

    for language in languages {
        let engines: Vec<&str> = language.engines.iter().map(|e| e.as_str()).collect();
        println!("{:<14} {:<32} {}", language.code, language.name, engines.join(", "));
    }

    Ok(())
}

fn run_models(controller: &Controller, json: bool) -> Result<()> {
    let entries = controller.list_models();

    if json {
        return print_json(&entries);
    }

    for entry in entries {
        println!("{}:", entry.backend.display_name());
        for model in &entry.models {
            let default = if *model == entry.default_model { " (default)" } else { "" };
            let loaded = if entry.loaded.contains(model) { " [loaded]" } else { "" };
            println!("  {}{}{}", model, default, loaded);
        }
    }

    Ok(())
}

async fn run_compare(controller: &Controller, text: &str, source: &str, target: &str, json: bool) -> Result<()> {
    let entries = controller.compare(text, source, target).await;

    if json {
        return print_json(&entries);
    }

    for entry in entries {
        match (&entry.result, &entry.error) {
            (Some(result), _) => println!(
                "{:<12} {} [{} ms, {:?}]",
                entry.backend.display_name(),
                result.translation,
                result.timings.total,
                result.verdict.status
            ),
            (None, Some(e)) => println!("{:<12} error: {}", entry.backend.display_name(), e),
            (None, None) => {}
        }
    }

    Ok(())
}

async fn run_check_validator(controller: &Controller) -> Result<()> {
    let status = controller.check_validator().await;

    if status.interpreter_available {
        info!("Interpreter '{}' is available", status.interpreter);
    } else {
        error!("Interpreter '{}' not found or not responding (set TREALLA_PATH)", status.interpreter);
    }

    if status.parser_found {
        info!("Coptic parser found at {:?}", status.parser_path);
    } else {
        error!("Coptic parser not found at {:?}", status.parser_path);
    }

    if status.is_ready() {
        Ok(())
    } else {
        Err(anyhow!("Symbolic validator is not ready"))
    }
}

fn report_verdict(result: &TranslationResult) {
    info!(
        "{} '{}' ({:?}), {} chunk(s), validation: {:?}",
        result.backend.display_name(),
        result.model,
        result.selection_reason,
        result.chunk_count,
        result.verdict.status
    );
    for issue in &result.verdict.errors {
        warn!("  {}", issue);
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output to JSON")?;
    println!("{}", json);
    Ok(())
}
