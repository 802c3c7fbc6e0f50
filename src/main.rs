// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Result, anyhow};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, error, info, warn};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};

use scriptum::app_config::{self, Config, SubtitleFormat};
use scriptum::app_controller::Controller;
use scriptum::errors::ExtractionError;
use scriptum::file_utils::FileManager;
use scriptum::progress::CancellationToken;
use scriptum::subtitle_languages;

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

/// CLI Wrapper for SubtitleFormat to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliSubtitleFormat {
    Srt,
    Ass,
    Webvtt,
}

impl From<CliSubtitleFormat> for SubtitleFormat {
    fn from(cli_format: CliSubtitleFormat) -> Self {
        match cli_format {
            CliSubtitleFormat::Srt => SubtitleFormat::Srt,
            CliSubtitleFormat::Ass => SubtitleFormat::Ass,
            CliSubtitleFormat::Webvtt => SubtitleFormat::WebVtt,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the subtitle streams of a video file
    Probe(ProbeArgs),

    /// Extract subtitle streams to text subtitle files
    Extract(ExtractArgs),

    /// Show the display name, flag and badges for a language tag
    Classify {
        /// Language tag or label, e.g. 'pt-BR', 'eng (SDH)'
        #[arg(value_name = "LANGUAGE")]
        language: String,

        /// Stream title to classify together with the tag
        #[arg(long)]
        title: Option<String>,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completions for scriptum
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Parser, Debug)]
struct ProbeArgs {
    /// Input video file
    #[arg(value_name = "INPUT_FILE")]
    input_path: PathBuf,

    /// Print JSON instead of text
    #[arg(long)]
    json: bool,
}

#[derive(Parser, Debug)]
struct ExtractArgs {
    /// Input video file or directory to process
    #[arg(value_name = "INPUT_PATH")]
    input_path: PathBuf,

    /// Output directory (defaults to the video's directory)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Force overwrite of existing output files
    #[arg(short, long)]
    force_overwrite: bool,

    /// Output subtitle format
    #[arg(long, value_enum)]
    format: Option<CliSubtitleFormat>,

    /// Only write the track selected for this language (e.g. 'pt', 'eng')
    #[arg(long)]
    language: Option<String>,

    /// Print JSON instead of text
    #[arg(long)]
    json: bool,
}

/// Scriptum - subtitle extraction
///
/// Lists, extracts and classifies the subtitle streams of MKV and other
/// video files using ffmpeg.
#[derive(Parser, Debug)]
#[command(name = "scriptum")]
#[command(version)]
#[command(about = "Subtitle stream discovery and extraction tool")]
#[command(long_about = "Scriptum finds the subtitle streams of video files and extracts them as text subtitles.

EXAMPLES:
    scriptum probe movie.mkv                        # List subtitle streams
    scriptum extract movie.mkv                      # Extract every subtitle stream
    scriptum extract -f --format webvtt movie.mkv   # Overwrite, as WebVTT
    scriptum extract --language pt movie.mkv        # Only the Portuguese (or fallback) track
    scriptum extract /movies/                       # Process an entire directory
    scriptum classify 'por Brazilian (SDH)'         # Show display metadata
    scriptum completions bash > scriptum.bash       # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config-path. If the config file doesn't exist, a default one
    will be created automatically.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json", global = true)]
    config_path: String,

    /// Set logging level
    #[arg(short, long, value_enum, global = true)]
    log_level: Option<CliLogLevel>,

    /// ffmpeg binary to use
    #[arg(long, global = true)]
    ffmpeg: Option<String>,
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

    // @returns: ANSI color for level
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
            let mut stderr = std::io::stderr();
            let _ = writeln!(
                stderr,
                "{}{} {} {}\x1B[0m",
                Self::get_color_for_level(record.level()),
                now,
                Self::get_emoji_for_level(record.level()),
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
    // Every level is accepted by the logger; the max level filters
    CustomLogger::init(LevelFilter::Trace)?;
    log::set_max_level(LevelFilter::Info);

    let cli = CommandLineOptions::parse();
    if let Some(level) = &cli.log_level {
        let level: app_config::LogLevel = level.clone().into();
        log::set_max_level(level.to_level_filter());
    }

    match &cli.command {
        Commands::Completions { shell } => {
            let mut cmd = CommandLineOptions::command();
            generate(*shell, &mut cmd, "scriptum", &mut std::io::stdout());
            Ok(())
        }
        Commands::Classify { language, title, json } => {
            run_classify(language, title.as_deref(), *json)
        }
        Commands::Probe(args) => {
            let controller = build_controller(&cli, None)?;
            run_probe(&controller, args).await
        }
        Commands::Extract(args) => {
            let format = args.format.clone().map(Into::into);
            let controller = build_controller(&cli, format)?;
            run_extract(&controller, args).await
        }
    }
}

/// Load the configuration, apply CLI overrides and wire Ctrl-C to cancellation
fn build_controller(cli: &CommandLineOptions, format: Option<SubtitleFormat>) -> Result<Controller> {
    let mut config = Config::load_or_create(&cli.config_path)?;

    if let Some(ffmpeg) = &cli.ffmpeg {
        config.engine.ffmpeg_path = ffmpeg.clone();
    }
    if let Some(format) = format {
        config.extraction.output_format = format;
    }
    match &cli.log_level {
        Some(level) => config.log_level = level.clone().into(),
        None => log::set_max_level(config.log_level.to_level_filter()),
    }

    let token = CancellationToken::new();
    let signal_token = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping after the current step");
            signal_token.cancel();
        }
    });

    Ok(Controller::with_config(config)?.with_cancellation(token))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Report an extraction error in JSON mode before propagating it
fn fail(error: anyhow::Error, json: bool) -> Result<()> {
    if json {
        let kind = error
            .downcast_ref::<ExtractionError>()
            .map(|e| e.kind().code())
            .unwrap_or("error");
        print_json(&serde_json::json!({
            "error": { "kind": kind, "message": error.to_string() }
        }))?;
    }
    Err(error)
}

fn run_classify(language: &str, title: Option<&str>, json: bool) -> Result<()> {
    let info = subtitle_languages::classify_stream(Some(language), title);
    if json {
        return print_json(&info);
    }

    let badges: Vec<&str> = info.badges().iter().map(|b| b.label()).collect();
    println!("{} {}", info.flag, info.display_name);
    if !badges.is_empty() {
        println!("   {}", badges.join(" · "));
    }
    Ok(())
}

async fn run_probe(controller: &Controller, args: &ProbeArgs) -> Result<()> {
    let probe = match controller.probe_file(&args.input_path).await {
        Ok(probe) => probe,
        Err(e) => return fail(e, args.json),
    };

    if args.json {
        return print_json(&probe);
    }

    info!(
        "{} ({}): {} subtitle stream(s)",
        probe.source_name,
        FileManager::format_file_size(probe.size),
        probe.streams.len()
    );
    for stream in &probe.streams {
        let marker = if probe.preferred_index == Some(stream.descriptor.index) { "*" } else { " " };
        let badges: Vec<&str> = stream.display.badges().iter().map(|b| b.label()).collect();
        println!(
            "{} #{} (stream {}) {} {} [{}]{}{}{}",
            marker,
            stream.descriptor.index,
            stream.descriptor.stream_index,
            stream.display.flag,
            stream.display.display_name,
            stream.descriptor.codec,
            stream.descriptor.title.as_deref().map(|t| format!(" \"{}\"", t)).unwrap_or_default(),
            if badges.is_empty() { String::new() } else { format!(" {}", badges.join(" ")) },
            if stream.text_based { "" } else { " (bitmap, not extractable)" },
        );
    }
    Ok(())
}

async fn run_extract(controller: &Controller, args: &ExtractArgs) -> Result<()> {
    let language = args.language.as_deref();

    if args.input_path.is_dir() {
        let summary = match controller
            .run_folder(&args.input_path, language, args.force_overwrite)
            .await
        {
            Ok(summary) => summary,
            Err(e) => return fail(e, args.json),
        };
        if args.json {
            print_json(&summary)?;
        }
        return Ok(());
    }

    if !args.input_path.is_file() {
        return Err(anyhow!("Input path does not exist: {:?}", args.input_path));
    }

    let output_dir = args.output_dir.clone().unwrap_or_else(|| {
        args.input_path
            .parent()
            .unwrap_or(Path::new("."))
            .to_path_buf()
    });

    match controller
        .extract_file(&args.input_path, &output_dir, language, args.force_overwrite)
        .await
    {
        Ok(extraction) => {
            if args.json {
                print_json(&serde_json::json!({
                    "written": extraction.written,
                    "skipped": extraction.skipped,
                    "failures": extraction.report.failures,
                }))?;
            } else {
                info!("Wrote {} subtitle file(s)", extraction.written.len());
            }
            Ok(())
        }
        Err(e) => {
            // Nothing to extract is an answer, not a failure
            let no_subtitles = e
                .downcast_ref::<ExtractionError>()
                .is_some_and(|err| err.is_no_subtitles());
            if no_subtitles && !args.json {
                warn!("{}", e);
                return Ok(());
            }
            if !args.json {
                error!("{}", e);
            }
            fail(e, args.json)
        }
    }
}
