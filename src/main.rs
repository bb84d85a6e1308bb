// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Result, anyhow};
use clap::{Parser, ValueEnum, CommandFactory, Subcommand};
use clap_complete::{generate, Shell};
use log::{error, debug, LevelFilter, Log, Metadata, Record, Level, SetLoggerError};

use wwdcdigest::app_config::{Config, ImageFormat, LogLevel, OutputFormat};
use wwdcdigest::app_controller::Controller;

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => LogLevel::Error,
            CliLogLevel::Warn => LogLevel::Warn,
            CliLogLevel::Info => LogLevel::Info,
            CliLogLevel::Debug => LogLevel::Debug,
            CliLogLevel::Trace => LogLevel::Trace,
        }
    }
}

/// CLI Wrapper for ImageFormat to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliImageFormat {
    Jpg,
    Png,
    Webp,
}

impl From<CliImageFormat> for ImageFormat {
    fn from(cli_format: CliImageFormat) -> Self {
        match cli_format {
            CliImageFormat::Jpg => ImageFormat::Jpg,
            CliImageFormat::Png => ImageFormat::Png,
            CliImageFormat::Webp => ImageFormat::Webp,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a digest from a WWDC session URL (default command)
    Digest(DigestArgs),

    /// Generate shell completions for wwdcdigest
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Parser, Debug)]
struct DigestArgs {
    /// WWDC session page URL
    #[arg(value_name = "SESSION_URL")]
    url: String,

    /// Output directory; the session directory is created inside it
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Output format (currently only markdown)
    #[arg(short, long)]
    format: Option<String>,

    /// Language code for the digest (e.g. 'en', 'ja', 'fr')
    #[arg(short, long)]
    language: Option<String>,

    /// OpenAI API key for summary, key points and translation
    #[arg(long)]
    openai_key: Option<String>,

    /// Custom OpenAI-compatible endpoint URL
    #[arg(long)]
    openai_endpoint: Option<String>,

    /// Image format for extracted frames
    #[arg(long, value_enum)]
    image_format: Option<CliImageFormat>,

    /// Scale extracted frames to this width, keeping aspect ratio
    #[arg(long, value_name = "PIXELS")]
    image_width: Option<u32>,

    /// Set logging level
    #[arg(long, value_enum)]
    log_level: Option<CliLogLevel>,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json")]
    config_path: String,
}

/// wwdcdigest - WWDC session digests with video frames
///
/// Turns a WWDC session page into a markdown digest: downloads the video
/// and subtitles, extracts one frame per subtitle cue, and optionally adds
/// an AI summary and translation.
#[derive(Parser, Debug)]
#[command(name = "wwdcdigest")]
#[command(version = "0.3.0")]
#[command(about = "WWDC session digests with video frames")]
#[command(long_about = "wwdcdigest turns a WWDC session page into a markdown digest with one
video frame per subtitle cue, plus an optional AI summary and translation.

EXAMPLES:
    wwdcdigest https://developer.apple.com/videos/play/wwdc2023/10187/
    wwdcdigest -o ~/digests <URL>                 # Choose the output directory
    wwdcdigest -l ja --openai-key sk-... <URL>    # Japanese digest (needs OpenAI)
    wwdcdigest --image-format png <URL>           # PNG frames instead of JPEG
    wwdcdigest --image-width 640 <URL>            # Scale frames down to 640px
    wwdcdigest completions zsh > _wwdcdigest      # Generate zsh completions

CONFIGURATION:
    Settings are read from conf.json when present; command line options
    override it. The OpenAI key and endpoint also fall back to the
    OPENAI_API_KEY and OPENAI_API_ENDPOINT environment variables.

OUTPUT:
    <output-dir>/wwdc_<session>/<session>_digest.md plus the downloaded
    video, the subtitle track, and a frames/ directory. Without -o the
    tree lands in a fresh directory under the system temp dir.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Option<Commands>,

    /// WWDC session page URL
    #[arg(value_name = "SESSION_URL")]
    url: Option<String>,

    /// Output directory; the session directory is created inside it
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Output format (currently only markdown)
    #[arg(short, long)]
    format: Option<String>,

    /// Language code for the digest (e.g. 'en', 'ja', 'fr')
    #[arg(short, long)]
    language: Option<String>,

    /// OpenAI API key for summary, key points and translation
    #[arg(long)]
    openai_key: Option<String>,

    /// Custom OpenAI-compatible endpoint URL
    #[arg(long)]
    openai_endpoint: Option<String>,

    /// Image format for extracted frames
    #[arg(long, value_enum)]
    image_format: Option<CliImageFormat>,

    /// Scale extracted frames to this width, keeping aspect ratio
    #[arg(long, value_name = "PIXELS")]
    image_width: Option<u32>,

    /// Set logging level
    #[arg(long, value_enum)]
    log_level: Option<CliLogLevel>,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json")]
    config_path: String,
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
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let emoji = Self::get_emoji_for_level(record.level());

            let color = match record.level() {
                Level::Error => "\x1B[1;31m",
                Level::Warn => "\x1B[1;33m",
                Level::Info => "\x1B[1;32m",
                Level::Debug => "\x1B[1;36m",
                Level::Trace => "\x1B[1;35m",
            };

            let mut stderr = std::io::stderr();
            let _ = writeln!(stderr, "{}{} {}{}\x1B[0m", color, now, emoji, record.args());
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

fn level_filter(level: &LogLevel) -> LevelFilter {
    match level {
        LogLevel::Error => LevelFilter::Error,
        LogLevel::Warn => LevelFilter::Warn,
        LogLevel::Info => LevelFilter::Info,
        LogLevel::Debug => LevelFilter::Debug,
        LogLevel::Trace => LevelFilter::Trace,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize the logger once with info level by default
    // We'll update the level after loading the config if needed
    CustomLogger::init(LevelFilter::Info)?;

    // Parse command line arguments using clap
    let cli = CommandLineOptions::parse();

    // Handle subcommands
    match cli.command {
        Some(Commands::Completions { shell }) => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "wwdcdigest", &mut std::io::stdout());
            Ok(())
        }
        Some(Commands::Digest(args)) => run_digest(args).await,
        None => {
            // Default behavior - treat the top-level args as the digest command
            let url = cli
                .url
                .ok_or_else(|| anyhow!("SESSION_URL is required when no subcommand is specified"))?;

            let digest_args = DigestArgs {
                url,
                output_dir: cli.output_dir,
                format: cli.format,
                language: cli.language,
                openai_key: cli.openai_key,
                openai_endpoint: cli.openai_endpoint,
                image_format: cli.image_format,
                image_width: cli.image_width,
                log_level: cli.log_level,
                config_path: cli.config_path,
            };
            run_digest(digest_args).await
        }
    }
}

async fn run_digest(options: DigestArgs) -> Result<()> {
    // If log level is set via command line, apply it immediately
    if let Some(cmd_log_level) = &options.log_level {
        let config_log_level: LogLevel = cmd_log_level.clone().into();
        log::set_max_level(level_filter(&config_log_level));
    }

    // Load configuration; a missing default config file just means defaults,
    // an explicitly passed path that does not exist is an error
    let config_path = &options.config_path;
    let mut config = if Path::new(config_path).exists() {
        Config::from_file(config_path)?
    } else if config_path != "conf.json" {
        return Err(anyhow!("Config file does not exist: {}", config_path));
    } else {
        debug!("No config file at '{}', using defaults", config_path);
        Config::default()
    };

    // Override config with CLI options if provided
    if let Some(language) = &options.language {
        config.language = language.clone();
    }
    if let Some(format) = &options.format {
        config.output_format = format.parse::<OutputFormat>()?;
    }
    if let Some(key) = &options.openai_key {
        config.openai.api_key = key.clone();
    }
    if let Some(endpoint) = &options.openai_endpoint {
        config.openai.endpoint = endpoint.clone();
    }
    if let Some(image_format) = &options.image_format {
        config.image.format = image_format.clone().into();
    }
    if let Some(width) = options.image_width {
        config.image.width = Some(width);
    }
    if let Some(log_level) = &options.log_level {
        config.log_level = log_level.clone().into();
    }

    // Environment variables fill in credentials the CLI and config left empty
    config.resolve_openai_env();

    // If log level was not set via command line, update it from config now
    if options.log_level.is_none() {
        log::set_max_level(level_filter(&config.log_level));
    }

    // Without -o the digest tree goes to a fresh directory under the temp dir
    let output_dir = options.output_dir.unwrap_or_else(|| {
        std::env::temp_dir().join(format!("wwdcdigest_{}", chrono::Utc::now().timestamp()))
    });

    let controller = Controller::with_config(config);
    match controller.create_digest(&options.url, &output_dir).await {
        Ok(digest) => {
            println!("Digest created: {}", digest.markdown_path.display());
            Ok(())
        }
        Err(e) => {
            if let Some(stage) = e.stage() {
                error!("Digest creation failed while {stage}");
            }
            Err(e.into())
        }
    }
}
