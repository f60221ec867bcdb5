//! Codepath CLI
//!
//! Serves the lesson API, validates tutorial files and plays lessons in the
//! terminal.

mod play;

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use codepath_engine::source::load_raw_tutorial;
use codepath_engine::{
    create_router, AppState, Config, LessonKind, LessonSession, NullSink, Tutorial,
};
use codepath_render::json::JsonGenerator;
use codepath_render::{LessonReport, MarkdownGenerator};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

/// Default port for the HTTP API server.
const DEFAULT_PORT: u16 = 3000;

/// File names of the summaries written by `play`.
const SUMMARY_MARKDOWN: &str = "codepath-summary.md";
const SUMMARY_JSON: &str = "codepath-summary.json";

/// Codepath - interactive programming lessons
///
/// Serves concept, multiple-choice, fill-in-the-blank and code-rearrangement
/// lessons over HTTP, or plays them directly in the terminal.
#[derive(Parser, Debug)]
#[command(name = "codepath")]
#[command(version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Path to configuration file (default: codepath.json in current directory)
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<String>,

    /// Directory holding tutorials/ and languages/
    #[arg(long, value_name = "DIR", global = true)]
    content_dir: Option<String>,

    /// Output directory for lesson summaries
    #[arg(short, long, value_name = "DIR", global = true)]
    output_dir: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP and WebSocket API
    Serve {
        /// Port for the HTTP API server
        #[arg(short, long, default_value_t = DEFAULT_PORT)]
        port: u16,
    },
    /// Check a tutorial file and list every content problem
    Validate {
        /// Path to the tutorial JSON file
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Play a lesson in the terminal
    Play {
        /// Path to the tutorial JSON file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Lesson slug (default: first lesson)
        #[arg(short, long)]
        lesson: Option<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if args.verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!(config = ?args.config, "Config file");

    match run(args).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(1)
        }
    }
}

async fn run(args: Args) -> anyhow::Result<ExitCode> {
    let mut config = load_config(args.config.as_deref())?;

    if let Some(ref content_dir) = args.content_dir {
        config.content_dir.clone_from(content_dir);
    }
    if let Some(ref output_dir) = args.output_dir {
        config.output_dir.clone_from(output_dir);
    }

    // Re-validate after overrides
    config.validate()?;

    match args.command {
        Command::Serve { port } => {
            serve(config, port).await?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Validate { file } => {
            if validate(&file, config.max_content_bytes())? {
                Ok(ExitCode::SUCCESS)
            } else {
                Ok(ExitCode::from(1))
            }
        }
        Command::Play { file, lesson } => {
            play_lesson(&config, &file, lesson.as_deref())?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Loads configuration from the specified path or default location.
fn load_config(config_path: Option<&str>) -> anyhow::Result<Config> {
    match config_path {
        Some(path_str) => {
            let path = Path::new(path_str);
            if !path.exists() {
                anyhow::bail!(
                    "Config file not found: '{}'\n\nSuggestion: Check the path or remove the --config flag to use defaults",
                    path.display()
                );
            }
            Config::load_from_file(path).map_err(|e| anyhow::anyhow!("{e}"))
        }
        None => Config::load().map_err(|e| anyhow::anyhow!("{e}")),
    }
}

/// Runs the API until Ctrl+C.
async fn serve(config: Config, port: u16) -> anyhow::Result<()> {
    let addr: SocketAddr = ([127, 0, 0, 1], port).into();
    print_config(&config);

    let state = AppState::new(config)?;
    let router = create_router(state);

    let listener = TcpListener::bind(addr).await.map_err(|e| {
        anyhow::anyhow!(
            "Failed to bind to {addr}: {e}\n\nSuggestion: Try a different port with --port"
        )
    })?;

    println!("Codepath API running on http://{addr}");
    println!("Press Ctrl+C to stop");

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Received Ctrl+C, shutting down");
            }
        })
        .await?;
    Ok(())
}

/// Strictly validates a tutorial file. Returns `false` when anything is wrong.
fn validate(path: &Path, max_bytes: u64) -> anyhow::Result<bool> {
    let raw = load_raw_tutorial(path, max_bytes)?;

    match Tutorial::from_raw_strict(raw) {
        Ok(tutorial) => {
            println!("{} ({}): OK", tutorial.title, tutorial.slug);
            for lesson in &tutorial.lessons {
                println!(
                    "  {} [{}] {} question(s)",
                    lesson.slug,
                    lesson.kind().map_or("unknown", LessonKind::as_str),
                    lesson.body.len()
                );
            }
            Ok(true)
        }
        Err(issues) => {
            println!("{}: {} issue(s) found", path.display(), issues.len());
            for issue in &issues {
                println!("  - {issue}");
            }
            Ok(false)
        }
    }
}

/// Plays one lesson on stdin/stdout, then writes the summary files.
fn play_lesson(config: &Config, path: &Path, lesson_slug: Option<&str>) -> anyhow::Result<()> {
    let tutorial = Tutorial::from_raw(load_raw_tutorial(path, config.max_content_bytes())?);

    let lesson = match lesson_slug {
        Some(slug) => tutorial.lesson(slug).cloned().ok_or_else(|| {
            anyhow::anyhow!(
                "Lesson '{slug}' not found in '{}'\n\nSuggestion: Run `codepath validate {}` to list lessons",
                tutorial.slug,
                path.display()
            )
        })?,
        None => tutorial.lessons.first().cloned().ok_or_else(|| {
            anyhow::anyhow!("Tutorial '{}' has no lessons", tutorial.slug)
        })?,
    };

    let mut session = LessonSession::new("cli", &tutorial.slug, lesson, Arc::new(NullSink));

    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();
    play::run(&mut session, config.theme, stdin.lock(), &mut stdout)?;

    write_summaries(&session.report(), Path::new(&config.output_dir))
}

/// Writes Markdown and JSON summaries into `output_dir`.
fn write_summaries(report: &LessonReport, output_dir: &Path) -> anyhow::Result<()> {
    std::fs::create_dir_all(output_dir)?;

    let md_path = output_dir.join(SUMMARY_MARKDOWN);
    std::fs::write(&md_path, MarkdownGenerator::new(report).generate())?;
    println!("  Markdown summary: {}", md_path.display());

    let json_path = output_dir.join(SUMMARY_JSON);
    JsonGenerator::new(report).write_to_file(&json_path, true)?;
    println!("  JSON summary: {}", json_path.display());

    Ok(())
}

/// Prints the loaded configuration.
fn print_config(config: &Config) {
    println!("Configuration loaded:");
    println!("  Content directory: {}", config.content_dir);
    println!("  Theme: {}", config.theme);
    println!("  Code execution: {}", config.execution.url);
    println!("  AI chat: {}", config.chat.url);
}
