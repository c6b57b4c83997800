//! # PNG Minify - Main Entry Point
//!
//! Questo è il punto di ingresso principale dell'applicazione.
//!
//! ## Responsabilità:
//! - Parsing degli argomenti della command line con `clap`
//! - Inizializzazione del logging con `tracing` (su stderr)
//! - Caricamento della configurazione
//! - Mappatura degli errori sugli exit code
//! - Gestione di Ctrl-C e SIGTERM con pulizia dei file temporanei
//!
//! ## Flusso di esecuzione:
//! 1. Parsa gli argomenti CLI (errori → exit 1)
//! 2. Configura il logging (WARN, DEBUG con `-v`, `RUST_LOG` ha la precedenza)
//! 3. Carica la config e verifica che l'input esista (mancante → exit 2)
//! 4. Esegue la pipeline in competizione con Ctrl-C (exit 130) e SIGTERM (exit 143)
//! 5. Stampa il riepilogo JSON (con `--json`) e la riga `Done:` su stdout
//!
//! ## Esempio di utilizzo:
//! ```bash
//! png-minify banner.png --max-width 1600 --lossy 60-80
//! png-minify icon.png --lossless --out dist/icon.png
//! ```

use anyhow::Result;
use clap::error::ErrorKind;
use clap::Parser;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, error, warn};
use tracing_subscriber::EnvFilter;

use png_minify::detect::{format_report, ToolDetector};
use png_minify::error::{EXIT_INTERRUPTED, EXIT_OK, EXIT_TERMINATED, EXIT_USAGE};
use png_minify::progress::ProgressManager;
use png_minify::{Config, Mode, PipelineError, PipelineRequest, PngOptimizer, QualityRange, ReportGenerator, RunSummary};

#[derive(Parser, Debug)]
#[command(name = "png-minify", version)]
#[command(about = "Resize and compress a PNG with whatever tools are installed")]
struct Args {
    /// PNG file to optimize
    #[arg(required_unless_present = "check_tools")]
    input: Option<PathBuf>,

    /// Scale down so the longest side is at most N pixels
    #[arg(long = "max-width", value_name = "N", value_parser = clap::value_parser!(u32).range(1..))]
    max_width: Option<u32>,

    /// Output file (default: <input>-min.png next to the input)
    #[arg(long, value_name = "FILE")]
    out: Option<PathBuf>,

    /// Quality range for lossy compression (default 65-80)
    #[arg(long, value_name = "MIN-MAX")]
    lossy: Option<QualityRange>,

    /// Lossless compression only; overrides the default lossy mode
    #[arg(long)]
    lossless: bool,

    /// Configuration file (JSON)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Print a JSON summary line before the final line
    #[arg(long)]
    json: bool,

    /// Report which external tools were found and exit
    #[arg(long)]
    check_tools: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// No progress spinner
    #[arg(short, long)]
    quiet: bool,
}

impl Args {
    fn request(&self, input: &Path, config: &Config) -> PipelineRequest {
        let mut request = PipelineRequest::new(input).with_range(self.lossy.unwrap_or(config.lossy_range));
        if self.lossless {
            request = request.with_mode(Mode::Lossless);
        }
        if let Some(max_dim) = self.max_width {
            request = request.with_max_dim(max_dim);
        }
        if let Some(out) = &self.out {
            request = request.with_output(out);
        }
        request
    }
}

fn init_logging(verbose: bool) -> Result<()> {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

/// Waits for Ctrl-C, or SIGTERM on unix, and returns the matching exit code
async fn shutdown_signal() -> u8 {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = interrupted() => EXIT_INTERRUPTED,
                    _ = terminate.recv() => EXIT_TERMINATED,
                }
            }
            Err(e) => {
                warn!("Cannot listen for SIGTERM: {}", e);
                interrupted().await;
                EXIT_INTERRUPTED
            }
        }
    }

    #[cfg(not(unix))]
    {
        interrupted().await;
        EXIT_INTERRUPTED
    }
}

async fn interrupted() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Cannot listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}

/// Everything after argument parsing; returns the process exit code.
///
/// The pipeline is abandoned as soon as `shutdown` resolves, with its exit code.
async fn run(args: Args, shutdown: impl Future<Output = u8>) -> u8 {
    let config = match Config::load(args.config.as_deref()).await {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {:#}", e);
            return EXIT_USAGE;
        }
    };

    if args.check_tools {
        print!("{}", format_report(&ToolDetector::new(&config).report()));
        return EXIT_OK;
    }

    let Some(input) = args.input.as_deref() else {
        // clap enforces this unless --check-tools
        error!("{}", PipelineError::Usage("missing input file".to_string()));
        return EXIT_USAGE;
    };
    if !input.exists() {
        let e = PipelineError::InputNotFound(input.to_path_buf());
        error!("{}", e);
        return e.exit_code();
    }

    let request = args.request(input, &config);
    let progress = if args.quiet {
        ProgressManager::hidden()
    } else {
        ProgressManager::visible()
    };

    let optimizer = match PngOptimizer::new(config) {
        Ok(optimizer) => optimizer.with_progress(progress.clone()),
        Err(e) => {
            error!("Invalid configuration: {:#}", e);
            return EXIT_USAGE;
        }
    };

    // Dropping the pipeline future kills the running tool and removes temporary files
    let outcome = tokio::select! {
        result = optimizer.run(&request) => result,
        code = shutdown => {
            progress.finish();
            error!("Interrupted");
            return code;
        }
    };
    progress.finish();

    match outcome {
        Ok(result) => {
            if args.json {
                match RunSummary::new(input, &result).to_json() {
                    Ok(line) => println!("{}", line),
                    Err(e) => error!("Failed to serialize summary: {}", e),
                }
            }
            println!("{}", ReportGenerator::done_line(input, &result));
            debug!("Exit code {}", EXIT_OK);
            EXIT_OK
        }
        Err(e) => {
            error!("{}", e);
            e.exit_code()
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let code = match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => EXIT_OK,
                _ => EXIT_USAGE,
            };
            let _ = e.print();
            return ExitCode::from(code);
        }
    };

    if let Err(e) = init_logging(args.verbose) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    ExitCode::from(run(args, shutdown_signal()).await)
}
