use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use humansize::{format_size, DECIMAL};
use indicatif::{ProgressBar, ProgressStyle};
use std::process::ExitCode;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use blobsync::cli::{Cli, Commands, RunOptions, SyncArgs};
use blobsync::config::Config;
use blobsync::error::SyncError;
use blobsync::fs::ExtensionMimeMapper;
use blobsync::sync::{run_sync, SyncPhase, SyncProgress, SyncRequest, SyncSummary};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let run_options = cli.run_options();
    init_tracing(&run_options);

    match run(cli, run_options).await {
        Ok(code) => ExitCode::from(code),
        Err(err) => {
            eprintln!("{} {:#}", "Error:".red().bold(), err);
            match err.downcast_ref::<SyncError>() {
                Some(sync_err) => {
                    if let Some(hint) = sync_err.hint() {
                        eprintln!("{} {}", "Hint:".yellow(), hint);
                    }
                    ExitCode::from(sync_err.exit_code())
                }
                None => ExitCode::from(1),
            }
        }
    }
}

/// Logs go to stderr; RUST_LOG wins over --debug / --quiet.
fn init_tracing(options: &RunOptions) {
    let default_level = if options.debug {
        "blobsync=debug"
    } else if options.quiet {
        "blobsync=error"
    } else {
        "blobsync=info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(options.debug)
        .without_time()
        .init();
}

async fn run(cli: Cli, run_options: RunOptions) -> Result<u8> {
    let config = Config::discover(cli.config.as_deref())?;
    match cli.command {
        Commands::Sync(args) => sync(args, config, run_options).await,
    }
}

async fn sync(args: SyncArgs, config: Config, run_options: RunOptions) -> Result<u8> {
    let config = args.merge_into(config);
    let options = args.sync_options(&config);
    let gateway = config.open_gateway(&args.container)?;
    let request = SyncRequest {
        local_path: args.local_path.clone(),
        options,
        public_read: config.public_read(),
    };

    let (progress_tx, progress_task) = if run_options.progress {
        let (tx, rx) = mpsc::channel(256);
        (Some(tx), Some(tokio::spawn(drive_progress(rx))))
    } else {
        (None, None)
    };

    let result = run_sync(gateway, Arc::new(ExtensionMimeMapper), request, progress_tx).await;
    if let Some(task) = progress_task {
        let _ = task.await;
    }
    let summary = result?;

    if run_options.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary);
    }
    Ok(summary.exit_code())
}

/// Render engine progress events until the sender side is dropped
async fn drive_progress(mut rx: mpsc::Receiver<SyncProgress>) {
    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {prefix:>10} [{bar:40.cyan/blue}] {pos}/{len} {wide_msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-"),
    );

    while let Some(progress) = rx.recv().await {
        let phase = match progress.phase {
            SyncPhase::Scanning => "scanning",
            SyncPhase::Hashing => "hashing",
            SyncPhase::Uploading => "uploading",
            SyncPhase::Deleting => "deleting",
            SyncPhase::Complete => "done",
        };
        pb.set_prefix(phase);
        pb.set_length(progress.total_files as u64);
        pb.set_position(progress.files_done as u64);
        pb.set_message(progress.current_file);
        if progress.phase == SyncPhase::Complete {
            break;
        }
    }
    pb.finish_and_clear();
}

fn print_summary(summary: &SyncSummary) {
    let report = &summary.report;
    let title = if summary.dry_run {
        "Dry run complete".yellow().bold()
    } else {
        "Sync complete".green().bold()
    };

    println!("{} {} -> {}", title, summary.local_root.display(), summary.destination);
    println!(
        "  {} new, {} updated, {} deleted, {} unchanged",
        report.new.to_string().green(),
        report.changed.to_string().cyan(),
        report.deleted.to_string().red(),
        report.unchanged
    );
    println!(
        "  {} uploaded in {:.1}s",
        format_size(report.bytes_uploaded, DECIMAL),
        summary.duration_ms as f64 / 1000.0
    );
    println!(
        "  local files: {}, remote objects: {} before, {} after",
        summary.local_files, summary.remote_objects_before, summary.remote_objects_after
    );
    if summary.deletes_withheld {
        println!(
            "  {}",
            "Deletes skipped: the local tree could not be read completely".yellow()
        );
    }

    if report.has_failures() {
        println!("  {} {}", report.failures.len().to_string().red().bold(), "failed:".red());
        for failure in &report.failures {
            println!("    [{}] {}: {}", failure.kind, failure.target, failure.message);
        }
    }
}
