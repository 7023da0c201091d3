use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;
use log::{error, info, warn};

use scene_keyframes::cli::{self, Args};

fn main() -> ExitCode {
    scene_keyframes::init_logging();
    let args = Args::parse();
    let started = Instant::now();

    match cli::run(&args) {
        Ok(report) if report.has_failures() => {
            warn!(
                "⚠️ {} of {} videos failed ({:.1}s)",
                report.failed,
                report.videos.len(),
                started.elapsed().as_secs_f64()
            );
            ExitCode::FAILURE
        }
        Ok(report) => {
            info!(
                "🎉 {} keyframes from {} videos in {} ({:.1}s)",
                report.scenes,
                report.videos.len(),
                args.output_dir.display(),
                started.elapsed().as_secs_f64()
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("❌ {err:#}");
            ExitCode::FAILURE
        }
    }
}
