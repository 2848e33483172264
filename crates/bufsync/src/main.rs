use bufsync::replay::{Scenario, run_scenario};
use std::path::Path;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let Some(path) = std::env::args_os().nth(1) else {
        eprintln!("usage: bufsync-replay <scenario.json>");
        return ExitCode::from(2);
    };

    match replay(Path::new(&path)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("Replay of {} failed: {}", Path::new(&path).display(), e);
            ExitCode::FAILURE
        }
    }
}

fn replay(path: &Path) -> bufsync_core::Result<()> {
    let scenario = Scenario::from_path(path)?;

    // Blocking polls wait on the editor thread, so the backend needs its own
    // worker threads.
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    let report = run_scenario(&scenario, runtime.handle())?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
