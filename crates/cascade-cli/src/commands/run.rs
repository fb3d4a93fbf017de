//! Run command: simulate a program and hand the terminal to the REPL.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use cascade_core::config::GlobalConfig;
use cascade_runtime::{format_frequency, Runtime, RuntimeHandle, RuntimeOptions};
use cascade_ui::{StreamController, TermController, TermView};
use cascade_util::errors::CascadeError;
use cascade_util::fs::IncludePath;
use miette::Result;
use tracing::{debug, info};

pub struct RunArgs {
    pub file: Option<PathBuf>,
    pub march: Option<String>,
    pub include: Option<String>,
    pub batch: bool,
    pub open_loop_target: Option<u64>,
    pub profile_interval: Option<u64>,
    pub disable_warnings: bool,
}

pub async fn exec(args: RunArgs) -> Result<i32> {
    let config = GlobalConfig::load()?;

    let mut settings = config.runtime.clone();
    if let Some(march) = args.march {
        settings.march = march;
    }
    if let Some(target) = args.open_loop_target {
        settings.open_loop_target = target;
    }
    if let Some(interval) = args.profile_interval {
        settings.profile_interval = interval;
    }
    settings.disable_warnings |= args.disable_warnings;

    let mut options = RuntimeOptions::from_config(&settings)?;
    if let Some(list) = &args.include {
        options.include.extend(&IncludePath::from_colon_list(list));
    }
    debug!(march = %options.march, include = ?options.include.dirs(), "starting runtime");

    let color = config.ui.color && console::colors_enabled_stderr();
    let runtime = Runtime::new(options, Box::new(TermView::stdio(color)));
    let handle = runtime.handle();
    let join = runtime.spawn();

    if settings.profile_interval > 0 {
        tokio::spawn(profile(
            handle.clone(),
            Duration::from_millis(settings.profile_interval),
        ));
    }

    if let Some(file) = args.file {
        StreamController::file(handle.clone(), file)
            .abort_on_failure(args.batch)
            .run()
            .await;
    }
    if !args.batch {
        // Never joined: the thread may be parked on stdin when the runtime stops.
        TermController::stdio(handle.clone()).spawn();
    }

    let status = join.await.map_err(|e| CascadeError::Runtime {
        message: format!("runtime task failed: {e}"),
    })?;
    println!("Goodbye!");
    Ok(status)
}

/// Report the virtual clock frequency once per `interval` until the runtime stops.
async fn profile(handle: RuntimeHandle, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.tick().await;
    let mut last_time = handle.time();
    let mut last_instant = Instant::now();
    loop {
        ticker.tick().await;
        if handle.is_stopped() {
            break;
        }
        let now = handle.time();
        let elapsed = last_instant.elapsed().as_secs_f64().max(1e-9);
        let hz = (now.saturating_sub(last_time) as f64 / 2.0 / elapsed) as u64;
        let frequency = format_frequency(hz);
        info!(time = now, %frequency, "profile");
        cascade_util::progress::status_info(
            "Profiling",
            &format!("time {now}, virtual frequency {frequency}"),
        );
        last_time = now;
        last_instant = Instant::now();
    }
}
