// src/main.rs
#[cfg(windows)]
use spotify_taskbar_fix::{
    FixTimings, SIGNAL_EXIT_CODE, StartupError, SystemClock, TargetProfile, TaskbarFixer,
    cli::{self, CommandLineOptions},
    console,
    etw::EtwProcessStartSource,
    hwnd::Win32Desktop,
    instance::{self, INSTANCE_MUTEX_NAME, InstanceGuard},
    logging, run_worker, sink_channel,
    ProcessStartSource,
};
#[cfg(windows)]
use tracing::{debug, error, info, warn};

#[cfg(windows)]
fn main() {
    let options = cli::parse_command_line();
    if !options.show_console {
        console::hide_console();
    }
    logging::init_logging(options.show_console);
    debug!("{}", options);

    let code = match run(&options) {
        Ok(code) => code,
        Err(e) => {
            println!("ERROR: {}", e);
            console::pause_for_enter();
            e.exit_code()
        }
    };
    instance::release_instance();
    std::process::exit(code);
}

#[cfg(windows)]
fn run(options: &CommandLineOptions) -> Result<i32, StartupError> {
    ctrlc::set_handler(|| {
        warn!("Termination requested, exiting");
        instance::release_instance();
        std::process::exit(SIGNAL_EXIT_CODE);
    })
    .map_err(|e| StartupError::SignalHandler {
        reason: e.to_string(),
    })?;

    instance::hold_instance(InstanceGuard::acquire(INSTANCE_MUTEX_NAME)?);

    if !is_admin::is_admin() {
        warn!("Not running as administrator; process start tracing will likely be refused");
    }

    let profile = TargetProfile::spotify();
    let (sink, events) = sink_channel(&profile.process_name);
    let mut source = EtwProcessStartSource::new();
    source.subscribe(sink)?;
    info!(
        process = %profile.process_name,
        console = options.show_console,
        "Watching for process starts"
    );

    let fixer = TaskbarFixer::new(
        Win32Desktop::new(),
        SystemClock::new(),
        profile,
        FixTimings::default(),
    );
    let worker = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        run_worker(&events, &fixer)
    }));
    drop(source);

    match worker {
        Ok(attempts) => {
            debug!(attempts, "notification stream closed");
            Ok(0)
        }
        Err(panic) => {
            let message = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            error!(%message, "Unhandled fault while fixing a window");
            println!("ERROR: Unhandled exception\n    {}", message);
            console::pause_for_enter();
            Ok(1)
        }
    }
}

#[cfg(not(windows))]
fn main() {
    eprintln!(
        "ERROR: {}",
        spotify_taskbar_fix::StartupError::Unsupported
    );
    std::process::exit(1);
}
