//! Process-wide tracing setup for hosts embedding a session.

use std::path::Path;
use std::sync::Once;
use tracing_appender::non_blocking::WorkerGuard;

/// Install a file-backed subscriber filtered by `RUST_LOG`. The log file is
/// truncated on every start. Returns the writer guard, which must be held for
/// the life of the process; `None` when a global subscriber already exists.
pub fn init(log_dir: &Path, file_name: &str) -> Option<WorkerGuard> {
    let log_path = log_dir.join(file_name);
    if log_path.exists() {
        let _ = std::fs::remove_file(&log_path);
    }

    let file_appender = tracing_appender::rolling::never(log_dir, file_name);
    let (nb_writer, guard) = tracing_appender::non_blocking(file_appender);
    match tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_ansi(false)
        .with_writer(nb_writer)
        .try_init()
    {
        Ok(()) => Some(guard),
        // Already installed; dropping the guard shuts this writer down.
        Err(_) => None,
    }
}

/// Route panics through tracing before the default hook runs.
pub fn install_panic_hook() {
    static HOOK: Once = Once::new();
    HOOK.call_once(|| {
        let default_panic = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            tracing::error!(target: "runtime.panic", ?info, "panic");
            default_panic(info);
        }));
    });
}
