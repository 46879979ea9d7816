use crate::config::LoggingConfig;
use crate::utils::app_paths::AppPaths;
use chrono::Local;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Targets the library logs under
pub const TARGETS: [&str; 4] = ["api", "session", "storage", "config"];

/// Filter used when RUST_LOG is unset. `-v` opens the crate's own targets
/// at debug, `-vv` at trace; dependencies stay at the configured level.
pub fn filter_directive(config: &LoggingConfig, verbosity: u8) -> String {
    let base = if config.level.trim().is_empty() {
        "warn"
    } else {
        config.level.trim()
    };
    let ours = match verbosity {
        0 => return base.to_string(),
        1 => "debug",
        _ => "trace",
    };
    let mut directive = base.to_string();
    for target in TARGETS {
        directive.push_str(&format!(",{}={}", target, ours));
    }
    directive
}

/// Timestamped log file plus a `latest.log` pointer next to it
pub struct LogFile {
    path: PathBuf,
    file: File,
}

impl LogFile {
    pub fn create_in(log_dir: &Path) -> std::io::Result<Self> {
        std::fs::create_dir_all(log_dir)?;

        let timestamp = Local::now().format("%Y%m%d_%H%M%S");
        let path = log_dir.join(format!("bakery_{}.log", timestamp));
        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        let latest_path = log_dir.join("latest.log");

        #[cfg(unix)]
        {
            let _ = std::fs::remove_file(&latest_path);
            let _ = std::os::unix::fs::symlink(&path, &latest_path);
        }

        #[cfg(not(unix))]
        {
            let _ = std::fs::write(&latest_path, format!("Current log file: {}\n", path.display()));
        }

        Ok(Self { path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Install the global subscriber: compact stderr output, plus a file layer
/// when `log_to_file` is set. Returns the log file path if one was opened.
pub fn init_tracing(config: &LoggingConfig, verbosity: u8) -> Option<PathBuf> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directive(config, verbosity)));

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .without_time()
        .compact();

    let log_file = if config.log_to_file {
        AppPaths::log_dir()
            .map_err(|e| e.to_string())
            .and_then(|dir| LogFile::create_in(&dir).map_err(|e| e.to_string()))
            .map_err(|e| eprintln!("Log file disabled: {}", e))
            .ok()
    } else {
        None
    };

    let log_path = log_file.as_ref().map(|f| f.path().to_path_buf());
    let file_layer = log_file.map(|log_file| {
        fmt::layer()
            .with_writer(Mutex::new(log_file.file))
            .with_target(true)
            .with_ansi(false)
            .with_timer(fmt::time::LocalTime::rfc_3339())
    });

    let result = tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init();

    if result.is_ok() {
        tracing::debug!(target: "config", "Logging initialized");
    }
    log_path
}
