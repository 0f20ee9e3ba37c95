//! Session log for batch runs.
//!
//! One file per run, truncated on open. Location, first match wins:
//!   1. [`LogConfig::path`] (the CLI's `--log-file`)
//!   2. the `FILTERMIX_LOG` environment variable
//!   3. `<platform data dir>/FilterMixtures/filtermix.log`
//!
//! Emit records with `log_debug!` / `log_info!` / `log_warn!` / `log_err!`.
//! Until [`init`] succeeds every macro is a no-op, so library callers and
//! tests pay nothing.

use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};
use std::time::{SystemTime, UNIX_EPOCH};

/// Environment variable that overrides the log file location.
pub const LOG_ENV_VAR: &str = "FILTERMIX_LOG";

/// Severity of a log record, lowest first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Level {
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl Level {
    pub fn tag(self) -> &'static str {
        match self {
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// How the session log is opened.
#[derive(Clone, Debug, Default)]
pub struct LogConfig {
    /// Explicit file; beats the environment and the data directory.
    pub path: Option<PathBuf>,
    /// Records below this level are dropped.
    pub min_level: Level,
}

struct Session {
    file: Mutex<File>,
    path: PathBuf,
    min_level: Level,
}

static SESSION: OnceLock<Session> = OnceLock::new();

/// Path of the open session log, if any.
pub fn log_path() -> Option<&'static Path> {
    SESSION.get().map(|s| s.path.as_path())
}

/// Whether a record at `level` would be written.
pub fn enabled(level: Level) -> bool {
    SESSION.get().is_some_and(|s| level >= s.min_level)
}

/// Append one record. I/O failures are swallowed.
pub fn log(level: Level, args: fmt::Arguments<'_>) {
    let Some(session) = SESSION.get() else {
        return;
    };
    if level < session.min_level {
        return;
    }
    append(session, &format!("{} {:<5} {}", clock(), level.tag(), args));
}

fn append(session: &Session, line: &str) {
    if let Ok(mut file) = session.file.lock() {
        let _ = writeln!(file, "{}", line);
    }
}

#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        $crate::logger::log($crate::logger::Level::Debug, format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        $crate::logger::log($crate::logger::Level::Info, format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        $crate::logger::log($crate::logger::Level::Warn, format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_err {
    ($($arg:tt)*) => {
        $crate::logger::log($crate::logger::Level::Error, format_args!($($arg)*))
    };
}

/// Open the session log. Later calls are ignored.
///
/// A file that cannot be created is reported on stderr and logging stays
/// disabled; the run itself continues. Panics are mirrored into the log
/// before the previous hook runs.
pub fn init(config: &LogConfig) {
    if SESSION.get().is_some() {
        return;
    }
    let env_path = std::env::var_os(LOG_ENV_VAR).map(PathBuf::from);
    let path = resolve_log_path(config.path.as_deref(), env_path.as_deref(), &data_dir());

    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        let _ = fs::create_dir_all(dir);
    }
    let file = match OpenOptions::new().create(true).write(true).truncate(true).open(&path) {
        Ok(file) => file,
        Err(e) => {
            eprintln!("warning: cannot open log file {}: {}", path.display(), e);
            return;
        }
    };

    let session = Session {
        file: Mutex::new(file),
        path,
        min_level: config.min_level,
    };
    if SESSION.set(session).is_err() {
        return;
    }
    if let Some(session) = SESSION.get() {
        append(
            session,
            &format!(
                "--- filtermix {} | unix time {} | level {} ---",
                env!("CARGO_PKG_VERSION"),
                unix_seconds(),
                session.min_level
            ),
        );
    }

    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        if let Some(session) = SESSION.get() {
            append(session, &format!("{} PANIC {}", clock(), info));
        }
        previous(info);
    }));
}

/// Explicit path, then a non-empty environment override, then
/// `<data_dir>/FilterMixtures/filtermix.log`.
fn resolve_log_path(explicit: Option<&Path>, env: Option<&Path>, data_dir: &Path) -> PathBuf {
    explicit
        .or(env.filter(|p| !p.as_os_str().is_empty()))
        .map(Path::to_path_buf)
        .unwrap_or_else(|| data_dir.join("FilterMixtures").join("filtermix.log"))
}

fn data_dir() -> PathBuf {
    let var = |name: &str| std::env::var_os(name).filter(|v| !v.is_empty()).map(PathBuf::from);

    let platform = if cfg!(target_os = "windows") {
        var("APPDATA")
    } else if cfg!(target_os = "macos") {
        var("HOME").map(|h| h.join("Library/Application Support"))
    } else {
        var("XDG_DATA_HOME").or_else(|| var("HOME").map(|h| h.join(".local/share")))
    };
    platform.unwrap_or_else(|| PathBuf::from("."))
}

fn unix_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// UTC wall clock as `HH:MM:SS.mmm`.
fn clock() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    let day_ms = millis % 86_400_000;
    format!(
        "{:02}:{:02}:{:02}.{:03}",
        day_ms / 3_600_000,
        day_ms / 60_000 % 60,
        day_ms / 1000 % 60,
        day_ms % 1000
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_path_wins() {
        let p = resolve_log_path(
            Some(Path::new("/tmp/a.log")),
            Some(Path::new("/tmp/b.log")),
            Path::new("/data"),
        );
        assert_eq!(p, PathBuf::from("/tmp/a.log"));
    }

    #[test]
    fn env_path_beats_data_dir() {
        let p = resolve_log_path(None, Some(Path::new("/tmp/b.log")), Path::new("/data"));
        assert_eq!(p, PathBuf::from("/tmp/b.log"));
    }

    #[test]
    fn empty_env_falls_back_to_app_folder() {
        let p = resolve_log_path(None, Some(Path::new("")), Path::new("/data"));
        assert_eq!(p, Path::new("/data").join("FilterMixtures").join("filtermix.log"));
    }

    #[test]
    fn levels_are_ordered() {
        assert!(Level::Debug < Level::Info);
        assert!(Level::Warn < Level::Error);
        assert_eq!(Level::default(), Level::Info);
        assert_eq!(Level::Warn.to_string(), "WARN");
    }

    #[test]
    fn clock_is_well_formed() {
        let ts = clock();
        assert_eq!(ts.len(), 12);
        assert_eq!(&ts[2..3], ":");
        assert_eq!(&ts[8..9], ".");
    }

    #[test]
    fn macros_are_silent_before_init() {
        // No session in unit tests; the call must not panic.
        crate::log_debug!("nothing {}", 1);
        assert!(!enabled(Level::Error) || log_path().is_some());
    }
}
