//! Access to the process state the engine reads.
//!
//! The engine never touches `std::env` or the file system directly; it goes
//! through a [`Sources`] implementation. [`ProcessSources`] reads the real
//! process, [`StaticSources`] serves fixed in-memory values.

use std::cell::Cell;
use std::collections::HashMap;
use std::ffi::OsString;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

/// Read-only view of the command line, environment, files and stdin.
pub trait Sources {
    /// Command-line arguments, without the program name.
    ///
    /// Arguments are not required to be valid Unicode; the engine reports
    /// the ones that are not.
    fn args(&self) -> Vec<OsString>;

    /// Value of the environment variable `key`, if set.
    fn var(&self, key: &str) -> Option<OsString>;

    /// Full contents of the file at `path`.
    ///
    /// A missing file must be reported as [`io::ErrorKind::NotFound`].
    fn read_file(&self, path: &Path) -> io::Result<String>;

    /// Full contents of standard input.
    fn read_stdin(&self) -> io::Result<String>;
}

/// The running process.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessSources;

impl Sources for ProcessSources {
    fn args(&self) -> Vec<OsString> {
        std::env::args_os().skip(1).collect()
    }

    fn var(&self, key: &str) -> Option<OsString> {
        std::env::var_os(key)
    }

    fn read_file(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn read_stdin(&self) -> io::Result<String> {
        let mut buf = String::new();
        io::stdin().lock().read_to_string(&mut buf)?;
        Ok(buf)
    }
}

/// Fixed in-memory sources.
///
/// # Examples
///
/// ```
/// use std::ffi::OsString;
/// use std::path::Path;
/// use appconfig_core::{Sources, StaticSources};
///
/// let sources = StaticSources::new()
///     .with_args(["-timeout=250"])
///     .with_var("PORT", ":9090")
///     .with_file("config.json", r#"{"port": ":7070"}"#);
///
/// assert_eq!(sources.args(), vec![OsString::from("-timeout=250")]);
/// assert_eq!(sources.var("PORT"), Some(OsString::from(":9090")));
/// assert!(sources.read_file(Path::new("config.json")).is_ok());
/// assert!(sources.read_file(Path::new("missing.json")).is_err());
/// assert!(sources.read_stdin().is_err());
/// ```
#[derive(Debug, Default)]
pub struct StaticSources {
    args: Vec<OsString>,
    vars: HashMap<String, OsString>,
    files: HashMap<PathBuf, String>,
    stdin: Option<String>,
    stdin_reads: Cell<usize>,
}

impl StaticSources {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one argument.
    pub fn with_arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Appends several arguments.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Sets an environment variable.
    pub fn with_var(mut self, key: &str, value: impl Into<OsString>) -> Self {
        self.vars.insert(key.to_string(), value.into());
        self
    }

    /// Registers a file with the given contents.
    pub fn with_file(mut self, path: impl Into<PathBuf>, contents: &str) -> Self {
        self.files.insert(path.into(), contents.to_string());
        self
    }

    /// Sets the contents of standard input.
    pub fn with_stdin(mut self, contents: &str) -> Self {
        self.stdin = Some(contents.to_string());
        self
    }

    /// Number of times standard input was read.
    pub fn stdin_reads(&self) -> usize {
        self.stdin_reads.get()
    }
}

impl Sources for StaticSources {
    fn args(&self) -> Vec<OsString> {
        self.args.clone()
    }

    fn var(&self, key: &str) -> Option<OsString> {
        self.vars.get(key).cloned()
    }

    fn read_file(&self, path: &Path) -> io::Result<String> {
        self.files.get(path).cloned().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} not found", path.display()),
            )
        })
    }

    fn read_stdin(&self) -> io::Result<String> {
        self.stdin_reads.set(self.stdin_reads.get() + 1);
        self.stdin.clone().ok_or_else(|| {
            io::Error::new(io::ErrorKind::UnexpectedEof, "no standard input available")
        })
    }
}

impl<S: Sources + ?Sized> Sources for &S {
    fn args(&self) -> Vec<OsString> {
        (**self).args()
    }

    fn var(&self, key: &str) -> Option<OsString> {
        (**self).var(key)
    }

    fn read_file(&self, path: &Path) -> io::Result<String> {
        (**self).read_file(path)
    }

    fn read_stdin(&self) -> io::Result<String> {
        (**self).read_stdin()
    }
}

/// Environment variable consulted for parameter `name`.
///
/// The name is upper-cased and every character that is not an ASCII letter
/// or digit becomes `_`. A non-empty `prefix` is prepended the same way,
/// followed by `_`.
///
/// # Examples
///
/// ```
/// use appconfig_core::env_var_name;
///
/// assert_eq!(env_var_name(None, "statsd-addr"), "STATSD_ADDR");
/// assert_eq!(env_var_name(Some("app"), "timeout"), "APP_TIMEOUT");
/// assert_eq!(env_var_name(Some(""), "port"), "PORT");
/// ```
pub fn env_var_name(prefix: Option<&str>, name: &str) -> String {
    let normalize = |s: &str| -> String {
        s.chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() {
                    c.to_ascii_uppercase()
                } else {
                    '_'
                }
            })
            .collect()
    };

    match prefix.filter(|p| !p.is_empty()) {
        Some(prefix) => format!("{}_{}", normalize(prefix), normalize(name)),
        None => normalize(name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_var_name_replaces_punctuation() {
        assert_eq!(env_var_name(None, "config.node"), "CONFIG_NODE");
        assert_eq!(env_var_name(None, "statsd_addr"), "STATSD_ADDR");
        assert_eq!(env_var_name(Some("my-app"), "port"), "MY_APP_PORT");
    }

    #[test]
    fn test_static_sources_count_stdin_reads() {
        let sources = StaticSources::new().with_stdin("{}");
        assert_eq!(sources.stdin_reads(), 0);
        assert_eq!(sources.read_stdin().unwrap(), "{}");
        assert_eq!(sources.stdin_reads(), 1);
    }

    #[test]
    fn test_static_sources_missing_file_is_not_found() {
        let err = StaticSources::new()
            .read_file(Path::new("nope.json"))
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_process_sources_reads_real_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{}").unwrap();

        assert_eq!(ProcessSources.read_file(&path).unwrap(), "{}");
        let missing = ProcessSources
            .read_file(&dir.path().join("missing.json"))
            .unwrap_err();
        assert_eq!(missing.kind(), io::ErrorKind::NotFound);
    }
}
