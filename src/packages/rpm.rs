// src/packages/rpm.rs

//! Query installed RPM packages from the system database
//!
//! This module answers `PackageSource` queries by running the `rpm`
//! command-line tool, one invocation per attribute. Every invocation is
//! bounded by a timeout so a wedged rpm database cannot hang an audit.

use crate::error::{Error, Result};
use crate::packages::traits::PackageSource;
use std::io::Read;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};
use tracing::debug;
use wait_timeout::ChildExt;

/// Default timeout for a single rpm invocation (30 seconds)
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// rpm's message for a package missing from the database
const NOT_INSTALLED_MARKER: &str = "is not installed";

/// rpm's placeholder line for packages that own no files
const NO_FILES_MARKER: &str = "(contains no files)";

/// Package source backed by the `rpm` command
#[derive(Debug, Clone)]
pub struct RpmQuery {
    program: PathBuf,
    root: Option<PathBuf>,
    timeout: Duration,
}

/// Captured result of one rpm invocation
struct QueryOutput {
    success: bool,
    stdout: String,
    stderr: String,
}

impl Default for RpmQuery {
    fn default() -> Self {
        Self {
            program: PathBuf::from("rpm"),
            root: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl RpmQuery {
    /// Create a query adapter for the system rpm database
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a different rpm executable
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    /// Query the database under an alternate root directory
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }

    /// Set custom timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Check if the rpm executable is available
    pub fn is_available(&self) -> bool {
        Command::new(&self.program)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }

    /// Run rpm with the given arguments, bounded by the timeout
    fn run(&self, args: &[&str]) -> Result<QueryOutput> {
        let mut cmd = Command::new(&self.program);
        if let Some(root) = &self.root {
            cmd.arg("--root").arg(root);
        }
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        debug!("Running {} {}", self.program.display(), args.join(" "));

        let started = Instant::now();
        let mut child = cmd.spawn().map_err(|e| {
            Error::QueryError(format!(
                "Failed to run {}: {}. Is rpm installed?",
                self.program.display(),
                e
            ))
        })?;

        // Drain both pipes concurrently so large file lists cannot fill the
        // pipe buffer while we wait on the child
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let status = match child.wait_timeout(self.timeout)? {
            Some(status) => status,
            None => {
                // Timeout - kill the process
                let _ = child.kill();
                let _ = child.wait();
                return Err(self.timed_out(args));
            }
        };

        // A background process started by rpm can keep the pipes open after
        // rpm itself exits, so reading them shares the same deadline
        Ok(QueryOutput {
            success: status.success(),
            stdout: self.collect(&stdout, started, args)?,
            stderr: self.collect(&stderr, started, args)?,
        })
    }

    /// Wait for a drained pipe within whatever is left of the timeout
    fn collect(&self, pipe: &Receiver<Vec<u8>>, started: Instant, args: &[&str]) -> Result<String> {
        let remaining = self.timeout.saturating_sub(started.elapsed());
        match pipe.recv_timeout(remaining) {
            Ok(bytes) => Ok(String::from_utf8_lossy(&bytes).into_owned()),
            Err(RecvTimeoutError::Disconnected) => Ok(String::new()),
            Err(RecvTimeoutError::Timeout) => Err(self.timed_out(args)),
        }
    }

    fn timed_out(&self, args: &[&str]) -> Error {
        Error::QueryError(format!(
            "{} {} timed out after {:?}",
            self.program.display(),
            args.join(" "),
            self.timeout
        ))
    }

    /// Run a per-package query and return its non-empty output lines
    fn query(&self, name: &str, args: &[&str]) -> Result<Vec<String>> {
        let mut full_args = vec!["-q"];
        full_args.extend_from_slice(args);
        full_args.push(name);

        let output = self.run(&full_args)?;
        if !output.success {
            return Err(classify_failure(name, &output));
        }

        Ok(output_lines(&output.stdout))
    }
}

impl PackageSource for RpmQuery {
    fn list_installed(&self) -> Result<Vec<String>> {
        debug!("Querying installed RPM packages");

        let output = self
            .run(&["-qa", "--queryformat", "%{NAME}\n"])
            .map_err(|e| Error::EnumerationError(e.to_string()))?;

        if !output.success {
            return Err(Error::EnumerationError(format!(
                "rpm -qa failed: {}",
                output.stderr.trim()
            )));
        }

        let mut packages = output_lines(&output.stdout);
        packages.sort();
        packages.dedup();

        debug!("Found {} installed packages", packages.len());
        Ok(packages)
    }

    fn requires(&self, name: &str) -> Result<Vec<String>> {
        self.query(name, &["--requires"])
    }

    fn provides(&self, name: &str) -> Result<Vec<String>> {
        self.query(name, &["--provides"])
    }

    fn files(&self, name: &str) -> Result<Vec<String>> {
        let files = self
            .query(name, &["--list"])?
            .into_iter()
            .filter(|line| line != NO_FILES_MARKER)
            .collect();
        Ok(files)
    }

    fn version(&self, name: &str) -> Result<String> {
        let lines = self.query(
            name,
            &["--queryformat", "%{EPOCH}:%{VERSION}-%{RELEASE}\n"],
        )?;
        merge_versions(name, &lines)
    }

    fn size(&self, name: &str) -> Result<u64> {
        let lines = self.query(name, &["--queryformat", "%{SIZE}\n"])?;
        sum_sizes(name, &lines)
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Receiver<Vec<u8>> {
    let (tx, rx) = mpsc::channel();
    if let Some(mut pipe) = pipe {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            let _ = tx.send(buf);
        });
    }
    rx
}

/// Split rpm output into trimmed, non-empty lines
fn output_lines(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn classify_failure(name: &str, output: &QueryOutput) -> Error {
    if output.stdout.contains(NOT_INSTALLED_MARKER) || output.stderr.contains(NOT_INSTALLED_MARKER)
    {
        Error::NotInstalled(name.to_string())
    } else {
        Error::QueryError(format!(
            "rpm query for '{}' failed: {}",
            name,
            output.stderr.trim()
        ))
    }
}

/// Render one `EPOCH:VERSION-RELEASE` line, dropping an empty or zero epoch
fn format_version(line: &str) -> String {
    match line.split_once(':') {
        Some((epoch, rest)) if epoch == "(none)" || epoch == "0" || epoch.is_empty() => {
            rest.to_string()
        }
        _ => line.to_string(),
    }
}

/// Combine the versions of every installed instance of a package
fn merge_versions(name: &str, lines: &[String]) -> Result<String> {
    let mut versions: Vec<String> = lines.iter().map(|l| format_version(l)).collect();
    versions.sort();
    versions.dedup();

    if versions.is_empty() {
        return Err(Error::QueryError(format!(
            "rpm returned no version for '{}'",
            name
        )));
    }
    Ok(versions.join(","))
}

/// Sum the sizes of every installed instance of a package
fn sum_sizes(name: &str, lines: &[String]) -> Result<u64> {
    if lines.is_empty() {
        return Err(Error::QueryError(format!("rpm returned no size for '{}'", name)));
    }

    lines.iter().try_fold(0u64, |total, line| {
        line.parse::<u64>()
            .map(|size| total.saturating_add(size))
            .map_err(|e| {
                Error::QueryError(format!("Unexpected size '{}' for '{}': {}", line, name, e))
            })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_format_version_drops_empty_epoch() {
        assert_eq!(format_version("(none):5.1.8-9.el9"), "5.1.8-9.el9");
        assert_eq!(format_version("0:1.0-1"), "1.0-1");
        assert_eq!(format_version("2:1.0.0-1.fc43"), "2:1.0.0-1.fc43");
    }

    #[test]
    fn test_merge_versions_of_multiple_instances() {
        let merged = merge_versions(
            "kernel",
            &lines(&["(none):5.14.0-427-el9", "(none):5.14.0-362-el9", "(none):5.14.0-427-el9"]),
        )
        .unwrap();
        assert_eq!(merged, "5.14.0-362-el9,5.14.0-427-el9");

        assert!(merge_versions("kernel", &[]).is_err());
    }

    #[test]
    fn test_sum_sizes() {
        assert_eq!(sum_sizes("kernel", &lines(&["100", "250"])).unwrap(), 350);
        assert!(matches!(
            sum_sizes("kernel", &lines(&["abc"])),
            Err(Error::QueryError(_))
        ));
        assert!(sum_sizes("kernel", &[]).is_err());
    }

    #[test]
    fn test_output_lines_skips_blanks() {
        assert_eq!(output_lines("a\n\n  b  \n"), vec!["a", "b"]);
    }

    #[test]
    fn test_classify_failure() {
        let missing = QueryOutput {
            success: false,
            stdout: "package nosuch is not installed\n".to_string(),
            stderr: String::new(),
        };
        assert!(matches!(
            classify_failure("nosuch", &missing),
            Error::NotInstalled(_)
        ));

        let broken = QueryOutput {
            success: false,
            stdout: String::new(),
            stderr: "error: rpmdb open failed\n".to_string(),
        };
        assert!(matches!(
            classify_failure("bash", &broken),
            Error::QueryError(_)
        ));
    }

    #[test]
    fn test_missing_program_is_query_error() {
        let rpm = RpmQuery::new().with_program("/nonexistent/rpm");

        assert!(!rpm.is_available());
        assert!(matches!(rpm.requires("bash"), Err(Error::QueryError(_))));
        assert!(matches!(
            rpm.list_installed(),
            Err(Error::EnumerationError(_))
        ));
    }

    #[cfg(unix)]
    mod fake_rpm {
        use super::super::*;
        use std::fs;
        use std::os::unix::fs::PermissionsExt;
        use std::sync::Mutex;
        use tempfile::TempDir;

        // Writing an executable while another test thread forks can fail
        // with ETXTBSY, so script tests run one at a time
        static SPAWN_LOCK: Mutex<()> = Mutex::new(());

        fn fake_rpm(body: &str) -> (TempDir, RpmQuery) {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("rpm");
            fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
            fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
            (dir, RpmQuery::new().with_program(path))
        }

        #[test]
        fn test_not_installed_package() {
            let _guard = SPAWN_LOCK.lock().unwrap_or_else(|e| e.into_inner());
            let (_dir, rpm) = fake_rpm("echo \"package $3 is not installed\"\nexit 1");

            assert!(matches!(rpm.requires("nosuch"), Err(Error::NotInstalled(name)) if name == "nosuch"));
        }

        #[test]
        fn test_capabilities_and_files_are_read_line_by_line() {
            let _guard = SPAWN_LOCK.lock().unwrap_or_else(|e| e.into_inner());
            let (_dir, rpm) = fake_rpm("printf 'libc.so.6 >= 2\\n/bin/sh\\n\\n'");

            assert_eq!(rpm.requires("bash").unwrap(), vec!["libc.so.6 >= 2", "/bin/sh"]);
        }

        #[test]
        fn test_empty_file_list() {
            let _guard = SPAWN_LOCK.lock().unwrap_or_else(|e| e.into_inner());
            let (_dir, rpm) = fake_rpm("echo '(contains no files)'");

            assert!(rpm.files("filesystem-meta").unwrap().is_empty());
        }

        #[test]
        fn test_root_is_passed_before_query() {
            let _guard = SPAWN_LOCK.lock().unwrap_or_else(|e| e.into_inner());
            let (dir, rpm) =
                fake_rpm("[ \"$1\" = --root ] && [ -d \"$2\" ] || exit 2\necho '(none):1.0-1'");

            assert!(matches!(rpm.version("bash"), Err(Error::QueryError(_))));
            let rpm = rpm.with_root(dir.path());
            assert_eq!(rpm.version("bash").unwrap(), "1.0-1");
        }

        #[test]
        fn test_query_times_out() {
            let _guard = SPAWN_LOCK.lock().unwrap_or_else(|e| e.into_inner());
            let (_dir, rpm) = fake_rpm("exec sleep 5");
            let rpm = rpm.with_timeout(Duration::from_millis(200));

            match rpm.size("bash") {
                Err(Error::QueryError(msg)) => assert!(msg.contains("timed out")),
                other => panic!("expected timeout, got {:?}", other),
            }
        }

        #[test]
        fn test_background_child_holding_stdout_times_out() {
            let _guard = SPAWN_LOCK.lock().unwrap_or_else(|e| e.into_inner());
            let (_dir, rpm) = fake_rpm("sleep 4 &\necho 100");
            let rpm = rpm.with_timeout(Duration::from_millis(300));

            let started = Instant::now();
            let result = rpm.size("bash");

            assert!(started.elapsed() < Duration::from_secs(2));
            match result {
                Err(Error::QueryError(msg)) => assert!(msg.contains("timed out")),
                other => panic!("expected timeout, got {:?}", other),
            }
        }

        #[test]
        fn test_output_is_read_after_quick_exit() {
            let _guard = SPAWN_LOCK.lock().unwrap_or_else(|e| e.into_inner());
            let (_dir, rpm) = fake_rpm("echo 100\necho 250");
            let rpm = rpm.with_timeout(Duration::from_secs(5));

            assert_eq!(rpm.size("kernel").unwrap(), 350);
        }
    }
}
