// src/compare/report.rs

//! Report emitter
//!
//! Text reports write one fixed-width line per regression to the output
//! stream and `NOT INSTALLED` notices to the diagnostic stream, keeping the
//! output pipeable. JSON reports write one object per discrepancy to the
//! output stream.

use super::Discrepancy;
use std::io::{self, Write};

/// Report rendering
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReportFormat {
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

/// Counts of what was reported
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReportSummary {
    pub regressions: usize,
    pub not_installed: usize,
}

impl ReportSummary {
    pub fn is_clean(&self) -> bool {
        self.regressions == 0
    }
}

/// Writes discrepancies to an output and a diagnostic stream
pub struct Reporter<O: Write, E: Write> {
    out: O,
    err: E,
    format: ReportFormat,
    summary: ReportSummary,
}

impl<O: Write, E: Write> Reporter<O, E> {
    pub fn new(out: O, err: E, format: ReportFormat) -> Self {
        Self {
            out,
            err,
            format,
            summary: ReportSummary::default(),
        }
    }

    /// Write one discrepancy
    pub fn emit(&mut self, discrepancy: &Discrepancy) -> io::Result<()> {
        if discrepancy.is_regression() {
            self.summary.regressions += 1;
        } else {
            self.summary.not_installed += 1;
        }

        match self.format {
            ReportFormat::Json => {
                serde_json::to_writer(&mut self.out, discrepancy)?;
                writeln!(self.out)
            }
            ReportFormat::Text if discrepancy.is_regression() => {
                writeln!(self.out, "{}", discrepancy)
            }
            ReportFormat::Text => writeln!(self.err, "{}", discrepancy),
        }
    }

    /// Write every discrepancy from an iterator
    pub fn emit_all<I>(&mut self, discrepancies: I) -> io::Result<()>
    where
        I: IntoIterator<Item = Discrepancy>,
    {
        for discrepancy in discrepancies {
            self.emit(&discrepancy)?;
        }
        self.out.flush()?;
        self.err.flush()
    }

    pub fn summary(&self) -> ReportSummary {
        self.summary
    }

    /// Release the underlying streams
    pub fn into_inner(self) -> (O, E) {
        (self.out, self.err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compare::DiscrepancyKind;

    fn sample() -> Vec<Discrepancy> {
        vec![
            Discrepancy::new(
                "bash",
                DiscrepancyKind::MissingFile {
                    path: "/usr/bin/sh".to_string(),
                },
            ),
            Discrepancy::new("telnet", DiscrepancyKind::NotInstalled),
            Discrepancy::new(
                "zlib",
                DiscrepancyKind::VersionMismatch {
                    live: "1.2.11-41.el9".to_string(),
                    baseline: "1.2.11-40.el9".to_string(),
                },
            ),
        ]
    }

    #[test]
    fn test_text_report_splits_streams() {
        let mut reporter = Reporter::new(Vec::new(), Vec::new(), ReportFormat::Text);
        reporter.emit_all(sample()).unwrap();

        assert_eq!(
            reporter.summary(),
            ReportSummary {
                regressions: 2,
                not_installed: 1
            }
        );

        let (out, err) = reporter.into_inner();
        let out = String::from_utf8(out).unwrap();
        let err = String::from_utf8(err).unwrap();

        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("bash "));
        assert!(lines[0].ends_with("MISSING FILES:     /usr/bin/sh"));
        assert!(lines[1].contains("VERSION MISMATCH:  local=1.2.11-41.el9"));
        assert!(lines[1].ends_with("profile=1.2.11-40.el9"));

        assert_eq!(err, format!("{:<40} NOT INSTALLED\n", "telnet"));
    }

    #[test]
    fn test_json_report_is_one_object_per_line() {
        let mut reporter = Reporter::new(Vec::new(), Vec::new(), ReportFormat::Json);
        reporter.emit_all(sample()).unwrap();

        let (out, err) = reporter.into_inner();
        assert!(err.is_empty());

        let values: Vec<serde_json::Value> = String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();

        assert_eq!(values.len(), 3);
        assert_eq!(values[0]["package"], "bash");
        assert_eq!(values[0]["kind"], "missing_file");
        assert_eq!(values[0]["path"], "/usr/bin/sh");
        assert_eq!(values[1]["kind"], "not_installed");
        assert_eq!(values[2]["live"], "1.2.11-41.el9");
    }

    #[test]
    fn test_summary_clean_ignores_not_installed() {
        let mut reporter = Reporter::new(io::sink(), io::sink(), ReportFormat::Text);
        reporter
            .emit(&Discrepancy::new("telnet", DiscrepancyKind::NotInstalled))
            .unwrap();

        assert!(reporter.summary().is_clean());
    }
}
