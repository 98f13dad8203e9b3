// src/main.rs

use anyhow::{Context, Result, bail};
use clap::{CommandFactory, Parser};
use elprofile::compare::{
    self, CompareOptions, DEFAULT_SIZE_TOLERANCE, Dimensions, ReportFormat, ReportSummary, Reporter,
};
use elprofile::packages::{MemorySource, PackageSource, RpmQuery};
use elprofile::profile::{self, Profile};
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;
use tracing::info;

/// Exit status for fatal errors
const EXIT_FATAL: u8 = 255;

/// Exit status for `--fail-on-diff` when regressions were found
const EXIT_DIRTY: u8 = 1;

#[derive(Parser)]
#[command(name = "elprofile")]
#[command(author, about = "Enterprise Linux package profile generator and compliance checker", long_about = None)]
#[command(disable_version_flag = true)]
struct Cli {
    /// Profile to compare the system against
    profile: Option<PathBuf>,

    /// Generate a profile of the installed packages and print it
    #[arg(short, long)]
    generate: bool,

    /// Run all comparisons
    #[arg(short, long)]
    all: bool,

    /// Compare requires
    #[arg(short, long)]
    requires: bool,

    /// Compare provides
    #[arg(short, long)]
    provides: bool,

    /// Compare files
    #[arg(short, long)]
    files: bool,

    /// Compare versions
    #[arg(short, long)]
    version: bool,

    /// Compare installed sizes
    #[arg(short, long)]
    size: bool,

    /// Size difference to warn about, in percent of the profiled size
    #[arg(short = 'S', long = "sizepercent", value_name = "PERCENT",
          default_value_t = DEFAULT_SIZE_TOLERANCE, value_parser = parse_percent)]
    size_percent: f64,

    /// Only show issues (hide packages that are not installed)
    #[arg(short, long)]
    quiet: bool,

    /// Compare against a second profile instead of the installed packages
    #[arg(long, value_name = "FILE")]
    against: Option<PathBuf>,

    /// Print discrepancies as JSON lines
    #[arg(long)]
    json: bool,

    /// Query the rpm database under this root directory
    #[arg(long, value_name = "DIR")]
    root: Option<PathBuf>,

    /// Timeout for each rpm query, in seconds
    #[arg(long, value_name = "SECS", default_value_t = 30)]
    timeout: u64,

    /// Worker threads for profile generation (default: one per CPU)
    #[arg(short, long, value_name = "N")]
    jobs: Option<usize>,

    /// Exit with status 1 when any regression is found
    #[arg(long)]
    fail_on_diff: bool,

    /// Print a shell completion script and exit
    #[arg(long, value_name = "SHELL")]
    completions: Option<clap_complete::Shell>,

    /// Print the program version and exit
    #[arg(short = 'V', long = "program-version")]
    program_version: bool,
}

impl Cli {
    fn compare_options(&self) -> CompareOptions {
        let dimensions = if self.all {
            Dimensions::all()
        } else {
            Dimensions {
                requires: self.requires,
                provides: self.provides,
                files: self.files,
                version: self.version,
                size: self.size,
            }
        };

        CompareOptions {
            dimensions: dimensions.resolve(),
            size_tolerance_percent: self.size_percent,
            quiet: self.quiet,
        }
    }

    fn report_format(&self) -> ReportFormat {
        if self.json {
            ReportFormat::Json
        } else {
            ReportFormat::Text
        }
    }

    fn rpm_query(&self) -> Result<RpmQuery> {
        let rpm = RpmQuery::new().with_timeout(Duration::from_secs(self.timeout));
        require_rpm(match &self.root {
            Some(root) => rpm.with_root(root),
            None => rpm,
        })
    }
}

fn require_rpm(rpm: RpmQuery) -> Result<RpmQuery> {
    if !rpm.is_available() {
        bail!("rpm not found: is this an rpm-based system?");
    }
    Ok(rpm)
}

fn parse_percent(value: &str) -> std::result::Result<f64, String> {
    let percent: f64 = value
        .parse()
        .map_err(|_| format!("'{}' is not a number", value))?;

    if !percent.is_finite() || percent < 0.0 {
        return Err(format!("'{}' must be a non-negative percentage", value));
    }
    Ok(percent)
}

fn main() -> ExitCode {
    // Initialize tracing subscriber for logging; stdout is reserved for
    // profiles and reports
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if !e.use_stderr() => e.exit(),
        Err(e) => {
            let _ = e.print();
            return ExitCode::from(EXIT_FATAL);
        }
    };

    exit_code(run(&cli))
}

fn exit_code(result: Result<ExitCode>) -> ExitCode {
    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("ERROR: {:#}", e);
            ExitCode::from(EXIT_FATAL)
        }
    }
}

fn run(cli: &Cli) -> Result<ExitCode> {
    if cli.program_version {
        println!("elprofile {}", env!("CARGO_PKG_VERSION"));
        return Ok(ExitCode::SUCCESS);
    }

    if let Some(shell) = cli.completions {
        clap_complete::generate(shell, &mut Cli::command(), "elprofile", &mut io::stdout());
        return Ok(ExitCode::SUCCESS);
    }

    if cli.generate {
        generate(cli)?;
        return Ok(ExitCode::SUCCESS);
    }

    let Some(profile_path) = &cli.profile else {
        bail!("check usage: pass --generate or a profile file to compare against");
    };

    let summary = check(cli, profile_path)?;
    if cli.fail_on_diff && !summary.is_clean() {
        return Ok(ExitCode::from(EXIT_DIRTY));
    }
    Ok(ExitCode::SUCCESS)
}

fn generate(cli: &Cli) -> Result<()> {
    if let Some(jobs) = cli.jobs {
        rayon::ThreadPoolBuilder::new()
            .num_threads(jobs)
            .build_global()
            .context("could not configure worker threads")?;
    }

    info!("Generating local system profile...");

    let profile =
        profile::build_profile(&cli.rpm_query()?).context("could not generate package listing")?;

    info!("Profiled {} packages", profile.len());
    profile
        .write_to(io::stdout().lock())
        .context("could not write profile")?;
    Ok(())
}

fn check(cli: &Cli, profile_path: &Path) -> Result<ReportSummary> {
    info!("Comparing against template: {}", profile_path.display());

    let baseline = Profile::load(profile_path).context("could not load profile")?;
    let options = cli.compare_options();

    let summary = match &cli.against {
        Some(other) => {
            info!("Using profile {} as the live system", other.display());
            let live = Profile::load(other).context("could not load comparison profile")?;
            audit(&baseline, MemorySource::from(live), &options, cli.report_format())?
        }
        None => audit(&baseline, cli.rpm_query()?, &options, cli.report_format())?,
    };

    info!(
        "{} discrepancies, {} packages not installed",
        summary.regressions, summary.not_installed
    );
    Ok(summary)
}

fn audit<S: PackageSource>(
    baseline: &Profile,
    source: S,
    options: &CompareOptions,
    format: ReportFormat,
) -> Result<ReportSummary> {
    let mut reporter = Reporter::new(io::stdout().lock(), io::stderr().lock(), format);
    reporter
        .emit_all(compare::compare(baseline, source, options))
        .context("could not write report")?;
    Ok(reporter.summary())
}
