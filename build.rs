// build.rs

use clap::{Arg, ArgAction, Command};
use clap_mangen::Man;
use std::env;
use std::fs;
use std::path::PathBuf;

fn flag(id: &'static str, short: char, help: &'static str) -> Arg {
    Arg::new(id)
        .short(short)
        .long(id)
        .action(ArgAction::SetTrue)
        .help(help)
}

fn build_cli() -> Command {
    Command::new("elprofile")
        .version(env!("CARGO_PKG_VERSION"))
        .author("elprofile Contributors")
        .about("Enterprise Linux package profile generator and compliance checker")
        .disable_version_flag(true)
        .arg(Arg::new("profile").help("Profile to compare the system against"))
        .arg(flag("generate", 'g', "Generate a profile of the installed packages and print it"))
        .arg(flag("all", 'a', "Run all comparisons"))
        .arg(flag("requires", 'r', "Compare requires"))
        .arg(flag("provides", 'p', "Compare provides"))
        .arg(flag("files", 'f', "Compare files"))
        .arg(flag("version", 'v', "Compare versions"))
        .arg(flag("size", 's', "Compare installed sizes"))
        .arg(
            Arg::new("sizepercent")
                .short('S')
                .long("sizepercent")
                .value_name("PERCENT")
                .default_value("2.5")
                .help("Size difference to warn about, in percent of the profiled size"),
        )
        .arg(flag("quiet", 'q', "Only show issues (hide packages that are not installed)"))
        .arg(
            Arg::new("against")
                .long("against")
                .value_name("FILE")
                .help("Compare against a second profile instead of the installed packages"),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .action(ArgAction::SetTrue)
                .help("Print discrepancies as JSON lines"),
        )
        .arg(
            Arg::new("root")
                .long("root")
                .value_name("DIR")
                .help("Query the rpm database under this root directory"),
        )
        .arg(
            Arg::new("timeout")
                .long("timeout")
                .value_name("SECS")
                .default_value("30")
                .help("Timeout for each rpm query, in seconds"),
        )
        .arg(
            Arg::new("jobs")
                .short('j')
                .long("jobs")
                .value_name("N")
                .help("Worker threads for profile generation (default: one per CPU)"),
        )
        .arg(
            Arg::new("fail-on-diff")
                .long("fail-on-diff")
                .action(ArgAction::SetTrue)
                .help("Exit with status 1 when any regression is found"),
        )
        .arg(
            Arg::new("completions")
                .long("completions")
                .value_name("SHELL")
                .value_parser(["bash", "elvish", "fish", "powershell", "zsh"])
                .help("Print a shell completion script and exit"),
        )
        .arg(flag("program-version", 'V', "Print the program version and exit"))
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    // Create man directory
    let out_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap());
    let man_dir = out_dir.join("man");
    fs::create_dir_all(&man_dir).expect("Failed to create man directory");

    // Generate main man page
    let cmd = build_cli();
    let man = Man::new(cmd);
    let mut buffer = Vec::new();
    man.render(&mut buffer)
        .expect("Failed to render man page");

    let man_path = man_dir.join("elprofile.1");
    fs::write(&man_path, buffer).expect("Failed to write man page");
}
