mod args;
mod json;
mod path;
mod text;

use std::env;
use std::io;
use std::path::Path;

use log::info;
use patch_track_core::{ReviewUnitInput, ScanStats};

use args::{Command, ParsedArgs, Target, parse_args, print_help};
use json::{JsonScanStats, JsonUnitReport, map_dataset, map_unit, write_json};
use path::{resolve_dir, resolve_path};
use text::{format_dataset, format_scan_stats, format_unit, has_error_verdict, has_fatal_skips};

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .format_target(false)
        .init();
}

fn main() {
    let argv: Vec<String> = env::args().skip(1).collect();
    let parsed = match parse_args(&argv) {
        Ok(Command::Run(parsed)) => parsed,
        Ok(Command::Help) => {
            print_help();
            return;
        }
        Ok(Command::Version) => {
            println!("patch-track {}", env!("CARGO_PKG_VERSION"));
            return;
        }
        Err(message) => {
            eprintln!("Error: {message}\n");
            print_help();
            std::process::exit(2);
        }
    };

    init_logging(parsed.verbose);

    match run(&parsed) {
        Ok(exit_code) => std::process::exit(exit_code),
        Err(err) => {
            eprintln!("Error: {err}");
            std::process::exit(1);
        }
    }
}

fn run(parsed: &ParsedArgs) -> io::Result<i32> {
    let (units, text, json, stats) = match &parsed.target {
        Target::Dataset(root) => {
            let root = resolve_dir(root, "dataset root")?;
            info!("analyzing dataset {}", root.display());
            let outcome = patch_track_core::analyze_dataset_with_stats(&root, &parsed.options)?;
            let report = map_dataset(outcome.result);
            let text = format_dataset(&report);
            let json = serde_json::to_value(&report).map_err(io::Error::other)?;
            (report.units, text, json, outcome.stats)
        }
        Target::Unit {
            patch_dir,
            source_dir,
        } => {
            let patch_dir = resolve_path(patch_dir)?;
            let source_dir = resolve_path(source_dir)?;
            let input = ReviewUnitInput {
                id: unit_id(&patch_dir, &source_dir),
                project: String::new(),
                patch_dir,
                source_dir,
            };
            let outcome =
                patch_track_core::analyze_review_unit_with_stats(&input, &parsed.options)?;
            let report = map_unit(outcome.result);
            let text = format_unit(&report);
            let json = serde_json::to_value(&report).map_err(io::Error::other)?;
            (vec![report], text, json, outcome.stats)
        }
    };

    if parsed.json {
        if parsed.stats {
            write_json(&serde_json::json!({
                "report": json,
                "scanStats": JsonScanStats::from(stats.clone()),
            }))?;
        } else {
            write_json(&json)?;
        }
    } else {
        print!("{text}");
    }

    if parsed.stats && !parsed.json {
        eprint!("{}", format_scan_stats(&stats));
    }
    Ok(exit_code(parsed, &units, &stats))
}

fn exit_code(parsed: &ParsedArgs, units: &[JsonUnitReport], stats: &ScanStats) -> i32 {
    if !parsed.strict {
        return 0;
    }
    if has_fatal_skips(stats) {
        if !parsed.stats {
            eprint!("{}", format_scan_stats(stats));
        }
        return 1;
    }
    if has_error_verdict(units) {
        return 1;
    }
    0
}

/// The unit directory name when both paths share a parent, else the patch path.
fn unit_id(patch_dir: &Path, source_dir: &Path) -> String {
    let parent = patch_dir.parent();
    let name = match parent {
        Some(parent) if source_dir.parent() == Some(parent) => parent.file_name(),
        _ => patch_dir.file_name(),
    };
    name.map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| patch_dir.display().to_string())
}
