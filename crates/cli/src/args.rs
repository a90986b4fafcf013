use std::env;
use std::path::PathBuf;

use patch_track_core::{AnalysisOptions, Language, MatchMode, Polarity};

const HELP_TEXT: &str = concat!(
    "patch-track (did a patch land in the code it was suggested for?)\n",
    "\n",
    "Usage:\n",
    "  patch-track [options] [dataset-root]\n",
    "  patch-track [options] --unit <patch-dir> <source-dir>\n",
    "\n",
    "Options:\n",
    "  --unit                  Analyze a single review unit instead of a dataset\n",
    "  --polarity <side>       Diff side to look for: added|removed (default: added)\n",
    "  --ngram-size <n>        N-gram width in tokens (default: 1)\n",
    "  --bloom-bits <n>        Bloom filter capacity in bits (default: 2097152)\n",
    "  --batch-ratio <n>       Reset the filter every bloom-bits/n n-grams (default: 32)\n",
    "  --hunk-threshold <f>    Fraction of a hunk that must match: 0..1 (default: 0.5)\n",
    "  --similarity-threshold <f>  Similarity needed for PA: 0..1 (default: 0.3)\n",
    "  --priority-min-chars <n>  Minimum length of a priority n-gram (default: 8)\n",
    "  --no-priority           Do not require priority n-grams to match\n",
    "  --match-mode <mode>     all|path: pair diffs with every source file or by path (default: all)\n",
    "  --language <id>         Force a source language (name, index or extension)\n",
    "  --max-file-size <n>     Skip files larger than n bytes (default: 10485760)\n",
    "  --ignore-dir <name>     Add an ignored directory name (repeatable)\n",
    "  --no-gitignore          Do not respect .gitignore rules\n",
    "  --json                  Output JSON\n",
    "  --stats                 Include scan stats (JSON) or print to stderr\n",
    "  --strict                Exit non-zero on ERROR verdicts or fatal skips\n",
    "  -v, --verbose           Log progress to stderr\n",
    "  -V, --version           Show version\n",
    "  -h, --help              Show help\n",
    "\n",
    "Notes:\n",
    "  - A dataset root is laid out as <owner>/<repo>/<unit>/{github,chatgpt}\n",
    "  - Verdicts: PA applied, PN not applied, NE not existing, CC cannot classify, ERROR\n",
    "  - RUST_LOG overrides the log filter\n",
    "\n",
    "Examples:\n",
    "  patch-track ./dataset\n",
    "  patch-track --match-mode path --json ./dataset\n",
    "  patch-track --unit ./pr-12/github ./pr-12/chatgpt\n",
    "  patch-track --polarity removed --ngram-size 3 ./dataset\n",
    "\n"
);

pub(crate) fn print_help() {
    print!("{HELP_TEXT}");
}

/// What to analyze.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Target {
    Dataset(PathBuf),
    Unit {
        patch_dir: PathBuf,
        source_dir: PathBuf,
    },
}

#[derive(Debug, Clone)]
pub(crate) struct ParsedArgs {
    pub(crate) json: bool,
    pub(crate) stats: bool,
    pub(crate) strict: bool,
    pub(crate) verbose: bool,
    pub(crate) target: Target,
    pub(crate) options: AnalysisOptions,
}

#[derive(Debug, Clone)]
pub(crate) enum Command {
    Run(ParsedArgs),
    Help,
    Version,
}

fn parse_u64(name: &str, raw: &str) -> Result<u64, String> {
    raw.parse::<u64>()
        .map_err(|_| format!("{name} must be an integer"))
}

fn parse_usize_at_least(name: &str, raw: &str, min: usize) -> Result<usize, String> {
    let value = raw
        .parse::<usize>()
        .map_err(|_| format!("{name} must be an integer"))?;
    if value < min {
        return Err(format!("{name} must be >= {min}"));
    }
    Ok(value)
}

fn parse_fraction(name: &str, raw: &str) -> Result<f64, String> {
    let value = raw
        .parse::<f64>()
        .map_err(|_| format!("{name} must be a number"))?;
    if !value.is_finite() || !(0.0..=1.0).contains(&value) {
        return Err(format!("{name} must be 0..1"));
    }
    Ok(value)
}

fn value<'a>(argv: &'a [String], i: usize, name: &str) -> Result<&'a str, String> {
    argv.get(i + 1)
        .map(String::as_str)
        .ok_or_else(|| format!("{name} requires a value"))
}

pub(crate) fn parse_args(argv: &[String]) -> Result<Command, String> {
    let mut positionals: Vec<PathBuf> = Vec::new();
    let mut ignore_dirs: Vec<String> = Vec::new();
    let mut unit = false;
    let mut json = false;
    let mut stats = false;
    let mut strict = false;
    let mut verbose = false;
    let mut options = AnalysisOptions::default();

    let mut i = 0;
    while i < argv.len() {
        let arg = argv[i].as_str();
        if arg == "--" {
            positionals.extend(argv[(i + 1)..].iter().map(PathBuf::from));
            break;
        }
        match arg {
            "-h" | "--help" => return Ok(Command::Help),
            "-V" | "--version" => return Ok(Command::Version),
            "--unit" => unit = true,
            "--json" => json = true,
            "--stats" => stats = true,
            "--strict" => strict = true,
            "-v" | "--verbose" => verbose = true,
            "--no-priority" => options.priority_rule = false,
            "--no-gitignore" => options.respect_gitignore = false,
            "--gitignore" => options.respect_gitignore = true,
            "--polarity" => {
                let raw = value(argv, i, arg)?;
                options.polarity = Polarity::parse(raw)
                    .ok_or_else(|| "--polarity must be one of: added, removed".to_string())?;
                i += 1;
            }
            "--ngram-size" => {
                options.ngram_size = parse_usize_at_least(arg, value(argv, i, arg)?, 1)?;
                i += 1;
            }
            "--bloom-bits" => {
                options.bloom_bits = parse_usize_at_least(arg, value(argv, i, arg)?, 1)?;
                i += 1;
            }
            "--batch-ratio" => {
                options.batch_ratio = parse_usize_at_least(arg, value(argv, i, arg)?, 1)?;
                i += 1;
            }
            "--hunk-threshold" => {
                options.hunk_match_fraction = parse_fraction(arg, value(argv, i, arg)?)?;
                i += 1;
            }
            "--similarity-threshold" => {
                options.applied_similarity = parse_fraction(arg, value(argv, i, arg)?)?;
                i += 1;
            }
            "--priority-min-chars" => {
                options.priority_min_chars = parse_usize_at_least(arg, value(argv, i, arg)?, 0)?;
                i += 1;
            }
            "--match-mode" => {
                let raw = value(argv, i, arg)?;
                options.match_mode = MatchMode::parse(raw)
                    .ok_or_else(|| "--match-mode must be one of: all, path".to_string())?;
                i += 1;
            }
            "--language" => {
                let raw = value(argv, i, arg)?;
                let language =
                    Language::parse(raw).ok_or_else(|| format!("Unknown language: {raw}"))?;
                options.language = Some(language);
                i += 1;
            }
            "--max-file-size" => {
                options.max_file_size = Some(parse_u64(arg, value(argv, i, arg)?)?);
                i += 1;
            }
            "--ignore-dir" => {
                ignore_dirs.push(value(argv, i, arg)?.to_string());
                i += 1;
            }
            _ if arg.starts_with('-') && arg != "-" => {
                return Err(format!("Unknown option: {arg}"));
            }
            _ => positionals.push(PathBuf::from(arg)),
        }
        i += 1;
    }

    options.ignore_dirs.extend(ignore_dirs);
    options.validate().map_err(|err| err.to_string())?;

    let target = if unit {
        let mut paths = positionals.into_iter();
        match (paths.next(), paths.next(), paths.next()) {
            (Some(patch_dir), Some(source_dir), None) => Target::Unit {
                patch_dir,
                source_dir,
            },
            _ => return Err("--unit requires exactly <patch-dir> <source-dir>".to_string()),
        }
    } else {
        match positionals.len() {
            0 => Target::Dataset(
                env::current_dir().map_err(|e| format!("failed to get cwd: {e}"))?,
            ),
            1 => Target::Dataset(positionals.remove(0)),
            _ => return Err("expected a single dataset root".to_string()),
        }
    };

    Ok(Command::Run(ParsedArgs {
        json,
        stats,
        strict,
        verbose,
        target,
        options,
    }))
}
