use std::collections::HashSet;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use log::error;

use stemdate_core::date::exif::CAPTURE_TAGS;
use stemdate_core::templates;
use stemdate_core::{CatalogError, FileStatus, ScanOptions, DEFAULT_TIME_OF_DAY};

#[derive(Parser)]
#[command(name = "stemdate", version, about = "Infer missing capture timestamps from media filenames")]
struct Cli {
    /// Increase verbosity (-v=INFO, -vv=DEBUG, -vvv=TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct TemplateArgs {
    /// Date template JSON file; repeat to give fallbacks (default: built-in list)
    #[arg(long = "templates", value_name = "FILE")]
    templates: Vec<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Extract timestamps from the given file names
    Guess {
        #[arg(required = true)]
        names: Vec<String>,

        #[command(flatten)]
        templates: TemplateArgs,

        /// Time of day for date-only matches
        #[arg(long, default_value = DEFAULT_TIME_OF_DAY)]
        default_time: String,
    },
    /// Report the timestamps a backfill would write (read-only)
    Scan {
        /// Files or directories
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        #[command(flatten)]
        templates: TemplateArgs,

        /// Time of day for date-only matches
        #[arg(long, default_value = DEFAULT_TIME_OF_DAY)]
        default_time: String,

        /// Leave files that already carry an EXIF capture date alone
        #[arg(long)]
        skip_dated: bool,

        /// Descend into subdirectories
        #[arg(short, long)]
        recursive: bool,

        /// Fail when no date pattern could be loaded
        #[arg(long)]
        strict: bool,

        /// Also print exiftool batches and rename targets
        #[arg(long)]
        plan: bool,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Report which capture-date tags JPEG files carry
    Check {
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Descend into subdirectories
        #[arg(short, long)]
        recursive: bool,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// List compiled templates in precedence order
    Templates {
        #[command(flatten)]
        templates: TemplateArgs,
    },
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .format_timestamp(None)
        .init();
}

fn progress_bar() -> ProgressBar {
    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{bar:40}] {pos}/{len} {prefix} {msg}")
            .unwrap(),
    );
    pb
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Guess {
            names,
            templates,
            default_time,
        } => run_guess(names, templates.templates, default_time),
        Command::Scan {
            paths,
            templates,
            default_time,
            skip_dated,
            recursive,
            strict,
            plan,
            json,
        } => {
            let options = ScanOptions {
                paths,
                templates: templates.templates,
                default_time,
                skip_dated,
                recursive,
                strict,
            };
            run_scan(&options, plan, json)
        }
        Command::Check {
            paths,
            recursive,
            json,
        } => run_check(&paths, recursive, json),
        Command::Templates { templates } => run_templates(&templates.templates),
    }
}

fn run_guess(names: Vec<String>, templates: Vec<PathBuf>, default_time: String) -> anyhow::Result<()> {
    let mut options = ScanOptions::new(Vec::new());
    options.templates = templates;
    options.default_time = default_time;
    let guesser = stemdate_core::load_guesser(&options)?;

    for name in &names {
        match guesser.guess_filename(name) {
            Some(ts) => println!("{} -> {} ({})", name, ts.exif_value(), ts.matched_format()),
            None => println!("{} -> no match", name),
        }
    }
    Ok(())
}

fn run_scan(options: &ScanOptions, with_plan: bool, json: bool) -> anyhow::Result<()> {
    let t = std::time::Instant::now();
    let pb = progress_bar();
    pb.set_prefix("scanning");
    let result = stemdate_core::scan(options, &|_, current, total, message| {
        pb.set_length(total);
        pb.set_position(current + 1);
        pb.set_message(message.to_string());
    })?;
    pb.finish_and_clear();

    let plan = with_plan.then(|| stemdate_core::plan(&result, &HashSet::new()));

    if json {
        let out = serde_json::json!({ "scan": result, "plan": plan });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    if !result.patterns_available {
        eprintln!("No date patterns loaded. Cannot proceed with filename parsing.");
    }

    for f in &result.files {
        match &f.status {
            FileStatus::Matched { timestamp } => println!(
                "{}: {} (Matched: {})",
                f.filename,
                timestamp.exif_value(),
                timestamp.matched_format()
            ),
            FileStatus::AlreadyDated { date } => {
                println!("{}: already dated {}", f.filename, date.format("%Y:%m:%d %H:%M:%S"))
            }
            FileStatus::NoMatch => println!("{}: no matching date pattern found in filename", f.filename),
            FileStatus::Unreadable { error } => println!("{}: unreadable ({})", f.filename, error),
        }
    }

    if let Some(plan) = &plan {
        println!("\n--- ExifTool batches ---");
        for (i, batch) in plan.batches.iter().enumerate() {
            println!("Batch {} ({} files): {}", i + 1, batch.files.len(), batch.args.join(" "));
            for file in &batch.files {
                println!("  {}", file.display());
            }
        }
        println!("\n--- Renames ---");
        for r in &plan.renames {
            println!("{} -> {}", r.source.display(), r.target_name);
        }
    }

    let matched = result.count(|s| matches!(s, FileStatus::Matched { .. }));
    let dated = result.count(|s| matches!(s, FileStatus::AlreadyDated { .. }));
    let unmatched = result.count(|s| matches!(s, FileStatus::NoMatch));
    let unreadable = result.count(|s| matches!(s, FileStatus::Unreadable { .. }));
    eprintln!(
        "\nDone! {} files: {} matched, {} already dated, {} no match, {} unreadable ({:.2}s)",
        result.files.len(),
        matched,
        dated,
        unmatched,
        unreadable,
        t.elapsed().as_secs_f64()
    );
    Ok(())
}

fn run_check(paths: &[PathBuf], recursive: bool, json: bool) -> anyhow::Result<()> {
    let pb = progress_bar();
    pb.set_prefix("checking");
    let summary = stemdate_core::check::check_capture_tags(paths, recursive, &|_, current, total, message| {
        pb.set_length(total);
        pb.set_position(current + 1);
        pb.set_message(message.to_string());
    })?;
    pb.finish_and_clear();

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    if summary.files.is_empty() {
        println!("No JPEG files found.");
        return Ok(());
    }

    let wanted = CAPTURE_TAGS.len();
    for f in &summary.files {
        if let Some(e) = &f.error {
            println!("-> {}: ERROR - {}", f.filename, e);
        } else if f.tags.missing.is_empty() {
            println!("-> {}: All {} required tags present.", f.filename, wanted);
        } else {
            println!(
                "-> {}: Found {}/{} tags. Missing: {}",
                f.filename,
                f.tags.found_count(),
                wanted,
                f.tags.missing.join(", ")
            );
        }
    }

    println!("\n--- Metadata Check Summary ---");
    println!("Total JPEG files scanned: {}", summary.files.len());
    println!("Files with all {} required tags: {}", wanted, summary.histogram[wanted]);
    for n in (0..wanted).rev() {
        println!("Files with exactly {} required tag(s): {}", n, summary.histogram[n]);
    }
    if summary.errors > 0 {
        println!("Files that encountered processing errors: {}", summary.errors);
    }
    Ok(())
}

fn run_templates(candidates: &[PathBuf]) -> anyhow::Result<()> {
    let (source, build) = match templates::build_catalog(candidates) {
        Ok(loaded) => loaded,
        Err(CatalogError::Empty) => {
            error!("No template source found");
            return Err(CatalogError::Empty.into());
        }
        Err(e) => return Err(e.into()),
    };

    println!("Templates from {}:", source);
    for m in build.catalog.iter() {
        println!(
            "{:>3}. {:<32} {:<22} {}",
            m.rank() + 1,
            m.template().format_string,
            m.template().kind,
            m.pattern()
        );
    }
    for r in &build.rejected {
        println!(
            "{:>3}. {:<32} {:<22} REJECTED: {}",
            r.rank + 1,
            r.template.format_string,
            r.template.kind,
            r.error
        );
    }
    build.catalog.require_patterns()?;
    Ok(())
}
