use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use inquire::Confirm;
use picseq_core::{
    app_paths, apply_plan, compile_template, load_config, plan_renames, plan_undo, scan_directory,
    select_files, undo_from_log, AppConfig, PrefixProposal, RenamePlan, Selection,
    SelectionCriteria,
};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Parser)]
#[command(name = "picseq")]
#[command(about = "Batch-rename the images in one folder from a numbered name template")]
struct Cli {
    /// Folder holding the images (not searched recursively)
    #[arg(long, required_unless_present_any = ["undo", "show_config"])]
    dir: Option<PathBuf>,
    /// Name template without extension: digit runs count up, x runs use --start, [text] stays fixed
    #[arg(long, required_unless_present_any = ["undo", "show_config"])]
    name: Option<String>,
    /// First value for the x counter (default 1, or `start` from the config file)
    #[arg(long)]
    start: Option<u64>,
    /// Only rename files whose name starts with one of these comma-separated prefixes
    #[arg(long, value_delimiter = ',')]
    src_prefix: Vec<String>,
    /// Let names containing CJK characters be picked as messy
    #[arg(long, default_value_t = false)]
    include_cjk: bool,
    /// Print the plan without renaming anything
    #[arg(long, default_value_t = false)]
    dry_run: bool,
    /// Reverse an earlier run using its rename_log_*.json (the folder comes from the log)
    #[arg(long, conflicts_with_all = ["dir", "name", "src_prefix", "start"])]
    undo: Option<PathBuf>,
    /// Accept the proposed prefix without asking
    #[arg(short, long, default_value_t = false)]
    yes: bool,
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    output: OutputFormat,
    /// Print the config file location and values, then exit
    #[arg(long, default_value_t = false)]
    show_config: bool,
    #[arg(short, long, default_value_t = false)]
    verbose: bool,
    #[arg(short, long, default_value_t = false, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(&cli);

    if cli.show_config {
        return cmd_show_config();
    }

    if let Some(log_path) = cli.undo.as_deref() {
        return cmd_undo(&cli, log_path);
    }

    let config = load_config().unwrap_or_else(|err| {
        warn!("ignoring config file: {err:#}");
        AppConfig::default()
    });
    cmd_rename(&cli, &config)
}

fn cmd_rename(cli: &Cli, config: &AppConfig) -> Result<()> {
    let name = cli.name.as_deref().context("--name is required")?;
    let template = compile_template(name)?;

    let dir = cli.dir.as_deref().context("--dir is required")?;
    let dir = fs::canonicalize(dir)
        .with_context(|| format!("folder does not exist: {}", dir.display()))?;
    let listing = scan_directory(&dir)?;
    debug!(stats = ?listing.stats, "scanned folder");

    if listing.images.is_empty() {
        println!("No image files in {}.", dir.display());
        return Ok(());
    }

    let criteria =
        SelectionCriteria::from_options(&cli.src_prefix, cli.include_cjk || config.include_cjk);
    let selection = select_files(
        &listing.images,
        &criteria,
        &config.messy_rules(),
        |proposal| confirm_prefix(proposal, cli.yes),
    )?;

    let selected = match selection {
        Selection::Files(files) => files,
        Selection::NoCandidates => {
            match criteria {
                SelectionCriteria::Prefix { .. } => {
                    println!("No image names start with the given prefixes.")
                }
                SelectionCriteria::Messy { .. } => {
                    println!("No machine-generated image names found (CJK names are skipped unless --include-cjk).");
                    println!("Use --src-prefix to pick files explicitly.");
                }
            }
            return Ok(());
        }
        Selection::Declined => {
            println!("No prefix confirmed; nothing was renamed.");
            return Ok(());
        }
    };

    let start = cli.start.unwrap_or(config.start);
    let plan = plan_renames(&dir, &selected, &template, start, &listing)?;
    print_plan(&plan, cli.output, config.preview_limit)?;

    if cli.dry_run {
        eprintln!("Dry run: no files were renamed.");
        return Ok(());
    }

    let result = apply_plan(&plan)?;
    println!(
        "Renamed {} files ({} already had their target name).",
        result.applied, result.unchanged
    );
    if let Some(log_path) = result.log_path {
        println!("Log saved: {}", log_path.display());
        println!("Undo with: picseq --undo {}", log_path.display());
    }
    Ok(())
}

fn cmd_undo(cli: &Cli, log_path: &Path) -> Result<()> {
    if cli.dry_run {
        let plan = plan_undo(log_path)?;
        print_plan(&plan, cli.output, usize::MAX)?;
        eprintln!("Dry run: no files were restored.");
        return Ok(());
    }

    let result = undo_from_log(log_path)?;
    println!("Restored {} files.", result.restored);
    Ok(())
}

fn cmd_show_config() -> Result<()> {
    let config = load_config()?;
    let paths = app_paths()?;
    println!("Config file: {}", paths.config_path.display());
    println!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}

fn confirm_prefix(proposal: &PrefixProposal, assume_yes: bool) -> Result<bool> {
    // stderr keeps `--output json` parseable
    eprintln!(
        "\nFound {} image(s) with machine-generated names.",
        proposal.candidates
    );
    eprintln!(
        "Most common prefix: '{}' ({} files)",
        proposal.prefix,
        proposal.count()
    );
    eprintln!("Examples:");
    for example in &proposal.examples {
        eprintln!("  - {example}");
    }

    if assume_yes {
        return Ok(true);
    }

    let question = format!("Rename only the files starting with '{}'?", proposal.prefix);
    match Confirm::new(&question).with_default(false).prompt() {
        Ok(answer) => Ok(answer),
        Err(err) => {
            warn!(%err, "no confirmation received");
            Ok(false)
        }
    }
}

fn print_plan(plan: &RenamePlan, output: OutputFormat, limit: usize) -> Result<()> {
    match output {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(plan)?);
        }
        OutputFormat::Table => {
            println!("source -> target");
            for entry in plan.entries.iter().take(limit) {
                let marker = if entry.changed { "" } else { " (unchanged)" };
                println!("{} -> {}{}", entry.source_name(), entry.target_name(), marker);
            }
            if plan.entries.len() > limit {
                println!("... ({} files total)", plan.entries.len());
            }
        }
    }
    Ok(())
}

fn default_level(cli: &Cli) -> &'static str {
    if cli.quiet {
        "error"
    } else if cli.verbose {
        "debug"
    } else {
        "warn"
    }
}

fn setup_logging(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level(cli)));

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_thread_ids(false)
                .with_thread_names(false)
                .compact(),
        )
        .with(filter)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn src_prefix_splits_on_commas() {
        let cli = Cli::try_parse_from([
            "picseq",
            "--dir",
            "photos",
            "--name",
            "trip_x",
            "--src-prefix",
            "IMG_,mmexport",
        ])
        .expect("must parse");
        assert_eq!(cli.src_prefix, vec!["IMG_", "mmexport"]);
        assert_eq!(cli.start, None);
        assert!(!cli.dry_run);
    }

    #[test]
    fn undo_does_not_need_a_template() {
        let cli = Cli::try_parse_from(["picseq", "--undo", "rename_log_20260101_000000.json"])
            .expect("must parse");
        assert!(cli.name.is_none());
        assert!(cli.undo.is_some());
    }

    #[test]
    fn rename_requires_a_template() {
        assert!(Cli::try_parse_from(["picseq", "--dir", "photos"]).is_err());
        assert!(Cli::try_parse_from([
            "picseq", "--undo", "log.json", "--name", "x", "--dir", "photos"
        ])
        .is_err());
    }

    #[test]
    fn undo_rejects_a_folder_argument() {
        let err = Cli::try_parse_from(["picseq", "--undo", "log.json", "--dir", "photos"])
            .expect_err("--dir must conflict with --undo");
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn verbosity_flags_pick_the_default_level() {
        let parse = |args: &[&str]| {
            let mut argv = vec!["picseq", "--dir", "photos", "--name", "x"];
            argv.extend_from_slice(args);
            Cli::try_parse_from(argv).expect("must parse")
        };
        assert_eq!(default_level(&parse(&[])), "warn");
        assert_eq!(default_level(&parse(&["-v"])), "debug");
        assert_eq!(default_level(&parse(&["-q"])), "error");
    }
}
