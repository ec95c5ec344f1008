use anyhow::Result;
use arc_installer::archive::ArchiveError;
use arc_installer::fieldgroup::{FieldGroupError, Placement};
use arc_installer::installer::{InstallError, InstallOutcome, InstallReport, Installer};
use arc_installer::manifest::ContentKind;
use arc_installer::patch::{PatchError, PatchResult, Severity};
use arc_installer::safety::ProjectGuard;
use arc_installer::settings::Settings;
use arc_installer::update::{self, ExecutablePaths, CURRENT_VERSION};
use clap::{Parser, Subcommand};
use colored::Colorize;
use similar::{ChangeTag, TextDiff};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "arc")]
#[command(about = "Install blocks into an Arcadia theme", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to the theme root (defaults to the current directory)
    #[arg(short, long, global = true, env = "ARC_PROJECT")]
    project: Option<PathBuf>,

    /// Show debug logging (overridden by ARC_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Install 1 or more blocks
    Install {
        /// Block names to download and install, in order
        #[arg(required = true, value_name = "BLOCK")]
        blocks: Vec<String>,

        /// Show unified diff of changes
        #[arg(short, long)]
        diff: bool,
    },

    /// Extract already downloaded blocks
    Unpack {
        /// Show unified diff of changes
        #[arg(short, long)]
        diff: bool,
    },

    /// Display the current app version
    Version,

    /// Perform an update on arc
    Update,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Ok(paths) = ExecutablePaths::for_running_binary() {
        update::cleanup_previous(&paths);
    }

    let project = resolve_project(cli.project)?;
    let loaded = Settings::load(&project);
    // Version and update run on the defaults when arc.toml is broken
    let settings = match (&cli.command, loaded) {
        (_, Ok(settings)) => settings,
        (Commands::Install { .. } | Commands::Unpack { .. }, Err(e)) => return Err(e.into()),
        (Commands::Version | Commands::Update, Err(e)) => {
            warn!(error = %e, "Ignoring project settings");
            Settings::default().with_env_overrides()
        }
    };

    let available = update::check_for_update(&settings.update_url, CURRENT_VERSION);
    if available.is_some() && !matches!(cli.command, Commands::Update) {
        println!("{} Update Available", "ℹ".cyan());
        println!("  Run {} to install", "arc update".magenta());
        println!();
    }

    match cli.command {
        Commands::Install { blocks, diff } => cmd_install(&project, settings, &blocks, diff),
        Commands::Unpack { diff } => cmd_unpack(&project, settings, diff),
        Commands::Version => {
            println!(
                "You are currently running version: {}",
                CURRENT_VERSION.magenta()
            );
            Ok(())
        }
        Commands::Update => cmd_update(available),
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "error" };
    let filter = EnvFilter::try_from_env("ARC_LOG").unwrap_or_else(|_| EnvFilter::new(default));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Resolve the project root.
///
/// Priority order:
/// 1. Explicit --project flag
/// 2. ARC_PROJECT environment variable (handled by clap)
/// 3. Current directory
fn resolve_project(cli_project: Option<PathBuf>) -> Result<PathBuf> {
    match cli_project {
        Some(path) => Ok(path),
        None => Ok(env::current_dir()?),
    }
}

/// Open the installer, or report that `project` is not a theme.
fn open_installer(project: &Path, settings: Settings) -> Result<Option<Installer>> {
    let guard = ProjectGuard::new(project)?;
    match Installer::with_settings(guard, settings) {
        Ok(installer) => Ok(Some(installer)),
        Err(InstallError::NotAThemeProject(_)) => {
            eprintln!(
                "{} This directory doesn't contain an Arcadia theme",
                "✗".red()
            );
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

fn cmd_install(project: &Path, settings: Settings, blocks: &[String], show_diff: bool) -> Result<()> {
    let Some(installer) = open_installer(project, settings)? else {
        return Ok(());
    };

    let mut summary = Summary::default();
    for block in blocks {
        let before = snapshot_field_groups(&installer, show_diff);
        let result = installer.install_block(block);
        report(block, result, &before, show_diff, &mut summary);
    }

    summary.print()
}

fn cmd_unpack(project: &Path, settings: Settings, show_diff: bool) -> Result<()> {
    let Some(installer) = open_installer(project, settings)? else {
        return Ok(());
    };

    let archives = installer.pending_archives()?;
    if archives.is_empty() {
        println!("{} No blocks found", "ℹ".cyan());
        return Ok(());
    }

    let mut summary = Summary::default();
    for archive in archives {
        let label = archive
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| archive.display().to_string());
        let before = snapshot_field_groups(&installer, show_diff);
        let result = installer.install_archive(&archive);
        report(&label, result, &before, show_diff, &mut summary);
    }

    summary.print()
}

fn cmd_update(available: Option<String>) -> Result<()> {
    let Some(url) = available else {
        println!("You are on the latest version");
        return Ok(());
    };

    println!("Updating...");
    let paths = ExecutablePaths::for_running_binary()?;
    match update::apply_update(&url, &paths) {
        Ok(()) => {
            println!("{} Update complete", "✓".green());
            Ok(())
        }
        Err(e) => {
            eprintln!("{} Update failed: {}", "✗".red(), e);
            std::process::exit(1);
        }
    }
}

#[derive(Default)]
struct Summary {
    installed: usize,
    already_installed: usize,
    warnings: usize,
    failed: usize,
}

impl Summary {
    fn print(&self) -> Result<()> {
        println!();
        println!("{}", "Summary:".bold());
        println!("  {} installed", format!("{}", self.installed).green());
        println!(
            "  {} already installed",
            format!("{}", self.already_installed).yellow()
        );
        println!("  {} warnings", format!("{}", self.warnings).yellow());
        println!("  {} failed", format!("{}", self.failed).red());

        if self.failed > 0 {
            std::process::exit(1);
        }

        Ok(())
    }
}

/// Contents of both field-group documents, captured for `--diff`.
fn snapshot_field_groups(installer: &Installer, show_diff: bool) -> Vec<(PathBuf, String)> {
    if !show_diff {
        return Vec::new();
    }

    [ContentKind::Layout, ContentKind::Component]
        .into_iter()
        .map(|kind| {
            installer
                .settings()
                .field_group_path(installer.project_root(), kind)
        })
        .filter_map(|path| {
            let content = fs::read_to_string(&path).ok()?;
            Some((path, content))
        })
        .collect()
}

fn report(
    label: &str,
    result: Result<InstallOutcome, InstallError>,
    field_groups_before: &[(PathBuf, String)],
    show_diff: bool,
    summary: &mut Summary,
) {
    match result {
        Ok(InstallOutcome::Installed(report)) => {
            report_modifications(&report, show_diff, summary);

            match &report.placement {
                Ok(Placement::Sorted { .. }) => {}
                Ok(Placement::EndOfMapping { .. }) => {
                    println!(
                        "{} {}: no sorted position found, layout added at the end of {}",
                        "⊙".yellow(),
                        report.name,
                        report.field_group.display()
                    );
                    summary.warnings += 1;
                }
                Err(e) => {
                    eprintln!("{} {}: {}", "✗".red(), report.name, e);
                    eprintln!("  Block files and theme edits were kept; the layout must be added by hand");
                    summary.failed += 1;
                    return;
                }
            }

            if show_diff {
                if let Some((file, before)) = field_groups_before
                    .iter()
                    .find(|(file, _)| *file == report.field_group)
                {
                    if let Ok(after) = fs::read_to_string(file) {
                        display_diff(file, before, &after);
                    }
                }
            }

            println!("{} {} has been installed", "✓".green(), report.name);
            summary.installed += 1;
        }
        Ok(InstallOutcome::AlreadyInstalled { name }) => {
            println!("{} {} has already been installed", "⊙".yellow(), name);
            summary.already_installed += 1;
        }
        Err(e) => {
            eprintln!("{} {}: {}", "✗".red(), label, e);
            summary.failed += 1;

            match &e {
                InstallError::Archive(ArchiveError::NotFound { .. }) => {
                    eprintln!("  Check the block name and your network connection");
                }
                InstallError::FieldGroup(FieldGroupError::Corrupt(_)) => {
                    eprintln!(
                        "  {}",
                        "The field group could not be scanned; it was left unchanged".red()
                    );
                    eprintln!("  Block files may already have been extracted into the theme");
                }
                _ => {}
            }
        }
    }
}

fn report_modifications(report: &InstallReport, show_diff: bool, summary: &mut Summary) {
    for (path, result) in &report.modifications {
        match result {
            Ok(result) => {
                for outcome in result.outcomes() {
                    match outcome.severity() {
                        Severity::Warning => {
                            println!("{} Code could not be added to {}", "⊙".yellow(), path);
                            println!("  {}", outcome.to_string().dimmed());
                            summary.warnings += 1;
                        }
                        Severity::Info => {
                            println!(
                                "{} A code replacement couldn't be made within {}",
                                "ℹ".cyan(),
                                path
                            );
                        }
                        Severity::Quiet => {}
                    }
                }

                if show_diff {
                    if let PatchResult::Applied {
                        file,
                        before,
                        after,
                        ..
                    } = result
                    {
                        display_diff(file, before, after);
                    }
                }
            }
            Err(PatchError::Unavailable { .. }) => {
                println!(
                    "{} File not available for modification: {}",
                    "⊙".yellow(),
                    path
                );
                summary.warnings += 1;
            }
            Err(e) => {
                println!("{} {}", "⊙".yellow(), e);
                summary.warnings += 1;
            }
        }
    }
}

/// Show unified diff between original and modified content
fn display_diff(file: &Path, original: &str, modified: &str) {
    println!(
        "\n{}",
        format!("--- {} (original)", file.display()).dimmed()
    );
    println!("{}", format!("+++ {} (installed)", file.display()).dimmed());

    let diff = TextDiff::from_lines(original, modified);

    // Field-group documents are long; keep three lines of context per hunk
    for group in diff.grouped_ops(3) {
        for op in group {
            for change in diff.iter_changes(&op) {
                let sign = match change.tag() {
                    ChangeTag::Delete => format!("-{}", change).red(),
                    ChangeTag::Insert => format!("+{}", change).green(),
                    ChangeTag::Equal => format!(" {}", change).normal(),
                };
                print!("{}", sign);
            }
        }
    }
}
