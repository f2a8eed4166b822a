//! armada: batch operations across an owner's repositories.
//!
//! Commands operate on the current directory root: configuration lives at
//! `.armada/config.toml`, durable state at `.armada/state.json`, and working
//! copies under the configured output directory in a two-level
//! `owner/name` layout.

use std::fs;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use regex::Regex;

use armada::core::filter::filter_repositories;
use armada::core::identity::RepoId;
use armada::core::selection::Selection;
use armada::core::task::TaskResult;
use armada::exec::{Parallelism, execute_all};
use armada::exit_codes;
use armada::io::config::{Config, load_config, write_config};
use armada::io::host::{GhHost, RepoHost};
use armada::io::paths::ArmadaPaths;
use armada::io::reconcile::reconcile;
use armada::io::state_store;
use armada::logging;
use armada::ops::{self, EditSpec, ShellCommand};
use armada::report::BatchSummary;

#[derive(Parser)]
#[command(
    name = "armada",
    version,
    about = "Batch operations across an owner's repositories"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Refresh the discovered repository set from the hosting provider.
    Discover,
    /// Refresh discovery and narrow it with the configured inclusion policy.
    Filter,
    /// Reconcile the output root, then clone or sync every target repository.
    Sync {
        /// Run one repository at a time.
        #[arg(long)]
        sequential: bool,
    },
    /// Run a shell command in every cloned repository.
    Run {
        /// Command string passed to `sh -c`.
        command: String,
        /// Only repositories in the modified set.
        #[arg(long)]
        modified_only: bool,
        #[arg(long)]
        sequential: bool,
    },
    /// Apply a pattern substitution across tracked files.
    Apply {
        /// Regular expression to search for.
        #[arg(long)]
        pattern: String,
        /// Replacement text (capture groups as $1, $2, ...).
        #[arg(long)]
        replacement: String,
        /// Pathspec limiting which tracked files are edited.
        #[arg(long, default_value = ".")]
        pathspec: String,
        /// Report would-be changes, then restore the working tree.
        #[arg(long)]
        dry_run: bool,
        #[arg(long)]
        sequential: bool,
    },
    /// Restore every cloned working copy to its last commit.
    Restore {
        #[arg(long)]
        sequential: bool,
    },
    /// Create a branch and commit working-tree changes in every cloned repository.
    Commit {
        /// Branch name to create for the commit.
        #[arg(long)]
        branch: String,
        /// Commit message.
        #[arg(long, short)]
        message: String,
        #[arg(long)]
        sequential: bool,
    },
    /// Open pull requests for repositories not on their default branch.
    Pr {
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        body: String,
        #[arg(long)]
        sequential: bool,
    },
    /// Add a repository to the cloned set.
    Add { repo: RepoId },
    /// Remove a repository from the cloned set.
    Remove { repo: RepoId },
    /// Print the modified repository set.
    Modified,
}

/// Everything a command needs, constructed once per run and passed by
/// reference; there is no process-wide configuration singleton.
struct CommandContext {
    paths: ArmadaPaths,
    config: Config,
    host: GhHost,
}

impl CommandContext {
    fn output_root(&self) -> std::path::PathBuf {
        self.paths.output_root(&self.config.output_directory)
    }
}

fn main() {
    logging::init();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{err:#}");
            std::process::exit(exit_codes::INVALID);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    let root = std::env::current_dir().context("resolve working directory")?;
    let paths = ArmadaPaths::new(root);
    if !paths.config_path.exists() {
        write_config(&paths.config_path, &Config::default())?;
    }
    let config = load_config(&paths.config_path)?;
    let ctx = CommandContext {
        paths,
        config,
        host: GhHost,
    };

    match cli.command {
        Command::Discover => cmd_discover(&ctx),
        Command::Filter => cmd_filter(&ctx),
        Command::Sync { sequential } => cmd_sync(&ctx, sequential),
        Command::Run {
            command,
            modified_only,
            sequential,
        } => cmd_run(&ctx, &command, modified_only, sequential),
        Command::Apply {
            pattern,
            replacement,
            pathspec,
            dry_run,
            sequential,
        } => cmd_apply(&ctx, &pattern, replacement, pathspec, dry_run, sequential),
        Command::Restore { sequential } => cmd_restore(&ctx, sequential),
        Command::Commit {
            branch,
            message,
            sequential,
        } => cmd_commit(&ctx, &branch, &message, sequential),
        Command::Pr {
            title,
            body,
            sequential,
        } => cmd_pr(&ctx, &title, &body, sequential),
        Command::Add { repo } => cmd_add(&ctx, repo),
        Command::Remove { repo } => cmd_remove(&ctx, &repo),
        Command::Modified => cmd_modified(&ctx),
    }
}

fn cmd_discover(ctx: &CommandContext) -> Result<i32> {
    let mut selection = load_selection(ctx)?;
    let repos = ctx.host.list_repositories(&selection.owner)?;
    selection.set_discovered(repos.iter().map(|meta| meta.name_with_owner.clone()).collect());
    state_store::save(&ctx.paths.state_path, &selection)?;
    println!(
        "discovered {} repositories under {}",
        selection.discovered.len(),
        selection.owner
    );
    Ok(exit_codes::OK)
}

fn cmd_filter(ctx: &CommandContext) -> Result<i32> {
    let mut selection = load_selection(ctx)?;
    let policy = ctx.config.policy()?;
    let repos = ctx.host.list_repositories(&selection.owner)?;
    selection.set_discovered(repos.iter().map(|meta| meta.name_with_owner.clone()).collect());
    selection.set_filtered(filter_repositories(&repos, &policy));
    state_store::save(&ctx.paths.state_path, &selection)?;
    println!(
        "filtered {} of {} discovered repositories",
        selection.filtered.len(),
        selection.discovered.len()
    );
    Ok(exit_codes::OK)
}

fn cmd_sync(ctx: &CommandContext, sequential: bool) -> Result<i32> {
    let mut selection = load_selection(ctx)?;
    let targets = if selection.filtered.is_empty() {
        selection.discovered.clone()
    } else {
        selection.filtered.clone()
    };
    if targets.is_empty() {
        bail!("no target repositories; run `armada discover` or `armada filter` first");
    }

    let output_root = ctx.output_root();
    fs::create_dir_all(&output_root)
        .with_context(|| format!("create output root {}", output_root.display()))?;

    let report = reconcile(&output_root, &targets)?;
    for path in &report.removed {
        println!("removed extra directory {}", path.display());
    }
    for failure in &report.failed {
        println!(
            "failed to remove {}: {}",
            failure.path.display(),
            failure.error
        );
    }

    let results = run_batch(&ctx.config, &targets, sequential, |repo| {
        ops::sync_repository(&ctx.host, &output_root, repo)
    });
    let synced = results
        .iter()
        .filter(|result| result.success)
        .map(|result| result.repo.clone())
        .collect();
    selection.set_cloned(synced);
    state_store::save(&ctx.paths.state_path, &selection)?;
    finish(&results, !report.failed.is_empty())
}

fn cmd_run(
    ctx: &CommandContext,
    command: &str,
    modified_only: bool,
    sequential: bool,
) -> Result<i32> {
    let selection = load_selection(ctx)?;
    let repos = if modified_only {
        &selection.modified
    } else {
        &selection.cloned
    };
    if repos.is_empty() {
        println!("no repositories to run against");
        return Ok(exit_codes::OK);
    }
    let scope = if modified_only { "modified" } else { "cloned" };
    println!(
        "running {command:?} across {} {scope} repositories",
        repos.len()
    );
    let output_root = ctx.output_root();
    let shell = ShellCommand::new(command);
    let results = run_batch(&ctx.config, repos, sequential, |repo| {
        ops::run_shell(&output_root, repo, &shell)
    });
    finish(&results, false)
}

fn cmd_apply(
    ctx: &CommandContext,
    pattern: &str,
    replacement: String,
    pathspec: String,
    dry_run: bool,
    sequential: bool,
) -> Result<i32> {
    let selection = load_selection(ctx)?;
    if selection.cloned.is_empty() {
        println!("no cloned repositories");
        return Ok(exit_codes::OK);
    }
    let edit = EditSpec {
        pattern: Regex::new(pattern).with_context(|| format!("compile pattern '{pattern}'"))?,
        replacement,
        pathspec,
        dry_run,
    };
    let output_root = ctx.output_root();
    let results = run_batch(&ctx.config, &selection.cloned, sequential, |repo| {
        ops::apply_edit(&output_root, repo, &edit)
    });
    finish(&results, false)
}

fn cmd_restore(ctx: &CommandContext, sequential: bool) -> Result<i32> {
    let selection = load_selection(ctx)?;
    if selection.cloned.is_empty() {
        println!("no cloned repositories");
        return Ok(exit_codes::OK);
    }
    let output_root = ctx.output_root();
    let results = run_batch(&ctx.config, &selection.cloned, sequential, |repo| {
        ops::restore_worktree(&output_root, repo)
    });
    finish(&results, false)
}

fn cmd_commit(ctx: &CommandContext, branch: &str, message: &str, sequential: bool) -> Result<i32> {
    let selection = load_selection(ctx)?;
    if selection.cloned.is_empty() {
        println!("no cloned repositories");
        return Ok(exit_codes::OK);
    }
    let output_root = ctx.output_root();
    let results = run_batch(&ctx.config, &selection.cloned, sequential, |repo| {
        ops::commit_changes(&output_root, repo, branch, message)
    });
    finish(&results, false)
}

fn cmd_pr(ctx: &CommandContext, title: &str, body: &str, sequential: bool) -> Result<i32> {
    let selection = load_selection(ctx)?;
    if selection.cloned.is_empty() {
        println!("no cloned repositories");
        return Ok(exit_codes::OK);
    }
    let output_root = ctx.output_root();
    let results = run_batch(&ctx.config, &selection.cloned, sequential, |repo| {
        ops::open_pull_request(&ctx.host, &output_root, repo, title, body)
    });
    finish(&results, false)
}

fn cmd_add(ctx: &CommandContext, repo: RepoId) -> Result<i32> {
    let mut selection = load_selection(ctx)?;
    if selection.add_cloned(repo.clone()) {
        state_store::save(&ctx.paths.state_path, &selection)?;
        println!("added {repo} to the cloned set");
    } else {
        println!("{repo} is already in the cloned set");
    }
    Ok(exit_codes::OK)
}

fn cmd_remove(ctx: &CommandContext, repo: &RepoId) -> Result<i32> {
    let mut selection = load_selection(ctx)?;
    if selection.remove_cloned(repo) {
        state_store::save(&ctx.paths.state_path, &selection)?;
        println!("removed {repo} from the cloned set");
    } else {
        println!("{repo} is not in the cloned set");
    }
    Ok(exit_codes::OK)
}

fn cmd_modified(ctx: &CommandContext) -> Result<i32> {
    let selection = load_selection(ctx)?;
    for repo in &selection.modified {
        println!("{repo}");
    }
    Ok(exit_codes::OK)
}

fn load_selection(ctx: &CommandContext) -> Result<Selection> {
    state_store::load_or_init(&ctx.paths.state_path, ctx.config.owner.as_deref())
}

fn run_batch<F>(config: &Config, repos: &[RepoId], sequential: bool, op: F) -> Vec<TaskResult>
where
    F: Fn(&RepoId) -> TaskResult + Sync,
{
    let parallelism = Parallelism::from_flags(sequential, config.max_parallelism);
    let observer: &(dyn Fn(&TaskResult) + Sync) = &print_progress;
    execute_all(repos, parallelism, Some(observer), op)
}

/// Live status line per completed task. Purely observational; the batch
/// result set is what callers act on.
fn print_progress(result: &TaskResult) {
    let status = if result.success { "ok" } else { "failed" };
    println!("{status} {}", result.repo);
    if !result.stdout.trim().is_empty() {
        println!("{}", result.stdout.trim());
    }
    if !result.stderr.trim().is_empty() {
        println!("{}", result.stderr.trim());
    }
}

fn finish(results: &[TaskResult], extra_failures: bool) -> Result<i32> {
    let summary = BatchSummary::from_results(results);
    println!("{summary}");
    if summary.has_failures() || extra_failures {
        Ok(exit_codes::PARTIAL)
    } else {
        Ok(exit_codes::OK)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_sync_defaults_to_parallel() {
        let cli = Cli::parse_from(["armada", "sync"]);
        assert!(matches!(cli.command, Command::Sync { sequential: false }));
    }

    #[test]
    fn parse_run_with_flags() {
        let cli = Cli::parse_from([
            "armada",
            "run",
            "cargo fmt",
            "--modified-only",
            "--sequential",
        ]);
        match cli.command {
            Command::Run {
                command,
                modified_only,
                sequential,
            } => {
                assert_eq!(command, "cargo fmt");
                assert!(modified_only);
                assert!(sequential);
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn parse_add_validates_the_identity() {
        let cli = Cli::parse_from(["armada", "add", "octo/api"]);
        match cli.command {
            Command::Add { repo } => assert_eq!(repo.full_name(), "octo/api"),
            _ => panic!("expected add"),
        }
        assert!(Cli::try_parse_from(["armada", "add", "not-an-identity"]).is_err());
    }

    #[test]
    fn parse_apply_requires_pattern_and_replacement() {
        assert!(Cli::try_parse_from(["armada", "apply", "--pattern", "a"]).is_err());
        let cli = Cli::parse_from([
            "armada",
            "apply",
            "--pattern",
            "a",
            "--replacement",
            "b",
            "--dry-run",
        ]);
        match cli.command {
            Command::Apply {
                pattern,
                replacement,
                pathspec,
                dry_run,
                sequential,
            } => {
                assert_eq!(pattern, "a");
                assert_eq!(replacement, "b");
                assert_eq!(pathspec, ".");
                assert!(dry_run);
                assert!(!sequential);
            }
            _ => panic!("expected apply"),
        }
    }
}
