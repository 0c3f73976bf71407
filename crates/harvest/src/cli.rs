//! Clap CLI definitions for the `harvest` command.

use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};

use harvest_core::build::{BuildId, BuildVariant};
use harvest_core::change::ChangeId;
use harvest_core::enums::{BuildStatus, Scm, TrackingSystem};
use harvest_core::issue::IssueId;

/// harvest -- build provenance for CI.
///
/// Records the change-lineage graph of your repositories and the builds CI
/// produced from it, then answers which changes a build introduced.
#[derive(Parser, Debug)]
#[command(
    name = "harvest",
    about = "Build provenance: which changes did this build bring in?",
    version,
    propagate_version = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Global flags available to all subcommands.
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Database file (default: `database` from .harvest/config.yaml).
    #[arg(long, global = true)]
    pub db: Option<String>,

    /// Output in JSON format.
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable debug logging on stderr.
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output (errors only).
    #[arg(short = 'q', long, global = true)]
    pub quiet: bool,
}

/// All available subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a .harvest directory and database here.
    Init(InitArgs),

    // ===== Change graph =====
    /// Register and list source repositories.
    Repo(RepoArgs),

    /// Register and list branches.
    Branch(BranchArgs),

    /// Record, inspect and traverse changes.
    Change(ChangeArgs),

    /// Register issues and link them to changes.
    Issue(IssueArgs),

    // ===== Build catalog =====
    /// Register and list build projects.
    Project(NameArgs),

    /// Register and list platforms.
    Platform(NameArgs),

    /// Register and list CI integration types.
    Integration(IntegrationArgs),

    // ===== Build ledger =====
    /// Record builds and resolve their provenance.
    Build(BuildArgs),

    // ===== Admin =====
    /// Show or change .harvest/config.yaml.
    Config(ConfigArgs),

    /// Show row counts across the graph and the ledger.
    Stats,

    /// Print version information.
    Version,
}

// ---------------------------------------------------------------------------
// Init
// ---------------------------------------------------------------------------

/// Arguments for `harvest init`.
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Re-initialize even if a database already exists.
    #[arg(long)]
    pub force: bool,
}

// ---------------------------------------------------------------------------
// Repo / Branch
// ---------------------------------------------------------------------------

#[derive(Args, Debug)]
pub struct RepoArgs {
    #[command(subcommand)]
    pub command: RepoCommands,
}

#[derive(Subcommand, Debug)]
pub enum RepoCommands {
    /// Register a repository (idempotent).
    Add {
        name: String,
        url: String,
        /// Source-control system.
        #[arg(long, default_value = "git")]
        scm: Scm,
    },
    /// List repositories.
    List,
}

#[derive(Args, Debug)]
pub struct BranchArgs {
    #[command(subcommand)]
    pub command: BranchCommands,
}

#[derive(Subcommand, Debug)]
pub enum BranchCommands {
    /// Register a branch of a repository (idempotent).
    Add {
        /// Repository name.
        #[arg(long)]
        repo: String,
        name: String,
    },
    /// List branches of a repository.
    List {
        #[arg(long)]
        repo: String,
    },
}

// ---------------------------------------------------------------------------
// Change
// ---------------------------------------------------------------------------

#[derive(Args, Debug)]
pub struct ChangeArgs {
    #[command(subcommand)]
    pub command: ChangeCommands,
}

#[derive(Subcommand, Debug)]
pub enum ChangeCommands {
    /// Record a change with its parent and merge sources.
    Add(ChangeAddArgs),
    /// Show a change with its neighbours and issues.
    Show { id: ChangeId },
    /// List changes on a branch, newest first.
    List {
        #[arg(long)]
        repo: String,
        #[arg(long)]
        branch: String,
    },
    /// Record that SOURCE was merged into TARGET.
    Merge { source: ChangeId, target: ChangeId },
    /// List a change and everything it derives from.
    Ancestors { id: ChangeId },
    /// List a change and everything derived from it.
    Descendants { id: ChangeId },
}

/// Arguments for `harvest change add`.
#[derive(Args, Debug)]
pub struct ChangeAddArgs {
    /// Repository name.
    #[arg(long)]
    pub repo: String,

    /// Branch name.
    #[arg(long)]
    pub branch: String,

    /// SCM revision (commit hash, changelist number, ...).
    #[arg(long = "rev")]
    pub revision: String,

    /// One-line summary of the change.
    #[arg(short = 's', long)]
    pub summary: String,

    #[arg(short = 'd', long, default_value = "")]
    pub description: String,

    #[arg(short = 'a', long)]
    pub author: String,

    /// Commit time as RFC 3339 (default: now).
    #[arg(long)]
    pub timestamp: Option<DateTime<Utc>>,

    /// Id of the change this one was derived from.
    #[arg(long)]
    pub parent: Option<ChangeId>,

    /// Id of a change merged into this one (repeatable).
    #[arg(long = "merged-from")]
    pub merged_from: Vec<ChangeId>,
}

// ---------------------------------------------------------------------------
// Issue
// ---------------------------------------------------------------------------

#[derive(Args, Debug)]
pub struct IssueArgs {
    #[command(subcommand)]
    pub command: IssueCommands,
}

#[derive(Subcommand, Debug)]
pub enum IssueCommands {
    /// Register an issue (idempotent).
    Add {
        /// Tracker code, e.g. PROJ-123.
        code: String,
        #[arg(long, default_value = "jira")]
        system: TrackingSystem,
    },
    /// Record that a change resolves an issue.
    Link { issue: IssueId, change: ChangeId },
    /// List issues.
    List {
        /// Only issues resolved by this change.
        #[arg(long)]
        change: Option<ChangeId>,
    },
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// Arguments shared by `harvest project` and `harvest platform`.
#[derive(Args, Debug)]
pub struct NameArgs {
    #[command(subcommand)]
    pub command: NameCommands,
}

#[derive(Subcommand, Debug)]
pub enum NameCommands {
    /// Register by name (idempotent).
    Add { name: String },
    List,
}

#[derive(Args, Debug)]
pub struct IntegrationArgs {
    #[command(subcommand)]
    pub command: IntegrationCommands,
}

#[derive(Subcommand, Debug)]
pub enum IntegrationCommands {
    /// Register a CI tool (idempotent; the first abbreviation sticks).
    Add {
        name: String,
        #[arg(long)]
        abbrev: String,
        #[arg(long, default_value = "")]
        description: String,
    },
    List,
}

// ---------------------------------------------------------------------------
// Build
// ---------------------------------------------------------------------------

#[derive(Args, Debug)]
pub struct BuildArgs {
    #[command(subcommand)]
    pub command: BuildCommands,
}

#[derive(Subcommand, Debug)]
pub enum BuildCommands {
    /// Insert or update a build, keyed by project, integration, CI id and platform.
    Record(BuildRecordArgs),
    /// Show one build.
    Show { id: BuildId },
    /// List builds in start order.
    List(BuildListArgs),
    /// List good builds in order, oldest first.
    Good {
        #[arg(long)]
        project: Option<String>,
    },
    /// Show the most recent good build.
    LastGood {
        #[arg(long)]
        project: Option<String>,
    },
    /// Show the good build preceding a build in its project.
    PrevGood { id: BuildId },
    /// List the changes a build introduced since the previous good build.
    Changes { id: BuildId },
}

/// Arguments for `harvest build record`.
#[derive(Args, Debug)]
pub struct BuildRecordArgs {
    /// Build project name.
    #[arg(long)]
    pub project: String,

    /// Integration type name.
    #[arg(long)]
    pub integration: String,

    /// The CI tool's own build id.
    #[arg(long = "ci-id")]
    pub ci_build_id: String,

    /// Platform name, for platform-scoped builds.
    #[arg(long)]
    pub platform: Option<String>,

    #[arg(long)]
    pub status: Option<BuildStatus>,

    /// RFC 3339.
    #[arg(long)]
    pub started: Option<DateTime<Utc>>,

    /// RFC 3339.
    #[arg(long)]
    pub finished: Option<DateTime<Utc>>,

    /// Id of the most recent change included in the build.
    #[arg(long = "last-change")]
    pub last_change: Option<ChangeId>,

    /// Jenkins job name.
    #[arg(long = "jenkins-project", conflicts_with = "ec_procedure")]
    pub jenkins_project: Option<String>,

    /// ElectricCommander procedure name.
    #[arg(long = "ec-procedure", requires = "ec_step")]
    pub ec_procedure: Option<String>,

    /// ElectricCommander procedure step.
    #[arg(long = "ec-step", requires = "ec_procedure")]
    pub ec_step: Option<String>,
}

impl BuildRecordArgs {
    /// The tool-specific payload selected by the flags, `None` when no
    /// variant flag was given.
    pub fn variant(&self) -> Option<BuildVariant> {
        match (&self.jenkins_project, &self.ec_procedure, &self.ec_step) {
            (Some(project_name), _, _) => Some(BuildVariant::Jenkins {
                project_name: project_name.clone(),
            }),
            (None, Some(procedure_name), Some(procedure_step)) => {
                Some(BuildVariant::ElectricCommander {
                    procedure_name: procedure_name.clone(),
                    procedure_step: procedure_step.clone(),
                })
            }
            _ => None,
        }
    }
}

/// Arguments for `harvest build list`.
#[derive(Args, Debug)]
pub struct BuildListArgs {
    #[arg(long)]
    pub project: Option<String>,

    #[arg(long)]
    pub integration: Option<String>,

    #[arg(long)]
    pub platform: Option<String>,

    #[arg(long)]
    pub status: Option<BuildStatus>,

    #[arg(short = 'n', long)]
    pub limit: Option<usize>,
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Print the effective configuration.
    Show,
    /// Print one value by dotted key (e.g. closure.max-nodes).
    Get { key: String },
    /// Set one value by dotted key and save config.yaml.
    Set { key: String, value: String },
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
    fn record_variant_from_flags() {
        let cli = Cli::parse_from([
            "harvest",
            "build",
            "record",
            "--project",
            "fw",
            "--integration",
            "Jenkins",
            "--ci-id",
            "12",
            "--jenkins-project",
            "nightly",
        ]);
        let Some(Commands::Build(BuildArgs {
            command: BuildCommands::Record(args),
        })) = cli.command
        else {
            panic!("expected build record");
        };
        assert_eq!(
            args.variant(),
            Some(BuildVariant::Jenkins {
                project_name: "nightly".into()
            })
        );
    }

    #[test]
    fn ec_procedure_requires_step() {
        let result = Cli::try_parse_from([
            "harvest",
            "build",
            "record",
            "--project",
            "fw",
            "--integration",
            "EC",
            "--ci-id",
            "12",
            "--ec-procedure",
            "release",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn status_parses_case_insensitively() {
        let cli = Cli::parse_from(["harvest", "build", "list", "--status", "passed"]);
        let Some(Commands::Build(BuildArgs {
            command: BuildCommands::List(args),
        })) = cli.command
        else {
            panic!("expected build list");
        };
        assert_eq!(args.status, Some(BuildStatus::Passed));
    }
}
