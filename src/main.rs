mod commands;

use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use vibe::agents::{InputSource, StdinInput};
use vibe::config::{Config, Overrides};
use vibe::logging;
use vibe::shutdown;

use commands::BoardFilter;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// vibe - sequence context, planning and execution agents through a sprint.
#[derive(Parser)]
#[command(name = "vibe", version, about)]
struct Cli {
    /// Project directory (default: current directory).
    #[arg(short = 'C', long, global = true, value_name = "DIR")]
    project_root: Option<PathBuf>,

    /// Config file (default: vibe.toml in the project directory).
    #[arg(short, long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Replace every agent with a deterministic stub.
    #[arg(long, global = true)]
    stub: bool,

    /// Debug logging on stderr.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the current sprint and its tasks.
    Status,

    /// Discard all sprint state.
    Reset {
        /// Skip the confirmation prompt.
        #[arg(short, long)]
        force: bool,
    },

    /// Sprint lifecycle commands.
    #[command(subcommand)]
    Sprint(SprintCommand),

    /// Phase 1: analyze the repository with the context agent.
    Context,

    /// Phase 2: send the planning prompt, or load a written plan.
    Plan {
        /// Plan document to parse into tasks.
        #[arg(short, long, value_name = "PATH")]
        load: Option<PathBuf>,
    },

    /// Phase 3: execute pending tasks with the exec agent.
    Exec {
        /// Run only this task.
        #[arg(short, long, value_name = "ID")]
        task: Option<String>,
        /// Do not ask between tasks; stop at the first failure.
        #[arg(long)]
        auto: bool,
    },

    /// Phase 4: review the implementation against the plan.
    Verify,

    /// View and manage the agent blackboard.
    Blackboard {
        /// Sections to show.
        #[arg(short = 't', long = "type", value_enum, default_value_t = BoardFilter::All)]
        kind: BoardFilter,

        #[command(subcommand)]
        action: Option<BoardCommand>,
    },

    /// Show efficiency metrics for the current sprint.
    Metrics {
        /// Also write the report to the telemetry directory.
        #[arg(long)]
        save: bool,
    },

    /// Compare saved reports of earlier sprints.
    Compare {
        /// Sprint ids, e.g. sprint-2025-01-15-093000.
        #[arg(required = true)]
        sprint_ids: Vec<String>,
    },

    /// Live terminal dashboard.
    Dashboard,

    /// Create vibe.toml and the project directories.
    Init,

    /// Show version information.
    Version,
}

#[derive(Subcommand)]
enum SprintCommand {
    /// Start a new sprint.
    Start {
        /// What the sprint should achieve.
        objective: String,
    },
    /// Run context, planning and execution in one go.
    Full {
        objective: String,
        /// Do not ask between tasks; stop at the first failure.
        #[arg(long)]
        auto: bool,
    },
}

#[derive(Subcommand)]
enum BoardCommand {
    /// Mark a blocker resolved.
    Resolve {
        /// Blocker number as listed (1-based).
        number: usize,
        resolution: String,
    },
    /// Post a question for the agents or the team.
    Ask {
        question: String,
        #[arg(long)]
        context: Option<String>,
    },
    /// Mark a question answered.
    Answer {
        /// Question number as listed (1-based).
        number: usize,
    },
}

impl Commands {
    /// Commands that may spawn agent processes.
    fn runs_agents(&self) -> bool {
        matches!(
            self,
            Commands::Sprint(_)
                | Commands::Context
                | Commands::Plan { .. }
                | Commands::Exec { .. }
                | Commands::Verify
        )
    }
}

fn main() {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    let overrides = Overrides {
        project_root: cli.project_root.clone(),
        config: cli.config.clone(),
        stub: cli.stub,
        verbose: cli.verbose,
    };
    let config = match Config::load(&overrides) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            process::exit(1);
        }
    };

    // Ctrl+C pauses the sprint at the next task boundary
    if cli.command.runs_agents() {
        if let Err(e) = shutdown::register_handler() {
            eprintln!("warning: {}", e);
        }
    }

    if let Err(e) = run(cli.command, &config) {
        eprintln!("error: {}", e);
        process::exit(1);
    }
}

fn run(command: Commands, config: &Config) -> Result<(), String> {
    let input: Arc<dyn InputSource> = Arc::new(StdinInput);

    match command {
        Commands::Status => commands::cmd_status(config),
        Commands::Reset { force } => commands::cmd_reset(config, input, force),
        Commands::Sprint(SprintCommand::Start { objective }) => {
            commands::cmd_sprint_start(config, input, &objective)
        }
        Commands::Sprint(SprintCommand::Full { objective, auto }) => {
            commands::cmd_sprint_full(config, input, &objective, !auto)
        }
        Commands::Context => commands::cmd_context(config, input),
        Commands::Plan { load } => commands::cmd_plan(config, input, load.as_deref()),
        Commands::Exec { task, auto } => {
            commands::cmd_exec(config, input, task.as_deref(), !auto)
        }
        Commands::Verify => commands::cmd_verify(config, input),
        Commands::Blackboard { kind, action } => match action {
            None => commands::cmd_blackboard(config, kind),
            Some(BoardCommand::Resolve { number, resolution }) => {
                commands::cmd_resolve(config, number, &resolution)
            }
            Some(BoardCommand::Ask { question, context }) => {
                commands::cmd_ask(config, &question, context.as_deref())
            }
            Some(BoardCommand::Answer { number }) => commands::cmd_answer(config, number),
        },
        Commands::Metrics { save } => commands::cmd_metrics(config, save),
        Commands::Compare { sprint_ids } => commands::cmd_compare(config, &sprint_ids),
        Commands::Dashboard => commands::cmd_dashboard(config),
        Commands::Init => commands::cmd_init(config),
        Commands::Version => {
            println!("vibe {}", VERSION);
            Ok(())
        }
    }
}
