use clap::{Args, Parser, Subcommand};
use histofan::config::RunConfig;
use histofan::fleet::{parse_inputs, Fleet, WorkerProgram};
use histofan::worker::{Assignment, WorkerTask};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, error, trace};

/// Count letters in every input file, one worker process per file
#[derive(Parser)]
#[command(name = "histofan", version)]
#[command(about = "Fan letter histograms out across one worker process per file", long_about = None)]
#[command(args_conflicts_with_subcommands = true, disable_help_subcommand = true)]
struct Cli {
    /// Enable verbose output (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    run: RunArgs,
}

#[derive(Args)]
struct RunArgs {
    /// Input files; the cancel marker (default "SIG") starts a worker that is killed
    inputs: Vec<PathBuf>,

    /// Path to a TOML configuration file
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Directory for the file<pid>.hist artifacts
    #[arg(short = 'o', long)]
    output_dir: Option<PathBuf>,

    /// Input name that marks a slot for cancellation
    #[arg(long)]
    cancel_marker: Option<String>,

    /// Milliseconds a cancelled slot's worker runs before SIGINT
    #[arg(long)]
    kill_grace_ms: Option<u64>,

    /// Milliseconds allowed for draining one payload
    #[arg(long)]
    drain_timeout_ms: Option<u64>,

    /// Milliseconds every worker lingers after publishing
    #[arg(long)]
    linger_base_ms: Option<u64>,

    /// Extra linger per worker index, in milliseconds
    #[arg(long)]
    linger_step_ms: Option<u64>,

    /// Print the run report as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single worker unit (started by the launcher)
    #[command(hide = true)]
    Worker {
        #[arg(long)]
        index: usize,

        #[arg(long, conflicts_with = "hold", required_unless_present = "hold")]
        input: Option<PathBuf>,

        #[arg(long)]
        hold: bool,

        #[arg(long, default_value = "0")]
        linger_ms: u64,

        #[arg(long, default_value = "60000")]
        hold_limit_ms: u64,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    // Worker stdout is a result channel, so logs always go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(cli.verbose >= 2)
        .init();

    debug!("histofan started with verbosity level: {}", cli.verbose);
    trace!("Full CLI args: {:?}", std::env::args().collect::<Vec<_>>());

    let code = match cli.command {
        Some(Commands::Worker {
            index,
            input,
            hold,
            linger_ms,
            hold_limit_ms,
        }) => {
            let assignment = match (hold, input) {
                (false, Some(path)) => Assignment::Input(path),
                _ => Assignment::Hold,
            };
            let task = WorkerTask::new(index, assignment)
                .with_linger(Duration::from_millis(linger_ms))
                .with_hold_limit(Duration::from_millis(hold_limit_ms));
            run_worker(task).await
        }
        None => match run_fleet(cli.run).await {
            Ok(()) => 0,
            Err(e) => {
                error!("Fatal error: {}", e);
                eprintln!("Error: {e}");
                1
            }
        },
    };

    std::process::exit(code);
}

async fn run_worker(task: WorkerTask) -> i32 {
    let result = tokio::task::spawn_blocking(move || {
        let stdout = std::io::stdout();
        let mut channel = stdout.lock();
        task.run(&mut channel)
    })
    .await;

    match result {
        Ok(code) => code,
        Err(e) => {
            error!("Worker task panicked: {}", e);
            histofan::worker::exit_code::PUBLISH_FAILURE
        }
    }
}

async fn run_fleet(args: RunArgs) -> anyhow::Result<()> {
    let config = build_config(&args)?;
    let inputs = parse_inputs(args.inputs, &config.cancel_marker)?;

    let program = WorkerProgram::current_exe()?;
    let fleet = Fleet::new(config, program);
    let report = fleet.run(&inputs).await?;

    if args.json {
        println!("{}", report.to_json()?);
    } else {
        print!("{report}");
    }
    Ok(())
}

fn build_config(args: &RunArgs) -> anyhow::Result<RunConfig> {
    let mut config = match &args.config {
        Some(path) => RunConfig::load(path)?,
        None => RunConfig::default(),
    };
    config.merge_env_vars()?;

    if let Some(dir) = &args.output_dir {
        config.output_dir = dir.clone();
    }
    if let Some(marker) = &args.cancel_marker {
        config.cancel_marker = marker.clone();
    }
    if let Some(ms) = args.kill_grace_ms {
        config.kill_grace = Duration::from_millis(ms);
    }
    if let Some(ms) = args.drain_timeout_ms {
        config.drain_timeout = Duration::from_millis(ms);
    }
    if let Some(ms) = args.linger_base_ms {
        config.linger_base = Duration::from_millis(ms);
    }
    if let Some(ms) = args.linger_step_ms {
        config.linger_step = Duration::from_millis(ms);
    }

    config.validate()?;
    debug!("Run configuration: {:?}", config);
    Ok(config)
}
