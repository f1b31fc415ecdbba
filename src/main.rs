use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use jac_playground::protocol::ConversionDirection;
use jac_playground::{
    convert_jac_to_python, convert_python_to_jac, PlaygroundConfig, PlaygroundError, Result,
    ScriptRuntime, ThreadController, WorkerEvent,
};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Parser)]
#[command(name = "jac-playground", version, about = "Run and convert playground scripts")]
struct Cli {
    /// JSON configuration file
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run a script, pausing at breakpoints
    Run {
        file: PathBuf,
        /// Break before this 1-based line (repeatable)
        #[arg(long = "break", value_name = "LINE")]
        breakpoints: Vec<u32>,
        /// Print every worker event as one JSON line
        #[arg(long)]
        json: bool,
    },
    /// Convert a script between Jac and Python
    Convert {
        file: PathBuf,
        #[arg(long, value_enum)]
        to: Target,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Target {
    Py,
    Jac,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    match run_cli(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(%err, "jac-playground failed");
            ExitCode::FAILURE
        }
    }
}

fn run_cli(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => PlaygroundConfig::load(path)?,
        None => PlaygroundConfig::default(),
    };
    debug!(?config, "configuration loaded");

    let runtime = ScriptRuntime::new(config.source_path.clone());
    let mut controller = ThreadController::new(config, Box::new(runtime));
    if !controller.initialize()? {
        return Err(PlaygroundError::InitializationFailed);
    }

    match cli.command {
        Command::Run {
            file,
            breakpoints,
            json,
        } => {
            let source = fs::read_to_string(file)?;
            run_script(&mut controller, &source, &breakpoints, json)?;
        }
        Command::Convert { file, to } => {
            let source = fs::read_to_string(file)?;
            let direction = match to {
                Target::Py => ConversionDirection::JacToPython,
                Target::Jac => ConversionDirection::PythonToJac,
            };
            info!(
                from = direction.source_language(),
                to = direction.target_language(),
                "converting"
            );
            let output = match direction {
                ConversionDirection::JacToPython => convert_jac_to_python(&mut controller, &source)?,
                ConversionDirection::PythonToJac => convert_python_to_jac(&mut controller, &source)?,
            };
            print!("{}", output);
        }
    }

    controller.shutdown()
}

fn run_script(
    controller: &mut ThreadController,
    source: &str,
    breakpoints: &[u32],
    json: bool,
) -> Result<()> {
    if !json {
        let _ = controller.on_stdout(|text| {
            print!("{}", text);
            let _ = io::stdout().flush();
        });
        let _ = controller.on_stderr(|text| eprint!("{}", text));
    }

    controller.set_breakpoints(breakpoints)?;
    controller.start_execution(source)?;

    let stdin = io::stdin();
    let mut input = stdin.lock().lines();
    loop {
        let Some(event) = controller.wait_event(POLL_INTERVAL)? else {
            continue;
        };
        if json {
            println!("{}", serde_json::to_string(&event)?);
        }
        match event {
            WorkerEvent::BreakHit { line } => {
                prompt(controller, line, &mut input)?;
            }
            WorkerEvent::ExecEnd => return Ok(()),
            _ => {}
        }
    }
}

/// Read debugger commands until one of them resumes or terminates the run.
fn prompt<I>(controller: &mut ThreadController, line: u32, input: &mut I) -> Result<()>
where
    I: Iterator<Item = io::Result<String>>,
{
    let text = controller
        .session()
        .and_then(|session| session.source().lines().nth(line.saturating_sub(1) as usize))
        .unwrap_or_default()
        .trim()
        .to_string();
    eprintln!("-> {:>4}  {}", line, text);

    loop {
        eprint!("(jac) ");
        let _ = io::stderr().flush();

        let Some(raw) = input.next().transpose()? else {
            // stdin closed: stop rather than hang at the breakpoint.
            return controller.terminate();
        };
        let Some(words) = shlex::split(&raw) else {
            eprintln!("unbalanced quotes");
            continue;
        };
        let Some((cmd, args)) = words.split_first() else {
            continue;
        };

        match cmd.as_str() {
            "c" | "continue" => return controller.continue_execution(),
            "n" | "next" => return controller.step_over(),
            "s" | "step" => return controller.step_into(),
            "o" | "out" => return controller.step_out(),
            "q" | "quit" => return controller.terminate(),
            "b" | "break" => match args.iter().map(|a| a.parse::<u32>()).collect::<std::result::Result<Vec<_>, _>>() {
                Ok(lines) => {
                    controller.set_breakpoints(&lines)?;
                    eprintln!("breakpoints: {:?}", controller.breakpoints());
                }
                Err(err) => eprintln!("invalid line number: {}", err),
            },
            other => {
                eprintln!("unknown command '{}'", other);
                eprintln!("commands: c(ontinue) n(ext) s(tep) o(ut) b(reak) LINE... q(uit)");
            }
        }
    }
}
