use std::panic;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use coderunner::constants::{DEFAULT_OUTPUT_CAP_BYTES, DEFAULT_TIME_LIMIT_MS};
use coderunner::{ExecutionLimits, Pipeline, PipelineConfig, TestCase, Verdict, native_pipeline};

#[derive(Parser)]
#[command(name = "coderunner", version)]
#[command(about = "Compile and run a source file under a time limit and an output cap.", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a source file against one input.
    Run(RunArgs),
    /// Run a source file against a JSON file of test cases.
    Test(TestArgs),
}

#[derive(Args)]
struct LimitArgs {
    #[arg(long, default_value_t = DEFAULT_TIME_LIMIT_MS)]
    time_limit_ms: u64,

    /// Bytes kept per output stream.
    #[arg(long, default_value_t = DEFAULT_OUTPUT_CAP_BYTES)]
    output_cap: usize,
}

#[derive(Args)]
struct RunArgs {
    /// One of: cpp, c, python, java.
    language: String,
    file: PathBuf,
    /// Standard input for the program.
    input: Option<String>,

    #[arg(long, conflicts_with = "input")]
    input_file: Option<PathBuf>,

    #[command(flatten)]
    limits: LimitArgs,

    /// Print the outcome as JSON.
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct TestArgs {
    language: String,
    file: PathBuf,

    /// JSON array of {"input", "expectedOutput"} objects.
    #[arg(long)]
    cases: PathBuf,

    #[command(flatten)]
    limits: LimitArgs,

    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
    set_panic_hook();

    let cli = Cli::parse();
    match try_main(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(2)
        }
    }
}

async fn try_main(cli: Cli) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let config = PipelineConfig::from_env()?;
    for (name, path) in config.toolchain.missing() {
        tracing::warn!(toolchain = name, path = %path.display(), "Toolchain binary not found");
    }
    let pipeline = native_pipeline(config)?;

    match cli.command {
        Command::Run(args) => run(&pipeline, args).await,
        Command::Test(args) => test(&pipeline, args).await,
    }
}

async fn run(pipeline: &Pipeline, args: RunArgs) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let source = std::fs::read_to_string(&args.file)?;
    let stdin = match (args.input, args.input_file) {
        (Some(input), _) => input,
        (None, Some(path)) => std::fs::read_to_string(path)?,
        (None, None) => String::new(),
    };

    let outcome = pipeline
        .execute(
            &args.language,
            &source,
            &stdin,
            args.limits.time_limit_ms,
            args.limits.output_cap,
        )
        .await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        println!("{} ({} ms)", outcome.verdict, outcome.execution_time_ms);
        if !outcome.output.is_empty() {
            println!("{}", outcome.output);
        }
    }

    Ok(exit_code(outcome.verdict == Verdict::Accepted))
}

async fn test(pipeline: &Pipeline, args: TestArgs) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let source = std::fs::read_to_string(&args.file)?;
    let cases: Vec<TestCase> = serde_json::from_str(&std::fs::read_to_string(&args.cases)?)?;
    let limits = ExecutionLimits::new(args.limits.time_limit_ms, args.limits.output_cap);

    let reports = pipeline
        .execute_with_testcases(&args.language, &source, &cases, &limits)
        .await?;
    let passed = reports.iter().filter(|report| report.passed).count();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        for report in &reports {
            println!(
                "case {}: {} ({}, {} ms)",
                report.index + 1,
                if report.passed { "PASS" } else { "FAIL" },
                report.outcome.verdict,
                report.outcome.execution_time_ms
            );
        }
        println!("{}/{} passed", passed, reports.len());
    }

    Ok(exit_code(passed == reports.len()))
}

fn exit_code(success: bool) -> ExitCode {
    if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn set_panic_hook() {
    panic::set_hook(Box::new(|panic_info| {
        tracing::error!(
            message = "panic occurred",
            panic = %panic_info
        );
    }));
}
