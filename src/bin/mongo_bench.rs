use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use mongo_bench::{payload, run_endpoint, Plan, RunConfig, Scale, TargetEndpoint};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(
    name = "mongo_bench",
    about = "CRUD and GridFS micro-benchmarks against MongoDB builds",
    args_conflicts_with_subcommands = true
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Used when no subcommand is given
    #[command(flatten)]
    run: RunArgs,
}

#[derive(Subcommand)]
enum Command {
    /// Run a benchmark session against one endpoint
    Run(RunArgs),
    /// List the built-in endpoints
    List,
    /// Write a random payload file for the GridFS descriptors
    GenPayload {
        #[arg(default_value = payload::DEFAULT_PAYLOAD)]
        path: PathBuf,
        /// Payload size in bytes
        #[arg(long, default_value_t = 1 << 20)]
        size: usize,
    },
}

#[derive(Args)]
struct RunArgs {
    /// Built-in endpoint name (mongo50, mongo60, mongo70, mongo80)
    #[arg(default_value = "mongo80")]
    endpoint: String,

    /// Override the endpoint host
    #[arg(long)]
    host: Option<String>,

    /// Override the endpoint port
    #[arg(long)]
    port: Option<u16>,

    /// Load the plan from a JSON file instead of the built-in suites
    #[arg(long)]
    plan: Option<PathBuf>,

    /// Size of the seeding insert-many batch
    #[arg(long, default_value = "thousand")]
    scale: Scale,

    /// Include every variant, not only the standard suite
    #[arg(long)]
    full: bool,

    /// File uploaded by the GridFS descriptors
    #[arg(long, env = "MONGO_BENCH_PAYLOAD", default_value = payload::DEFAULT_PAYLOAD)]
    payload: PathBuf,

    /// Upper bound on each database call, in seconds
    #[arg(long, env = "MONGO_BENCH_TIMEOUT_SECS", default_value_t = 30)]
    timeout_secs: u64,

    /// Also write the report as JSON
    #[arg(long)]
    json: Option<PathBuf>,
}

impl RunArgs {
    fn endpoint(&self) -> anyhow::Result<TargetEndpoint> {
        let mut endpoint = match TargetEndpoint::lookup(&self.endpoint) {
            Some(endpoint) => endpoint,
            None if self.host.is_some() && self.port.is_some() => {
                TargetEndpoint::new(&self.endpoint, "localhost", 0)
            }
            None => bail!(
                "unknown endpoint '{}'; run `mongo_bench list` or pass --host and --port",
                self.endpoint
            ),
        };
        if let Some(host) = &self.host {
            endpoint.host = host.clone();
        }
        if let Some(port) = self.port {
            endpoint.port = port;
        }
        Ok(endpoint)
    }

    fn plan(&self) -> anyhow::Result<Plan> {
        match &self.plan {
            Some(path) => Plan::from_json_file(path)
                .with_context(|| format!("loading plan {}", path.display())),
            None if self.full => Ok(Plan::full(self.scale)),
            None => Ok(Plan::standard(self.scale)),
        }
    }

    fn config(&self) -> RunConfig {
        RunConfig::default()
            .with_op_timeout(Duration::from_secs(self.timeout_secs))
            .with_payload(&self.payload)
    }
}

async fn run(args: RunArgs) -> anyhow::Result<()> {
    let endpoint = args.endpoint()?;
    let plan = args.plan()?;

    println!("MongoDB Benchmark");
    println!("==================");
    println!("Target: {}", endpoint);
    println!("Plan: {} ({} descriptors)", plan.name, plan.len());
    println!();

    let report = run_endpoint(&endpoint, &plan, args.config())
        .await
        .with_context(|| format!("cannot start a session on {}", endpoint.name))?;
    report.print();

    if let Some(path) = &args.json {
        report
            .write_json(path)
            .with_context(|| format!("writing {}", path.display()))?;
        println!("Report written to {}", path.display());
    }

    if !report.succeeded() {
        bail!("{} descriptor(s) failed", report.failures().count() + report.aborted.iter().count());
    }
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mongo_bench=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Some(Command::Run(args)) => run(args).await,
        Some(Command::List) => {
            for endpoint in TargetEndpoint::builtin() {
                println!("{}", endpoint);
            }
            Ok(())
        }
        Some(Command::GenPayload { path, size }) => {
            payload::generate_payload(&path, size)
                .with_context(|| format!("writing {}", path.display()))?;
            println!("Wrote {} bytes to {}", size, path.display());
            Ok(())
        }
        None => run(cli.run).await,
    }
}
