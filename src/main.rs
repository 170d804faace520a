mod config;
mod prompt;

use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::info;

use dblogs_collect::{
    CollectOptions, CollectionSummary, Collector, WorkloadCatalog, WorkloadChooser, exit_code,
    render_text, resolve_namespace,
};
use dblogs_k8s::{KubeClient, WorkloadSource};

use config::{Config, Overrides, Settings};
use prompt::StdinChooser;

/// Exit code for errors that stop the run before any log is collected
const EXIT_FATAL: u8 = 1;

/// dblogs - export database cluster pod logs to a local directory
#[derive(Parser, Debug)]
#[command(name = "dblogs")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Config file (defaults to $DBLOGS_CONFIG, then <config dir>/dblogs/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Get logs of all pods of a database
    #[command(after_help = "EXAMPLES\n    dblogs logs --workspace splicedb -f ./splicedb-logs")]
    Logs(LogsArgs),
}

#[derive(Args, Debug)]
struct LogsArgs {
    /// Database name (prompts when omitted and stdin is a terminal)
    #[arg(short = 'd', long = "database-name", visible_aliases = ["database", "workspace"])]
    database_name: Option<String>,

    /// Label selector to filter pods on [default: app=hbase]
    #[arg(short, long)]
    selector: Option<String>,

    /// Get logs from all pods, ignoring the selector
    #[arg(short, long)]
    all: bool,

    /// Directory to write logs to; replaced if it exists
    #[arg(short = 'f', long, value_name = "DIR", value_hint = clap::ValueHint::DirPath)]
    directory: PathBuf,

    /// Kubernetes context (defaults to the kubeconfig's current context)
    #[arg(long)]
    context: Option<String>,

    /// Seconds a container log may go without new data, 0 waits forever [default: 300]
    #[arg(long, value_name = "SECS")]
    idle_timeout: Option<u64>,

    /// Maximum number of pods streamed at once [default: all]
    #[arg(long, value_name = "N")]
    max_concurrency: Option<usize>,

    /// Never prompt for a database name
    #[arg(long)]
    no_prompt: bool,

    /// Summary output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

impl From<&LogsArgs> for Overrides {
    fn from(args: &LogsArgs) -> Self {
        Self {
            database_name: args.database_name.clone(),
            selector: args.selector.clone(),
            all: args.all,
            directory: args.directory.clone(),
            context: args.context.clone(),
            idle_timeout_secs: args.idle_timeout,
            max_concurrency: args.max_concurrency,
            no_prompt: args.no_prompt,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(EXIT_FATAL)
        }
    }
}

async fn run(cli: Cli) -> Result<u8> {
    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Command::Logs(args) => run_logs(&args, &config).await,
    }
}

async fn run_logs(args: &LogsArgs, config: &Config) -> Result<u8> {
    let settings = Settings::resolve(args.into(), config, std::io::stdin().is_terminal());

    let kube = KubeClient::connect(settings.context.as_deref())
        .await?
        .with_namespace_selector(config.namespace_selector.clone());
    info!(context = kube.context().unwrap_or("<in-cluster>"), "connected to cluster");

    let catalog = load_catalog(&settings, config, &kube).await?;
    let chooser = StdinChooser;
    let chooser = settings
        .interactive
        .then_some(&chooser as &dyn WorkloadChooser);
    let namespace = resolve_namespace(settings.database_name.as_deref(), &catalog, chooser)?;

    info!(
        namespace = %namespace,
        selector = %settings.selector,
        directory = %settings.directory.display(),
        "collecting logs"
    );

    let logs = Arc::new(kube.pod_logs(&namespace));
    let collector = Collector::new(
        Arc::new(kube),
        logs,
        CollectOptions {
            idle_timeout: settings.idle_timeout,
            max_concurrency: settings.max_concurrency,
        },
    );
    let report = collector
        .collect(&namespace, &settings.selector, &settings.directory)
        .await?;

    let summary = CollectionSummary::from(&report);
    match args.format {
        OutputFormat::Text => print!("{}", render_text(&summary)),
        OutputFormat::Json => println!("{}", summary.to_json()?),
    }

    Ok(exit_code(&report))
}

/// Static config entries first; the cluster is only asked when they do not
/// already answer the requested name.
async fn load_catalog(
    settings: &Settings,
    config: &Config,
    kube: &KubeClient,
) -> Result<WorkloadCatalog> {
    let catalog = WorkloadCatalog::new(config.workload_catalog());
    let known = settings
        .database_name
        .as_deref()
        .is_some_and(|name| catalog.find(name).is_some());
    if known {
        return Ok(catalog);
    }

    Ok(WorkloadCatalog::load(config.workload_catalog(), Some(kube as &dyn WorkloadSource)).await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing_logs() {
        let cli = Cli::try_parse_from(["dblogs", "logs", "-d", "splicedb", "-f", "out"]).unwrap();
        let Command::Logs(args) = cli.command;
        assert_eq!(args.database_name.as_deref(), Some("splicedb"));
        assert_eq!(args.directory, PathBuf::from("out"));
        assert_eq!(args.format, OutputFormat::Text);
        assert!(!args.all);
    }

    #[test]
    fn test_cli_database_aliases() {
        for flag in ["--database-name", "--database", "--workspace"] {
            let cli = Cli::try_parse_from(["dblogs", "logs", flag, "splicedb", "-f", "out"]).unwrap();
            let Command::Logs(args) = cli.command;
            assert_eq!(args.database_name.as_deref(), Some("splicedb"));
        }
    }

    #[test]
    fn test_cli_directory_is_required() {
        assert!(Cli::try_parse_from(["dblogs", "logs", "-d", "splicedb"]).is_err());
    }

    #[test]
    fn test_cli_selector_and_all() {
        let cli =
            Cli::try_parse_from(["dblogs", "logs", "-s", "app=spark", "-a", "-f", "out"]).unwrap();
        let Command::Logs(args) = cli.command;
        assert_eq!(args.selector.as_deref(), Some("app=spark"));
        assert!(args.all);

        let settings = Settings::resolve((&args).into(), &Config::default(), false);
        assert_eq!(settings.selector, "");
    }

    #[test]
    fn test_cli_tuning_flags() {
        let cli = Cli::try_parse_from([
            "dblogs",
            "logs",
            "-f",
            "out",
            "--idle-timeout",
            "30",
            "--max-concurrency",
            "4",
            "--no-prompt",
            "--format",
            "json",
        ])
        .unwrap();
        let Command::Logs(args) = cli.command;
        assert_eq!(args.idle_timeout, Some(30));
        assert_eq!(args.max_concurrency, Some(4));
        assert!(args.no_prompt);
        assert_eq!(args.format, OutputFormat::Json);
    }

    #[test]
    fn test_cli_global_flags() {
        let cli = Cli::try_parse_from([
            "dblogs", "logs", "-f", "out", "-v", "--config", "dblogs.toml",
        ])
        .unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("dblogs.toml")));
    }
}
