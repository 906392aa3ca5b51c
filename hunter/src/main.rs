use anyhow::{anyhow, Context as _, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use hunt_engine::{load_wordlist, Context, Hunt, HuntConfig};
use hunter_results::{load, save, write_csv, write_json, write_jsonl, write_skeleton, write_text, HuntRecord, DEFAULT_FILE};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod config;

fn now_rfc3339() -> String {
    OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_else(|_| String::new())
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum OutputFormat { Text, Json, Jsonl, Csv }

#[derive(Debug, Parser)]
#[command(name = "hunter", version, about = "Recursive asset discovery: hosts, open ports and HTTP paths")]
struct Cli {
    /// Optional settings file (YAML). If omitted, loads ./hunter.yaml if present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Result file holding the scope and everything found so far
    #[arg(long, global = true, default_value = DEFAULT_FILE)]
    file: PathBuf,
    #[command(flatten)]
    run: RunArgs,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Clone, Args)]
struct RunArgs {
    /// Enumerate subdomains of scope domains and hunt them too
    #[arg(long, default_value_t = false)]
    subdomains: bool,
    /// Run vulnerability probes (XSS on pages, CRLF on HTTP ports)
    #[arg(long, default_value_t = false)]
    scan: bool,
    /// Maximum concurrent network operations (at least 5, default 150)
    #[arg(long)]
    max_connections: Option<usize>,
    /// Ports: comma/range list (e.g., 22,80,443 or 8000-8100). Default: built-in catalogue.
    #[arg(long)]
    ports: Option<String>,
    /// Newline-delimited paths to try on HTTP ports
    #[arg(long, value_name = "FILE")]
    wordlist: Option<PathBuf>,
    /// Log every probe outcome
    #[arg(long, short, default_value_t = false)]
    verbose: bool,
}

impl RunArgs {
    /// Combine flags given before `run` with those given after it; the latter win.
    fn merge(mut self, outer: &RunArgs) -> RunArgs {
        self.subdomains |= outer.subdomains;
        self.scan |= outer.scan;
        self.verbose |= outer.verbose;
        self.max_connections = self.max_connections.or(outer.max_connections);
        self.ports = self.ports.or_else(|| outer.ports.clone());
        self.wordlist = self.wordlist.or_else(|| outer.wordlist.clone());
        self
    }
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Hunt the scope of the result file (default)
    Run(RunArgs),
    /// Print recorded results
    Print {
        /// Include paths with status 300 and above
        #[arg(long, default_value_t = false)]
        all: bool,
        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Print version information
    Version,
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "info,hunter=debug,hunt_engine=debug,web_surface=debug"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

/// Defaults, then the settings file, then flags.
fn hunt_config(args: &RunArgs, file: Option<&config::Config>) -> Result<HuntConfig> {
    let mut cfg = HuntConfig::default();
    if let Some(run) = file.and_then(|c| c.run.as_ref()) {
        run.apply(&mut cfg)?;
    }
    if let Some(n) = args.max_connections { cfg.max_connections = n; }
    if let Some(spec) = &args.ports { cfg.ports = config::parse_port_list(spec)?; }
    if let Some(path) = &args.wordlist { cfg.wordlist = load_wordlist(path)?; }
    cfg.subdomains |= args.subdomains;
    cfg.scan |= args.scan;
    cfg.validate()?;
    Ok(cfg)
}

impl Cli {
    fn run_args(&self) -> RunArgs {
        match &self.command {
            Some(Commands::Run(inner)) => inner.clone().merge(&self.run),
            _ => self.run.clone(),
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match &cli.command {
        Some(Commands::Version) => {
            println!("hunter {} (core {})", env!("CARGO_PKG_VERSION"), hunter_core::version());
        }
        Some(Commands::Print { all, format }) => print(&cli.file, *all, *format)?,
        Some(Commands::Run(_)) | None => run(&cli.file, cli.config.as_deref(), &cli.run_args())?,
    }
    Ok(())
}

fn run(file: &Path, config_path: Option<&Path>, args: &RunArgs) -> Result<()> {
    init_tracing(args.verbose);
    let loaded_cfg = config::load_config(config_path)?;
    let cfg = hunt_config(args, loaded_cfg.as_ref())?;

    let Some(record) = load(file)? else {
        write_skeleton(file)?;
        println!("created {}: add domains, hosts, URLs or CIDRs to its scope, then run again", file.display());
        return Ok(());
    };
    if record.scope.is_empty() && record.targets.is_empty() {
        println!("the scope of {} is empty: nothing to hunt", file.display());
        return Ok(());
    }

    let rt = tokio::runtime::Runtime::new()?;
    let start = Instant::now();
    let started_at = now_rfc3339();
    let limit = cfg.max_connections;
    let (snapshot, peak) = rt.block_on(async move {
        let hunt = Hunt::new(record, Context::new(cfg)?);
        let seeded = hunt.start();
        info!(seeded, max_connections = limit, "hunt started");
        tokio::select! {
            _ = hunt.wait() => {}
            res = tokio::signal::ctrl_c() => {
                match res {
                    Ok(()) => warn!("interrupted: saving what was found so far"),
                    Err(e) => {
                        warn!("cannot listen for ctrl-c: {}", e);
                        hunt.wait().await;
                    }
                }
            }
        }
        Ok::<(HuntRecord, usize), anyhow::Error>((hunt.snapshot(), hunt.gate().peak()))
    })?;
    // Interrupted probes are dropped, not awaited.
    rt.shutdown_background();

    save(file, &snapshot)?;
    let (targets, ports, paths) = snapshot.counts();
    info!(
        started_at = %started_at,
        ended_at = %now_rfc3339(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        targets,
        ports,
        paths,
        peak_connections = peak,
        "hunt saved to {}",
        file.display()
    );
    Ok(())
}

fn print(file: &Path, all: bool, format: OutputFormat) -> Result<()> {
    let record = load(file)?.ok_or_else(|| anyhow!("{} does not exist: run a hunt first", file.display()))?;
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match format {
        OutputFormat::Text => write_text(&mut out, &record, all)?,
        OutputFormat::Json => write_json(&mut out, &record)?,
        OutputFormat::Jsonl => write_jsonl(&mut out, &record, all)?,
        OutputFormat::Csv => write_csv(&mut out, &record, all)?,
    }
    out.flush().context("writing to stdout")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(extra: &[&str]) -> Cli {
        Cli::parse_from(std::iter::once("hunter").chain(extra.iter().copied()))
    }

    #[test]
    fn bare_invocation_runs() {
        let cli = args(&["--scan", "--max-connections", "10"]);
        assert!(cli.command.is_none());
        assert!(cli.run.scan);
        assert_eq!(cli.run.max_connections, Some(10));
        assert_eq!(cli.file, PathBuf::from("hunt.yml"));
    }

    #[test]
    fn run_and_print_subcommands() {
        let cli = args(&["--file", "x.yml", "run", "--subdomains", "-v"]);
        match cli.command {
            Some(Commands::Run(r)) => assert!(r.subdomains && r.verbose),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(cli.file, PathBuf::from("x.yml"));

        let cli = args(&["print", "--all", "--format", "jsonl"]);
        assert!(matches!(cli.command, Some(Commands::Print { all: true, format: OutputFormat::Jsonl })));
    }

    #[test]
    fn flags_before_run_are_kept() {
        let cli = args(&["--scan", "--max-connections", "12", "run", "--subdomains"]);
        let merged = cli.run_args();
        assert!(merged.scan && merged.subdomains);
        assert_eq!(merged.max_connections, Some(12));

        let cli = args(&["--max-connections", "9", "run", "--max-connections", "20"]);
        assert_eq!(cli.run_args().max_connections, Some(20));

        let cli = args(&["--max-connections", "4", "run"]);
        assert!(hunt_config(&cli.run_args(), None).is_err());
    }

    #[test]
    fn flags_override_file_settings() {
        let file = config::Config {
            run: Some(config::RunConfig { max_connections: Some(50), scan: Some(true), ..Default::default() }),
        };
        let cli = args(&["--max-connections", "7"]);
        let cfg = hunt_config(&cli.run, Some(&file)).unwrap();
        assert_eq!(cfg.max_connections, 7);
        assert!(cfg.scan);

        let cli = args(&["--max-connections", "4"]);
        assert!(hunt_config(&cli.run, None).is_err());
    }
}
