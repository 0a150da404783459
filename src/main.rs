use std::path::PathBuf;

use clap::Parser;
use futures::future::join_all;
use indexmap::IndexMap;

use version_scout::config::{self, Config};
use version_scout::http::HttpClient;
use version_scout::resolver::{MissingCurrentPolicy, Resolver};
use version_scout::source::VersionReport;
use version_scout::sources::build_sources;

#[derive(Parser)]
#[command(name = "version-scout")]
#[command(version, about = "Find the latest released version of desktop software")]
struct Cli {
    /// Software names to look up
    #[arg(required = true, value_name = "SOFTWARE")]
    software: Vec<String>,

    /// Version currently installed (single software name only)
    #[arg(long, value_name = "VERSION")]
    current: Option<String>,

    /// Print a JSON map of name to report instead of text lines
    #[arg(long)]
    json: bool,

    /// Path to a JSON configuration file
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Sources to query, in order
    #[arg(long, value_delimiter = ',', value_name = "SOURCE")]
    methods: Vec<String>,

    /// Update reporting when --current is absent (no-update, assume-older)
    #[arg(long, value_name = "POLICY")]
    missing_current: Option<MissingCurrentPolicy>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let guard = version_scout::logging::init(&config::log_path())?;

    let all_resolved = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(run(cli))?;

    if !all_resolved {
        // process::exit skips Drop, so flush the log writer first.
        drop(guard);
        std::process::exit(1);
    }
    Ok(())
}

async fn run(cli: Cli) -> anyhow::Result<bool> {
    if cli.current.is_some() && cli.software.len() != 1 {
        anyhow::bail!("--current requires exactly one software name");
    }

    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if !cli.methods.is_empty() {
        config.methods = cli.methods.clone();
    }
    if let Some(policy) = cli.missing_current {
        config.missing_current = policy;
    }

    let client = HttpClient::new(&config.http)?;
    let sources = build_sources(&config, &client);
    let resolver = Resolver::new(sources, config.missing_current);

    let current = cli.current.as_deref();
    let lookups = cli.software.iter().map(|name| {
        let resolver = &resolver;
        async move { (name.clone(), resolver.resolve(name, current).await) }
    });
    let results: IndexMap<String, Option<VersionReport>> =
        join_all(lookups).await.into_iter().collect();

    let unresolved = results.values().filter(|report| report.is_none()).count();

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else {
        for (name, report) in &results {
            print_report(name, report.as_ref());
        }
    }

    Ok(unresolved == 0)
}

fn print_report(name: &str, report: Option<&VersionReport>) {
    let Some(report) = report else {
        println!("{name}: no version information found");
        return;
    };

    let latest = report.latest_version.as_deref().unwrap_or("unknown");
    let mut line = format!("{name}: {latest}");
    if let Some(date) = &report.release_date {
        line.push_str(&format!(" (released {date})"));
    }
    line.push_str(&format!(" via {}", report.method));
    if report.update_found {
        line.push_str(" [update available]");
    } else if report.current_version.is_some() {
        line.push_str(" [up to date]");
    }
    println!("{line}");
    if let Some(url) = &report.source_url {
        println!("  {url}");
    }
}
