mod cli;

use autoreel::{
    config,
    history::HistoryStore,
    pipeline::{NamespaceInventory, StageReport},
    studio::Studio,
    tools::ToolRegistry,
    versions::VersionRegistry,
};
use autoreel_common::{RunResult, Topic};

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands, HistoryAction};
use tokio_util::sync::CancellationToken;

fn main() -> Result<()> {
    // Secrets may live in a .env next to the working directory.
    dotenv::dotenv().ok();

    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "autoreel=trace,autoreel_webdriver=debug,autoreel_common=debug,reqwest=debug".to_string()
        } else {
            "autoreel=info,autoreel_webdriver=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .init();

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Fetch { json } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(fetch(config_path, json))
        }
        Commands::Run { topic, description } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(run(config_path, topic.map(|t| Topic::manual(t, description))))
        }
        Commands::Resume => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(resume(config_path))
        }
        Commands::Status { json } => status(config_path, json),
        Commands::History { action } => history(config_path, action),
        Commands::Version => {
            let config = config::load_config_or_default(config_path)?;
            let registry = VersionRegistry::new(&config.paths.counter_file, &config.paths.data_dir);
            println!("{}", registry.current());
            Ok(())
        }
        Commands::CheckTools => check_tools(config_path),
        Commands::Validate {
            config: validate_path,
        } => {
            let path = validate_path.or(cli.config);
            validate_config(path.as_deref())
        }
    }
}

/// Build the studio and cancel its run on Ctrl-C.
fn studio(config_path: Option<&std::path::Path>) -> Result<Studio> {
    let config = config::load_config_or_default(config_path)?;
    let tools = ToolRegistry::discover(&config.tools);
    let cancel = CancellationToken::new();

    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, stopping after the current step");
            on_signal.cancel();
        }
    });

    Ok(Studio::from_config(&config, &tools)?.with_cancellation(cancel))
}

async fn fetch(config_path: Option<&std::path::Path>, json: bool) -> Result<()> {
    let studio = studio(config_path)?;
    match studio.fetch_topic().await? {
        Some(topic) if json => println!("{}", serde_json::to_string_pretty(&topic)?),
        Some(topic) => {
            println!("Title: {}", topic.title);
            println!("Description: {}", topic.description);
            println!("Source: {}", topic.source);
            println!("Published: {}", topic.published_at);
            println!("URL: {}", topic.url);
        }
        None => println!("No new unique news found. All recent news already processed."),
    }
    Ok(())
}

async fn run(config_path: Option<&std::path::Path>, manual: Option<Topic>) -> Result<()> {
    let studio = studio(config_path)?;
    if let Some(pending) = studio.pending_topic() {
        anyhow::bail!(
            "Version {} is still working on \"{}\"; run `autoreel resume` first",
            studio.current_version(),
            pending.title
        );
    }

    let topic = match manual {
        Some(topic) => match studio.submit_topic(topic)? {
            Some(topic) => topic,
            None => anyhow::bail!("Topic was already processed; use `autoreel resume` to continue it"),
        },
        None => match studio.fetch_topic().await? {
            Some(topic) => topic,
            None => {
                println!("No new unique news found. Nothing to do.");
                return Ok(());
            }
        },
    };

    println!("Topic: {}", topic.title);
    let result = studio.run_pipeline(&topic).await;
    studio.shutdown().await;
    report(&result)
}

async fn resume(config_path: Option<&std::path::Path>) -> Result<()> {
    let studio = studio(config_path)?;
    let result = studio.resume().await?;
    studio.shutdown().await;
    report(&result)
}

fn report(result: &RunResult) -> Result<()> {
    for warning in &result.warnings {
        println!("  warning: {warning}");
    }
    if result.success {
        println!("✓ Version {} published", result.version_used);
        return Ok(());
    }
    if !result.publish_trail.is_empty() {
        println!("  publish: {}", result.publish_trail.join(" -> "));
    }
    let stage = result
        .failed_stage
        .map(|s| s.to_string())
        .unwrap_or_else(|| "setup".to_string());
    anyhow::bail!(
        "Version {} failed at {}: {}",
        result.version_used,
        stage,
        result.error.as_deref().unwrap_or("unknown error")
    )
}

fn status(config_path: Option<&std::path::Path>, json: bool) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let registry = VersionRegistry::new(&config.paths.counter_file, &config.paths.data_dir);
    let version = registry.current();
    let stages = StageReport::from_inventory(&NamespaceInventory::scan(&registry.peek(version)));

    if json {
        let value = serde_json::json!({ "version": version, "stages": stages.stages });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("Current version: {version}");
    for (stage, status) in &stages.stages {
        println!("  {stage:<10} {status}");
    }
    Ok(())
}

fn history(config_path: Option<&std::path::Path>, action: HistoryAction) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let mut store = HistoryStore::open(&config.paths.history_file);

    match action {
        HistoryAction::Stats => {
            let stats = store.stats();
            println!("Total processed: {}", stats.total_processed);
            for (source, count) in &stats.sources {
                println!("  {source}: {count}");
            }
            if let Some(oldest) = stats.oldest_entry {
                println!("Oldest: {}", oldest.to_rfc3339());
            }
            if let Some(newest) = stats.newest_entry {
                println!("Newest: {}", newest.to_rfc3339());
            }
        }
        HistoryAction::Clear => {
            store.clear()?;
            println!("✓ History cleared");
        }
    }
    Ok(())
}

fn check_tools(config_path: Option<&std::path::Path>) -> Result<()> {
    println!("Checking external tools...\n");

    let config = config::load_config_or_default(config_path)?;
    let tools = ToolRegistry::discover(&config.tools).check_all();
    let mut all_ok = true;

    for tool in &tools {
        let status = if tool.available {
            "✓"
        } else {
            all_ok = false;
            "✗"
        };

        print!("{} {}", status, tool.name);

        if let Some(ref version) = tool.version {
            print!(" ({})", version);
        }

        if let Some(ref path) = tool.path {
            print!(" - {}", path.display());
        }

        println!();
    }

    println!();
    if all_ok {
        println!("All required tools are available!");
    } else {
        println!("Some tools are missing. Install them to enable all features.");
    }

    Ok(())
}

fn validate_config(path: Option<&std::path::Path>) -> Result<()> {
    match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            println!("  Data dir: {}", config.paths.data_dir.display());
            println!("  Video: {}s, one scene per {}s", config.script.video_duration_secs, config.script.seconds_per_scene);
            println!("  Voice: {}", config.narration.voice);
            println!("  Publish to: {}", config.publish.studio_url);
            println!("  Visibility: {}", config.publish.visibility.label());
            if let Err(e) = config.require_secrets() {
                println!("  ⚠ {e}");
            }
        }
        None => {
            println!("No config file specified, using defaults");
            let config = config::Config::default();
            println!("Default config:");
            println!("  Data dir: {}", config.paths.data_dir.display());
            println!("  Publish to: {}", config.publish.studio_url);
        }
    }

    Ok(())
}
