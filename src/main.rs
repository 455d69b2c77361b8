use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, bail};
use artifact_sync::artifact::catalog::DockerCatalog;
use artifact_sync::artifact::engine::summarize;
use artifact_sync::artifact::fetcher::DockerFetcher;
use artifact_sync::artifact::package::{download, parse_step_id};
use artifact_sync::artifact::registries::{ImageRegistryClient, StepRegistry};
use artifact_sync::artifact::registry::PackageRegistry;
use artifact_sync::artifact::resolver::ArtifactResolver;
use artifact_sync::artifact::types::{Decision, Mode, ResolutionPolicy};
use artifact_sync::config::{SyncConfig, log_dir};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "artifact-sync")]
#[command(version, about = "Keeps runner images and step packages in sync with the registry")]
struct Cli {
    /// JSON configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Bearer token for registry requests, overrides the config file
    #[arg(long, global = true)]
    auth_token: Option<String>,

    /// Log filter, e.g. `debug` or `artifact_sync=trace`
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check the local runner image against the registry
    Resolve {
        /// Image family, defaults to the configured one
        family: Option<String>,

        /// Pull a newer remote image automatically
        #[arg(long)]
        pull: bool,

        /// Only trust images tagged `latest` or `master`
        #[arg(long)]
        production: bool,

        /// Use this local image instead of selecting one (ignored with --production)
        #[arg(long)]
        override_image: Option<String>,
    },
    /// Step package operations
    Step {
        #[command(subcommand)]
        action: StepAction,
    },
}

#[derive(Subcommand)]
enum StepAction {
    /// Show the registry entry for `owner/name@version`
    Info { id: String },
    /// Download the tarball for `owner/name@version`
    Download {
        id: String,
        #[arg(long, short)]
        output: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _guard = artifact_sync::logging::init(cli.log_level.as_deref(), &log_dir());

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(run(cli))
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = SyncConfig::load(cli.config.as_deref())?;
    let auth_token = cli.auth_token.or(config.auth_token.clone());

    match cli.command {
        Command::Resolve {
            family,
            pull,
            production,
            override_image,
        } => {
            let family = family.unwrap_or_else(|| config.registries.images.family.clone());
            let policy = ResolutionPolicy {
                mode: if production {
                    Mode::Production
                } else {
                    Mode::Development
                },
                explicit_override: override_image,
                auto_fetch: pull,
            };
            resolve_image(&config, auth_token, &family, &policy).await
        }
        Command::Step { action } => {
            let registry = StepRegistry::new(&config.registries.steps.url, auth_token);
            run_step(&registry, action).await
        }
    }
}

async fn resolve_image(
    config: &SyncConfig,
    auth_token: Option<String>,
    family: &str,
    policy: &ResolutionPolicy,
) -> anyhow::Result<()> {
    let images = &config.registries.images;
    let resolver = ArtifactResolver::new(
        Arc::new(DockerCatalog::new(config.docker.binary.clone())),
        Arc::new(ImageRegistryClient::new(&images.url, &images.host, auth_token)),
    );

    let resolution = resolver.resolve(family, policy).await?;
    println!("{}", summarize(&resolution.decision, resolution.local.as_ref()));

    if let Decision::Unresolvable(reason) = resolution.decision {
        bail!("cannot resolve an image for {}: {}", family, reason);
    }

    let fetcher = DockerFetcher::new(config.docker.binary.clone());
    let is_fetch = matches!(resolution.decision, Decision::Fetch(_));
    let local = resolver.apply(resolution, &fetcher).await?;

    if is_fetch {
        match local {
            Some(local) => println!(
                "Image: {}, created: {}",
                local.reference, local.created_at
            ),
            None => bail!("pulled image is not present in the local store"),
        }
    }

    Ok(())
}

async fn run_step(registry: &dyn PackageRegistry, action: StepAction) -> anyhow::Result<()> {
    match action {
        StepAction::Info { id } => {
            let (owner, name, version) = parse_step_id(&id)
                .with_context(|| format!("expected owner/name@version, got {:?}", id))?;
            let descriptor = registry.resolve_version(owner, name, version).await?;
            println!("{}", serde_json::to_string_pretty(&descriptor)?);
            Ok(())
        }
        StepAction::Download { id, output } => {
            let (owner, name, version) = parse_step_id(&id)
                .with_context(|| format!("expected owner/name@version, got {:?}", id))?;
            let descriptor = registry.resolve_version(owner, name, version).await?;
            let written = download(registry, &descriptor, &output).await?;
            println!("Wrote {} bytes to {}", written, output.display());
            Ok(())
        }
    }
}
