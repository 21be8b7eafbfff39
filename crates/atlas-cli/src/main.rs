//! Atlas CLI - command-line access to the Atlas research paper API.
//!
//! Sessions are persisted between runs, so `atlas login` followed by
//! `atlas validate` is only needed once every 48 hours.

use std::io;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use atlas_core::{
    AtlasClient, ClientConfig, Config, FeatureCreate, FeatureType, LoginOutcome, DEFAULT_STRATEGY,
};
use clap::{Args, Parser, Subcommand};
use tracing::{debug, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "atlas", version, about = "Command-line client for the Atlas API")]
struct Cli {
    /// API base URL (overrides ATLAS_BASE_URL and the saved config)
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Account email (defaults to the last one used)
    #[arg(long, short, global = true)]
    email: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Request a magic link, or reuse a stored session
    Login {
        /// Always request a new magic link
        #[arg(long)]
        no_stored: bool,
    },
    /// Exchange the emailed magic-link token for a session
    Validate {
        /// Token from the email; prompted for if omitted
        token: Option<String>,
    },
    /// Report whether the stored session is still accepted
    Check,
    Logout,
    #[command(flatten)]
    Api(ApiCommand),
}

/// Commands that need an authenticated session
#[derive(Subcommand)]
enum ApiCommand {
    #[command(subcommand)]
    Features(FeatureCommand),
    #[command(subcommand)]
    Papers(PaperCommand),
    /// Show the state of a processing task
    Task { task_id: String },
    #[command(subcommand)]
    Reprocess(ReprocessCommand),
    #[command(subcommand)]
    Project(ProjectCommand),
}

#[derive(Subcommand)]
enum FeatureCommand {
    List {
        #[arg(long)]
        project: Option<String>,
    },
    Create(CreateFeatureArgs),
    Delete { feature_id: String },
}

#[derive(Args)]
struct CreateFeatureArgs {
    #[arg(long)]
    name: String,
    #[arg(long)]
    description: String,
    #[arg(long)]
    identifier: String,
    #[arg(long = "type", default_value = "string")]
    feature_type: FeatureType,
    #[arg(long)]
    parent: Option<String>,
    /// Allowed values, comma separated
    #[arg(long, value_delimiter = ',')]
    options: Vec<String>,
    #[arg(long)]
    shared: bool,
}

#[derive(Subcommand)]
enum PaperCommand {
    List {
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 10)]
        page_size: u32,
    },
    Upload {
        project_id: String,
        file: PathBuf,
        #[arg(long, default_value = DEFAULT_STRATEGY)]
        strategy: String,
    },
}

#[derive(Subcommand)]
enum ReprocessCommand {
    Paper {
        paper_id: String,
        project_id: String,
        #[arg(long, default_value = DEFAULT_STRATEGY)]
        strategy: String,
    },
    Project {
        project_id: String,
        #[arg(long, default_value = DEFAULT_STRATEGY)]
        strategy: String,
    },
}

#[derive(Subcommand)]
enum ProjectCommand {
    /// List the features assigned to a project
    Features { project_id: String },
    AddFeatures {
        project_id: String,
        #[arg(required = true)]
        feature_ids: Vec<String>,
    },
    RemoveFeatures {
        project_id: String,
        #[arg(required = true)]
        feature_ids: Vec<String>,
    },
}

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();
    init_tracing();

    let cli = Cli::parse();
    let mut config = config_or_default(Config::load());

    let mut client_config = ClientConfig::from_env()?;
    if let Some(url) = cli.base_url.as_ref().or(config.base_url.as_ref()) {
        client_config = client_config.with_base_url(url.clone());
    }
    debug!(base_url = %client_config.base_url, "Using API");
    let mut client = AtlasClient::new(client_config)?;

    let email = cli.email.clone().or_else(|| config.last_email.clone());

    match cli.command {
        Command::Login { no_stored } => {
            let email = email.context("An email is required: pass --email")?;
            let outcome = client.login(&email, !no_stored).await?;
            match outcome {
                LoginOutcome::StoredCredentials => println!("✓ Using stored credentials for {}", email),
                LoginOutcome::MagicLinkSent { .. } => {
                    println!("📧 Magic link sent to {}", email);
                    println!("Run `atlas validate` with the token from the email");
                }
            }
            config.last_email = Some(email);
            config.save()?;
        }
        Command::Validate { token } => {
            let email = email.context("An email is required: pass --email or run `atlas login`")?;
            let token = match token {
                Some(token) => token,
                None => rpassword::prompt_password("Magic link token: ")
                    .context("Failed to read token")?,
            };
            client.validate_magic_link(token.trim(), Some(&email)).await?;
            println!("✓ Authentication successful! Token saved for future use.");
            config.last_email = Some(email);
            config.save()?;
        }
        Command::Check => {
            let authenticated = match email {
                Some(email) => client.restore(&email).await,
                None => false,
            };
            if authenticated {
                println!("✓ Authenticated");
            } else {
                println!("✗ Not authenticated");
            }
        }
        Command::Logout => {
            if let Some(ref email) = email {
                client.restore(email).await;
            }
            client.logout().await?;
            if let Some(ref email) = email {
                if config.forget_email(email) {
                    config.save()?;
                }
            }
            println!("✓ Logged out successfully");
        }
        Command::Api(command) => {
            ensure_session(&mut client, email.as_deref()).await?;
            run(&client, command).await?;
        }
    }

    Ok(())
}

/// Fall back to defaults when the preferences file cannot be read, but say so.
fn config_or_default(loaded: Result<Config>) -> Config {
    loaded.unwrap_or_else(|e| {
        warn!(error = %format!("{:#}", e), "Ignoring unreadable config file");
        Config::default()
    })
}

async fn ensure_session(client: &mut AtlasClient, email: Option<&str>) -> Result<()> {
    let Some(email) = email else {
        bail!("Not logged in: run `atlas login --email <address>` first");
    };
    if !client.restore(email).await {
        bail!("No valid session for {}: run `atlas login` first", email);
    }
    info!(email, "Restored session");
    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run(client: &AtlasClient, command: ApiCommand) -> Result<()> {
    match command {
        ApiCommand::Features(FeatureCommand::List { project }) => {
            let features = client.list_features(project.as_deref()).await?;
            println!("Found {} features", features.len());
            for feature in &features {
                println!(
                    "  • {} [{}] ({}): {}",
                    feature.feature_name, feature.feature_type, feature.id, feature.feature_description
                );
            }
        }
        ApiCommand::Features(FeatureCommand::Create(args)) => {
            let mut create = FeatureCreate::new(args.name, args.description, args.identifier)
                .with_type(args.feature_type)
                .with_enum_options(args.options)
                .shared(args.shared);
            if let Some(parent) = args.parent {
                create = create.with_parent(parent);
            }
            let feature = client.create_feature(&create).await?;
            println!("Created: {} (ID: {})", feature.feature_name, feature.id);
        }
        ApiCommand::Features(FeatureCommand::Delete { feature_id }) => {
            print_json(&client.delete_feature(&feature_id).await?)?;
        }
        ApiCommand::Papers(PaperCommand::List { page, page_size }) => {
            let list = client.list_papers(page, page_size).await?;
            println!(
                "Total papers: {} (page {} of {})",
                list.total_papers,
                list.page,
                list.total_pages()
            );
            for paper in &list.papers {
                let status = paper.status.as_deref().unwrap_or("-");
                println!("  • {} [{}] ({})", paper.display_name(), status, paper.id);
            }
        }
        ApiCommand::Papers(PaperCommand::Upload {
            project_id,
            file,
            strategy,
        }) => {
            let tasks = client.upload_paper(&project_id, &file, &strategy).await?;
            for (file_name, task_id) in &tasks {
                println!("Upload started: {} → task {}", file_name, task_id);
            }
        }
        ApiCommand::Task { task_id } => {
            print_json(&client.check_task_status(&task_id).await?)?;
        }
        ApiCommand::Reprocess(ReprocessCommand::Paper {
            paper_id,
            project_id,
            strategy,
        }) => {
            print_json(&client.reprocess_paper(&paper_id, &project_id, &strategy).await?)?;
        }
        ApiCommand::Reprocess(ReprocessCommand::Project {
            project_id,
            strategy,
        }) => {
            print_json(&client.reprocess_project(&project_id, &strategy).await?)?;
        }
        ApiCommand::Project(ProjectCommand::Features { project_id }) => {
            let features = client.get_project_features(&project_id).await?;
            for feature in &features {
                println!("  • {} ({})", feature.feature_name, feature.id);
            }
        }
        ApiCommand::Project(ProjectCommand::AddFeatures {
            project_id,
            feature_ids,
        }) => {
            print_json(&client.update_project_features(&project_id, &feature_ids).await?)?;
        }
        ApiCommand::Project(ProjectCommand::RemoveFeatures {
            project_id,
            feature_ids,
        }) => {
            print_json(&client.remove_project_features(&project_id, &feature_ids).await?)?;
        }
    }
    Ok(())
}
