//! SaaS Dashboard CLI - Terminal front end and database tools.
//!
//! # Usage
//!
//! ```bash
//! # Create an account (establishes the session)
//! dash signup -e owner@acme.com -c "Acme" -p hunter2
//!
//! # Show the latest dashboard snapshot, following logins in other terminals
//! dash dashboard --follow
//!
//! # Update Shopify credentials
//! dash settings save --domain acme.myshopify.com --api-key KEY --access-token TOKEN
//!
//! # Run database migrations
//! dash migrate
//! ```
//!
//! # Commands
//!
//! - `home`, `nav` - Static pages
//! - `signup`, `login`, `logout` - Session management
//! - `dashboard` - Latest snapshot of the active company
//! - `settings show|save` - Shopify credentials of the active company
//! - `companies` - List every company (admin token required)
//! - `migrate` - Apply the `PostgreSQL` migrations

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use saas_dashboard_client::{AppContext, BackendKind, ClientConfig, SharedStorage};
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod render;

#[derive(Parser)]
#[command(name = "dash")]
#[command(author, version, about = "SaaS Dashboard terminal front end")]
struct Cli {
    /// Override the configured backend (memory, rest, postgres)
    #[arg(long, global = true)]
    backend: Option<BackendKind>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the landing page
    Home,
    /// Show the navigation links
    Nav,
    /// Create a company and its first user
    Signup {
        /// Login email address
        #[arg(short, long)]
        email: String,

        /// Company name
        #[arg(short, long)]
        company: String,

        /// Password
        #[arg(short, long, env = "DASHBOARD_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Sign in
    Login {
        /// Login email address
        #[arg(short, long)]
        email: String,

        /// Password
        #[arg(short, long, env = "DASHBOARD_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Sign out of this client
    Logout,
    /// Show the latest dashboard snapshot
    Dashboard {
        /// Keep running and reload when the session changes elsewhere
        #[arg(long)]
        follow: bool,
    },
    /// View or update Shopify settings
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
    /// List every company (requires the admin token)
    Companies {
        /// Admin token
        #[arg(long)]
        token: String,
    },
    /// Run database migrations
    Migrate,
}

#[derive(Subcommand)]
enum SettingsAction {
    /// Show the current settings
    Show,
    /// Save new settings; omitted values are cleared
    Save {
        /// Shopify store domain (e.g. your-store.myshopify.com)
        #[arg(long, default_value = "")]
        domain: String,

        /// Shopify API key
        #[arg(long, default_value = "")]
        api_key: String,

        /// Shopify Admin API access token
        #[arg(long, default_value = "")]
        access_token: String,
    },
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &ClientConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "saas_dashboard_client=info,saas_dashboard_cli=info".into());

    // Logs go to stderr; stdout carries the rendered pages.
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut config = match ClientConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            #[allow(clippy::print_stderr)]
            {
                eprintln!("Configuration error: {e}");
            }
            return ExitCode::FAILURE;
        }
    };
    if let Some(backend) = cli.backend {
        config.backend = backend;
    }

    // Sentry must be initialized before the tracing subscriber
    let _sentry_guard = init_sentry(&config);
    init_tracing();

    match run(cli.command, &config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::debug!("Command failed: {e}");
            #[allow(clippy::print_stderr)]
            {
                eprintln!("{e}");
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Commands, config: &ClientConfig) -> Result<(), commands::CommandError> {
    match command {
        Commands::Home => commands::pages::home(),
        Commands::Nav => commands::pages::nav(),
        Commands::Migrate => commands::migrate::run(config).await?,
        Commands::Logout => {
            let storage = commands::open_storage(config)?;
            commands::account::logout(&commands::open_session(config, &storage))?;
        }
        command => {
            let storage = commands::open_storage(config)?;
            let ctx = commands::connect(config, &storage).await?;
            run_connected(command, ctx, &storage, config).await?;
        }
    }
    Ok(())
}

async fn run_connected(
    command: Commands,
    ctx: AppContext,
    storage: &SharedStorage,
    config: &ClientConfig,
) -> Result<(), commands::CommandError> {
    match command {
        Commands::Signup {
            email,
            company,
            password,
        } => commands::account::signup(ctx, &email, &company, &password).await,
        Commands::Login { email, password } => {
            commands::account::login(ctx, &email, &password).await
        }
        Commands::Dashboard { follow } => commands::pages::dashboard(ctx, storage, follow).await,
        Commands::Settings {
            action: SettingsAction::Show,
        } => commands::pages::settings_show(ctx).await,
        Commands::Settings {
            action:
                SettingsAction::Save {
                    domain,
                    api_key,
                    access_token,
                },
        } => commands::pages::settings_save(ctx, &domain, &api_key, &access_token).await,
        Commands::Companies { token } => commands::admin::companies(&ctx, config, &token).await,
        Commands::Home | Commands::Nav | Commands::Logout | Commands::Migrate => Ok(()),
    }
}
