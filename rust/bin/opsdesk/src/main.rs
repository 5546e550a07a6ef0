//! `opsdesk` — the operations console CLI.
//!
//! Signs in against the backend, keeps the session token in a local
//! session store, and runs permission-checked resource operations.

mod commands;
mod config;

use std::io::Write;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Operations console CLI.
#[derive(Parser, Debug)]
#[command(name = "opsdesk", about = "Operations console CLI client")]
struct Cli {
    /// Path to client config file (default: ~/.opsdesk/config.toml).
    #[arg(long = "config", global = true)]
    config: Option<String>,

    /// Backend base URL; overrides OPSDESK_API_URL and the config file.
    #[arg(long = "api-url", global = true)]
    api_url: Option<String>,

    /// Output format: text or json.
    #[arg(long = "output", short = 'o', global = true, default_value = "text")]
    output: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Client configuration.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Login to the backend.
    Login {
        /// Phone number.
        #[arg(long)]
        phone: Option<String>,
        /// Password (not recommended, use the interactive prompt).
        #[arg(long)]
        password: Option<String>,
    },

    /// Logout and forget the stored token.
    Logout,

    /// Show the signed-in user.
    Whoami,

    /// Check whether the signed-in user holds a permission code.
    Can {
        /// Permission code (e.g. product_add).
        code: String,
    },

    /// List system permissions grouped per resource.
    Permissions,

    /// Show dashboard statistics.
    Dashboard,

    /// Get resource(s).
    Get {
        /// Resource type (e.g. products, shipments, jobs).
        resource: String,
        /// Optional resource ID for single get.
        id: Option<String>,
        /// Filter job roles by name, description or company contact.
        #[arg(long)]
        search: Option<String>,
    },

    /// Create a resource.
    Create {
        /// Resource type.
        resource: String,
        /// JSON body.
        #[arg(long = "json")]
        json_body: Option<String>,
        /// Read JSON from file.
        #[arg(short = 'f', long = "file")]
        file: Option<String>,
        /// File to upload (product image, shipment receipt).
        #[arg(long)]
        attach: Option<PathBuf>,
    },

    /// Update a resource.
    Update {
        /// Resource type.
        resource: String,
        /// Resource ID.
        id: String,
        /// JSON body.
        #[arg(long = "json")]
        json_body: String,
        /// File to upload (product image, shipment receipt).
        #[arg(long)]
        attach: Option<PathBuf>,
    },

    /// Delete a resource.
    Delete {
        /// Resource type.
        resource: String,
        /// Resource ID.
        id: String,
        /// Skip confirmation.
        #[arg(long = "yes", short = 'y')]
        yes: bool,
    },

    /// Show version.
    Version,
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Set the backend base URL.
    SetUrl { url: String },
}

fn read_line(prompt: &str) -> anyhow::Result<String> {
    eprint!("{}", prompt);
    std::io::stderr().flush()?;
    let mut s = String::new();
    std::io::stdin().read_line(&mut s)?;
    Ok(s.trim().to_string())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config_path = cli
        .config
        .map(PathBuf::from)
        .unwrap_or_else(config::ClientConfig::default_path);
    let json_output = cli.output == "json";
    let api_url = cli.api_url.as_deref();

    match cli.command {
        Commands::Config { action } => match action {
            ConfigAction::SetUrl { url } => {
                commands::set_url(&url, &config_path)?;
            }
        },

        Commands::Login { phone, password } => {
            let phone = match phone {
                Some(p) => p,
                None => read_line("Phone: ")?,
            };
            let password = match password {
                Some(p) => p,
                None => rpassword::prompt_password("Password: ")?,
            };
            if phone.is_empty() || password.is_empty() {
                anyhow::bail!("Phone and password are required.");
            }
            let console = commands::open_console(&config_path, api_url)?;
            commands::session::login(&console, &phone, &password).await?;
        }

        Commands::Logout => {
            let console = commands::open_console(&config_path, api_url)?;
            commands::session::logout(&console).await?;
        }

        Commands::Whoami => {
            let console = commands::open_console(&config_path, api_url)?;
            commands::session::whoami(&console, json_output).await?;
        }

        Commands::Can { code } => {
            let console = commands::open_console(&config_path, api_url)?;
            if !commands::session::can(&console, &code).await? {
                std::process::exit(1);
            }
        }

        Commands::Permissions => {
            let console = commands::open_console(&config_path, api_url)?;
            commands::permissions::list(&console, json_output).await?;
        }

        Commands::Dashboard => {
            let console = commands::open_console(&config_path, api_url)?;
            commands::session::dashboard(&console, json_output).await?;
        }

        Commands::Get {
            resource,
            id,
            search,
        } => {
            let console = commands::open_console(&config_path, api_url)?;
            commands::resource::get(
                &console,
                &resource,
                id.as_deref(),
                search.as_deref(),
                json_output,
            )
            .await?;
        }

        Commands::Create {
            resource,
            json_body,
            file,
            attach,
        } => {
            let body = if let Some(path) = file {
                std::fs::read_to_string(&path)?
            } else if let Some(json) = json_body {
                json
            } else {
                anyhow::bail!("Provide --json or -f <file>.");
            };
            let console = commands::open_console(&config_path, api_url)?;
            commands::resource::create(&console, &resource, &body, attach.as_deref(), json_output)
                .await?;
        }

        Commands::Update {
            resource,
            id,
            json_body,
            attach,
        } => {
            let console = commands::open_console(&config_path, api_url)?;
            commands::resource::update(
                &console,
                &resource,
                &id,
                &json_body,
                attach.as_deref(),
                json_output,
            )
            .await?;
        }

        Commands::Delete { resource, id, yes } => {
            if !yes {
                let answer = read_line("Are you sure? [y/N]: ")?;
                if !answer.eq_ignore_ascii_case("y") {
                    println!("Cancelled.");
                    return Ok(());
                }
            }
            let console = commands::open_console(&config_path, api_url)?;
            commands::resource::delete(&console, &resource, &id).await?;
        }

        Commands::Version => {
            println!("opsdesk cli v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
