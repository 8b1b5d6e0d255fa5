use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, bail};
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use storerate::auth::{JwtKeys, PasswordHasher, generate_secret};
use storerate::config::{JWT_SECRET_FILE, ServerConfig};
use storerate::db::{Database, SqliteDatabase};
use storerate::server::validation::{
    normalize_email, validate_email, validate_password, validate_user_name,
};
use storerate::server::{AppState, create_router};
use storerate::types::{Role, User};

const CONFIG_FILE: &str = "storerate.toml";

const DEFAULT_ADMIN_NAME: &str = "Application System Administrator";
const DEFAULT_ADMIN_EMAIL: &str = "admin@example.com";
const DEFAULT_ADMIN_PASSWORD: &str = "Admin@123";

#[cfg(unix)]
fn set_restrictive_permissions(path: &Path) {
    use std::os::unix::fs::PermissionsExt;
    if let Err(e) = fs::set_permissions(path, fs::Permissions::from_mode(0o600)) {
        tracing::warn!("Failed to set permissions on {}: {e}", path.display());
    }
}

#[derive(Parser)]
#[command(name = "storerate")]
#[command(about = "A role-based store rating service", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Administrative commands
    Admin {
        #[command(subcommand)]
        command: AdminCommands,
    },

    /// Start the server
    Serve {
        /// TOML config file (defaults to <data-dir>/storerate.toml if present)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Host to bind to
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to
        #[arg(long, short)]
        port: Option<u16>,

        /// Data directory for the database and JWT secret
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum AdminCommands {
    /// Initialize the server (create database, JWT secret and first administrator)
    Init {
        /// Data directory for the database and JWT secret
        #[arg(long, default_value = "./data")]
        data_dir: PathBuf,

        /// Skip interactive prompts
        #[arg(long)]
        non_interactive: bool,

        /// Administrator display name
        #[arg(long)]
        name: Option<String>,

        /// Administrator email
        #[arg(long)]
        email: Option<String>,

        /// Administrator password
        #[arg(long)]
        password: Option<String>,
    },
}

struct AdminInput {
    name: String,
    email: String,
    password: String,
}

fn prompt_admin(
    name: Option<String>,
    email: Option<String>,
    password: Option<String>,
) -> anyhow::Result<AdminInput> {
    let name = name.unwrap_or_else(|| DEFAULT_ADMIN_NAME.to_string());

    let email = inquire::Text::new("Admin email:")
        .with_default(email.as_deref().unwrap_or(DEFAULT_ADMIN_EMAIL))
        .with_validator(|input: &str| {
            Ok(match validate_email(input) {
                Ok(()) => inquire::validator::Validation::Valid,
                Err(msg) => inquire::validator::Validation::Invalid(msg.into()),
            })
        })
        .prompt()?;

    let password = match password {
        Some(password) => password,
        None => inquire::Password::new("Admin password:")
            .with_validator(|input: &str| {
                Ok(match validate_password(input) {
                    Ok(()) => inquire::validator::Validation::Valid,
                    Err(msg) => inquire::validator::Validation::Invalid(msg.into()),
                })
            })
            .prompt()?,
    };

    Ok(AdminInput {
        name,
        email,
        password,
    })
}

fn write_jwt_secret(data_path: &Path) -> anyhow::Result<PathBuf> {
    let secret_file = data_path.join(JWT_SECRET_FILE);
    if secret_file.exists() {
        info!("Keeping existing JWT secret at {}", secret_file.display());
        return Ok(secret_file);
    }

    fs::write(&secret_file, generate_secret())?;

    #[cfg(unix)]
    set_restrictive_permissions(&secret_file);

    Ok(secret_file)
}

fn run_init(
    data_dir: PathBuf,
    non_interactive: bool,
    name: Option<String>,
    email: Option<String>,
    password: Option<String>,
) -> anyhow::Result<()> {
    fs::create_dir_all(&data_dir)?;

    let config = ServerConfig {
        data_dir,
        ..Default::default()
    };
    let db = SqliteDatabase::new(config.db_path())?;
    db.initialize()?;

    if db.has_admin()? {
        bail!(
            "Server already initialized. An administrator exists in {}",
            config.db_path().display()
        );
    }

    let default_password = non_interactive && password.is_none();
    let input = if non_interactive {
        AdminInput {
            name: name.unwrap_or_else(|| DEFAULT_ADMIN_NAME.to_string()),
            email: email.unwrap_or_else(|| DEFAULT_ADMIN_EMAIL.to_string()),
            password: password.unwrap_or_else(|| DEFAULT_ADMIN_PASSWORD.to_string()),
        }
    } else {
        prompt_admin(name, email, password)?
    };

    let name = input.name.trim().to_string();
    for check in [
        validate_user_name(&name),
        validate_email(&input.email),
        validate_password(&input.password),
    ] {
        if let Err(msg) = check {
            bail!("{msg}");
        }
    }

    let secret_file = write_jwt_secret(&config.data_dir)?;

    let now = Utc::now();
    let admin = User {
        id: Uuid::new_v4().to_string(),
        name,
        email: normalize_email(&input.email),
        address: None,
        password_hash: PasswordHasher::new().hash(&input.password)?,
        role: Role::Admin,
        created_at: now,
        updated_at: now,
    };
    db.create_user(&admin)?;

    println!();
    println!("========================================");
    println!("Administrator created:");
    println!();
    println!("  email: {}", admin.email);
    if default_password {
        println!("  password: {DEFAULT_ADMIN_PASSWORD} (change it after first login)");
    }
    println!();
    println!("Database: {}", config.db_path().display());
    println!("JWT secret: {}", secret_file.display());
    println!("========================================");
    println!();

    Ok(())
}

fn load_config(config: Option<PathBuf>, data_dir: Option<&Path>) -> anyhow::Result<ServerConfig> {
    let path = match config {
        Some(path) => Some(path),
        None => {
            let dir = data_dir
                .map(Path::to_path_buf)
                .unwrap_or_else(|| ServerConfig::default().data_dir);
            Some(dir.join(CONFIG_FILE)).filter(|p| p.exists())
        }
    };

    match path {
        Some(path) => {
            info!("Loading config from {}", path.display());
            ServerConfig::from_file(&path)
                .with_context(|| format!("failed to load {}", path.display()))
        }
        None => Ok(ServerConfig::default()),
    }
}

async fn run_serve(
    config: Option<PathBuf>,
    host: Option<String>,
    port: Option<u16>,
    data_dir: Option<PathBuf>,
) -> anyhow::Result<()> {
    let mut config = load_config(config, data_dir.as_deref())?;
    if let Some(host) = host {
        config.host = host;
    }
    if let Some(port) = port {
        config.port = port;
    }
    if let Some(data_dir) = data_dir {
        config.data_dir = data_dir;
    }

    let not_initialized =
        "Server not initialized. Run 'storerate admin init' first to create the database and administrator.";

    if !config.db_path().exists() {
        bail!(not_initialized);
    }

    let db = SqliteDatabase::new(config.db_path())?;
    db.initialize()?;
    if !db.has_admin()? {
        bail!(not_initialized);
    }

    let secret = config.load_jwt_secret()?;
    let jwt = JwtKeys::new(secret.as_bytes(), config.token_ttl());

    let state = Arc::new(
        AppState::new(Arc::new(db), jwt).with_allowed_origins(config.allowed_origins.clone()),
    );

    let app = create_router(state);
    let addr = config.socket_addr()?;

    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("storerate=info".parse()?))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Admin { command } => match command {
            AdminCommands::Init {
                data_dir,
                non_interactive,
                name,
                email,
                password,
            } => {
                run_init(data_dir, non_interactive, name, email, password)?;
            }
        },
        Commands::Serve {
            config,
            host,
            port,
            data_dir,
        } => {
            run_serve(config, host, port, data_dir).await?;
        }
    }

    Ok(())
}
