use std::path::PathBuf;

use clap::{Parser, Subcommand};
use humanmatch::config::{ClientConfig, ConfigError};
use humanmatch::matching::{self, MatchConfidence};
use humanmatch::net::types::{MatchOutcome, MatchResult, UserUpdate};
use humanmatch::net::{ApiError, Backend};
use humanmatch::session::{LoginRedirect, SessionStatus};
use humanmatch::upload::{UploadError, UploadFile, UploadForm};
use humanmatch::{Connection, connect};
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("{}", .0.user_message())]
    Api(#[from] ApiError),
    #[error(transparent)]
    Upload(#[from] UploadError),
    #[error("not logged in; run `humanmatch login`")]
    NotLoggedIn,
    #[error("{0}")]
    LoginFailed(String),
    #[error("image {0} is a reference image; only query images can be matched")]
    ReferenceImage(i64),
    #[error("nothing to update; pass --email, --full-name or --password")]
    EmptyUpdate,
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "humanmatch", about = "Human Match face-matching client")]
struct Cli {
    /// Backend base URL (overrides HUMANMATCH_API_URL).
    #[arg(long)]
    api_url: Option<String>,

    /// Session token file (overrides HUMANMATCH_TOKEN_FILE).
    #[arg(long)]
    token_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check that the backend is up.
    Ping,
    Login {
        #[arg(long)]
        username: String,
        #[arg(long, env = "HUMANMATCH_PASSWORD", hide_env_values = true)]
        password: String,
    },
    Logout,
    #[command(flatten)]
    Session(SessionCommand),
}

/// Commands that run against a resolved session.
#[derive(Subcommand, Debug)]
enum SessionCommand {
    /// Show the current user's profile.
    Whoami,
    UpdateProfile {
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        full_name: Option<String>,
        #[arg(long)]
        password: Option<String>,
    },
    Upload {
        path: PathBuf,
        /// Add to the reference database instead of submitting as a query.
        #[arg(long, default_value_t = false)]
        reference: bool,
    },
    Images {
        #[arg(long, default_value_t = false, conflicts_with = "query_only")]
        reference_only: bool,
        /// Only images that can be submitted for matching.
        #[arg(long, default_value_t = false)]
        query_only: bool,
    },
    Image {
        image_id: i64,
    },
    /// Match a query image against the reference database.
    Match {
        image_id: i64,
    },
    History,
}

/// Login entry point for a terminal session.
struct LoginPrompt;

impl LoginRedirect for LoginPrompt {
    fn redirect_to_login(&self) {
        eprintln!("session expired; run `humanmatch login` to sign in again");
    }
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let cli = Cli::parse();
    let mut config = ClientConfig::from_env()?;
    if let Some(url) = cli.api_url.as_deref() {
        config = config.with_api_url(url)?;
    }
    if let Some(path) = cli.token_file {
        config = config.with_token_file(path);
    }
    let conn = connect(&config, Box::new(LoginPrompt))?;

    match cli.command {
        Command::Ping => run_ping(&conn).await,
        Command::Login { username, password } => run_login(&conn, &username, &password).await,
        Command::Logout => {
            conn.session.logout();
            eprintln!("logged out");
            Ok(())
        }
        Command::Session(command) => {
            require_session(&conn).await?;
            run_authenticated(&conn, command).await
        }
    }
}

async fn run_ping(conn: &Connection) -> Result<(), CliError> {
    let health = conn.api.health().await?;
    println!("{}", health.status);
    Ok(())
}

async fn run_login(conn: &Connection, username: &str, password: &str) -> Result<(), CliError> {
    if !conn.session.login(username, password).await {
        let message = conn
            .session
            .error()
            .unwrap_or_else(|| "Login failed. Please try again.".to_owned());
        return Err(CliError::LoginFailed(message));
    }
    if let Some(user) = conn.session.user() {
        eprintln!("logged in as {}", user.display_name());
    }
    Ok(())
}

async fn require_session(conn: &Connection) -> Result<(), CliError> {
    match conn.session.initialize().await {
        SessionStatus::Authenticated => Ok(()),
        _ => match conn.session.error() {
            Some(message) => Err(CliError::LoginFailed(message)),
            None => Err(CliError::NotLoggedIn),
        },
    }
}

async fn run_authenticated(conn: &Connection, command: SessionCommand) -> Result<(), CliError> {
    let backend = conn.session.backend();
    match command {
        SessionCommand::Whoami => {
            let user = conn.session.user().ok_or(CliError::NotLoggedIn)?;
            print_json(&user)
        }
        SessionCommand::UpdateProfile { email, full_name, password } => {
            let update = UserUpdate { email, full_name, password };
            if update.is_empty() {
                return Err(CliError::EmptyUpdate);
            }
            let user = conn.session.update_profile(&update).await?;
            print_json(&user)
        }
        SessionCommand::Upload { path, reference } => {
            let mut form = UploadForm::new();
            form.set_reference(reference);
            form.select(UploadFile::from_path(&path)?)?;
            let image = backend.upload_image(form.take_request()?).await?;
            print_json(&image)?;
            if !image.is_reference {
                eprintln!("run `humanmatch match {}` to match this image", image.id);
            }
            Ok(())
        }
        SessionCommand::Images { reference_only, query_only } => {
            let images = backend.list_images(reference_only).await?;
            let images = if query_only { matching::query_images(images) } else { images };
            print_json(&images)
        }
        SessionCommand::Image { image_id } => {
            let image = backend.fetch_image(image_id).await?;
            print_json(&image)
        }
        SessionCommand::Match { image_id } => run_match(conn, image_id).await,
        SessionCommand::History => {
            let history = backend.match_history().await?;
            print_json(&history)
        }
    }
}

async fn run_match(conn: &Connection, image_id: i64) -> Result<(), CliError> {
    let backend = conn.session.backend();
    let image = backend.fetch_image(image_id).await?;
    if image.is_reference {
        return Err(CliError::ReferenceImage(image_id));
    }
    eprintln!("comparing {} with reference database...", image.filename);

    match backend.match_image(image_id).await? {
        MatchOutcome::Matched(result) => print_match(conn, &result),
        MatchOutcome::NoMatch => println!("No match found in the reference database"),
        MatchOutcome::NoReferenceImages(detail) => println!("{detail}"),
    }
    Ok(())
}

fn print_match(conn: &Connection, result: &MatchResult) {
    let confidence = MatchConfidence::classify(result.similarity_score);
    println!("Match ID: {}", result.id);
    println!("Similarity Score: {}", matching::format_score(result.similarity_score));
    println!("Match Status: {}", confidence.label());
    println!("Match Date: {}", result.match_date);
    println!(
        "Matched Image: {} ({})",
        result.matched_image.filename,
        conn.api.asset_url(&result.matched_image)
    );
}

fn print_json<T: Serialize>(value: &T) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}
