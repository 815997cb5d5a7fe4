//! SoundSync terminal client.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{debug, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use soundsync_client::{SignUpForm, SoundSyncApp};
use soundsync_models::ArtifactKind;

mod commands;
mod session_store;

use session_store::{SessionStore, DEFAULT_SESSION_FILE};

#[derive(Parser, Debug)]
#[command(name = "soundsync")]
#[command(about = "Generate soundtracks for your videos")]
#[command(version)]
struct Cli {
    /// File holding the signed-in session between runs
    #[arg(long, global = true, env = "SOUNDSYNC_SESSION_FILE", default_value = DEFAULT_SESSION_FILE)]
    session_file: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in with email and password, or a Google ID token
    SignIn {
        #[arg(long, env = "SOUNDSYNC_EMAIL")]
        email: Option<String>,
        #[arg(long, env = "SOUNDSYNC_PASSWORD", hide_env_values = true)]
        password: Option<String>,
        /// Takes precedence over email and password
        #[arg(long)]
        google_id_token: Option<String>,
    },
    /// Create an account
    SignUp {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        confirm_password: String,
        #[arg(long)]
        display_name: Option<String>,
    },
    /// Forget the stored session
    SignOut,
    /// List your projects
    Projects {
        /// Match against title, track name and genre
        #[arg(long)]
        query: Option<String>,
        #[arg(long)]
        genre: Option<String>,
        /// Print the distinct genres instead
        #[arg(long)]
        genres: bool,
    },
    /// Follow a generation until it is ready
    Watch {
        id: String,
        /// Download the track once ready
        #[arg(long)]
        download: bool,
    },
    /// Download a project artifact
    Download {
        id: String,
        /// Defaults to the track, else the AI video
        #[arg(long, value_enum)]
        artifact: Option<Artifact>,
    },
    /// Upload a video or audio file and start a generation
    Upload {
        file: PathBuf,
        #[arg(long)]
        title: Option<String>,
        /// Follow the generation after starting it
        #[arg(long)]
        watch: bool,
    },
    /// Rename a project
    Rename { id: String, title: String },
    /// Show the route table and guard decisions
    Routes,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Artifact {
    Track,
    Video,
    AiVideo,
}

impl From<Artifact> for ArtifactKind {
    fn from(artifact: Artifact) -> Self {
        match artifact {
            Artifact::Track => ArtifactKind::Track,
            Artifact::Video => ArtifactKind::NormalVideo,
            Artifact::AiVideo => ArtifactKind::AiVideo,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // .env.local wins over .env; neither overrides the process environment
    dotenvy::from_filename(".env.local").ok();
    dotenvy::dotenv().ok();

    init_tracing()?;

    let cli = Cli::parse();
    let store = SessionStore::new(&cli.session_file);

    let app = SoundSyncApp::from_env().context("Failed to configure client")?;
    app.restore(store.load());
    debug!(session_file = %store.path().display(), "Session restored");

    let result = run(&app, &store, cli.command).await;

    // Tokens may have been refreshed or revoked during the command
    match app.session().current_session() {
        Some(session) => store.save(&session)?,
        None => store.clear()?,
    }

    result
}

async fn run(app: &SoundSyncApp, store: &SessionStore, command: Command) -> Result<()> {
    match command {
        Command::SignIn {
            email,
            password,
            google_id_token,
        } => commands::sign_in(app, email, password, google_id_token).await,
        Command::SignUp {
            email,
            password,
            confirm_password,
            display_name,
        } => {
            let form = SignUpForm {
                email,
                password,
                confirm_password,
                display_name,
            };
            commands::sign_up(app, form).await
        }
        Command::SignOut => {
            app.sign_out();
            info!(session_file = %store.path().display(), "Signed out");
            println!("Signed out");
            Ok(())
        }
        Command::Projects { query, genre, genres } => commands::projects(app, query, genre, genres).await,
        Command::Watch { id, download } => commands::watch(app, &id, download).await,
        Command::Download { id, artifact } => commands::download(app, &id, artifact.map(Into::into)).await,
        Command::Upload { file, title, watch } => commands::upload(app, &file, title, watch).await,
        Command::Rename { id, title } => commands::rename(app, &id, &title).await,
        Command::Routes => {
            commands::routes(app);
            Ok(())
        }
    }
}

/// Colored output for dev, JSON when `LOG_FORMAT=json`. Logs go to stderr.
fn init_tracing() -> Result<()> {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("soundsync=warn"))?;

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_writer(std::io::stderr),
            )
            .with(env_filter)
            .init();
    }
    Ok(())
}
