//! Subcommand handlers.

use std::path::Path;

use anyhow::{anyhow, bail, Result};
use soundsync_client::{
    card_file_name, GuardDecision, LiveStatus, Route, SessionGuard, SignInForm, SignUpForm,
    SoundSyncApp, StatusSeed,
};
use soundsync_models::{card_download_path, suggested_file_name, ArtifactKind, GenerationId};
use tracing::{debug, info};

/// Gate a protected command on the session, returning the signed-in uid.
pub async fn require_session(app: &SoundSyncApp, route: Route) -> Result<String> {
    let mut guard = SessionGuard::mount(app.session());
    let decision = guard.resolve().await;
    guard.detach();

    match decision {
        GuardDecision::Render(session) => {
            debug!(route = %route, uid = %session.uid, "Guard passed");
            Ok(session.uid)
        }
        GuardDecision::Redirect(target) => {
            bail!("{} requires a session. Sign in at {} (`soundsync sign-in`).", route, target)
        }
        GuardDecision::Pending => bail!("Session state unresolved"),
    }
}

pub async fn sign_in(
    app: &SoundSyncApp,
    email: Option<String>,
    password: Option<String>,
    google_id_token: Option<String>,
) -> Result<()> {
    let session = match (google_id_token, email, password) {
        (Some(token), _, _) => app.sign_in_with_google(&token).await?,
        (None, Some(email), Some(password)) => app.sign_in(&SignInForm { email, password }).await?,
        _ => bail!("Provide --email and --password, or --google-id-token"),
    };

    println!(
        "Signed in as {}",
        session.display_name.as_deref().or(session.email.as_deref()).unwrap_or(&session.uid)
    );
    Ok(())
}

pub async fn sign_up(app: &SoundSyncApp, form: SignUpForm) -> Result<()> {
    let session = app.sign_up(&form).await?;
    println!(
        "Account created for {}",
        session.email.as_deref().unwrap_or(&session.uid)
    );
    Ok(())
}

pub async fn projects(app: &SoundSyncApp, query: Option<String>, genre: Option<String>, list_genres: bool) -> Result<()> {
    let uid = require_session(app, Route::Dashboard).await?;

    let mut list = app.project_list();
    if !list.refresh(&uid).await && !list.is_loaded() {
        bail!("Could not load your projects. Try again shortly.");
    }

    if list_genres {
        for genre in list.genres() {
            println!("{}", genre);
        }
        return Ok(());
    }

    if let Some(query) = query {
        list.set_query(query);
    }
    if let Some(genre) = genre {
        list.set_genre(genre);
    }

    for project in list.visible() {
        let state = if project.processing { "processing" } else { "ready" };
        println!(
            "{}  {}  [{}]  {}  {}  ({})",
            project.id, project.title, project.genre, project.duration, project.created_at, state
        );
    }
    println!("{}", list.count_label());
    Ok(())
}

/// Follow one generation until it is ready or the user interrupts.
pub async fn watch(app: &SoundSyncApp, id: &str, download: bool) -> Result<()> {
    require_session(app, Route::Generate).await?;

    let id = GenerationId::from_string(id);
    let mut subscriber = app.live_status();
    let mut updates = subscriber.observe();
    subscriber.attach(id.clone(), StatusSeed::default());
    println!("Watching {} (Ctrl+C to stop)", id);

    let finished = loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break None;
                }
                let status = updates.borrow_and_update().clone();
                if status.record.is_none() {
                    continue;
                }
                print_status(&status);
                if !status.is_processing() {
                    break Some(status);
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!(generation_id = %id, "Watch interrupted");
                break None;
            }
        }
    };
    subscriber.detach();

    let Some(status) = finished else {
        return Ok(());
    };
    println!("Generation complete.");

    if download {
        let name = suggested_file_name(status.title(), ArtifactKind::Track);
        let saved = app.downloader().download(status.track_path(), &name).await?;
        println!("Saved {}", saved.display());
    }
    Ok(())
}

fn print_status(status: &LiveStatus) {
    let state = if status.is_processing() { "processing" } else { "ready" };
    println!(
        "{}: {}  track={}  ai_video={}",
        status.title().unwrap_or("Untitled"),
        state,
        status.track_path().unwrap_or("-"),
        status.ai_video_path().unwrap_or("-"),
    );
}

/// Download an artifact. Without `kind`, picks what a project card would.
pub async fn download(app: &SoundSyncApp, id: &str, kind: Option<ArtifactKind>) -> Result<()> {
    let uid = require_session(app, Route::Dashboard).await?;
    let id = GenerationId::from_string(id);

    let record = app
        .generations(&uid)
        .get(&id)
        .await?
        .ok_or_else(|| anyhow!("No project with id {}", id))?;

    let (path, file_name) = match kind {
        None => {
            let path = card_download_path(&record);
            (path, card_file_name(path))
        }
        Some(kind) => (
            record.storage_path(kind),
            suggested_file_name(record.title.as_deref(), kind),
        ),
    };

    let saved = app.downloader().download(path, &file_name).await?;
    println!("Saved {}", saved.display());
    Ok(())
}

pub async fn upload(app: &SoundSyncApp, file: &Path, title: Option<String>, watch_after: bool) -> Result<()> {
    let uid = require_session(app, Route::Upload).await?;

    let outcome = app.upload_flow().start(&uid, file, title.as_deref()).await?;
    println!("Uploaded {} as generation {}", outcome.media.content_type, outcome.generation_id);
    if !outcome.triggered {
        println!("Generation could not be started; the upload was kept.");
        return Ok(());
    }

    if watch_after {
        watch(app, outcome.generation_id.as_str(), false).await?;
    }
    Ok(())
}

pub async fn rename(app: &SoundSyncApp, id: &str, title: &str) -> Result<()> {
    let uid = require_session(app, Route::Dashboard).await?;
    let title = title.trim();
    if title.is_empty() {
        bail!("Title cannot be empty");
    }

    app.generations(&uid)
        .rename(&GenerationId::from_string(id), title)
        .await?;
    println!("Renamed {} to {}", id, title);
    Ok(())
}

/// Print the route table and what the guard decides for each route now.
pub fn routes(app: &SoundSyncApp) {
    let state = app.session().state();
    for route in Route::ALL {
        let decision = if route.is_protected() {
            match GuardDecision::from_state(&state) {
                GuardDecision::Pending => "pending".to_string(),
                GuardDecision::Render(_) => "render".to_string(),
                GuardDecision::Redirect(target) => format!("redirect {}", target),
            }
        } else {
            "render".to_string()
        };
        let protection = if route.is_protected() { "protected" } else { "public" };
        println!("{:<12} {:<10} {}", route.path(), protection, decision);
    }
    println!("{:<12} {:<10} redirect {}", "*", "public", Route::Home);
}
