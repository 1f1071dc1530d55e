// src/auth.rs
use crate::engine::events::{EventSender, Severity};
use crate::host::SiteSession;
use crate::models::Credentials;
use crate::profile::{Pacing, SiteProfile};
use crate::storage::{self, keys, BlobStore};
use crate::utils::error::EngineError;
use scraper::Html;

/// True when the document on screen is the subscriber login page, detected
/// by the URL token or by the presence of the login form's username field.
pub fn is_login_page(url: &str, document: &Html, profile: &SiteProfile) -> bool {
    url.contains(profile.login_url_token.as_str())
        || document
            .select(&profile.username_field.selector)
            .next()
            .is_some()
}

/// Fills the login form with the stored credentials and submits it. Returns
/// `Ok(false)` without touching the page when it isn't the login page or no
/// credentials are stored. Starting an extraction never calls this; the
/// start precondition still rejects an unauthenticated page.
pub async fn auto_login<H: SiteSession>(
    host: &H,
    store: &dyn BlobStore,
    profile: &SiteProfile,
    pacing: &Pacing,
    events: &EventSender,
) -> Result<bool, EngineError> {
    let html = host.current_html().await?;
    let url = host.current_url().await?;
    let on_login_page = {
        let document = Html::parse_document(&html);
        is_login_page(&url, &document, profile)
    };
    if !on_login_page {
        return Ok(false);
    }

    let Some(credentials) = storage::load::<Credentials>(store, keys::CREDENTIALS)? else {
        events.log(
            "Login page detected but no credentials are stored",
            Severity::Warning,
        );
        return Ok(false);
    };

    events.log("Login page detected, signing in", Severity::Info);
    host.fill(&profile.username_field.source, &credentials.username)
        .await?;
    host.fill(&profile.password_field.source, &credentials.password)
        .await?;
    tokio::time::sleep(pacing.login_settle).await;
    host.trigger(&profile.submit_button.source).await?;
    tokio::time::sleep(pacing.page_settle).await;
    Ok(true)
}
