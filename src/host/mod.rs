// src/host/mod.rs
use crate::utils::error::HostError;
use async_trait::async_trait;

/// Navigation and interaction primitives of the host environment.
///
/// The extractor never owns a browser; it reads and drives the one page the
/// host has open. Concrete implementations (headless browser, embedded
/// webview) live with the host. All reads go through `current_html`, so the
/// rest of the crate parses a snapshot rather than touching live DOM state.
#[async_trait]
pub trait SiteSession: Send + Sync {
    /// Full HTML of the document currently on screen.
    async fn current_html(&self) -> Result<String, HostError>;

    /// URL of the document currently on screen.
    async fn current_url(&self) -> Result<String, HostError>;

    /// Follows a link target taken from the current document.
    async fn follow(&self, href: &str) -> Result<(), HostError>;

    /// Clicks the first element matching `selector` on the current page.
    async fn trigger(&self, selector: &str) -> Result<(), HostError>;

    /// Types `value` into the first element matching `selector`.
    async fn fill(&self, selector: &str, value: &str) -> Result<(), HostError>;

    /// Hands `content` to the host's download mechanism. Used as the
    /// fallback when the export file cannot be written directly.
    async fn download(&self, filename: &str, content: &str) -> Result<(), HostError>;
}
