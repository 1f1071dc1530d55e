// src/profile.rs
use scraper::Selector;
use std::time::Duration;

/// A selector used both to match against parsed snapshots and to address an
/// element through the host, which takes the raw source string.
#[derive(Debug, Clone)]
pub struct InteractiveSelector {
    pub selector: Selector,
    pub source: String,
}

impl InteractiveSelector {
    fn new(source: &str) -> Self {
        Self {
            selector: sel(source),
            source: source.to_string(),
        }
    }
}

/// The source site's markup dialect, as data. The defaults describe the one
/// legacy site this extractor targets; everything the scanner and pagination
/// controller match against lives here so the matching code stays generic.
#[derive(Debug, Clone)]
pub struct SiteProfile {
    /// Listing rows are the only interactive rows on the results page.
    pub record_rows: Selector,
    /// Bold cells inside a row; one of them carries the "ref : title" header.
    pub header_cells: Selector,
    /// Font cells inside a row; one of them carries the description block.
    pub font_cells: Selector,
    /// Marker that identifies the description cell among the font cells.
    pub description_marker: String,
    /// Section-header rows announcing the property type of the rows below.
    pub type_header_rows: Selector,
    /// Bulletin banner fragments, found near a block of listing rows.
    pub bulletin_info: Selector,
    /// The per-listing phone-request affordance.
    pub reveal_buttons: Selector,
    /// Gallery links attached to a listing row.
    pub image_links: Selector,
    /// Energy-class marker cell.
    pub energy_class: Selector,
    /// Links whose target encodes a page parameter.
    pub page_links: Selector,
    /// Visible texts that mark a page link as "next".
    pub next_tokens: Vec<String>,
    /// Substring of the authentication page's URL.
    pub login_url_token: String,
    pub username_field: InteractiveSelector,
    pub password_field: InteractiveSelector,
    pub submit_button: InteractiveSelector,
}

impl Default for SiteProfile {
    fn default() -> Self {
        Self {
            record_rows: sel(r#"tr[onmouseover*="backgroundColor"]"#),
            header_cells: sel("b"),
            font_cells: sel("font"),
            description_marker: "DESCRIPTION :".to_string(),
            type_header_rows: sel(r#"tr[bgcolor="#FFAAAA"]"#),
            bulletin_info: sel(r#"font[style*="color: #AA0000"]"#),
            reveal_buttons: sel(r#"input[onclick*="sendreq"]"#),
            image_links: sel(r#"a[rel*="image"]"#),
            energy_class: sel(r#"td[background*="fleche_select2.png"] font"#),
            page_links: sel(r#"a[href*="page="]"#),
            next_tokens: vec!["Suivant".into(), ">".into(), "Next".into()],
            login_url_token: "w_index_abonnes.php".to_string(),
            username_field: InteractiveSelector::new(r#"input[name="abonlogin1"]"#),
            password_field: InteractiveSelector::new(r#"input[name="abonpassword"]"#),
            submit_button: InteractiveSelector::new(r#"input[type="submit"]"#),
        }
    }
}

fn sel(source: &str) -> Selector {
    Selector::parse(source).expect("Failed to compile profile selector")
}

/// Fixed pacing against the source site. These are politeness floors, not
/// readiness checks; the site renders asynchronously and is never polled.
#[derive(Debug, Clone)]
pub struct Pacing {
    /// Sleep between records on a page.
    pub record_delay: Duration,
    /// Settle time after following a page link.
    pub page_settle: Duration,
    /// Extra sleep between page iterations in batch mode.
    pub page_delay: Duration,
    /// Window for the site's asynchronous phone-reveal response.
    pub reveal_wait: Duration,
    /// Pause between filling the login form and submitting it.
    pub login_settle: Duration,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            record_delay: Duration::from_millis(1000),
            page_settle: Duration::from_millis(3000),
            page_delay: Duration::from_millis(2000),
            reveal_wait: Duration::from_millis(15000),
            login_settle: Duration::from_millis(1000),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_profile_selectors_compile() {
        let profile = SiteProfile::default();
        assert_eq!(profile.next_tokens.len(), 3);
        assert_eq!(profile.description_marker, "DESCRIPTION :");
    }
}
