// src/pagination/mod.rs

// --- Imports ---
use crate::patterns;
use crate::profile::SiteProfile;
use scraper::Html;

/// Finds the "next page" affordance: among the links whose target encodes a
/// page parameter, the first whose visible text carries one of the known
/// next tokens. `None` means the last page was reached, which is the normal
/// end of data rather than a failure.
pub fn next_page_link(document: &Html, profile: &SiteProfile) -> Option<String> {
    document.select(&profile.page_links).find_map(|link| {
        let text = link.text().collect::<String>();
        if profile
            .next_tokens
            .iter()
            .any(|token| text.contains(token.as_str()))
        {
            link.value().attr("href").map(str::to_string)
        } else {
            None
        }
    })
}

/// Estimates the total record count visible from this page. Single-page mode
/// never looks past what is on screen; batch mode reads the pagination text
/// and falls back to a per-page multiple of the visible page links. The
/// orchestrator later replaces this estimate with the running discovered
/// count, which is authoritative.
pub fn estimate_total(
    document: &Html,
    current_page_count: usize,
    batch_mode: bool,
    profile: &SiteProfile,
) -> usize {
    if !batch_mode {
        return current_page_count;
    }

    let page_text = document.root_element().text().collect::<String>();
    if let Some(total) = patterns::total_from_pagination_text(&page_text) {
        tracing::debug!("Pagination text reports {} records", total);
        return total;
    }

    let link_count = document.select(&profile.page_links).count();
    if link_count > 0 {
        let estimated = current_page_count * (link_count + 1);
        tracing::debug!(
            "No pagination text, estimating {} records from {} page links",
            estimated,
            link_count
        );
        return estimated;
    }

    current_page_count
}

// --- Tests ---
#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> SiteProfile {
        SiteProfile::default()
    }

    #[test]
    fn next_link_matched_by_token() {
        let document = Html::parse_document(
            r#"<body>
                <a href="liste.php?page=1">1</a>
                <a href="liste.php?page=2">2</a>
                <a href="liste.php?page=2">Suivant</a>
            </body>"#,
        );
        assert_eq!(
            next_page_link(&document, &profile()).as_deref(),
            Some("liste.php?page=2")
        );
    }

    #[test]
    fn next_link_accepts_angle_and_english_tokens() {
        let document =
            Html::parse_document(r#"<body><a href="liste.php?page=4">&gt;</a></body>"#);
        assert_eq!(
            next_page_link(&document, &profile()).as_deref(),
            Some("liste.php?page=4")
        );

        let document =
            Html::parse_document(r#"<body><a href="liste.php?page=4">Next</a></body>"#);
        assert!(next_page_link(&document, &profile()).is_some());
    }

    #[test]
    fn no_next_link_on_last_page() {
        let document = Html::parse_document(
            r#"<body><a href="liste.php?page=1">Précédent</a><a href="autre.php">Menu</a></body>"#,
        );
        assert!(next_page_link(&document, &profile()).is_none());
    }

    #[test]
    fn single_page_mode_counts_only_whats_visible() {
        let document = Html::parse_document(r#"<body>Page 1 sur 12</body>"#);
        assert_eq!(estimate_total(&document, 8, false, &profile()), 8);
    }

    #[test]
    fn batch_mode_prefers_pagination_text() {
        let document = Html::parse_document(
            r#"<body>Page 3 sur 12<a href="liste.php?page=4">Suivant</a></body>"#,
        );
        assert_eq!(estimate_total(&document, 10, true, &profile()), 12);
    }

    #[test]
    fn batch_mode_falls_back_to_link_count() {
        let document = Html::parse_document(
            r#"<body>
                LISTE DES ANNONCES
                <a href="liste.php?page=2">deux</a>
                <a href="liste.php?page=3">trois</a>
            </body>"#,
        );
        // 10 per page, 2 page links visible besides this page.
        assert_eq!(estimate_total(&document, 10, true, &profile()), 30);
    }

    #[test]
    fn batch_mode_without_any_hint_returns_page_count() {
        let document = Html::parse_document(r#"<body>LISTE DES ANNONCES</body>"#);
        assert_eq!(estimate_total(&document, 7, true, &profile()), 7);
    }
}
