// src/patterns/mod.rs

// --- Imports ---
use once_cell::sync::Lazy;
use regex::Regex;

// --- Regex Patterns (Lazy Static) ---
// Every listing row carries a bold "<7-digit ref> : <title>" header.
static RECORD_HEADER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{7}\s*:").expect("Failed to compile RECORD_HEADER_RE"));

static ID_TITLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{7})\s*:\s*(.+)$").expect("Failed to compile ID_TITLE_RE"));

// Description sub-fields. Each one is attempted independently; a miss leaves
// the field unset without failing the record.
static RENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"LOYER\s*:\s*(\d+\.?\d*)\s*€").expect("Failed to compile RENT_RE"));

static CHARGES_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"CHARGES?\s*:\s*(\d+\.?\d*)\s*€").expect("Failed to compile CHARGES_RE")
});

static SURFACE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+)\s*M²").expect("Failed to compile SURFACE_RE"));

static AVAILABILITY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)DISPONIBLE\s+([^,]+)").expect("Failed to compile AVAILABILITY_RE")
});

// Phone formats, in precedence order: national, international prefix, then a
// generic 10-digit grouped form. The first pattern that matches anywhere in
// the text wins, even if a later pattern would match a different substring.
static PHONE_RES: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"\b0[1-9][\s.-]?(?:\d{2}[\s.-]?){4}",
        r"\+33[\s.-]?[1-9][\s.-]?(?:\d{2}[\s.-]?){4}",
        r"\b\d{2}[\s.-]?\d{2}[\s.-]?\d{2}[\s.-]?\d{2}[\s.-]?\d{2}\b",
    ]
    .iter()
    .map(|pat| Regex::new(pat).expect("Failed to compile phone pattern"))
    .collect()
});

// Pagination hints, in precedence order. The site renders its pager in a few
// different shapes depending on the result count.
static PAGINATION_TOTAL_RES: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)Page\s+\d+\s+sur\s+(\d+)",
        r"\d+/(\d+)",
        r"(?i)sur\s+(\d+)",
        r"(?i)total:\s*(\d+)",
        r"(?i)(\d+)\s+résultats?",
    ]
    .iter()
    .map(|pat| Regex::new(pat).expect("Failed to compile pagination pattern"))
    .collect()
});

// Reveal-request id inside the affordance's onclick descriptor.
static REQUEST_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"sendreq\((\d+)\)").expect("Failed to compile REQUEST_ID_RE"));

static BULLETIN_NUMBER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"BULLETIN\s+N°\s*(\d+)").expect("Failed to compile BULLETIN_NUMBER_RE")
});

static BULLETIN_DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{2}/\d{2}/\d{4})").expect("Failed to compile BULLETIN_DATE_RE"));

// --- Data Structures ---
/// Sub-fields parsed out of a listing's description block. Every field is
/// independently optional.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DescriptionFields {
    pub rent: Option<String>,
    pub charges: Option<String>,
    pub surface_area: Option<String>,
    pub availability: Option<String>,
}

// --- Predicates / Extractors ---

/// True for text shaped like a listing header: a 7-digit reference followed
/// by a colon.
pub fn looks_like_record_header(text: &str) -> bool {
    RECORD_HEADER_RE.is_match(text)
}

/// Splits a listing header into `(id, title)`. A trailing `*` on the title
/// (the site's "new listing" marker) is stripped.
pub fn parse_id_and_title(text: &str) -> Option<(String, String)> {
    let caps = ID_TITLE_RE.captures(text)?;
    let id = caps.get(1)?.as_str().to_string();
    let title = caps
        .get(2)?
        .as_str()
        .trim_end_matches('*')
        .trim()
        .to_string();
    Some((id, title))
}

/// Best-effort parse of the description block. Units are kept in the output
/// ("650 €", "45 M²") to match the tabular export.
pub fn parse_description_fields(block: &str) -> DescriptionFields {
    DescriptionFields {
        rent: RENT_RE
            .captures(block)
            .map(|c| format!("{} €", &c[1])),
        charges: CHARGES_RE
            .captures(block)
            .map(|c| format!("{} €", &c[1])),
        surface_area: SURFACE_RE
            .captures(block)
            .map(|c| format!("{} M²", &c[1])),
        availability: AVAILABILITY_RE
            .captures(block)
            .map(|c| c[1].trim().to_string()),
    }
}

/// Finds a phone number anywhere in `text`, trying the known formats in
/// order and stripping separators from the first match.
pub fn parse_phone(text: &str) -> Option<String> {
    for pattern in PHONE_RES.iter() {
        if let Some(found) = pattern.find(text) {
            let digits: String = found
                .as_str()
                .chars()
                .filter(|c| !c.is_whitespace() && *c != '.' && *c != '-')
                .collect();
            return Some(digits);
        }
    }
    None
}

/// Reads a total result count out of free-form pagination text. The first
/// pattern whose capture parses to a positive number wins.
pub fn total_from_pagination_text(text: &str) -> Option<usize> {
    for pattern in PAGINATION_TOTAL_RES.iter() {
        if let Some(caps) = pattern.captures(text) {
            if let Ok(total) = caps[1].parse::<usize>() {
                if total > 0 {
                    return Some(total);
                }
            }
        }
    }
    None
}

/// Extracts the reveal-request id from an affordance's onclick descriptor.
pub fn parse_request_id(onclick: &str) -> Option<u64> {
    REQUEST_ID_RE
        .captures(onclick)
        .and_then(|c| c[1].parse().ok())
}

/// Pulls the bulletin number and issue date out of the banner text next to a
/// block of listings. Either part can be missing.
pub fn parse_bulletin_info(text: &str) -> (Option<String>, Option<String>) {
    let number = BULLETIN_NUMBER_RE
        .captures(text)
        .map(|c| c[1].to_string());
    let date = BULLETIN_DATE_RE.captures(text).map(|c| c[1].to_string());
    (number, date)
}
