// src/scanner/mod.rs

// --- Imports ---
use crate::models::Record;
use crate::patterns;
use crate::profile::SiteProfile;
use scraper::{ElementRef, Html};

/// One scanned listing row: the parsed record plus the raw descriptor of its
/// phone-request affordance, when the row has one.
#[derive(Debug, Clone)]
pub struct ScannedRecord {
    pub record: Record,
    pub reveal_onclick: Option<String>,
}

/// Locates the listing rows on the page, in document order. Rows are the
/// interactive table rows that contain at least one bold header matching the
/// "ref : title" shape; everything else (section headers, banners, pager
/// rows) is filtered out.
pub fn find_record_rows<'a>(document: &'a Html, profile: &SiteProfile) -> Vec<ElementRef<'a>> {
    document
        .select(&profile.record_rows)
        .filter(|row| {
            row.select(&profile.header_cells).any(|cell| {
                patterns::looks_like_record_header(cell.text().collect::<String>().trim())
            })
        })
        .collect()
}

/// Scans the whole page: one entry per candidate row, `None` where the row
/// could not be parsed into a record. The caller logs misses and keeps
/// going; a miss never aborts the page.
pub fn scan_page(document: &Html, profile: &SiteProfile) -> Vec<Option<ScannedRecord>> {
    find_record_rows(document, profile)
        .into_iter()
        .map(|row| {
            extract_record(row, profile).map(|record| ScannedRecord {
                record,
                reveal_onclick: reveal_affordance(row, profile),
            })
        })
        .collect()
}

/// Extracts one record from a listing row. The id and title are required;
/// every other field is best-effort and independently absent.
pub fn extract_record(row: ElementRef, profile: &SiteProfile) -> Option<Record> {
    let (id, title) = row.select(&profile.header_cells).find_map(|cell| {
        patterns::parse_id_and_title(cell.text().collect::<String>().trim())
    })?;

    let mut record = Record::new(id, title);
    record.property_type = find_property_type(row, profile);

    // The description block lives in one of the row's font cells, flagged by
    // the marker text. Sub-fields are parsed out of the same block.
    for cell in row.select(&profile.font_cells) {
        let text = cell.text().collect::<String>();
        if text.contains(profile.description_marker.as_str()) {
            let fields = patterns::parse_description_fields(&text);
            record.description = Some(text.trim().to_string());
            record.rent = fields.rent;
            record.charges = fields.charges;
            record.surface_area = fields.surface_area;
            record.availability = fields.availability;
            break;
        }
    }

    record.images = row
        .select(&profile.image_links)
        .filter_map(|link| link.value().attr("href"))
        .map(str::to_string)
        .collect();

    if let Some(cell) = row.select(&profile.energy_class).next() {
        record.energy_class = Some(cell.text().collect::<String>().trim().to_string());
    }

    if let Some(banner) = find_bulletin_info(row, profile) {
        let (number, date) = patterns::parse_bulletin_info(&banner);
        record.bulletin_number = number;
        record.bulletin_date = date;
    }

    tracing::debug!(
        "Scanned record {}: '{}' ({} images)",
        record.id,
        record.title,
        record.images.len()
    );
    Some(record)
}

/// Walks the preceding sibling rows until a section-header row is found and
/// returns its label. Listings are grouped under per-type headers; the
/// nearest one above the row names its property type.
pub fn find_property_type(row: ElementRef, profile: &SiteProfile) -> Option<String> {
    row.prev_siblings()
        .filter_map(ElementRef::wrap)
        .find(|sibling| profile.type_header_rows.matches(sibling))
        .and_then(|header| header.select(&profile.font_cells).next())
        .map(|label| label.text().collect::<String>().trim().to_string())
}

/// The raw onclick descriptor of the row's phone-request affordance.
pub fn reveal_affordance(row: ElementRef, profile: &SiteProfile) -> Option<String> {
    row.select(&profile.reveal_buttons)
        .next()
        .and_then(|button| button.value().attr("onclick"))
        .map(str::to_string)
}

/// Finds the bulletin banner nearest to the row: sibling rows are walked
/// upward first, then downward, stopping at the first fragment found.
fn find_bulletin_info(row: ElementRef, profile: &SiteProfile) -> Option<String> {
    let upward = row
        .prev_siblings()
        .filter_map(ElementRef::wrap)
        .find_map(|sibling| sibling.select(&profile.bulletin_info).next());
    let banner = upward.or_else(|| {
        row.next_siblings()
            .filter_map(ElementRef::wrap)
            .find_map(|sibling| sibling.select(&profile.bulletin_info).next())
    })?;
    Some(banner.text().collect::<String>())
}

// --- Tests ---
#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RecordStatus;

    const LISTING_PAGE: &str = r##"
        <html><body>
        <table>
        <tr bgcolor="#FFAAAA"><td><font>APPARTEMENTS</font></td></tr>
        <tr><td><font style="color: #AA0000">BULLETIN N° 118 du 01/02/2024</font></td></tr>
        <tr onmouseover="this.style.backgroundColor='#EEEEEE'">
          <td>
            <b>1234567 : Nice Flat*</b>
            <font>DESCRIPTION : T2 LUMINEUX, 45 M², LOYER : 650 € CHARGES : 50 €, DISPONIBLE de suite, proche gare</font>
            <a rel="imagegroup1" href="http://photos.test/1234567-a.jpg">photo 1</a>
            <a rel="imagegroup1" href="http://photos.test/1234567-b.jpg">photo 2</a>
            <input type="button" onclick="javascript:sendreq(4521);" value="DEMANDE">
          </td>
          <td background="img/fleche_select2.png"><font>D</font></td>
        </tr>
        <tr onmouseover="this.style.backgroundColor='#EEEEEE'">
          <td><b>7654321 : Grand Studio</b></td>
        </tr>
        <tr><td><font>Page 1 sur 3</font></td></tr>
        </table>
        </body></html>
    "##;

    #[test]
    fn finds_listing_rows_in_document_order() {
        let document = Html::parse_document(LISTING_PAGE);
        let profile = SiteProfile::default();
        let rows = find_record_rows(&document, &profile);
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn extracts_full_record_from_first_row() {
        let document = Html::parse_document(LISTING_PAGE);
        let profile = SiteProfile::default();
        let rows = find_record_rows(&document, &profile);
        let record = extract_record(rows[0], &profile).unwrap();

        assert_eq!(record.id, "1234567");
        assert_eq!(record.title, "Nice Flat");
        assert_eq!(record.property_type.as_deref(), Some("APPARTEMENTS"));
        assert_eq!(record.rent.as_deref(), Some("650 €"));
        assert_eq!(record.charges.as_deref(), Some("50 €"));
        assert_eq!(record.surface_area.as_deref(), Some("45 M²"));
        assert_eq!(record.availability.as_deref(), Some("de suite"));
        assert_eq!(record.images.len(), 2);
        assert_eq!(record.images[0], "http://photos.test/1234567-a.jpg");
        assert_eq!(record.energy_class.as_deref(), Some("D"));
        assert_eq!(record.bulletin_number.as_deref(), Some("118"));
        assert_eq!(record.bulletin_date.as_deref(), Some("01/02/2024"));
        assert_eq!(record.status, RecordStatus::Extracted);
        assert!(record.phone.is_none());
    }

    #[test]
    fn sparse_row_keeps_required_fields_only() {
        let document = Html::parse_document(LISTING_PAGE);
        let profile = SiteProfile::default();
        let rows = find_record_rows(&document, &profile);
        let record = extract_record(rows[1], &profile).unwrap();

        assert_eq!(record.id, "7654321");
        assert_eq!(record.title, "Grand Studio");
        assert!(record.description.is_none());
        assert!(record.rent.is_none());
        assert!(record.images.is_empty());
        assert!(record.energy_class.is_none());
        // The bulletin banner above the block still applies to this row.
        assert_eq!(record.bulletin_number.as_deref(), Some("118"));
    }

    #[test]
    fn reveal_affordance_found_on_first_row_only() {
        let document = Html::parse_document(LISTING_PAGE);
        let profile = SiteProfile::default();
        let rows = find_record_rows(&document, &profile);
        assert_eq!(
            reveal_affordance(rows[0], &profile).as_deref(),
            Some("javascript:sendreq(4521);")
        );
        assert!(reveal_affordance(rows[1], &profile).is_none());
    }

    #[test]
    fn bulletin_banner_below_the_row_is_found_downward() {
        let page = r##"
            <table>
            <tr onmouseover="this.style.backgroundColor='#EEEEEE'">
              <td><b>1111111 : Maison de village</b></td>
            </tr>
            <tr><td><font style="color: #AA0000">BULLETIN N° 9 du 15/03/2024</font></td></tr>
            </table>
        "##;
        let document = Html::parse_document(page);
        let profile = SiteProfile::default();
        let rows = find_record_rows(&document, &profile);
        let record = extract_record(rows[0], &profile).unwrap();
        assert_eq!(record.bulletin_number.as_deref(), Some("9"));
        assert_eq!(record.bulletin_date.as_deref(), Some("15/03/2024"));
    }

    #[test]
    fn row_with_headerless_bold_text_is_ignored() {
        let page = r##"
            <table>
            <tr onmouseover="this.style.backgroundColor='#EEEEEE'">
              <td><b>NOUVEAUTES DE LA SEMAINE</b></td>
            </tr>
            </table>
        "##;
        let document = Html::parse_document(page);
        let profile = SiteProfile::default();
        assert!(find_record_rows(&document, &profile).is_empty());
    }

    #[test]
    fn scan_page_reports_unparsable_row_as_miss() {
        // A header-shaped bold cell with an empty title passes the row
        // filter but fails record extraction.
        let page = r##"
            <table>
            <tr onmouseover="this.style.backgroundColor='#EEEEEE'">
              <td><b>1234567 :</b></td>
            </tr>
            <tr onmouseover="this.style.backgroundColor='#EEEEEE'">
              <td><b>7654321 : Grand Studio</b></td>
            </tr>
            </table>
        "##;
        let document = Html::parse_document(page);
        let profile = SiteProfile::default();
        let scans = scan_page(&document, &profile);
        assert_eq!(scans.len(), 2);
        assert!(scans[0].is_none());
        assert_eq!(scans[1].as_ref().unwrap().record.id, "7654321");
    }
}
