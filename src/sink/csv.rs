// src/sink/csv.rs
use crate::models::Record;

/// Export column order, fixed so downstream spreadsheets stay stable.
const COLUMNS: [&str; 15] = [
    "id",
    "title",
    "propertyType",
    "description",
    "rent",
    "charges",
    "surfaceArea",
    "availability",
    "images",
    "energyClass",
    "bulletinNumber",
    "bulletinDate",
    "phone",
    "extractedAt",
    "status",
];

/// Serializes the record set to CSV: one header row, one row per record,
/// image lists joined with `;`.
pub fn to_csv(records: &[Record]) -> String {
    let mut lines = Vec::with_capacity(records.len() + 1);
    lines.push(COLUMNS.join(","));
    for record in records {
        lines.push(record_row(record).join(","));
    }
    lines.join("\n")
}

fn record_row(record: &Record) -> Vec<String> {
    vec![
        escape(&record.id),
        escape(&record.title),
        escape_opt(record.property_type.as_deref()),
        escape_opt(record.description.as_deref()),
        escape_opt(record.rent.as_deref()),
        escape_opt(record.charges.as_deref()),
        escape_opt(record.surface_area.as_deref()),
        escape_opt(record.availability.as_deref()),
        escape(&record.images.join(";")),
        escape_opt(record.energy_class.as_deref()),
        escape_opt(record.bulletin_number.as_deref()),
        escape_opt(record.bulletin_date.as_deref()),
        escape_opt(record.phone.as_deref()),
        escape(&record.extracted_at.to_rfc3339()),
        escape(record.status.as_str()),
    ]
}

/// Standard CSV quoting: wrap when the value carries a comma or a quote,
/// doubling internal quotes.
fn escape(field: &str) -> String {
    if field.contains(',') || field.contains('"') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn escape_opt(field: Option<&str>) -> String {
    field.map(escape).unwrap_or_default()
}

// --- Tests ---
#[cfg(test)]
mod tests {
    use super::*;

    fn sample(id: &str, title: &str) -> Record {
        Record::new(id.to_string(), title.to_string())
    }

    #[test]
    fn header_row_lists_all_fields_in_order() {
        let csv = to_csv(&[]);
        assert_eq!(
            csv,
            "id,title,propertyType,description,rent,charges,surfaceArea,availability,images,energyClass,bulletinNumber,bulletinDate,phone,extractedAt,status"
        );
    }

    #[test]
    fn plain_records_need_no_quoting() {
        let csv = to_csv(&[sample("1234567", "Nice Flat"), sample("7654321", "Studio")]);
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("1234567,Nice Flat,"));
        assert!(lines[2].starts_with("7654321,Studio,"));
        assert!(lines[1].ends_with(",extracted"));
        assert!(!lines[1].contains('"'));
    }

    #[test]
    fn commas_and_quotes_are_escaped() {
        let mut record = sample("1234567", r#"Maison "Les Lilas", centre"#);
        record.rent = Some("650 €".into());
        let csv = to_csv(&[record]);
        let row = csv.lines().nth(1).unwrap();
        assert!(row.starts_with(r#"1234567,"Maison ""Les Lilas"", centre",#));
    }

    #[test]
    fn images_join_with_semicolons() {
        let mut record = sample("1234567", "Nice Flat");
        record.images = vec![
            "http://photos.test/a.jpg".into(),
            "http://photos.test/b.jpg".into(),
        ];
        let csv = to_csv(&[record]);
        let row = csv.lines().nth(1).unwrap();
        assert!(row.contains("http://photos.test/a.jpg;http://photos.test/b.jpg"));
    }

    #[test]
    fn absent_fields_are_empty_cells() {
        let csv = to_csv(&[sample("1234567", "Nice Flat")]);
        let row = csv.lines().nth(1).unwrap();
        let cells: Vec<&str> = row.split(',').collect();
        assert_eq!(cells.len(), 15);
        assert_eq!(cells[2], ""); // propertyType
        assert_eq!(cells[12], ""); // phone
        assert_eq!(cells[14], "extracted");
    }
}
