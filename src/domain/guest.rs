//! Guest rows from the RSVP sheet and the headcount derived from them
//!
//! The sheet is row-oriented: row 0 names the columns, every following row is
//! one RSVP. Columns are addressed by label, never by position, so reordering
//! columns upstream does not change the parse.

use serde::Serialize;
use std::collections::HashMap;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::OffsetDateTime;

pub const COL_TIMESTAMP: &str = "Timestamp";
pub const COL_FULL_NAME: &str = "Full Name";
pub const COL_EMAIL: &str = "Email";
pub const COL_GUESTS: &str = "Number Of Guests";
pub const COL_MESSAGE: &str = "Message";

/// Header labels in the order the RSVP form writes them
pub const SHEET_COLUMNS: [&str; 5] = [COL_TIMESTAMP, COL_FULL_NAME, COL_EMAIL, COL_GUESTS, COL_MESSAGE];

const DEFAULT_NAME: &str = "Guest";
const DEFAULT_GUESTS: &str = "1";

/// Header row plus data rows, cells as text
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowTable {
    header: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl RowTable {
    pub fn new(header: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { header, rows }
    }

    /// Build from raw rows where the first row is the header
    pub fn from_rows(mut rows: Vec<Vec<String>>) -> Self {
        if rows.is_empty() {
            return Self::default();
        }
        let header = rows.remove(0);
        Self { header, rows }
    }

    /// Table with the standard RSVP header and no data rows
    pub fn with_standard_header() -> Self {
        Self::new(SHEET_COLUMNS.iter().map(|c| c.to_string()).collect(), Vec::new())
    }

    pub fn header(&self) -> &[String] {
        &self.header
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// True when there are no data rows (a header alone is still empty)
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn push_row(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    /// Header followed by data rows, the shape the read endpoint serves
    pub fn to_rows(&self) -> Vec<Vec<String>> {
        if self.header.is_empty() && self.rows.is_empty() {
            return Vec::new();
        }
        std::iter::once(self.header.clone()).chain(self.rows.iter().cloned()).collect()
    }
}

/// Column label → position, built once per fetch
#[derive(Debug, Clone, Default)]
pub struct HeaderIndex {
    columns: HashMap<String, usize>,
}

impl HeaderIndex {
    /// Duplicate labels resolve to the right-most column.
    pub fn new(header: &[String]) -> Self {
        let mut columns = HashMap::with_capacity(header.len());
        for (i, label) in header.iter().enumerate() {
            columns.insert(label.clone(), i);
        }
        Self { columns }
    }

    pub fn position(&self, label: &str) -> Option<usize> {
        self.columns.get(label).copied()
    }

    /// Cell under `label`, or None if the column is missing, the row is short,
    /// or the cell is empty
    pub fn cell<'a>(&self, row: &'a [String], label: &str) -> Option<&'a str> {
        let idx = self.position(label)?;
        row.get(idx).map(String::as_str).filter(|s| !s.is_empty())
    }
}

/// One RSVP after defaults are applied
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GuestEntry {
    pub timestamp: String,
    pub name: String,
    pub email: String,
    /// Raw value from the sheet; see [`parse_guest_count`]
    pub guest_count: String,
    pub message: String,
}

impl GuestEntry {
    pub fn from_row(row: &[String], index: &HeaderIndex, now: &str) -> Self {
        // Whitespace-only names count as blank and fall back too
        let name = index
            .cell(row, COL_FULL_NAME)
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(DEFAULT_NAME);

        Self {
            timestamp: index.cell(row, COL_TIMESTAMP).unwrap_or(now).to_string(),
            name: name.to_string(),
            email: index.cell(row, COL_EMAIL).unwrap_or_default().to_string(),
            guest_count: index.cell(row, COL_GUESTS).unwrap_or(DEFAULT_GUESTS).to_string(),
            message: index.cell(row, COL_MESSAGE).unwrap_or_default().to_string(),
        }
    }

    pub fn guests(&self) -> u32 {
        parse_guest_count(&self.guest_count)
    }

    pub fn initials(&self) -> String {
        initials(&self.name)
    }
}

/// Leading-integer parse: `"2"` → 2, `"3 people"` → 3, `" 4"` → 4.
///
/// Values without leading digits and negative values count as zero.
/// Oversized values saturate.
pub fn parse_guest_count(raw: &str) -> u32 {
    let s = raw.trim_start();
    let (negative, rest) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s.strip_prefix('+').unwrap_or(s)),
    };

    let end = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
    if end == 0 || negative {
        return 0;
    }

    rest[..end].parse::<u32>().unwrap_or(u32::MAX)
}

/// Parse every data row in source order
pub fn parse_table(table: &RowTable, now: OffsetDateTime) -> Vec<GuestEntry> {
    let index = HeaderIndex::new(table.header());
    let now = now.format(&Rfc3339).unwrap_or_default();
    table.rows().iter().map(|row| GuestEntry::from_row(row, &index, &now)).collect()
}

pub fn total_guests(entries: &[GuestEntry]) -> u32 {
    entries.iter().fold(0u32, |sum, e| sum.saturating_add(e.guests()))
}

/// Result of one successful read: guests newest-first and their headcount
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GuestSnapshot {
    guests: Vec<GuestEntry>,
    total_guests: u32,
}

impl GuestSnapshot {
    pub fn from_table(table: &RowTable, now: OffsetDateTime) -> Self {
        let mut guests = parse_table(table, now);
        let total_guests = total_guests(&guests);
        // Last appended row first; no timestamp sort.
        guests.reverse();
        Self { guests, total_guests }
    }

    pub fn guests(&self) -> &[GuestEntry] {
        &self.guests
    }

    pub fn into_guests(self) -> Vec<GuestEntry> {
        self.guests
    }

    pub fn total_guests(&self) -> u32 {
        self.total_guests
    }

    pub fn is_empty(&self) -> bool {
        self.guests.is_empty()
    }
}

/// Up to two initials, uppercased; "?" for a blank name
pub fn initials(name: &str) -> String {
    let letters: String = name
        .split_whitespace()
        .take(2)
        .filter_map(|part| part.chars().next())
        .flat_map(char::to_uppercase)
        .collect();

    if letters.is_empty() {
        "?".to_string()
    } else {
        letters
    }
}

/// "May 18" from an RFC 3339 timestamp, empty when unparseable
pub fn short_date(timestamp: &str) -> String {
    let format = format_description!("[month repr:short] [day padding:none]");
    OffsetDateTime::parse(timestamp, &Rfc3339)
        .ok()
        .and_then(|dt| dt.format(&format).ok())
        .unwrap_or_default()
}

pub fn headcount_label(count: u32) -> String {
    if count == 1 {
        "1 Guest Confirmed".to_string()
    } else {
        format!("{count} Guests Confirmed")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    fn standard_table(rows: &[&[&str]]) -> RowTable {
        let mut table = RowTable::with_standard_header();
        for r in rows {
            table.push_row(row(r));
        }
        table
    }

    const NOW: OffsetDateTime = datetime!(2026-05-01 12:00 UTC);

    #[test]
    fn test_parse_guest_count() {
        assert_eq!(parse_guest_count("2"), 2);
        assert_eq!(parse_guest_count(" 4"), 4);
        assert_eq!(parse_guest_count("3 people"), 3);
        assert_eq!(parse_guest_count("2.7"), 2);
        assert_eq!(parse_guest_count("+5"), 5);
        assert_eq!(parse_guest_count("abc"), 0);
        assert_eq!(parse_guest_count(""), 0);
        assert_eq!(parse_guest_count("-3"), 0);
        assert_eq!(parse_guest_count("99999999999"), u32::MAX);
    }

    #[test]
    fn test_header_index_by_label() {
        let header = row(&["Message", "Number Of Guests", "Full Name"]);
        let index = HeaderIndex::new(&header);

        assert_eq!(index.position(COL_FULL_NAME), Some(2));
        assert_eq!(index.position(COL_EMAIL), None);

        let data = row(&["hi", "3", "Ana Cruz"]);
        assert_eq!(index.cell(&data, COL_FULL_NAME), Some("Ana Cruz"));
        assert_eq!(index.cell(&data, COL_GUESTS), Some("3"));
        assert_eq!(index.cell(&data, COL_EMAIL), None);
    }

    #[test]
    fn test_header_index_short_row_and_blank_cell() {
        let header = row(&SHEET_COLUMNS);
        let index = HeaderIndex::new(&header);

        let data = row(&["2026-01-01T00:00:00Z", ""]);
        assert_eq!(index.cell(&data, COL_FULL_NAME), None);
        assert_eq!(index.cell(&data, COL_MESSAGE), None);
    }

    #[test]
    fn test_entry_defaults() {
        let table = RowTable::new(row(&[COL_FULL_NAME]), vec![row(&["   "])]);
        let entries = parse_table(&table, NOW);

        assert_eq!(entries.len(), 1);
        let entry = &entries[0];
        assert_eq!(entry.name, "Guest");
        assert_eq!(entry.email, "");
        assert_eq!(entry.guest_count, "1");
        assert_eq!(entry.message, "");
        assert_eq!(entry.timestamp, "2026-05-01T12:00:00Z");
    }

    #[test]
    fn test_columns_found_regardless_of_position() {
        let table = RowTable::new(
            row(&[COL_MESSAGE, COL_GUESTS, COL_EMAIL, COL_FULL_NAME, COL_TIMESTAMP]),
            vec![row(&["See you!", "2", "ana@example.com", "Ana Cruz", "2026-02-01T10:00:00Z"])],
        );
        let entries = parse_table(&table, NOW);

        assert_eq!(entries[0].name, "Ana Cruz");
        assert_eq!(entries[0].email, "ana@example.com");
        assert_eq!(entries[0].guests(), 2);
        assert_eq!(entries[0].message, "See you!");
        assert_eq!(entries[0].timestamp, "2026-02-01T10:00:00Z");
    }

    #[test]
    fn test_snapshot_total_and_order() {
        let table = standard_table(&[
            &["2026-01-01T00:00:00Z", "A", "a@x", "2", ""],
            &["2026-01-02T00:00:00Z", "B", "b@x", "many", ""],
            &["2026-01-03T00:00:00Z", "C", "c@x", "3", ""],
        ]);
        let snapshot = GuestSnapshot::from_table(&table, NOW);

        assert_eq!(snapshot.total_guests(), 5);
        let names: Vec<&str> = snapshot.guests().iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["C", "B", "A"]);
    }

    #[test]
    fn test_missing_guest_column_counts_one_each() {
        let table = RowTable::new(row(&[COL_FULL_NAME]), vec![row(&["A"]), row(&["B"])]);
        let snapshot = GuestSnapshot::from_table(&table, NOW);
        assert_eq!(snapshot.total_guests(), 2);
    }

    #[test]
    fn test_header_only_is_empty() {
        let snapshot = GuestSnapshot::from_table(&RowTable::with_standard_header(), NOW);
        assert!(snapshot.is_empty());
        assert_eq!(snapshot.total_guests(), 0);
    }

    #[test]
    fn test_from_rows_splits_header() {
        let table = RowTable::from_rows(vec![row(&SHEET_COLUMNS), row(&["t", "A", "", "1", ""])]);
        assert_eq!(table.header().len(), 5);
        assert_eq!(table.rows().len(), 1);
        assert_eq!(table.to_rows().len(), 2);

        let empty = RowTable::from_rows(Vec::new());
        assert!(empty.header().is_empty());
        assert!(empty.to_rows().is_empty());
    }

    #[test]
    fn test_initials() {
        assert_eq!(initials("ana maria cruz"), "AM");
        assert_eq!(initials("  Lee "), "L");
        assert_eq!(initials(""), "?");
        assert_eq!(initials("   "), "?");
    }

    #[test]
    fn test_short_date() {
        assert_eq!(short_date("2026-05-18T14:30:00+08:00"), "May 18");
        assert_eq!(short_date("2026-01-05T08:12:00.000Z"), "Jan 5");
        assert_eq!(short_date("yesterday"), "");
    }

    #[test]
    fn test_headcount_label() {
        assert_eq!(headcount_label(1), "1 Guest Confirmed");
        assert_eq!(headcount_label(0), "0 Guests Confirmed");
        assert_eq!(headcount_label(12), "12 Guests Confirmed");
    }
}
