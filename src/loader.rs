use std::collections::HashMap;

/// A parsed sheet row: column header mapped to the cell text.
///
/// Headers come from the first CSV row verbatim. A record only carries keys
/// for the fields the row actually had, so a short row yields absent keys
/// rather than empty strings.
pub type Record = HashMap<String, String>;

/// Parse raw CSV text into header-keyed records
///
/// This is the ingestion entry point for published sheet exports. The first
/// row supplies the headers; every following row is zipped with them
/// positionally. Quoted fields may contain commas, newlines and doubled
/// quotes (`""` unescapes to a literal `"`). `\r` is dropped everywhere.
///
/// Rows whose every field is empty are skipped. A trailing row without a
/// final newline is still flushed. The parser never fails: malformed quoting
/// can merge fields, but the scan always terminates.
///
/// # Arguments
/// * `text` - Raw CSV text as exported by the sheet
///
/// # Returns
/// * `Vec<Record>` - One record per data row, in sheet order
///
/// # Examples
/// ```
/// use salesboard::loader::parse_csv;
///
/// let records = parse_csv("name,note\n\"Smith, John\",\"He said \"\"hi\"\"\"");
/// assert_eq!(records[0]["name"], "Smith, John");
/// assert_eq!(records[0]["note"], "He said \"hi\"");
/// ```
pub fn parse_csv(text: &str) -> Vec<Record> {
    let rows = scan_rows(text);
    let mut iter = rows.into_iter();

    let headers = match iter.next() {
        Some(h) => h,
        None => return Vec::new(),
    };

    let mut records = Vec::new();
    for fields in iter {
        // Skip rows that are entirely empty
        if fields.iter().all(|f| f.is_empty()) {
            continue;
        }

        let mut record = Record::new();
        for (i, value) in fields.into_iter().enumerate() {
            if let Some(header) = headers.get(i) {
                record.insert(header.clone(), value);
            }
            // Extra fields beyond the header row are ignored
        }
        records.push(record);
    }

    records
}

// Scan the full text into rows of fields with a single pass.
// Separators are only significant outside quotes.
fn scan_rows(text: &str) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    let mut fields = Vec::new();
    let mut current_field = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' => {
                if in_quotes && chars.peek() == Some(&'"') {
                    // Double quote inside quoted field - add a single quote
                    current_field.push('"');
                    chars.next();
                } else {
                    in_quotes = !in_quotes;
                }
            }
            ',' if !in_quotes => {
                fields.push(std::mem::take(&mut current_field));
            }
            '\n' if !in_quotes => {
                fields.push(std::mem::take(&mut current_field));
                rows.push(std::mem::take(&mut fields));
            }
            '\r' => {}
            _ => current_field.push(c),
        }
    }

    // Flush an unterminated trailing field/row
    if !current_field.is_empty() || !fields.is_empty() {
        fields.push(current_field);
        rows.push(fields);
    }

    rows
}
