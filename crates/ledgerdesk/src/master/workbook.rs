//! Spreadsheet parsing for service-master uploads.
//!
//! Only the first worksheet is read. The first row names the columns; the
//! recognized ones are `name`, `display_name`, `description`, and `url`.
//! Unknown columns are ignored.

use std::io::Cursor;

use calamine::{Data, Reader, Xlsx};
use ledgerdesk_core::service::MasterRow;

use super::ApplyError;

/// Parses the first sheet of an `.xlsx` file into raw master rows.
pub fn parse_workbook(bytes: &[u8]) -> Result<Vec<MasterRow>, ApplyError> {
    let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes))
        .map_err(|e| ApplyError::InvalidWorkbook(format!("not a readable workbook: {e}")))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| ApplyError::InvalidWorkbook("workbook has no sheets".to_string()))?
        .map_err(|e| ApplyError::InvalidWorkbook(format!("unreadable first sheet: {e}")))?;

    let mut rows = range.rows().map(|row| {
        row.iter()
            .map(cell_to_string)
            .collect::<Vec<String>>()
    });

    let Some(header) = rows.next() else {
        return Ok(Vec::new());
    };

    Ok(rows_from_cells(&header, rows))
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        other => other.to_string().trim().to_string(),
    }
}

/// Maps data rows to [`MasterRow`]s using the header row for column lookup.
fn rows_from_cells(
    header: &[String],
    rows: impl Iterator<Item = Vec<String>>,
) -> Vec<MasterRow> {
    let column = |name: &str| {
        header
            .iter()
            .position(|h| h.eq_ignore_ascii_case(name))
    };
    let name_col = column("name");
    let display_col = column("display_name");
    let description_col = column("description");
    let url_col = column("url");

    let cell = |row: &[String], col: Option<usize>| {
        col.and_then(|i| row.get(i)).cloned().unwrap_or_default()
    };

    rows.map(|row| MasterRow {
        name: cell(&row, name_col),
        display_name: cell(&row, display_col),
        description: cell(&row, description_col),
        url: cell(&row, url_col),
    })
    .collect()
}
