//! Conversion between `.xlsx` bytes and [`ProcessTable`] using `umya-spreadsheet`.
//!
//! Only the first worksheet is read. Row 1 is the header row. Blank rows in
//! the middle of the data are kept so the export has the same number of rows
//! as the input; blank rows after the last data row are dropped. The export
//! always writes a single sheet named `Sheet1`, and each cell keeps the type
//! it had in the input.

use crate::domain::model::{CellKind, ColumnNames, ProcessTable};
use crate::utils::error::{BotError, Result};
use std::io::Cursor;
use umya_spreadsheet::{Cell, Worksheet};

pub fn parse_workbook(data: &[u8], columns: &ColumnNames) -> Result<ProcessTable> {
    let book = umya_spreadsheet::reader::xlsx::read_reader(Cursor::new(data), true).map_err(
        |e| BotError::SpreadsheetError {
            message: format!("Failed to read workbook: {}", e),
        },
    )?;

    let sheet = book.get_sheet(&0).ok_or_else(|| BotError::SpreadsheetError {
        message: "Workbook has no worksheets".to_string(),
    })?;

    let (max_col, max_row) = sheet.get_highest_column_and_row();
    if max_row == 0 || max_col == 0 {
        return Err(BotError::SpreadsheetError {
            message: "Worksheet is empty".to_string(),
        });
    }

    let headers: Vec<String> = (1..=max_col)
        .map(|col| sheet.get_value((col, 1)).trim().to_string())
        .collect();

    let mut rows = Vec::new();
    let mut kinds = Vec::new();
    for row in 2..=max_row {
        let (cells, row_kinds) = read_row(sheet, row, max_col);
        rows.push(cells);
        kinds.push(row_kinds);
    }

    // 只去掉資料之後的空白列
    while rows.last().is_some_and(|cells| is_blank(cells)) {
        rows.pop();
        kinds.pop();
    }
    for (index, cells) in rows.iter().enumerate() {
        if is_blank(cells) {
            tracing::warn!("⚠️ Spreadsheet row {} is blank; it is kept as is", index + 2);
        }
    }

    tracing::debug!(
        "Parsed worksheet: {} columns, {} data rows",
        headers.len(),
        rows.len()
    );
    Ok(ProcessTable::new(headers, rows, columns)?.with_cell_kinds(kinds))
}

fn read_row(sheet: &Worksheet, row: u32, max_col: u32) -> (Vec<String>, Vec<CellKind>) {
    (1..=max_col)
        .map(|col| match sheet.get_cell((col, row)) {
            Some(cell) => (cell.get_value().into_owned(), cell_kind(cell)),
            None => (String::new(), CellKind::Text),
        })
        .unzip()
}

fn cell_kind(cell: &Cell) -> CellKind {
    match cell.get_data_type() {
        "n" => CellKind::Number,
        "b" => CellKind::Bool,
        _ => CellKind::Text,
    }
}

fn is_blank(cells: &[String]) -> bool {
    cells.iter().all(|c| c.trim().is_empty())
}

pub fn render_workbook(table: &ProcessTable) -> Result<Vec<u8>> {
    let mut book = umya_spreadsheet::new_file();
    let sheet = book.get_active_sheet_mut();

    for (col, header) in table.headers().iter().enumerate() {
        sheet
            .get_cell_mut((col as u32 + 1, 1))
            .set_value_string(header.as_str());
    }

    for (index, row) in table.rows().iter().enumerate() {
        let row_number = index as u32 + 2;
        for (col, value) in row.iter().enumerate() {
            if value.is_empty() {
                continue;
            }
            let cell = sheet.get_cell_mut((col as u32 + 1, row_number));
            match (table.cell_kind(index, col), value.parse::<f64>()) {
                (CellKind::Number, Ok(number)) => {
                    cell.set_value_number(number);
                }
                (CellKind::Bool, _) => {
                    cell.set_value_bool(value.eq_ignore_ascii_case("true"));
                }
                _ => {
                    cell.set_value_string(value.as_str());
                }
            }
        }
    }

    let mut cursor = Cursor::new(Vec::new());
    umya_spreadsheet::writer::xlsx::write_writer(&book, &mut cursor).map_err(|e| {
        BotError::SpreadsheetError {
            message: format!("Failed to write workbook: {}", e),
        }
    })?;
    Ok(cursor.into_inner())
}
