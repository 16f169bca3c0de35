use crate::utils::error::{BotError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 試算表中五個已知欄位的標題名稱
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnNames {
    pub name: String,
    pub lawyer: String,
    pub process_number: String,
    pub city: String,
    pub status: String,
}

impl Default for ColumnNames {
    fn default() -> Self {
        Self {
            name: "Nome".to_string(),
            lawyer: "Advogado".to_string(),
            process_number: "Processo".to_string(),
            city: "Cidade".to_string(),
            status: "Status".to_string(),
        }
    }
}

/// 一筆表單提交資料
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessRecord {
    pub name: String,
    pub lawyer: String,
    pub process_number: String,
    pub city: String,
    pub status: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ColumnLayout {
    name: usize,
    lawyer: usize,
    process_number: usize,
    city: usize,
    status: usize,
}

/// 儲存格在輸入檔中的型別，匯出時照原樣寫回
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CellKind {
    #[default]
    Text,
    Number,
    Bool,
}

/// Flat table loaded from the input spreadsheet.
///
/// Columns other than the five known ones are carried through untouched so
/// that the exported file keeps the original layout. Every cell remembers
/// whether it was text, a number or a boolean, so a text cell such as
/// `000123` is never turned into the number `123`.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    kinds: Vec<Vec<CellKind>>,
    layout: ColumnLayout,
}

impl ProcessTable {
    pub fn new(
        mut headers: Vec<String>,
        mut rows: Vec<Vec<String>>,
        columns: &ColumnNames,
    ) -> Result<Self> {
        let name = require_column(&headers, &columns.name)?;
        let lawyer = require_column(&headers, &columns.lawyer)?;
        let process_number = require_column(&headers, &columns.process_number)?;
        let city = require_column(&headers, &columns.city)?;

        // 沒有 Status 欄位時自動補上
        let status = match column_position(&headers, &columns.status) {
            Some(index) => index,
            None => {
                tracing::debug!("Status column '{}' missing, appending it", columns.status);
                headers.push(columns.status.clone());
                headers.len() - 1
            }
        };

        let width = headers.len();
        for row in &mut rows {
            if row.len() < width {
                row.resize(width, String::new());
            }
        }
        let kinds = rows.iter().map(|row| vec![CellKind::Text; row.len()]).collect();

        Ok(Self {
            headers,
            rows,
            kinds,
            layout: ColumnLayout {
                name,
                lawyer,
                process_number,
                city,
                status,
            },
        })
    }

    /// Attaches the cell types read from the workbook; missing entries stay text.
    pub fn with_cell_kinds(mut self, kinds: Vec<Vec<CellKind>>) -> Self {
        for (row, row_kinds) in self.kinds.iter_mut().zip(kinds) {
            for (slot, kind) in row.iter_mut().zip(row_kinds) {
                *slot = kind;
            }
        }
        self
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn cell_kind(&self, row: usize, col: usize) -> CellKind {
        self.kinds
            .get(row)
            .and_then(|kinds| kinds.get(col))
            .copied()
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn record(&self, index: usize) -> Option<ProcessRecord> {
        let row = self.rows.get(index)?;
        let cell = |i: usize| row.get(i).cloned().unwrap_or_default();

        Some(ProcessRecord {
            name: cell(self.layout.name),
            lawyer: cell(self.layout.lawyer),
            process_number: cell(self.layout.process_number),
            city: cell(self.layout.city),
            status: cell(self.layout.status),
        })
    }

    pub fn records(&self) -> impl Iterator<Item = ProcessRecord> + '_ {
        (0..self.rows.len()).filter_map(move |i| self.record(i))
    }

    pub fn set_status(&mut self, index: usize, label: &str) -> Result<()> {
        let len = self.rows.len();
        let status = self.layout.status;
        let row = self
            .rows
            .get_mut(index)
            .ok_or_else(|| BotError::SpreadsheetError {
                message: format!("Row {} out of range ({} rows)", index, len),
            })?;
        row[status] = label.to_string();
        if let Some(kind) = self.kinds.get_mut(index).and_then(|k| k.get_mut(status)) {
            *kind = CellKind::Text;
        }
        Ok(())
    }

    pub fn count_status(&self, label: &str) -> usize {
        self.rows
            .iter()
            .filter(|row| row[self.layout.status] == label)
            .count()
    }
}

fn column_position(headers: &[String], column: &str) -> Option<usize> {
    headers.iter().position(|h| h.trim() == column.trim())
}

fn require_column(headers: &[String], column: &str) -> Result<usize> {
    column_position(headers, column).ok_or_else(|| BotError::MissingColumn {
        column: column.to_string(),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocatorKind {
    Id,
    ClassName,
    TagName,
    LinkText,
    PartialLinkText,
    Css,
    Xpath,
}

/// 頁面元素定位方式
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Locator {
    pub by: LocatorKind,
    pub value: String,
}

impl Locator {
    pub fn new(by: LocatorKind, value: impl Into<String>) -> Self {
        Self {
            by,
            value: value.into(),
        }
    }

    pub fn id(value: impl Into<String>) -> Self {
        Self::new(LocatorKind::Id, value)
    }

    pub fn class_name(value: impl Into<String>) -> Self {
        Self::new(LocatorKind::ClassName, value)
    }

    pub fn tag_name(value: impl Into<String>) -> Self {
        Self::new(LocatorKind::TagName, value)
    }

    pub fn partial_link_text(value: impl Into<String>) -> Self {
        Self::new(LocatorKind::PartialLinkText, value)
    }

    /// Strategy and selector as sent to the WebDriver.
    ///
    /// Id and class name become CSS selectors, partial link text becomes an
    /// XPath over anchors, so only the three W3C strategies remain.
    pub fn query(&self) -> (QueryKind, String) {
        match self.by {
            LocatorKind::Id => (QueryKind::Css, format!("[id=\"{}\"]", css_escape(&self.value))),
            LocatorKind::ClassName => (
                QueryKind::Css,
                format!("[class~=\"{}\"]", css_escape(&self.value)),
            ),
            LocatorKind::TagName | LocatorKind::Css => (QueryKind::Css, self.value.clone()),
            LocatorKind::LinkText => (QueryKind::LinkText, self.value.clone()),
            LocatorKind::PartialLinkText => (
                QueryKind::XPath,
                format!("//a[contains(normalize-space(.), {})]", xpath_literal(&self.value)),
            ),
            LocatorKind::Xpath => (QueryKind::XPath, self.value.clone()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    Css,
    LinkText,
    XPath,
}

impl fmt::Display for QueryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            QueryKind::Css => "css selector",
            QueryKind::LinkText => "link text",
            QueryKind::XPath => "xpath",
        })
    }
}

fn css_escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

// XPath 1.0 沒有跳脫字元，含兩種引號時只能用 concat()
fn xpath_literal(value: &str) -> String {
    if !value.contains('"') {
        format!("\"{}\"", value)
    } else if !value.contains('\'') {
        format!("'{}'", value)
    } else {
        let parts: Vec<String> = value
            .split('"')
            .map(|part| format!("\"{}\"", part))
            .collect();
        format!("concat({})", parts.join(", '\"', "))
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (kind, value) = self.query();
        write!(f, "{} '{}'", kind, value)
    }
}

/// 一次完整執行的結果摘要
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub output_path: String,
    pub rows: usize,
    pub found: usize,
    pub not_found: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunSummary {
    pub fn elapsed(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_table_resolves_columns_in_any_order() {
        let table = ProcessTable::new(
            headers(&["Processo", "Cidade", "Nome", "Status", "Advogado"]),
            vec![row(&["123", "Recife", "Ana", "nan", "Dr. Silva"])],
            &ColumnNames::default(),
        )
        .unwrap();

        let record = table.record(0).unwrap();
        assert_eq!(record.name, "Ana");
        assert_eq!(record.lawyer, "Dr. Silva");
        assert_eq!(record.process_number, "123");
        assert_eq!(record.city, "Recife");
        assert_eq!(record.status, "nan");
        assert!(table.record(1).is_none());
    }

    #[test]
    fn test_missing_status_column_is_appended() {
        let mut table = ProcessTable::new(
            headers(&["Nome", "Advogado", "Processo", "Cidade", "Obs"]),
            vec![row(&["Ana", "Dr. Silva", "1", "Recife"])],
            &ColumnNames::default(),
        )
        .unwrap();

        assert_eq!(table.headers().last().map(String::as_str), Some("Status"));
        assert_eq!(table.rows()[0].len(), 6);

        table.set_status(0, "Encontrado").unwrap();
        assert_eq!(table.rows()[0][5], "Encontrado");
        assert_eq!(table.count_status("Encontrado"), 1);
        assert!(table.set_status(3, "Encontrado").is_err());
    }

    #[test]
    fn test_missing_required_column() {
        let err = ProcessTable::new(
            headers(&["Nome", "Advogado", "Processo"]),
            vec![],
            &ColumnNames::default(),
        )
        .unwrap_err();

        assert!(matches!(err, BotError::MissingColumn { column } if column == "Cidade"));
    }

    #[test]
    fn test_status_update_marks_cell_as_text() {
        let mut table = ProcessTable::new(
            headers(&["Nome", "Advogado", "Processo", "Cidade", "Status"]),
            vec![row(&["Ana", "Dr. Silva", "000123", "Recife", "1"])],
            &ColumnNames::default(),
        )
        .unwrap()
        .with_cell_kinds(vec![vec![
            CellKind::Text,
            CellKind::Text,
            CellKind::Text,
            CellKind::Text,
            CellKind::Number,
        ]]);

        assert_eq!(table.cell_kind(0, 4), CellKind::Number);
        table.set_status(0, "Encontrado").unwrap();
        assert_eq!(table.cell_kind(0, 4), CellKind::Text);
        assert_eq!(table.cell_kind(0, 2), CellKind::Text);
        assert_eq!(table.cell_kind(7, 0), CellKind::Text);
    }

    #[test]
    fn test_locator_query() {
        assert_eq!(
            Locator::id("nome").query(),
            (QueryKind::Css, "[id=\"nome\"]".to_string())
        );
        assert_eq!(
            Locator::class_name("registerbtn").query(),
            (QueryKind::Css, "[class~=\"registerbtn\"]".to_string())
        );
        assert_eq!(
            Locator::partial_link_text("São Paulo").query(),
            (
                QueryKind::XPath,
                "//a[contains(normalize-space(.), \"São Paulo\")]".to_string()
            )
        );
        assert_eq!(Locator::tag_name("button").to_string(), "css selector 'button'");
    }

    #[test]
    fn test_partial_link_text_with_quotes() {
        let (_, xpath) = Locator::partial_link_text("Santa Bárbara d'Oeste").query();
        assert_eq!(
            xpath,
            "//a[contains(normalize-space(.), \"Santa Bárbara d'Oeste\")]"
        );

        let (_, xpath) = Locator::partial_link_text("a\"b'c").query();
        assert_eq!(
            xpath,
            "//a[contains(normalize-space(.), concat(\"a\", '\"', \"b'c\"))]"
        );
    }
}
