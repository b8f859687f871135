use calamine::{Reader, open_workbook_auto_from_rs};
use std::io::Cursor;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TabularError {
    #[error("could not open workbook: {0}")]
    Workbook(String),

    #[error("workbook contains no sheets")]
    NoSheets,
}

/// A sheet split into its header row and the data rows below it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TabularSheet {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl TabularSheet {
    /// The first row becomes the header row; an empty input yields an empty sheet.
    pub fn from_rows(rows: impl IntoIterator<Item = Vec<String>>) -> Self {
        let mut rows = rows.into_iter();
        let headers = rows.next().unwrap_or_default();
        Self {
            headers,
            rows: rows.collect(),
        }
    }
}

/// Turns raw uploaded bytes into cell text.
pub trait TabularReader: Send + Sync {
    fn read_first_sheet(&self, bytes: &[u8]) -> Result<TabularSheet, TabularError>;
}

/// Reads xls, xlsx, xlsb and ods workbooks.
#[derive(Clone, Copy, Debug, Default)]
pub struct WorkbookReader;

impl TabularReader for WorkbookReader {
    fn read_first_sheet(&self, bytes: &[u8]) -> Result<TabularSheet, TabularError> {
        let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
            .map_err(|e| TabularError::Workbook(e.to_string()))?;

        let range = workbook
            .worksheet_range_at(0)
            .ok_or(TabularError::NoSheets)?
            .map_err(|e| TabularError::Workbook(e.to_string()))?;

        Ok(TabularSheet::from_rows(
            range
                .rows()
                .map(|row| row.iter().map(|cell| cell.to_string()).collect()),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalizer::{HEADER_MAPPING, RawInput, normalize};
    use crate::record::Field;
    use rust_xlsxwriter::Workbook;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_from_rows_splits_header() {
        let sheet = TabularSheet::from_rows(vec![row(&["a", "b"]), row(&["1", "2"]), row(&["3"])]);
        assert_eq!(sheet.headers, row(&["a", "b"]));
        assert_eq!(sheet.rows, vec![row(&["1", "2"]), row(&["3"])]);
    }

    #[test]
    fn test_from_rows_empty() {
        let sheet = TabularSheet::from_rows(Vec::new());
        assert!(sheet.headers.is_empty());
        assert!(sheet.rows.is_empty());
    }

    #[test]
    fn test_garbage_is_not_a_workbook() {
        let result = WorkbookReader.read_first_sheet(b"definitely not a spreadsheet");
        assert!(matches!(result, Err(TabularError::Workbook(_))));
    }

    #[test]
    fn test_reads_only_first_sheet_as_text() {
        let mut workbook = Workbook::new();
        let calls = workbook.add_worksheet();
        calls.write_string(0, 0, "通话ID").unwrap();
        calls.write_string(0, 1, "主叫号码").unwrap();
        calls.write_string(0, 2, "备注").unwrap();
        calls.write_string(1, 0, "c-1").unwrap();
        calls.write_number(1, 1, 13800138000.0).unwrap();
        calls.write_string(1, 2, "callback").unwrap();
        calls.write_string(2, 0, "c-2").unwrap();
        calls.write_number(2, 1, 1.5).unwrap();
        calls.write_string(3, 0, "c-3").unwrap();

        let other = workbook.add_worksheet();
        other.write_string(0, 0, "ignored").unwrap();
        other.write_string(1, 0, "also ignored").unwrap();

        let bytes = workbook.save_to_buffer().unwrap();
        let sheet = WorkbookReader.read_first_sheet(&bytes).unwrap();

        assert_eq!(sheet.headers, row(&["通话ID", "主叫号码", "备注"]));
        assert_eq!(
            sheet.rows,
            vec![
                row(&["c-1", "13800138000", "callback"]),
                row(&["c-2", "1.5", ""]),
                row(&["c-3", "", ""]),
            ]
        );
    }

    #[test]
    fn test_workbook_rows_normalize() {
        let mut workbook = Workbook::new();
        let calls = workbook.add_worksheet();
        for (col, mapping) in (0u16..).zip(HEADER_MAPPING) {
            calls.write_string(0, col, mapping.header).unwrap();
            if mapping.field == Field::CallerNumber {
                calls.write_number(1, col, 13800138000.0).unwrap();
            } else {
                calls.write_string(1, col, format!("{}-1", mapping.field.as_str())).unwrap();
            }
        }

        let bytes = workbook.save_to_buffer().unwrap();
        let sheet = WorkbookReader.read_first_sheet(&bytes).unwrap();
        let records = normalize(RawInput::Tabular(sheet)).unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].caller_number, "13800138000");
        assert_eq!(records[0].call_id, "call_id-1");
        assert_eq!(records[0].province, "province-1");
    }
}

