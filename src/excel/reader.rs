//! Workbook reader: raw workbook bytes → [`Workbook`]

use crate::error::{KpiError, KpiResult};
use crate::types::{Cell, Workbook, Worksheet};
use calamine::{open_workbook_auto_from_rs, Data, Range, Reader};
use std::io::Cursor;
use tracing::{debug, warn};

/// Reads every worksheet of an in-memory workbook (xlsx, xls, xlsb or ods)
pub struct WorkbookReader<'a> {
    bytes: &'a [u8],
}

impl<'a> WorkbookReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    /// Decode the workbook.
    ///
    /// Fully blank rows are dropped. Columns stay absolute: a sheet whose data
    /// starts at column C still reports it as column 2, and every row spans the
    /// sheet's used width.
    pub fn read(&self) -> KpiResult<Workbook> {
        if self.bytes.is_empty() {
            return Err(KpiError::EmptyWorkbook("input is 0 bytes".to_string()));
        }

        let mut workbook = open_workbook_auto_from_rs(Cursor::new(self.bytes))
            .map_err(|e| KpiError::Workbook(format!("failed to open workbook: {e}")))?;

        let names = workbook.sheet_names();
        let mut sheets = Vec::with_capacity(names.len());
        for name in names {
            match workbook.worksheet_range(&name) {
                Ok(range) => {
                    let sheet = convert_range(&name, &range);
                    debug!(sheet = %name, rows = sheet.row_count(), "worksheet read");
                    sheets.push(sheet);
                }
                Err(e) => {
                    // A chart sheet or broken part; keep the name so sheet indices stay stable
                    warn!(sheet = %name, error = %e, "worksheet could not be read, treating as empty");
                    sheets.push(Worksheet::new(name, Vec::new()));
                }
            }
        }

        Ok(Workbook::new(sheets))
    }
}

/// Convenience wrapper around [`WorkbookReader`]
pub fn read_workbook(bytes: &[u8]) -> KpiResult<Workbook> {
    WorkbookReader::new(bytes).read()
}

fn convert_range(name: &str, range: &Range<Data>) -> Worksheet {
    let start_col = range.start().map_or(0, |(_, col)| col as usize);

    let rows = range
        .rows()
        .filter(|row| row.iter().any(|data| !convert_cell(data).is_empty()))
        .map(|row| {
            std::iter::repeat(Cell::Empty)
                .take(start_col)
                .chain(row.iter().map(convert_cell))
                .collect()
        })
        .collect();

    Worksheet::new(name, rows)
}

fn convert_cell(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Empty,
        Data::Float(f) => Cell::Number(*f),
        Data::Int(i) => Cell::Number(*i as f64),
        Data::String(s) => Cell::Text(s.clone()),
        Data::DateTime(dt) => Cell::Number(dt.as_f64()),
        Data::Bool(b) => Cell::Text(b.to_string()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::Text(s.clone()),
        Data::Error(e) => Cell::Text(format!("#{e:?}")),
    }
}
