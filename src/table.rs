//! Tabular file I/O
//!
//! Spreadsheets are loaded into an in-memory [`Table`] (first row is the
//! header), extended with result columns and written back in one go. Workbooks
//! are read with `calamine` and written with `rust_xlsxwriter`; CSV goes through
//! the `csv` crate. The format is picked from the file extension.

use crate::errors::CheckerError;
use calamine::{open_workbook_auto, Data, Reader};
use rust_xlsxwriter::{Format, Workbook};
use std::{fmt, path::Path};
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
}

impl CellValue {
    /// Missing, or text that is empty after trimming. Numbers and booleans
    /// are never blank.
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(text) => text.trim().is_empty(),
            CellValue::Number(_) | CellValue::Bool(_) => false,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Text(text) => f.write_str(text),
            CellValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{}", *n as i64),
            CellValue::Number(n) => write!(f, "{}", n),
            CellValue::Bool(b) => write!(f, "{}", b),
        }
    }
}

impl From<&str> for CellValue {
    fn from(text: &str) -> Self {
        CellValue::Text(text.to_string())
    }
}

impl From<String> for CellValue {
    fn from(text: String) -> Self {
        CellValue::Text(text)
    }
}

impl From<&Data> for CellValue {
    fn from(data: &Data) -> Self {
        match data {
            Data::Empty => CellValue::Empty,
            Data::String(text) => CellValue::Text(text.clone()),
            Data::Float(n) => CellValue::Number(*n),
            Data::Int(n) => CellValue::Number(*n as f64),
            Data::Bool(b) => CellValue::Bool(*b),
            other => CellValue::Text(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TableFormat {
    Csv,
    Workbook,
}

impl TableFormat {
    /// Format used to read `path`
    pub fn for_input(path: &Path) -> Result<Self, CheckerError> {
        match extension(path).as_deref() {
            Some("csv") => Ok(Self::Csv),
            Some("xlsx" | "xlsm" | "xlsb" | "xls" | "ods") => Ok(Self::Workbook),
            _ => Err(CheckerError::UnsupportedFormat(format!(
                "cannot read {} (expected .xlsx, .xlsm, .xlsb, .xls, .ods or .csv)",
                path.display()
            ))),
        }
    }

    /// Format used to write `path`. Only `.xlsx` workbooks can be written.
    pub fn for_output(path: &Path) -> Result<Self, CheckerError> {
        match extension(path).as_deref() {
            Some("csv") => Ok(Self::Csv),
            Some("xlsx") => Ok(Self::Workbook),
            _ => Err(CheckerError::UnsupportedFormat(format!(
                "cannot write {} (expected .xlsx or .csv)",
                path.display()
            ))),
        }
    }
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
}

/// A header row plus data rows, all rows as wide as the header
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<CellValue>>,
}

impl Table {
    pub fn new(headers: Vec<String>) -> Self {
        Self { headers, rows: Vec::new() }
    }

    /// Append a row, padding it with empty cells up to the header width
    pub fn push_row(&mut self, mut row: Vec<CellValue>) {
        if row.len() < self.headers.len() {
            row.resize(self.headers.len(), CellValue::Empty);
        }
        self.rows.push(row);
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<CellValue>] {
        &self.rows
    }

    /// Number of data rows (the header is not counted)
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn require_column(&self, name: &str) -> Result<usize, CheckerError> {
        self.column_index(name)
            .ok_or_else(|| CheckerError::MissingColumn(name.to_string()))
    }

    /// Values of one column in row order
    pub fn column(&self, index: usize) -> impl Iterator<Item = &CellValue> + '_ {
        self.rows
            .iter()
            .map(move |row| row.get(index).unwrap_or(&CellValue::Empty))
    }

    /// Set column `name` to `values`, one per row. An existing column with the
    /// same name is overwritten in place; otherwise the column is appended.
    pub fn set_column(&mut self, name: &str, values: Vec<CellValue>) -> Result<(), CheckerError> {
        if values.len() != self.rows.len() {
            return Err(CheckerError::ColumnLength {
                name: name.to_string(),
                expected: self.rows.len(),
                actual: values.len(),
            });
        }

        let index = match self.column_index(name) {
            Some(index) => index,
            None => {
                self.headers.push(name.to_string());
                self.headers.len() - 1
            }
        };

        for (row, value) in self.rows.iter_mut().zip(values) {
            if row.len() <= index {
                row.resize(index + 1, CellValue::Empty);
            }
            row[index] = value;
        }

        Ok(())
    }
}

pub fn read_table(path: &Path) -> Result<Table, CheckerError> {
    let table = match TableFormat::for_input(path)? {
        TableFormat::Csv => read_csv(path)?,
        TableFormat::Workbook => read_workbook(path)?,
    };

    debug!("Loaded {} rows x {} columns from {}", table.len(), table.headers().len(), path.display());
    Ok(table)
}

pub fn write_table(path: &Path, table: &Table) -> Result<(), CheckerError> {
    match TableFormat::for_output(path)? {
        TableFormat::Csv => write_csv(path, table)?,
        TableFormat::Workbook => write_workbook(path, table)?,
    }

    debug!("Wrote {} rows to {}", table.len(), path.display());
    Ok(())
}

fn read_csv(path: &Path) -> Result<Table, CheckerError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)?;

    let header_record = reader.headers()?.clone();
    let mut next_line = header_record
        .position()
        .map(|position| position.line() + record_span(&header_record))
        .unwrap_or(2);

    let mut table = Table::new(header_record.iter().map(str::to_string).collect());

    for record in reader.records() {
        let record = record?;

        // The reader drops empty lines; each one is a row with nothing in it.
        // Blank lines after the last record are indistinguishable from a
        // trailing newline and are not counted.
        if let Some(position) = record.position() {
            for _ in next_line..position.line() {
                table.push_row(Vec::new());
            }
            next_line = position.line() + record_span(&record);
        }

        let row = record
            .iter()
            .map(|field| {
                if field.is_empty() {
                    CellValue::Empty
                } else {
                    CellValue::from(field)
                }
            })
            .collect();
        table.push_row(row);
    }

    Ok(table)
}

/// Lines a parsed record occupies, counting newlines inside quoted fields
fn record_span(record: &csv::StringRecord) -> u64 {
    1 + record
        .iter()
        .map(|field| field.matches('\n').count() as u64)
        .sum::<u64>()
}

fn read_workbook(path: &Path) -> Result<Table, CheckerError> {
    let mut workbook = open_workbook_auto(path)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| CheckerError::UnsupportedFormat(format!("{} contains no worksheets", path.display())))??;

    // The range begins at the first used cell; pad it back out to column A
    let leading_columns = range.start().map(|(_, col)| col as usize).unwrap_or(0);
    let empty = Data::Empty;

    let mut rows = range.rows();
    let headers = match rows.next() {
        Some(header_row) => std::iter::repeat(&empty)
            .take(leading_columns)
            .chain(header_row.iter())
            .enumerate()
            .map(|(index, cell)| match CellValue::from(cell) {
                // Same naming pandas uses for headerless columns
                value if value.is_blank() => format!("Unnamed: {}", index),
                value => value.to_string(),
            })
            .collect(),
        None => Vec::new(),
    };

    let mut table = Table::new(headers);
    for row in rows {
        let mut cells = vec![CellValue::Empty; leading_columns];
        cells.extend(row.iter().map(CellValue::from));
        table.push_row(cells);
    }

    Ok(table)
}

fn write_csv(path: &Path, table: &Table) -> Result<(), CheckerError> {
    let mut writer = csv::Writer::from_path(path)?;

    writer.write_record(table.headers())?;
    for row in table.rows() {
        writer.write_record(row.iter().map(|cell| cell.to_string()))?;
    }

    writer.flush()?;
    Ok(())
}

fn write_workbook(path: &Path, table: &Table) -> Result<(), CheckerError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    let header_format = Format::new().set_bold();

    for (col, header) in table.headers().iter().enumerate() {
        worksheet.write_string_with_format(0, column_number(col)?, header, &header_format)?;
    }

    for (row_offset, row) in table.rows().iter().enumerate() {
        let row_number = u32::try_from(row_offset + 1)
            .map_err(|_| CheckerError::Internal(format!("row {} is out of range for a worksheet", row_offset + 1)))?;

        for (col, cell) in row.iter().enumerate() {
            let col = column_number(col)?;
            match cell {
                CellValue::Empty => {}
                CellValue::Text(text) => {
                    worksheet.write_string(row_number, col, text)?;
                }
                CellValue::Number(n) => {
                    worksheet.write_number(row_number, col, *n)?;
                }
                CellValue::Bool(b) => {
                    worksheet.write_boolean(row_number, col, *b)?;
                }
            }
        }
    }

    workbook.save(path)?;
    Ok(())
}

fn column_number(col: usize) -> Result<u16, CheckerError> {
    u16::try_from(col)
        .map_err(|_| CheckerError::Internal(format!("column {} is out of range for a worksheet", col)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn sample_table() -> Table {
        let mut table = Table::new(vec!["Domain".to_string(), "Owner".to_string()]);
        table.push_row(vec!["example.com".into(), "alice".into()]);
        table.push_row(vec![CellValue::Empty, CellValue::Number(42.0)]);
        table.push_row(vec!["test.org".into()]);
        table
    }

    #[test]
    fn test_blank_cells() {
        assert!(CellValue::Empty.is_blank());
        assert!(CellValue::from("   ").is_blank());
        assert!(CellValue::from("\t\n").is_blank());
        assert!(!CellValue::from("0").is_blank());
        assert!(!CellValue::Number(0.0).is_blank());
        assert!(!CellValue::Bool(false).is_blank());
    }

    #[test]
    fn test_cell_display() {
        assert_eq!(CellValue::Number(42.0).to_string(), "42");
        assert_eq!(CellValue::Number(1.5).to_string(), "1.5");
        assert_eq!(CellValue::Empty.to_string(), "");
        assert_eq!(CellValue::Bool(true).to_string(), "true");
    }

    #[test]
    fn test_format_detection() {
        assert_eq!(TableFormat::for_input(Path::new("in.XLSX")).unwrap(), TableFormat::Workbook);
        assert_eq!(TableFormat::for_input(Path::new("in.ods")).unwrap(), TableFormat::Workbook);
        assert_eq!(TableFormat::for_input(Path::new("in.csv")).unwrap(), TableFormat::Csv);
        assert!(TableFormat::for_input(Path::new("in.txt")).is_err());
        assert!(TableFormat::for_input(Path::new("noext")).is_err());

        assert_eq!(TableFormat::for_output(Path::new("out.xlsx")).unwrap(), TableFormat::Workbook);
        assert!(matches!(
            TableFormat::for_output(Path::new("out.xls")),
            Err(CheckerError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_short_rows_are_padded() {
        let table = sample_table();
        assert_eq!(table.len(), 3);
        assert_eq!(table.rows()[2], vec![CellValue::from("test.org"), CellValue::Empty]);
    }

    #[test]
    fn test_require_column_is_case_sensitive() {
        let table = sample_table();
        assert_eq!(table.require_column("Domain").unwrap(), 0);
        assert!(matches!(table.require_column("domain"), Err(CheckerError::MissingColumn(_))));
    }

    #[test]
    fn test_set_column_appends_and_overwrites() {
        let mut table = sample_table();
        table.set_column("Status", vec!["a".into(), "b".into(), "c".into()]).unwrap();
        assert_eq!(table.headers(), &["Domain", "Owner", "Status"]);
        assert_eq!(table.rows()[1][2], CellValue::from("b"));

        table.set_column("Status", vec!["x".into(), "y".into(), "z".into()]).unwrap();
        assert_eq!(table.headers().len(), 3);
        assert_eq!(table.column(2).map(|c| c.to_string()).collect::<Vec<_>>(), vec!["x", "y", "z"]);
    }

    #[test]
    fn test_set_column_length_mismatch() {
        let mut table = sample_table();
        let err = table.set_column("Status", vec!["only one".into()]).unwrap_err();
        assert!(matches!(err, CheckerError::ColumnLength { expected: 3, actual: 1, .. }));
        assert_eq!(table.headers().len(), 2, "failed insert must not add a header");
    }

    #[test]
    fn test_csv_read_and_write() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("domains.csv");
        let mut file = std::fs::File::create(&input).unwrap();
        writeln!(file, "Domain,Notes").unwrap();
        writeln!(file, "example.com,first").unwrap();
        writeln!(file, ",blank").unwrap();
        drop(file);

        let mut table = read_table(&input).unwrap();
        assert_eq!(table.headers(), &["Domain", "Notes"]);
        assert_eq!(table.len(), 2);
        assert!(table.rows()[1][0].is_blank());

        table.set_column("Extra", vec!["1".into(), "2".into()]).unwrap();
        let output = dir.path().join("out.csv");
        write_table(&output, &table).unwrap();

        let written = std::fs::read_to_string(&output).unwrap();
        let lines: Vec<&str> = written.lines().collect();
        assert_eq!(lines, vec!["Domain,Notes,Extra", "example.com,first,1", ",blank,2"]);
    }

    #[test]
    fn test_workbook_write_then_read() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("domains.xlsx");

        write_table(&path, &sample_table()).unwrap();
        let table = read_table(&path).unwrap();

        assert_eq!(table.headers(), &["Domain", "Owner"]);
        assert_eq!(table.len(), 3);
        assert_eq!(table.rows()[0][0], CellValue::from("example.com"));
        assert!(table.rows()[1][0].is_blank());
        assert_eq!(table.rows()[1][1], CellValue::Number(42.0));
    }

    #[test]
    fn test_csv_blank_lines_are_empty_rows() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("domains.csv");
        std::fs::write(&input, "Domain\na.example\n\nb.example\n").unwrap();

        let table = read_table(&input).unwrap();
        assert_eq!(table.len(), 3);
        let domains: Vec<String> = table.column(0).map(|c| c.to_string()).collect();
        assert_eq!(domains, vec!["a.example", "", "b.example"]);
        assert!(table.rows()[1][0].is_blank());
    }

    #[test]
    fn test_csv_blank_lines_with_crlf_and_quoted_newlines() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("domains.csv");
        std::fs::write(
            &input,
            "Domain,Notes\r\na.example,\"two\nlines\"\r\n\r\n\r\nb.example,x\r\n",
        )
        .unwrap();

        let table = read_table(&input).unwrap();
        let domains: Vec<String> = table.column(0).map(|c| c.to_string()).collect();
        assert_eq!(domains, vec!["a.example", "", "", "b.example"]);
        assert_eq!(table.rows()[0][1], CellValue::from("two\nlines"));
    }

    #[test]
    fn test_workbook_keeps_leading_empty_columns() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("offset.xlsx");

        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet.write_string(0, 2, "Domain").unwrap();
        worksheet.write_string(1, 2, "example.com").unwrap();
        workbook.save(&path).unwrap();

        let table = read_table(&path).unwrap();
        assert_eq!(table.headers(), &["Unnamed: 0", "Unnamed: 1", "Domain"]);
        assert_eq!(table.require_column("Domain").unwrap(), 2);
        assert_eq!(
            table.rows()[0],
            vec![CellValue::Empty, CellValue::Empty, CellValue::from("example.com")]
        );
    }

    #[test]
    fn test_unreadable_workbook() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.xlsx");
        std::fs::write(&path, b"this is not a zip archive").unwrap();

        assert!(matches!(read_table(&path), Err(CheckerError::WorkbookRead(_))));
    }
}
