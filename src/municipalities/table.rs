//! Loads the static municipality reference table (IBGE code, name, state, coordinates)
//! from a spreadsheet or CSV file.

use crate::municipalities::error::MunicipalityTableError;
use crate::types::forecast_row::Municipality;
use crate::utils::normalize_code;
use calamine::{open_workbook_auto, Data, Reader};
use log::{info, warn};
use polars::prelude::*;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::task;

const SPREADSHEET_EXTENSIONS: [&str; 4] = ["xlsx", "xlsm", "xls", "ods"];

/// A header row plus string cells, whatever file format they came from.
struct RawSheet {
    headers: Vec<String>,
    rows: Vec<Vec<Option<String>>>,
}

/// Positions of the columns the table needs.
#[derive(Debug, PartialEq)]
struct ColumnLayout {
    code: usize,
    name: Option<usize>,
    state: Option<usize>,
    latitude: usize,
    longitude: usize,
}

/// The static municipality reference table, keyed by seven-digit IBGE code.
#[derive(Debug, Clone, Default)]
pub struct MunicipalityTable {
    municipalities: Vec<Municipality>,
    index: HashMap<String, usize>,
}

impl MunicipalityTable {
    /// Builds a table from already-parsed entries.
    ///
    /// Codes are normalised; entries with an unusable code or non-finite coordinates are
    /// dropped and duplicate codes keep their first occurrence.
    pub fn from_municipalities(municipalities: impl IntoIterator<Item = Municipality>) -> Self {
        let mut table = Self::default();
        for mut municipality in municipalities {
            let Some(code) = normalize_code(&municipality.code) else {
                continue;
            };
            if !municipality.latitude.is_finite() || !municipality.longitude.is_finite() {
                continue;
            }
            if table.index.contains_key(&code) {
                continue;
            }
            municipality.code = code.clone();
            table.index.insert(code, table.municipalities.len());
            table.municipalities.push(municipality);
        }
        table
    }

    /// Loads the reference file at `path`.
    ///
    /// `.xlsx`, `.xlsm`, `.xls` and `.ods` files are read with calamine (first worksheet);
    /// any other extension is parsed as CSV with a header row.
    ///
    /// # Errors
    ///
    /// Returns [`MunicipalityTableError::FileNotFound`] when the file is missing,
    /// [`MunicipalityTableError::MissingColumn`] when no code, latitude or longitude column
    /// can be identified and [`MunicipalityTableError::Empty`] when no row survives
    /// cleaning.
    pub async fn load(path: &Path) -> Result<Self, MunicipalityTableError> {
        if tokio::fs::metadata(path).await.is_err() {
            return Err(MunicipalityTableError::FileNotFound(path.to_path_buf()));
        }
        let path_buf = path.to_path_buf();
        let table = task::spawn_blocking(move || Self::load_blocking(&path_buf)).await??;
        info!(
            "Loaded {} municipalities from {}",
            table.len(),
            path.display()
        );
        Ok(table)
    }

    fn load_blocking(path: &Path) -> Result<Self, MunicipalityTableError> {
        let is_spreadsheet = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| SPREADSHEET_EXTENSIONS.contains(&e.to_lowercase().as_str()))
            .unwrap_or(false);
        let sheet = if is_spreadsheet {
            read_spreadsheet(path)?
        } else {
            read_csv(path)?
        };
        Self::from_sheet(path, sheet)
    }

    fn from_sheet(path: &Path, sheet: RawSheet) -> Result<Self, MunicipalityTableError> {
        let layout = resolve_columns(path, &sheet.headers)?;
        let cell = |row: &[Option<String>], idx: usize| -> Option<String> {
            row.get(idx)
                .and_then(|c| c.as_deref())
                .map(|s| s.trim().to_string())
        };

        let total = sheet.rows.len();
        let municipalities: Vec<Municipality> = sheet
            .rows
            .iter()
            .filter_map(|row| {
                let code = cell(row, layout.code)?;
                let latitude = cell(row, layout.latitude).and_then(|s| parse_coordinate(&s))?;
                let longitude = cell(row, layout.longitude).and_then(|s| parse_coordinate(&s))?;
                Some(Municipality {
                    code,
                    name: layout.name.and_then(|i| cell(row, i)).unwrap_or_default(),
                    state: layout.state.and_then(|i| cell(row, i)).unwrap_or_default(),
                    latitude,
                    longitude,
                })
            })
            .collect();

        let table = Self::from_municipalities(municipalities);
        if table.len() < total {
            warn!(
                "Dropped {} of {} rows in {} (missing code/coordinates or duplicate code)",
                total - table.len(),
                total,
                path.display()
            );
        }
        if table.is_empty() {
            return Err(MunicipalityTableError::Empty(path.to_path_buf()));
        }
        Ok(table)
    }

    /// Keeps only the first `limit` municipalities; `0` keeps everything.
    pub fn truncated(mut self, limit: usize) -> Self {
        if limit > 0 && limit < self.municipalities.len() {
            self.municipalities.truncate(limit);
            self.index.retain(|_, idx| *idx < limit);
        }
        self
    }

    pub fn get(&self, code: &str) -> Option<&Municipality> {
        self.index.get(code).map(|&idx| &self.municipalities[idx])
    }

    pub fn contains(&self, code: &str) -> bool {
        self.index.contains_key(code)
    }

    /// Municipalities in file order.
    pub fn iter(&self) -> impl Iterator<Item = &Municipality> {
        self.municipalities.iter()
    }

    pub fn len(&self) -> usize {
        self.municipalities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.municipalities.is_empty()
    }
}

fn resolve_columns(path: &Path, headers: &[String]) -> Result<ColumnLayout, MunicipalityTableError> {
    let lowered: Vec<String> = headers.iter().map(|h| h.trim().to_lowercase()).collect();
    let exact = |names: &[&str]| -> Option<usize> {
        names
            .iter()
            .find_map(|name| lowered.iter().position(|h| h == name))
    };
    let containing = |needle: &str| lowered.iter().position(|h| h.contains(needle));
    let missing = |column: &str| MunicipalityTableError::MissingColumn {
        path: path.to_path_buf(),
        column: column.to_string(),
    };

    Ok(ColumnLayout {
        code: exact(&["cd_mun", "cd_ibge"]).ok_or_else(|| missing("CD_MUN"))?,
        name: exact(&["nm_mun"]),
        state: exact(&["sigla_uf", "uf"]),
        latitude: containing("lat").ok_or_else(|| missing("lat"))?,
        longitude: containing("lon").ok_or_else(|| missing("lon"))?,
    })
}

fn parse_coordinate(raw: &str) -> Option<f64> {
    raw.trim()
        .replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

fn read_spreadsheet(path: &Path) -> Result<RawSheet, MunicipalityTableError> {
    let path_buf = path.to_path_buf();
    let mut workbook = open_workbook_auto(path)
        .map_err(|e| MunicipalityTableError::SpreadsheetOpen(path_buf.clone(), e))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| MunicipalityTableError::NoWorksheet(path_buf.clone()))?
        .map_err(|e| MunicipalityTableError::WorksheetRead(path_buf.clone(), e))?;

    let mut rows = range.rows();
    let headers: Vec<String> = rows
        .next()
        .map(|header| header.iter().map(|c| cell_text(c).unwrap_or_default()).collect())
        .unwrap_or_default();
    let rows = rows
        .map(|row| row.iter().map(cell_text).collect())
        .collect();

    Ok(RawSheet { headers, rows })
}

fn cell_text(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty | Data::Error(_) => None,
        Data::String(s) => Some(s.clone()),
        Data::Int(i) => Some(i.to_string()),
        Data::Float(f) => Some(f.to_string()),
        other => Some(other.to_string()),
    }
}

fn read_csv(path: &Path) -> Result<RawSheet, MunicipalityTableError> {
    let path_buf: PathBuf = path.to_path_buf();
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(path_buf.clone()))
        .map_err(|e| MunicipalityTableError::CsvRead(path_buf.clone(), e))?
        .finish()
        .map_err(|e| MunicipalityTableError::CsvRead(path_buf.clone(), e))?;

    let headers: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|name| name.to_string())
        .collect();

    let mut columns: Vec<Vec<Option<String>>> = Vec::with_capacity(headers.len());
    for name in &headers {
        let column_error = |e: PolarsError| MunicipalityTableError::ColumnProcessing {
            path: path_buf.clone(),
            column: name.clone(),
            source: e,
        };
        let as_text = df
            .column(name)
            .and_then(|c| c.cast(&DataType::String))
            .map_err(column_error)?;
        let values = as_text
            .str()
            .map_err(column_error)?
            .into_iter()
            .map(|v| v.map(str::to_string))
            .collect();
        columns.push(values);
    }

    let rows = (0..df.height())
        .map(|i| columns.iter().map(|c| c[i].clone()).collect())
        .collect();

    Ok(RawSheet { headers, rows })
}
