//! Streaming decoder for gzip-compressed hourly observation archives.
//!
//! Each archive is a headerless CSV with 13 columns: date, hour, then the
//! eleven measurements in the order of [`Measurements`].

use std::{io::Read, mem};

use csv::{ReaderBuilder, StringRecord};
use flate2::read::MultiGzDecoder;

use super::fields::{parse_f32_or_none, parse_i16_or_none};
use crate::error::DecodeError;

pub const HOURLY_COLUMNS: usize = 13;

/// One validated source row, still textual.
#[derive(Debug, Clone)]
pub struct HourlyRow {
    pub line: u64,
    record: StringRecord,
}

impl HourlyRow {
    pub fn date(&self) -> &str {
        &self.record[0]
    }

    pub fn hour(&self) -> &str {
        &self.record[1]
    }

    fn field(&self, column: usize) -> &str {
        &self.record[column]
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Measurements {
    pub temp: Option<f32>,
    pub dwpt: Option<f32>,
    pub rhum: Option<i16>,
    pub prcp: Option<f32>,
    pub snow: Option<i16>,
    pub wdir: Option<i16>,
    pub wspd: Option<f32>,
    pub wpgt: Option<f32>,
    pub pres: Option<f32>,
    pub tsun: Option<i16>,
    pub coco: Option<i16>,
}

impl Measurements {
    pub fn from_row(row: &HourlyRow) -> Self {
        Measurements {
            temp: parse_f32_or_none(row.field(2)),
            dwpt: parse_f32_or_none(row.field(3)),
            rhum: parse_i16_or_none(row.field(4)),
            prcp: parse_f32_or_none(row.field(5)),
            snow: parse_i16_or_none(row.field(6)),
            wdir: parse_i16_or_none(row.field(7)),
            wspd: parse_f32_or_none(row.field(8)),
            wpgt: parse_f32_or_none(row.field(9)),
            pres: parse_f32_or_none(row.field(10)),
            tsun: parse_i16_or_none(row.field(11)),
            coco: parse_i16_or_none(row.field(12)),
        }
    }
}

/// Lazy, non-restartable row source over a compressed archive.
pub struct HourlyReader<R: Read> {
    csv: csv::Reader<MultiGzDecoder<R>>,
    record: StringRecord,
    done: bool,
}

impl<R: Read> HourlyReader<R> {
    pub fn new(compressed: R) -> Self {
        let csv = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(MultiGzDecoder::new(compressed));

        HourlyReader {
            csv,
            record: StringRecord::new(),
            done: false,
        }
    }

    fn read_row(&mut self) -> Result<Option<HourlyRow>, DecodeError> {
        if !self.csv.read_record(&mut self.record)? {
            return Ok(None);
        }

        let line = self.record.position().map(|p| p.line()).unwrap_or(0);
        if self.record.len() != HOURLY_COLUMNS {
            return Err(DecodeError::ColumnCount {
                line,
                expected: HOURLY_COLUMNS,
                found: self.record.len(),
            });
        }

        Ok(Some(HourlyRow {
            line,
            record: mem::take(&mut self.record),
        }))
    }
}

impl<R: Read> Iterator for HourlyReader<R> {
    type Item = Result<HourlyRow, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.read_row() {
            Ok(Some(row)) => Some(Ok(row)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

// -- Tests -------------------------------------------------------------------
