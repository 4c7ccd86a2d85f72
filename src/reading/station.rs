//! Streaming decoder for the gzip-compressed station metadata archive.

use std::{collections::HashMap, fmt, io::Read};

use flate2::read::MultiGzDecoder;
use serde::{
    de::{DeserializeSeed, SeqAccess, Visitor},
    Deserialize, Deserializer,
};

use crate::error::{DecodeError, ImportError};

#[derive(Debug, Clone, PartialEq)]
pub struct StationRecord {
    pub id: String,
    pub display_name: String,
    pub country: String,
    pub latitude: f32,
    pub longitude: f32,
    pub timezone: String,
}

#[derive(Debug, Deserialize)]
struct StationEntry {
    id: String,
    #[serde(default)]
    name: Option<HashMap<String, Option<String>>>,
    country: String,
    location: Location,
    timezone: String,
}

#[derive(Debug, Deserialize)]
struct Location {
    latitude: f32,
    longitude: f32,
    #[allow(dead_code)]
    elevation: Option<i32>,
}

impl From<StationEntry> for StationRecord {
    fn from(entry: StationEntry) -> Self {
        let display_name = entry
            .name
            .and_then(|mut names| names.remove("en"))
            .flatten()
            .unwrap_or_default();

        StationRecord {
            display_name,
            id: entry.id,
            country: entry.country,
            latitude: entry.location.latitude,
            longitude: entry.location.longitude,
            timezone: entry.timezone,
        }
    }
}

/// Walks the top-level JSON array one element at a time, handing each station
/// to `on_station`. Returns the number of stations seen.
pub fn for_each_station<R, F>(compressed: R, on_station: F) -> Result<u64, ImportError>
where
    R: Read,
    F: FnMut(StationRecord) -> Result<(), ImportError>,
{
    let mut de = serde_json::Deserializer::from_reader(MultiGzDecoder::new(compressed));
    let mut visitor = StationVisitor {
        on_station,
        failure: None,
    };

    let decoded = DeserializeSeed::deserialize(&mut visitor, &mut de);
    if let Some(err) = visitor.failure.take() {
        return Err(err);
    }
    let count = decoded.map_err(DecodeError::from)?;
    de.end().map_err(DecodeError::from)?;

    Ok(count)
}

struct StationVisitor<F> {
    on_station: F,
    // Callback errors are parked here; serde can only carry its own error type.
    failure: Option<ImportError>,
}

impl<'de, F> DeserializeSeed<'de> for &mut StationVisitor<F>
where
    F: FnMut(StationRecord) -> Result<(), ImportError>,
{
    type Value = u64;

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> Result<u64, D::Error> {
        deserializer.deserialize_seq(self)
    }
}

impl<'de, F> Visitor<'de> for &mut StationVisitor<F>
where
    F: FnMut(StationRecord) -> Result<(), ImportError>,
{
    type Value = u64;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("an array of stations")
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<u64, A::Error> {
        let mut count = 0;
        while let Some(entry) = seq.next_element::<StationEntry>()? {
            if let Err(e) = (self.on_station)(entry.into()) {
                self.failure = Some(e);
                return Err(serde::de::Error::custom("station handler failed"));
            }
            count += 1;
        }
        Ok(count)
    }
}

// -- Tests -------------------------------------------------------------------
