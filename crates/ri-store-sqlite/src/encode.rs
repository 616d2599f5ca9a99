//! Encoding and decoding helpers between domain types and the column values
//! stored in SQLite.
//!
//! Restaurant ids are plain integers. Inspection dates are stored as ISO 8601
//! strings. Mention match kinds are stored as their lowercase names.

use chrono::NaiveDate;
use ri_core::{
  inspection::Inspection,
  linkage::{MatchKind, MentionMatch},
  restaurant::{RestaurantId, RestaurantRecord},
};

use crate::{Error, Result};

/// Column list shared by every restaurant query, in [`restaurant_from_row`]
/// order.
pub const RESTAURANT_COLUMNS: &str =
  "id, name, facility_type, address, city, state, zip, latitude, longitude, clean";

/// Excludes records already absorbed into a canonical record.
pub const NOT_ABSORBED: &str =
  "id NOT IN (SELECT original_rest_id FROM linked)";

// ─── NaiveDate ────────────────────────────────────────────────────────────────

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Restaurant ──────────────────────────────────────────────────────────────

pub fn restaurant_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RestaurantRecord> {
  Ok(RestaurantRecord {
    id:            RestaurantId(row.get(0)?),
    name:          row.get(1)?,
    facility_type: row.get(2)?,
    address:       row.get(3)?,
    city:          row.get(4)?,
    state:         row.get(5)?,
    zip:           row.get(6)?,
    latitude:      row.get(7)?,
    longitude:     row.get(8)?,
    clean:         row.get(9)?,
  })
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw values read directly from an `inspections` row.
pub struct RawInspection {
  pub id:              String,
  pub risk:            Option<String>,
  pub inspection_date: Option<String>,
  pub inspection_type: Option<String>,
  pub results:         Option<String>,
  pub violations:      Option<String>,
  pub restaurant_id:   i64,
}

impl RawInspection {
  pub const COLUMNS: &'static str =
    "id, risk, inspection_date, inspection_type, results, violations, restaurant_id";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:              row.get(0)?,
      risk:            row.get(1)?,
      inspection_date: row.get(2)?,
      inspection_type: row.get(3)?,
      results:         row.get(4)?,
      violations:      row.get(5)?,
      restaurant_id:   row.get(6)?,
    })
  }

  pub fn into_inspection(self) -> Result<Inspection> {
    Ok(Inspection {
      id:              self.id,
      risk:            self.risk,
      date:            self.inspection_date.as_deref().map(decode_date).transpose()?,
      inspection_type: self.inspection_type,
      results:         self.results,
      violations:      self.violations,
      restaurant_id:   RestaurantId(self.restaurant_id),
    })
  }
}

// ─── Mention matches ─────────────────────────────────────────────────────────

/// Decode a stored match kind, surfacing unknown values as a conversion error.
pub fn kind_from_column(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<MatchKind> {
  let raw: String = row.get(idx)?;
  raw.parse::<MatchKind>().map_err(|e| {
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
  })
}

/// Decode `restaurant_id, mention_key, kind`.
pub fn mention_match_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<MentionMatch> {
  Ok(MentionMatch {
    restaurant_id: RestaurantId(row.get(0)?),
    mention_key:   row.get(1)?,
    kind:          kind_from_column(row, 2)?,
  })
}
