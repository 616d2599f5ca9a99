//! The flat row shape of the upstream inspection feed and its validation.
//!
//! The feed mixes restaurant and inspection columns in one object. Rows are
//! split into a [`NewRestaurant`] and a [`NewInspection`] here, at the
//! ingestion boundary, so nothing downstream deals with partial records.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

use crate::{
  Error, Result,
  inspection::NewInspection,
  restaurant::NewRestaurant,
};

/// Date formats seen in the feed, most common first.
const DATE_FORMATS: &[&str] = &["%m/%d/%Y", "%Y-%m-%d"];

/// One row of the upstream feed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeedRecord {
  #[serde(default)]
  pub inspection_id:   String,
  #[serde(default)]
  pub name:            String,
  pub facility_type:   Option<String>,
  #[serde(default)]
  pub address:         String,
  pub city:            Option<String>,
  pub state:           Option<String>,
  #[serde(default, deserialize_with = "zip_code")]
  pub zip:             Option<String>,
  pub latitude:        Option<f64>,
  pub longitude:       Option<f64>,
  pub risk:            Option<String>,
  pub date:            Option<String>,
  pub inspection_type: Option<String>,
  pub results:         Option<String>,
  pub violations:      Option<String>,
}

impl FeedRecord {
  /// Validate the row and split it into its restaurant and inspection parts.
  ///
  /// Fails with [`Error::InputMissing`] when the inspection id, name or
  /// address is blank, and with [`Error::InvalidDate`] on an unparseable date.
  pub fn into_parts(self) -> Result<(NewRestaurant, NewInspection)> {
    if self.inspection_id.trim().is_empty() {
      return Err(Error::InputMissing("inspection_id"));
    }
    if self.name.trim().is_empty() {
      return Err(Error::InputMissing("name"));
    }
    if self.address.trim().is_empty() {
      return Err(Error::InputMissing("address"));
    }

    let date = self.date.as_deref().map(parse_date).transpose()?;

    let restaurant = NewRestaurant {
      name:          self.name,
      facility_type: blank_to_none(self.facility_type),
      address:       self.address,
      city:          blank_to_none(self.city),
      state:         blank_to_none(self.state),
      zip:           blank_to_none(self.zip),
      latitude:      self.latitude,
      longitude:     self.longitude,
      clean:         false,
    };
    let inspection = NewInspection {
      id: self.inspection_id,
      risk: blank_to_none(self.risk),
      date,
      inspection_type: blank_to_none(self.inspection_type),
      results: blank_to_none(self.results),
      violations: blank_to_none(self.violations),
    };
    Ok((restaurant, inspection))
  }
}

/// Parse a feed date, accepting `MM/DD/YYYY` and ISO `YYYY-MM-DD`.
pub fn parse_date(raw: &str) -> Result<NaiveDate> {
  let raw = raw.trim();
  DATE_FORMATS
    .iter()
    .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
    .ok_or_else(|| Error::InvalidDate(raw.to_owned()))
}

fn blank_to_none(value: Option<String>) -> Option<String> {
  value.filter(|v| !v.trim().is_empty())
}

/// Zip codes arrive either as strings or as bare numbers.
fn zip_code<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
  D: Deserializer<'de>,
{
  #[derive(Deserialize)]
  #[serde(untagged)]
  enum Zip {
    Text(String),
    Number(u64),
  }

  Ok(Option::<Zip>::deserialize(deserializer)?.map(|zip| match zip {
    Zip::Text(s) => s,
    Zip::Number(n) => n.to_string(),
  }))
}
