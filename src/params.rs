// Request parameter preparation
// Keyword joining, Sierra record number normalization and list query assembly

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Default page size for list endpoints
pub const DEFAULT_LIMIT: u32 = 10;

// Optional type prefix letter, 8 digit core number, optional check character
static SIERRA_NUMBER_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z]?([0-9]{8})[0-9A-Za-z]?$").unwrap());

// Partner record ids end up as a single URL path segment
static PARTNER_ID_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9A-Za-z_-]+$").unwrap());

/// Data source of a platform record (`nyplSource`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Source {
    /// NYPL Sierra catalog
    #[default]
    SierraNypl,
    /// Princeton, via ReCAP
    RecapPul,
    /// Columbia, via ReCAP
    RecapCul,
    /// Harvard, via ReCAP
    RecapHl,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::SierraNypl => "sierra-nypl",
            Source::RecapPul => "recap-pul",
            Source::RecapCul => "recap-cul",
            Source::RecapHl => "recap-hl",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Source {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "sierra-nypl" => Ok(Source::SierraNypl),
            "recap-pul" => Ok(Source::RecapPul),
            "recap-cul" => Ok(Source::RecapCul),
            "recap-hl" => Ok(Source::RecapHl),
            other => Err(Error::Validation(format!("Invalid nyplSource: {}", other))),
        }
    }
}

/// One or more search keywords or identifiers
///
/// Built from a single value, a comma delimited string, or a list; sent to the
/// platform as one comma joined string.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Keywords(Vec<String>);

impl Keywords {
    /// Comma joined keywords, or `None` when nothing usable was given
    pub fn joined(&self) -> Option<String> {
        if self.0.is_empty() {
            None
        } else {
            Some(self.0.join(","))
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    fn from_parts<I, T>(parts: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: ToString,
    {
        Keywords(
            parts
                .into_iter()
                .flat_map(|part| {
                    part.to_string()
                        .split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(str::to_string)
                        .collect::<Vec<_>>()
                })
                .collect(),
        )
    }
}

impl From<&str> for Keywords {
    fn from(value: &str) -> Self {
        Keywords::from_parts([value])
    }
}

impl From<String> for Keywords {
    fn from(value: String) -> Self {
        Keywords::from_parts([value])
    }
}

impl From<&String> for Keywords {
    fn from(value: &String) -> Self {
        Keywords::from_parts([value])
    }
}

macro_rules! keywords_from_int {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Keywords {
                fn from(value: $t) -> Self {
                    Keywords(vec![value.to_string()])
                }
            }
        )*
    };
}

keywords_from_int!(i32, i64, u32, u64);

impl<T: ToString> From<Vec<T>> for Keywords {
    fn from(values: Vec<T>) -> Self {
        Keywords::from_parts(values)
    }
}

impl<T: ToString> From<&[T]> for Keywords {
    fn from(values: &[T]) -> Self {
        Keywords::from_parts(values.iter().map(ToString::to_string))
    }
}

impl<T: ToString, const N: usize> From<[T; N]> for Keywords {
    fn from(values: [T; N]) -> Self {
        Keywords::from_parts(values)
    }
}

/// Join optional keywords into a query value
pub fn prep_keywords(keywords: Option<&Keywords>) -> Option<String> {
    keywords.and_then(Keywords::joined)
}

/// Normalize a Sierra record number to its 8 digit core
///
/// Strips an optional leading type letter ("b", "i", ...) and an optional
/// trailing check digit, which is discarded without verification:
/// `b123456789` → `12345678`.
pub fn normalize_sierra_number(value: &str) -> Result<String> {
    SIERRA_NUMBER_PATTERN
        .captures(value.trim())
        .and_then(|caps| caps.get(1))
        .map(|core| core.as_str().to_string())
        .ok_or_else(|| Error::Validation(format!("invalid identifier: {:?}", value)))
}

/// Normalize every Sierra number in `keywords` and comma join them
pub fn normalize_sierra_numbers(keywords: &Keywords) -> Result<Option<String>> {
    let numbers = keywords
        .iter()
        .map(normalize_sierra_number)
        .collect::<Result<Vec<_>>>()?;

    if numbers.is_empty() {
        Ok(None)
    } else {
        Ok(Some(numbers.join(",")))
    }
}

/// Prepare a single record id for a path segment
///
/// Sierra ids are normalized. Ids from partner sources pass through trimmed
/// and may only hold ASCII letters, digits, `-` and `_`.
pub fn prep_record_id(id: &str, source: Source) -> Result<String> {
    let id = id.trim();
    if id.is_empty() {
        return Err(Error::Validation("Missing required argument: id".to_string()));
    }

    match source {
        Source::SierraNypl => normalize_sierra_number(id),
        _ if PARTNER_ID_PATTERN.is_match(id) => Ok(id.to_string()),
        _ => Err(Error::Validation(format!("invalid identifier: {:?}", id))),
    }
}

/// Query parameters sent to the platform
pub type QueryParams = Vec<(&'static str, String)>;

fn push_opt(query: &mut QueryParams, name: &'static str, value: Option<String>) {
    if let Some(value) = value {
        query.push((name, value));
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn push_paging(
    query: &mut QueryParams,
    deleted: Option<bool>,
    limit: Option<u32>,
    offset: Option<u32>,
) {
    push_opt(query, "deleted", deleted.map(|d| d.to_string()));
    query.push(("limit", limit.unwrap_or(DEFAULT_LIMIT).to_string()));
    push_opt(query, "offset", offset.map(|o| o.to_string()));
}

/// Filters for `GET /bibs`
#[derive(Debug, Clone, Default)]
pub struct BibListQuery {
    pub id: Option<Keywords>,
    pub standard_number: Option<Keywords>,
    pub control_number: Option<Keywords>,
    pub nypl_source: Option<Source>,
    pub deleted: Option<bool>,
    /// Single date or `[start,end]` range, e.g. `[2013-09-03T13:17:45Z,]`
    pub created_date: Option<String>,
    pub updated_date: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl BibListQuery {
    /// Validate the filters and build query parameters
    pub fn to_query(&self) -> Result<QueryParams> {
        let id = prep_keywords(self.id.as_ref());
        let standard_number = prep_keywords(self.standard_number.as_ref());
        let control_number = prep_keywords(self.control_number.as_ref());
        let created_date = non_empty(&self.created_date);
        let updated_date = non_empty(&self.updated_date);

        if id.is_none()
            && standard_number.is_none()
            && control_number.is_none()
            && created_date.is_none()
            && updated_date.is_none()
        {
            return Err(Error::Validation(
                "Missing required argument: one of id, standardNumber, controlNumber, \
                 createdDate, updatedDate"
                    .to_string(),
            ));
        }

        let mut query = QueryParams::new();
        push_opt(&mut query, "id", id);
        push_opt(&mut query, "standardNumber", standard_number);
        push_opt(&mut query, "controlNumber", control_number);
        push_opt(&mut query, "nyplSource", self.nypl_source.map(|s| s.to_string()));
        push_opt(&mut query, "createdDate", created_date);
        push_opt(&mut query, "updatedDate", updated_date);
        push_paging(&mut query, self.deleted, self.limit, self.offset);

        Ok(query)
    }
}

/// Filters for `GET /items`
#[derive(Debug, Clone, Default)]
pub struct ItemListQuery {
    pub id: Option<Keywords>,
    pub barcode: Option<Keywords>,
    pub bib_id: Option<String>,
    pub nypl_source: Option<Source>,
    pub deleted: Option<bool>,
    pub created_date: Option<String>,
    pub updated_date: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl ItemListQuery {
    /// Validate the filters and build query parameters
    pub fn to_query(&self) -> Result<QueryParams> {
        let id = prep_keywords(self.id.as_ref());
        let barcode = prep_keywords(self.barcode.as_ref());
        let bib_id = match non_empty(&self.bib_id) {
            Some(bib_id) => Some(prep_record_id(&bib_id, self.nypl_source.unwrap_or_default())?),
            None => None,
        };
        let created_date = non_empty(&self.created_date);
        let updated_date = non_empty(&self.updated_date);

        if id.is_none()
            && barcode.is_none()
            && bib_id.is_none()
            && created_date.is_none()
            && updated_date.is_none()
        {
            return Err(Error::Validation(
                "Missing required argument: one of id, barcode, bibId, createdDate, updatedDate"
                    .to_string(),
            ));
        }

        let mut query = QueryParams::new();
        push_opt(&mut query, "id", id);
        push_opt(&mut query, "barcode", barcode);
        push_opt(&mut query, "bibId", bib_id);
        push_opt(&mut query, "nyplSource", self.nypl_source.map(|s| s.to_string()));
        push_opt(&mut query, "createdDate", created_date);
        push_opt(&mut query, "updatedDate", updated_date);
        push_paging(&mut query, self.deleted, self.limit, self.offset);

        Ok(query)
    }
}
