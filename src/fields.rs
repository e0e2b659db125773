//! Well-known EML fields and the value trees written for them.
//!
//! Every [`Field`] maps to a fixed [`FieldSpec`]. A [`FieldValue`] builds a
//! new [`ValueTree`] on each call to [`FieldValue::to_tree`]; nothing here
//! holds mutable state.

use crate::error::{Error, Result};
use crate::path::SchemaPath;
use crate::value::{is_blank_text, ValueTree};
use std::fmt;

/// Name written into the editor stamp at `additionalMetadata/metadata/emlEditor`.
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
/// Release written into the editor stamp.
pub const APP_RELEASE: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Title,
    Creator,
    Keywords,
    Publisher,
    PubDate,
    TemporalCoverage,
    GeographicCoverage,
    Cui,
    IntRights,
    Status,
    Doi,
    Contact,
    UsageCitation,
    Version,
    ProtocolCitation,
    Abstract,
    LitCited,
    Language,
    MetadataProvider,
}

/// Where a field lives in the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    /// Path of the field's elements.
    pub path: SchemaPath,
    /// Path the field's value tree is written under.
    pub parent: SchemaPath,
    /// Human readable name for messages.
    pub label: &'static str,
}

impl Field {
    pub const ALL: [Field; 19] = [
        Field::Title,
        Field::Creator,
        Field::Keywords,
        Field::Publisher,
        Field::PubDate,
        Field::TemporalCoverage,
        Field::GeographicCoverage,
        Field::Cui,
        Field::IntRights,
        Field::Status,
        Field::Doi,
        Field::Contact,
        Field::UsageCitation,
        Field::Version,
        Field::ProtocolCitation,
        Field::Abstract,
        Field::LitCited,
        Field::Language,
        Field::MetadataProvider,
    ];

    fn location(&self) -> (&'static [&'static str], &'static str) {
        match self {
            Field::Title => (&["dataset", "title"], "title"),
            Field::Creator => (&["dataset", "creator"], "creator"),
            Field::Keywords => (&["dataset", "keywordSet"], "keywords"),
            Field::Publisher => (&["dataset", "publisher"], "publisher"),
            Field::PubDate => (&["dataset", "pubDate"], "publication date"),
            Field::TemporalCoverage => (
                &["dataset", "coverage", "temporalCoverage"],
                "temporal coverage",
            ),
            Field::GeographicCoverage => (
                &["dataset", "coverage", "geographicCoverage"],
                "geographic coverage",
            ),
            Field::Cui => (
                &["additionalMetadata", "metadata", "CUI"],
                "controlled unclassified information",
            ),
            Field::IntRights => (&["dataset", "intellectualRights"], "intellectual rights"),
            Field::Status => (&["dataset", "maintenance"], "status"),
            Field::Doi => (&["dataset", "alternateIdentifier"], "doi"),
            Field::Contact => (&["dataset", "contact"], "contact"),
            Field::UsageCitation => (&["dataset", "usageCitation"], "usage citation"),
            Field::Version => (
                &["additionalMetadata", "metadata", "emlEditor"],
                "editor version",
            ),
            Field::ProtocolCitation => (
                &["dataset", "additionalInfo", "para"],
                "protocol citation",
            ),
            Field::Abstract => (&["dataset", "abstract"], "abstract"),
            Field::LitCited => (&["dataset", "literatureCited"], "literature cited"),
            Field::Language => (&["dataset", "language"], "language"),
            Field::MetadataProvider => (&["dataset", "metadataProvider"], "metadata provider"),
        }
    }

    pub fn spec(&self) -> FieldSpec {
        let (segments, label) = self.location();
        let path = SchemaPath::new(segments.iter().copied());
        let parent = path.truncated(segments.len() - 1);
        FieldSpec {
            path,
            parent,
            label,
        }
    }

    pub fn label(&self) -> &'static str {
        self.location().1
    }

    /// Tag of the field's own elements.
    pub fn tag(&self) -> &'static str {
        let segments = self.location().0;
        segments[segments.len() - 1]
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// A person or organization, as used by creator, contact and metadata provider.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Party {
    pub given_name: Option<String>,
    pub sur_name: Option<String>,
    pub organization_name: Option<String>,
    pub email: Option<String>,
}

impl Party {
    fn to_tree(&self) -> ValueTree {
        ValueTree::mapping(vec![
            (
                "individualName",
                ValueTree::mapping(vec![
                    ("givenName", ValueTree::from(self.given_name.clone())),
                    ("surName", ValueTree::from(self.sur_name.clone())),
                ]),
            ),
            ("organizationName", self.organization_name.clone().into()),
            ("electronicMailAddress", self.email.clone().into()),
        ])
    }

    fn validate(&self, field: Field) -> Result<()> {
        if !filled(&self.sur_name) && !filled(&self.organization_name) {
            return Err(Error::InvalidValue(format!(
                "{} needs a surname or an organization name",
                field
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Publisher {
    pub organization_name: Option<String>,
    pub city: Option<String>,
    /// State or province.
    pub administrative_area: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    pub online_url: Option<String>,
    /// Research Organization Registry id.
    pub user_id: Option<String>,
}

impl Publisher {
    fn to_tree(&self) -> ValueTree {
        ValueTree::mapping(vec![
            ("organizationName", ValueTree::from(self.organization_name.clone())),
            (
                "address",
                ValueTree::mapping(vec![
                    ("city", ValueTree::from(self.city.clone())),
                    ("administrativeArea", self.administrative_area.clone().into()),
                    ("postalCode", self.postal_code.clone().into()),
                    ("country", self.country.clone().into()),
                ]),
            ),
            ("onlineUrl", self.online_url.clone().into()),
            ("userId", self.user_id.clone().into()),
        ])
    }

    fn is_blank(&self) -> bool {
        [
            &self.organization_name,
            &self.city,
            &self.administrative_area,
            &self.postal_code,
            &self.country,
            &self.online_url,
            &self.user_id,
        ]
        .into_iter()
        .all(|value| !filled(value))
    }
}

/// West, east, north and south bounds in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub west: f64,
    pub east: f64,
    pub north: f64,
    pub south: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeographicCoverage {
    pub description: String,
    pub bounds: BoundingBox,
}

impl GeographicCoverage {
    fn to_tree(&self) -> ValueTree {
        let b = &self.bounds;
        ValueTree::mapping(vec![
            ("geographicDescription", ValueTree::from(self.description.as_str())),
            (
                "boundingCoordinates",
                ValueTree::mapping(vec![
                    ("westBoundingCoordinate", ValueTree::from(b.west)),
                    ("eastBoundingCoordinate", b.east.into()),
                    ("northBoundingCoordinate", b.north.into()),
                    ("southBoundingCoordinate", b.south.into()),
                ]),
            ),
        ])
    }

    fn validate(&self) -> Result<()> {
        let b = &self.bounds;
        let longitudes = [b.west, b.east];
        let latitudes = [b.north, b.south];
        if longitudes.iter().any(|v| !(-180.0..=180.0).contains(v))
            || latitudes.iter().any(|v| !(-90.0..=90.0).contains(v))
        {
            return Err(Error::InvalidValue(format!(
                "bounding box of `{}` is out of range",
                self.description
            )));
        }
        if b.south > b.north {
            return Err(Error::InvalidValue(format!(
                "bounding box of `{}` has south above north",
                self.description
            )));
        }
        Ok(())
    }
}

/// Reference to the data release report the dataset should be cited through.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UsageCitation {
    pub alternate_identifier: Option<String>,
    pub title: Option<String>,
    pub creator: Option<String>,
    pub report: Option<String>,
    pub id: Option<String>,
}

impl UsageCitation {
    fn is_blank(&self) -> bool {
        [
            &self.alternate_identifier,
            &self.title,
            &self.creator,
            &self.report,
            &self.id,
        ]
        .into_iter()
        .all(|value| !filled(value))
    }
}

/// Controlled unclassified information markings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cui {
    Public,
    NoContractors,
    DisseminationListOnly,
    FederalAndContractors,
    FederalOnly,
}

impl Cui {
    pub fn code(&self) -> &'static str {
        match self {
            Cui::Public => "PUBLIC",
            Cui::NoContractors => "NOCON",
            Cui::DisseminationListOnly => "DL_ONLY",
            Cui::FederalAndContractors => "FEDCON",
            Cui::FederalOnly => "FED_ONLY",
        }
    }

    pub fn from_code(code: &str) -> Option<Cui> {
        [
            Cui::Public,
            Cui::NoContractors,
            Cui::DisseminationListOnly,
            Cui::FederalAndContractors,
            Cui::FederalOnly,
        ]
        .into_iter()
        .find(|cui| cui.code() == code)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum License {
    CcZero,
    PublicDomain,
    Restricted,
}

impl License {
    pub fn text(&self) -> &'static str {
        match self {
            License::CcZero => "This product is released to the \"public domain\" under Creative Commons CC0 1.0 No Rights Reserved (see: https://creativecommons.org/publicdomain/zero/1.0/).",
            License::PublicDomain => "This product is released to the \"public domain\" under U.S. Government Works No Rights Reserved (see: http://www.usa.gov/publicdomain/label/1.0/).",
            License::Restricted => "This product has been determined to contain Controlled Unclassified Information (CUI) by the National Park Service, and is intended for internal use only. It is not published under an open license. Unauthorized access, use, and distribution are prohibited.",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Title(String),
    Creator(Party),
    Keywords(Vec<String>),
    Publisher(Publisher),
    /// `YYYY-MM-DD`
    PubDate(String),
    /// Begin and end calendar dates, `YYYY-MM-DD`.
    TemporalCoverage { begin: String, end: String },
    GeographicCoverage(Vec<GeographicCoverage>),
    Cui(Cui),
    IntRights(License),
    /// Maintenance description, e.g. `complete` or `ongoing`.
    Status(String),
    Doi(String),
    Contact(Party),
    UsageCitation(UsageCitation),
    /// Stamp this editor's name and release.
    Version,
    ProtocolCitation(String),
    Abstract(Vec<String>),
    /// BibTeX entries.
    LitCited(String),
    /// ISO 639 language code.
    Language(String),
    MetadataProvider(Party),
}

impl FieldValue {
    pub fn field(&self) -> Field {
        match self {
            FieldValue::Title(_) => Field::Title,
            FieldValue::Creator(_) => Field::Creator,
            FieldValue::Keywords(_) => Field::Keywords,
            FieldValue::Publisher(_) => Field::Publisher,
            FieldValue::PubDate(_) => Field::PubDate,
            FieldValue::TemporalCoverage { .. } => Field::TemporalCoverage,
            FieldValue::GeographicCoverage(_) => Field::GeographicCoverage,
            FieldValue::Cui(_) => Field::Cui,
            FieldValue::IntRights(_) => Field::IntRights,
            FieldValue::Status(_) => Field::Status,
            FieldValue::Doi(_) => Field::Doi,
            FieldValue::Contact(_) => Field::Contact,
            FieldValue::UsageCitation(_) => Field::UsageCitation,
            FieldValue::Version => Field::Version,
            FieldValue::ProtocolCitation(_) => Field::ProtocolCitation,
            FieldValue::Abstract(_) => Field::Abstract,
            FieldValue::LitCited(_) => Field::LitCited,
            FieldValue::Language(_) => Field::Language,
            FieldValue::MetadataProvider(_) => Field::MetadataProvider,
        }
    }

    /// Reject values that would write an unusable field.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidValue`]
    pub fn validate(&self) -> Result<()> {
        let field = self.field();
        match self {
            FieldValue::Title(title) => {
                if is_blank_text(title) || title.trim().chars().count() < 3 {
                    return Err(Error::InvalidValue(format!(
                        "title `{}` must be at least three characters",
                        title
                    )));
                }
            }
            FieldValue::PubDate(date) => check_date(field, date)?,
            FieldValue::TemporalCoverage { begin, end } => {
                check_date(field, begin)?;
                check_date(field, end)?;
                // Zero-padded ISO dates order lexicographically.
                if begin > end {
                    return Err(Error::InvalidValue(format!(
                        "begin date {} is after end date {}",
                        begin, end
                    )));
                }
            }
            FieldValue::Creator(party)
            | FieldValue::Contact(party)
            | FieldValue::MetadataProvider(party) => party.validate(field)?,
            FieldValue::GeographicCoverage(coverages) => {
                if coverages.is_empty() {
                    return Err(Error::InvalidValue(format!("{} cannot be empty", field)));
                }
                for coverage in coverages {
                    coverage.validate()?;
                }
            }
            FieldValue::Keywords(items) | FieldValue::Abstract(items) => {
                if items.iter().all(|item| is_blank_text(item)) {
                    return Err(Error::InvalidValue(format!("{} cannot be blank", field)));
                }
            }
            FieldValue::Status(text)
            | FieldValue::Doi(text)
            | FieldValue::ProtocolCitation(text)
            | FieldValue::LitCited(text)
            | FieldValue::Language(text) => {
                if is_blank_text(text) {
                    return Err(Error::InvalidValue(format!("{} cannot be blank", field)));
                }
            }
            FieldValue::Publisher(publisher) => {
                if publisher.is_blank() {
                    return Err(Error::InvalidValue(format!("{} has no values", field)));
                }
            }
            FieldValue::UsageCitation(citation) => {
                if citation.is_blank() {
                    return Err(Error::InvalidValue(format!("{} has no values", field)));
                }
            }
            FieldValue::Cui(_)
            | FieldValue::IntRights(_)
            | FieldValue::Version => {}
        }
        Ok(())
    }

    /// The tree written under the field's parent, keyed by the field's tag.
    pub fn to_tree(&self) -> ValueTree {
        let tag = self.field().tag();
        let content = match self {
            FieldValue::Title(text)
            | FieldValue::PubDate(text)
            | FieldValue::Doi(text)
            | FieldValue::ProtocolCitation(text)
            | FieldValue::Language(text) => ValueTree::from(text.as_str()),
            FieldValue::Creator(party)
            | FieldValue::Contact(party)
            | FieldValue::MetadataProvider(party) => party.to_tree(),
            FieldValue::Keywords(keywords) => {
                ValueTree::single("keyword", keywords.iter().map(String::as_str).collect::<Vec<_>>())
            }
            FieldValue::Publisher(publisher) => publisher.to_tree(),
            FieldValue::TemporalCoverage { begin, end } => ValueTree::single(
                "rangeOfDates",
                ValueTree::mapping(vec![
                    ("beginDate", ValueTree::single("calendarDate", begin.as_str())),
                    ("endDate", ValueTree::single("calendarDate", end.as_str())),
                ]),
            ),
            FieldValue::GeographicCoverage(coverages) => {
                ValueTree::Repeated(coverages.iter().map(GeographicCoverage::to_tree).collect())
            }
            FieldValue::Cui(cui) => ValueTree::from(cui.code()),
            FieldValue::IntRights(license) => ValueTree::single("para", license.text()),
            FieldValue::Status(description) => {
                ValueTree::single("description", description.as_str())
            }
            FieldValue::UsageCitation(citation) => ValueTree::mapping(vec![
                (
                    "alternateIdentifier",
                    ValueTree::from(citation.alternate_identifier.clone()),
                ),
                ("title", citation.title.clone().into()),
                ("creator", citation.creator.clone().into()),
                ("report", citation.report.clone().into()),
                ("id", citation.id.clone().into()),
            ]),
            FieldValue::Version => {
                ValueTree::mapping(vec![("app", APP_NAME), ("release", APP_RELEASE)])
            }
            FieldValue::Abstract(paragraphs) => ValueTree::single(
                "para",
                paragraphs.iter().map(String::as_str).collect::<Vec<_>>(),
            ),
            FieldValue::LitCited(bibtex) => ValueTree::single("bibtex", bibtex.as_str()),
        };
        ValueTree::single(tag, content)
    }
}

fn filled(value: &Option<String>) -> bool {
    value.as_deref().map_or(false, |text| !is_blank_text(text))
}

fn check_date(field: Field, date: &str) -> Result<()> {
    let parts: Vec<&str> = date.split('-').collect();
    let valid = match parts.as_slice() {
        [year, month, day] => {
            year.len() == 4
                && month.len() == 2
                && day.len() == 2
                && parts.iter().all(|p| p.chars().all(|c| c.is_ascii_digit()))
                && matches!(month.parse::<u32>(), Ok(1..=12))
                && matches!(day.parse::<u32>(), Ok(1..=31))
        }
        _ => false,
    };
    if valid {
        Ok(())
    } else {
        Err(Error::InvalidValue(format!(
            "{} date `{}` is not YYYY-MM-DD",
            field, date
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_specs_are_consistent() {
        for field in Field::ALL {
            let spec = field.spec();
            assert_eq!(spec.parent, spec.path.parent().unwrap());
            assert_eq!(spec.path.tag(), Some(field.tag()));
            assert_eq!(spec.label, field.label());
        }
        let spec = Field::TemporalCoverage.spec();
        assert_eq!(spec.path.to_string(), "dataset/coverage/temporalCoverage");
        assert_eq!(spec.parent.to_string(), "dataset/coverage");
    }

    #[test]
    fn test_trees_are_fresh() {
        let value = FieldValue::Creator(Party {
            sur_name: Some("Wapiti".to_string()),
            ..Party::default()
        });
        let mut first = value.to_tree();
        if let ValueTree::Mapping(entries) = &mut first {
            entries.clear();
        }
        let second = value.to_tree().prune_empty().unwrap();
        assert_eq!(
            second,
            ValueTree::single(
                "creator",
                ValueTree::single("individualName", ValueTree::single("surName", "Wapiti"))
            )
        );
    }

    #[test]
    fn test_keywords_tree() {
        let value = FieldValue::Keywords(vec!["elk".to_string(), "survey".to_string()]);
        assert_eq!(
            value.to_tree(),
            ValueTree::single("keywordSet", ValueTree::single("keyword", vec!["elk", "survey"]))
        );
    }

    #[test]
    fn test_validation() {
        assert!(FieldValue::Title("ab".to_string()).validate().is_err());
        assert!(FieldValue::Title("Elk".to_string()).validate().is_ok());
        assert!(FieldValue::PubDate("2024-13-01".to_string()).validate().is_err());
        assert!(FieldValue::PubDate("2024-02-01".to_string()).validate().is_ok());
        let range = FieldValue::TemporalCoverage {
            begin: "2024-05-01".to_string(),
            end: "2023-05-01".to_string(),
        };
        assert!(matches!(range.validate(), Err(Error::InvalidValue(_))));
        assert!(FieldValue::Creator(Party::default()).validate().is_err());
        let coverage = GeographicCoverage {
            description: "Glacier".to_string(),
            bounds: BoundingBox {
                west: -114.5,
                east: -113.2,
                north: 49.0,
                south: 48.2,
            },
        };
        assert!(FieldValue::GeographicCoverage(vec![coverage.clone()])
            .validate()
            .is_ok());
        let mut flipped = coverage;
        flipped.bounds.south = 50.0;
        assert!(FieldValue::GeographicCoverage(vec![flipped]).validate().is_err());
    }

    #[test]
    fn test_blank_values_are_rejected() {
        let blank_party = Party {
            sur_name: Some("  ".to_string()),
            organization_name: Some("None".to_string()),
            ..Party::default()
        };
        for value in [
            FieldValue::Creator(blank_party.clone()),
            FieldValue::Contact(blank_party),
            FieldValue::Publisher(Publisher {
                city: Some(" ".to_string()),
                ..Publisher::default()
            }),
            FieldValue::UsageCitation(UsageCitation::default()),
            FieldValue::GeographicCoverage(vec![]),
            FieldValue::Keywords(vec!["None".to_string(), "".to_string()]),
            FieldValue::Doi("None".to_string()),
        ] {
            assert!(
                matches!(value.validate(), Err(Error::InvalidValue(_))),
                "{:?}",
                value
            );
        }
        let publisher = FieldValue::Publisher(Publisher {
            country: Some("USA".to_string()),
            ..Publisher::default()
        });
        assert!(publisher.validate().is_ok());
    }

    #[test]
    fn test_cui_codes() {
        assert_eq!(Cui::from_code("FED_ONLY"), Some(Cui::FederalOnly));
        assert_eq!(Cui::from_code("nope"), None);
        assert_eq!(
            FieldValue::Cui(Cui::Public).to_tree(),
            ValueTree::single("CUI", "PUBLIC")
        );
    }
}
