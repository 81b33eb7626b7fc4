use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use schemars::JsonSchema;
use semver::Version;
use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use taxfill_common::{CellRef, letters_to_column};

use crate::validation::{ManifestIssue, ValidationError};

/// Current supported mapping format version.
pub const CURRENT_SPEC_VERSION: &str = "1.0.0";
/// Constant identifier for this spec.
pub const SPEC_IDENT: &str = "taxfill";

pub const DEFAULT_HEADER_ROWS: u32 = 30;
pub const DEFAULT_LEADING_COLS: u32 = 2;

static TEMPLATE_ID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z0-9][a-z0-9-]{1,62}[a-z0-9]$").expect("template id regex must compile")
});
static FIELD_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_.-]*$").expect("field name regex must compile")
});
static KIND_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z][A-Za-z_-]*$").expect("kind regex must compile"));

/// Mapping table for one template revision.
///
/// The table is the single source of truth for where a field lives; keyword
/// search is a fallback for locators that declare one.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct FieldMap {
    /// Format identifier (must be `taxfill`).
    pub spec: String,
    #[schemars(with = "String")]
    pub spec_version: SpecVersion,
    /// Template the mapping was authored against.
    pub template: TemplateMeta,
    /// Keyword-search window used by `search` locators.
    #[serde(default)]
    pub search: SearchWindow,
    /// Fields in processing order.
    pub fields: Vec<FieldSpec>,
}

impl FieldMap {
    pub fn from_yaml_reader<R: std::io::Read>(reader: R) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_reader(reader)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }

    /// Canonicalise textual details for diffing.
    ///
    /// - Field names, keywords and sheet selectors are trimmed.
    /// - Fixed coordinates are rewritten in canonical `C3` form when they parse.
    /// - Answer column letters are uppercased.
    ///
    /// Field order is preserved: it is the audit order.
    pub fn normalize(&mut self) {
        if let AnswerColumn::Column(letters) = &mut self.search.answer {
            *letters = letters.trim().to_ascii_uppercase();
        }
        for field in &mut self.fields {
            field.name = field.name.trim().to_string();
            match &mut field.sheet {
                SheetSelector::Exact(name) | SheetSelector::Keyword(name) => {
                    *name = name.trim().to_string();
                }
            }
            if let Some(cell) = &mut field.locate.cell {
                if let Ok(parsed) = CellRef::parse_a1(cell) {
                    *cell = parsed.to_string();
                }
            }
            if let Some(search) = &mut field.locate.search {
                *search = search.trim().to_string();
            }
        }
    }

    pub fn normalized(mut self) -> Self {
        self.normalize();
        self
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Validate the manifest and return granular issues when invariants fail.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();

        if self.spec != SPEC_IDENT {
            issues.push(ManifestIssue::new(
                "spec",
                format!(
                    "expected spec identifier `{}`, found `{}`",
                    SPEC_IDENT, self.spec
                ),
            ));
        }

        let current_version = Version::parse(CURRENT_SPEC_VERSION)
            .expect("CURRENT_SPEC_VERSION must be valid semver");
        let spec_version = &self.spec_version.0;
        if spec_version.major != current_version.major {
            issues.push(ManifestIssue::new(
                "spec_version",
                format!(
                    "incompatible major version `{}` (expected `{}`)",
                    spec_version, current_version.major
                ),
            ));
        }

        if !TEMPLATE_ID.is_match(&self.template.id) {
            issues.push(ManifestIssue::new(
                "template.id",
                "id must be lowercase alphanumeric with hyphens, 3-64 chars".to_string(),
            ));
        }

        self.search.collect_issues(&mut issues);

        let mut seen = HashSet::new();
        for (idx, field) in self.fields.iter().enumerate() {
            if !FIELD_NAME.is_match(&field.name) {
                issues.push(ManifestIssue::new(
                    format!("fields[{idx}].name"),
                    "field name must start with a letter or digit and contain only letters, digits, '_', '.', '-'"
                        .to_string(),
                ));
            }
            if !seen.insert(field.name.as_str()) {
                issues.push(ManifestIssue::new(
                    format!("fields[{idx}].name"),
                    format!("duplicate field name `{}`", field.name),
                ));
            }
            field.collect_issues(idx, &mut issues);
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::new(issues))
        }
    }
}

/// Human-facing metadata for the template revision.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct TemplateMeta {
    /// Stable identifier (lowercase alphanumeric + hyphen).
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Template revision label, e.g. the authority's form version.
    #[serde(default)]
    pub revision: Option<String>,
    #[serde(default)]
    pub metadata: Option<BTreeMap<String, JsonValue>>,
}

/// Bounded scan window for keyword search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct SearchWindow {
    /// Number of rows scanned from the top of the sheet.
    #[serde(default = "default_header_rows")]
    pub header_rows: u32,
    /// Number of leading columns scanned for labels.
    #[serde(default = "default_leading_cols")]
    pub leading_cols: u32,
    /// Where the answer sits relative to a matched label.
    #[serde(default, with = "serde_yaml::with::singleton_map")]
    #[schemars(with = "AnswerColumn")]
    pub answer: AnswerColumn,
}

fn default_header_rows() -> u32 {
    DEFAULT_HEADER_ROWS
}

fn default_leading_cols() -> u32 {
    DEFAULT_LEADING_COLS
}

impl Default for SearchWindow {
    fn default() -> Self {
        Self {
            header_rows: DEFAULT_HEADER_ROWS,
            leading_cols: DEFAULT_LEADING_COLS,
            answer: AnswerColumn::default(),
        }
    }
}

impl SearchWindow {
    fn collect_issues(&self, issues: &mut Vec<ManifestIssue>) {
        if self.header_rows == 0 {
            issues.push(ManifestIssue::new(
                "search.header_rows",
                "search window must span at least one row".to_string(),
            ));
        }
        if self.leading_cols == 0 {
            issues.push(ManifestIssue::new(
                "search.leading_cols",
                "search window must span at least one column".to_string(),
            ));
        }
        match &self.answer {
            AnswerColumn::Offset(0) => issues.push(ManifestIssue::new(
                "search.answer.offset",
                "answer offset 0 would overwrite the label itself".to_string(),
            )),
            AnswerColumn::Column(letters)
                if letters_to_column(&letters.trim().to_ascii_uppercase()).is_none() =>
            {
                issues.push(ManifestIssue::new(
                    "search.answer.column",
                    format!("`{letters}` is not a column letter"),
                ))
            }
            _ => {}
        }
    }
}

/// Answer placement relative to a matched label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum AnswerColumn {
    /// Columns to the right (positive) or left (negative) of the label.
    Offset(i32),
    /// Absolute column letter on the label's row.
    Column(String),
}

impl Default for AnswerColumn {
    fn default() -> Self {
        AnswerColumn::Offset(1)
    }
}

/// One semantic field and where it goes.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct FieldSpec {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(with = "serde_yaml::with::singleton_map")]
    #[schemars(with = "SheetSelector")]
    pub sheet: SheetSelector,
    pub locate: LocatorSpec,
    #[serde(with = "serde_yaml::with::singleton_map")]
    #[schemars(with = "Derivation")]
    pub value: Derivation,
    /// Coercion hint applied before the write.
    #[serde(rename = "type", default)]
    pub value_type: ValueType,
}

impl FieldSpec {
    fn collect_issues(&self, idx: usize, issues: &mut Vec<ManifestIssue>) {
        match &self.sheet {
            SheetSelector::Exact(name) | SheetSelector::Keyword(name) if name.trim().is_empty() => {
                issues.push(ManifestIssue::new(
                    format!("fields[{idx}].sheet"),
                    "sheet selector must not be blank".to_string(),
                ));
            }
            _ => {}
        }

        if self.locate.cell.is_none() && self.locate.search.is_none() {
            issues.push(ManifestIssue::new(
                format!("fields[{idx}].locate"),
                "locator must declare `cell`, `search`, or both".to_string(),
            ));
        }
        if let Some(cell) = &self.locate.cell {
            if let Err(err) = CellRef::parse_a1(cell) {
                issues.push(ManifestIssue::new(
                    format!("fields[{idx}].locate.cell"),
                    err.to_string(),
                ));
            }
        }
        if let Some(search) = &self.locate.search {
            if normalized_is_blank(search) {
                issues.push(ManifestIssue::new(
                    format!("fields[{idx}].locate.search"),
                    "search keyword must contain at least one letter or digit".to_string(),
                ));
            }
        }

        match &self.value {
            Derivation::Aggregate(agg) => {
                if !agg.of.eq_ignore_ascii_case("any") && !KIND_NAME.is_match(&agg.of) {
                    issues.push(ManifestIssue::new(
                        format!("fields[{idx}].value.aggregate.of"),
                        format!("`{}` is not a transaction kind", agg.of),
                    ));
                }
                if let Some(rate) = &agg.rate {
                    if Decimal::from_str(rate.trim()).is_err() {
                        issues.push(ManifestIssue::new(
                            format!("fields[{idx}].value.aggregate.rate"),
                            format!("`{rate}` is not a decimal rate"),
                        ));
                    }
                }
                if self.value_type != ValueType::Number {
                    issues.push(ManifestIssue::new(
                        format!("fields[{idx}].type"),
                        "aggregate fields must be typed `number`".to_string(),
                    ));
                }
            }
            Derivation::Literal(JsonValue::Array(_) | JsonValue::Object(_)) => {
                issues.push(ManifestIssue::new(
                    format!("fields[{idx}].value.literal"),
                    "literal values must be scalars".to_string(),
                ));
            }
            _ => {}
        }
    }
}

fn normalized_is_blank(text: &str) -> bool {
    !text.chars().any(char::is_alphanumeric)
}

/// How a field's worksheet is chosen.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SheetSelector {
    /// Sheet name, matched exactly then case-insensitively.
    Exact(String),
    /// Fragment matched exactly, case-insensitively, then as a substring.
    Keyword(String),
}

impl SheetSelector {
    pub fn text(&self) -> &str {
        match self {
            SheetSelector::Exact(s) | SheetSelector::Keyword(s) => s,
        }
    }
}

impl fmt::Display for SheetSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SheetSelector::Exact(s) => write!(f, "{s}"),
            SheetSelector::Keyword(s) => write!(f, "~{s}"),
        }
    }
}

/// Fixed coordinate, search keyword, or both (fixed first, search on drift).
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct LocatorSpec {
    /// A1 coordinate such as `C3`.
    #[serde(default)]
    pub cell: Option<String>,
    /// Label text searched for in the scan window.
    #[serde(default)]
    pub search: Option<String>,
}

/// Source of a field's value.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Derivation {
    /// Constant from the mapping itself.
    Literal(JsonValue),
    /// Entity metadata from the payload.
    Meta(MetaField),
    /// Sum over transactions of one kind.
    Aggregate(AggregateSpec),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum MetaField {
    #[serde(alias = "pin")]
    TaxId,
    PeriodFrom,
    PeriodTo,
    ReturnType,
}

impl fmt::Display for MetaField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MetaField::TaxId => "tax_id",
            MetaField::PeriodFrom => "period_from",
            MetaField::PeriodTo => "period_to",
            MetaField::ReturnType => "return_type",
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct AggregateSpec {
    /// Transaction kind to sum (`income`, `expense`, `any`, or a custom kind).
    pub of: String,
    /// Optional multiplier applied to the total, e.g. `"0.03"`.
    #[serde(default)]
    pub rate: Option<String>,
}

/// Coercion target for a field's value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    #[default]
    Text,
    Number,
    Date,
}

/// Semver wrapper carried as a string in YAML.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecVersion(pub Version);

impl SpecVersion {
    pub fn new(version: Version) -> Self {
        Self(version)
    }
}

impl Serialize for SpecVersion {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for SpecVersion {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        SpecVersion::from_str(&text).map_err(de::Error::custom)
    }
}

impl FromStr for SpecVersion {
    type Err = semver::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Version::parse(s.trim()).map(SpecVersion)
    }
}
