//! The tagged result cube.
//!
//! Every valuation and risk result in the workspace flows through [`Cube`]:
//! a long/tall table whose rows carry a sparse set of typed tags plus one
//! numeric value. Reductions are group-by-sum ([`Cube::pivot`]), row
//! subsetting ([`Cube::filter`]) and key-aligned subtraction
//! ([`Cube::difference`]).
//!
//! ## Column schema
//!
//! Columns form a closed enum rather than free-form strings, so a typo in
//! a dimension name is a compile error, not a silently-empty pivot. Rows
//! remain sparse: any subset of columns may be tagged. Genuinely variable
//! per-record annotations go into the row's metadata side-map, not into
//! the column schema.
//!
//! ## Difference semantics
//!
//! [`Cube::difference`] aligns rows by their full tag key and subtracts,
//! defaulting to zero for keys present on only one side. This is forgiving
//! by design — PnL-explain logic deliberately diffs cubes with
//! non-identical row sets and books the one-sided rows as genuine
//! contributions. It must never be tightened into a strict join.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;

/// Measure names used in the [`Column::Measure`] column of sensitivity
/// cubes. Producers and consumers of risk cubes share this vocabulary.
pub mod measure {
    /// First-order spot sensitivity.
    pub const DELTA: &str = "Delta";
    /// Second-order spot sensitivity.
    pub const GAMMA: &str = "Gamma";
    /// ATM-vol sensitivity.
    pub const VEGA: &str = "Vega";
    /// Per-year time sensitivity.
    pub const THETA: &str = "Theta";
}

/// The closed set of cube columns.
///
/// # Examples
///
/// ```
/// use risk_core::cube::Column;
///
/// assert_eq!(Column::TradeId.name(), "TradeId");
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Column {
    /// Scenario key (historical date, path index or bump label).
    Scenario,
    /// Trade identifier.
    TradeId,
    /// Trade type name.
    TradeType,
    /// Reporting currency of the value.
    Currency,
    /// Risk factor / underlying identifier.
    Underlying,
    /// Sensitivity measure name (`Delta`, `Gamma`, `Vega`, `Theta`).
    Measure,
    /// Attribution step name.
    Step,
    /// Attribution sub-step (typically a factor id).
    SubStep,
    /// Attribution sub-sub-step (measure or residual marker).
    SubSubStep,
    /// Curve pillar label.
    PointLabel,
    /// Curve pillar date.
    PointDate,
}

impl Column {
    /// Column name for display and export.
    pub fn name(&self) -> &'static str {
        match self {
            Column::Scenario => "Scenario",
            Column::TradeId => "TradeId",
            Column::TradeType => "TradeType",
            Column::Currency => "Currency",
            Column::Underlying => "Underlying",
            Column::Measure => "Measure",
            Column::Step => "Step",
            Column::SubStep => "SubStep",
            Column::SubSubStep => "SubSubStep",
            Column::PointLabel => "PointLabel",
            Column::PointDate => "PointDate",
        }
    }
}

/// A typed tag value.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Tag {
    /// Text tag.
    Text(String),
    /// Date tag (pillar dates, scenario dates).
    Date(NaiveDate),
}

impl Tag {
    /// The text content, if this is a text tag.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Tag::Text(s) => Some(s),
            Tag::Date(_) => None,
        }
    }

    /// The date content, if this is a date tag.
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Tag::Text(_) => None,
            Tag::Date(d) => Some(*d),
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tag::Text(s) => f.write_str(s),
            Tag::Date(d) => write!(f, "{}", d),
        }
    }
}

impl From<&str> for Tag {
    fn from(s: &str) -> Self {
        Tag::Text(s.to_string())
    }
}

impl From<String> for Tag {
    fn from(s: String) -> Self {
        Tag::Text(s)
    }
}

impl From<NaiveDate> for Tag {
    fn from(d: NaiveDate) -> Self {
        Tag::Date(d)
    }
}

/// The full tag key of a row, used to align rows across cubes.
pub type RowKey = Vec<(Column, Tag)>;

/// Sentinel group label used by [`Cube::pivot`] for rows missing the
/// pivot column.
pub const UNTAGGED: &str = "(untagged)";

/// One cube row: a sparse tag map plus a value.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Row {
    /// Sparse column tags.
    tags: BTreeMap<Column, Tag>,
    /// The numeric value.
    value: f64,
    /// Per-record annotation side-map for genuinely variable metadata.
    meta: Option<BTreeMap<String, String>>,
}

impl Row {
    /// Creates an untagged row with the given value.
    pub fn new(value: f64) -> Self {
        Self {
            tags: BTreeMap::new(),
            value,
            meta: None,
        }
    }

    /// Adds a tag (builder style).
    pub fn with_tag(mut self, column: Column, tag: impl Into<Tag>) -> Self {
        self.tags.insert(column, tag.into());
        self
    }

    /// Adds a text tag (builder style).
    pub fn with_text(self, column: Column, text: impl Into<String>) -> Self {
        self.with_tag(column, Tag::Text(text.into()))
    }

    /// Adds a date tag (builder style).
    pub fn with_date(self, column: Column, date: NaiveDate) -> Self {
        self.with_tag(column, Tag::Date(date))
    }

    /// Adds a metadata annotation (builder style).
    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.meta
            .get_or_insert_with(BTreeMap::new)
            .insert(key.into(), value.into());
        self
    }

    /// The tag at a column, if present.
    pub fn tag(&self, column: Column) -> Option<&Tag> {
        self.tags.get(&column)
    }

    /// The text tag at a column, if present and textual.
    pub fn text(&self, column: Column) -> Option<&str> {
        self.tags.get(&column).and_then(Tag::as_text)
    }

    /// The row's numeric value.
    #[inline]
    pub fn value(&self) -> f64 {
        self.value
    }

    /// The metadata annotation for a key, if any.
    pub fn meta(&self, key: &str) -> Option<&str> {
        self.meta.as_ref().and_then(|m| m.get(key)).map(String::as_str)
    }

    /// The full tag key, used for row alignment.
    pub fn key(&self) -> RowKey {
        self.tags.iter().map(|(c, t)| (*c, t.clone())).collect()
    }

    fn from_key(key: RowKey, value: f64) -> Self {
        Self {
            tags: key.into_iter().collect(),
            value,
            meta: None,
        }
    }
}

/// A tagged result table.
///
/// Instances are treated as immutable once handed downstream; all
/// reductions return new cubes.
///
/// # Examples
///
/// ```
/// use risk_core::cube::{Column, Cube, Row};
///
/// let mut pv = Cube::new();
/// pv.push(Row::new(100.0).with_text(Column::TradeId, "T1"));
/// pv.push(Row::new(-20.0).with_text(Column::TradeId, "T2"));
/// pv.push(Row::new(5.0).with_text(Column::TradeId, "T1"));
///
/// let by_trade = pv.pivot(Column::TradeId);
/// assert_eq!(by_trade.len(), 2);
/// assert_eq!(pv.total(), 85.0);
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Cube {
    rows: Vec<Row>,
}

impl Cube {
    /// Creates an empty cube.
    pub fn new() -> Self {
        Self { rows: Vec::new() }
    }

    /// Creates a cube from rows.
    pub fn from_rows(rows: Vec<Row>) -> Self {
        Self { rows }
    }

    /// Appends a row.
    pub fn push(&mut self, row: Row) {
        self.rows.push(row);
    }

    /// Appends all rows of another cube.
    pub fn extend(&mut self, other: Cube) {
        self.rows.extend(other.rows);
    }

    /// The rows.
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True if the cube has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Sum of all row values.
    pub fn total(&self) -> f64 {
        self.rows.iter().map(Row::value).sum()
    }

    /// True if any row carries a tag in the given column.
    ///
    /// Callers treat an absent column as an optional dimension and fall
    /// back to a sentinel grouping rather than failing.
    pub fn has_column(&self, column: Column) -> bool {
        self.rows.iter().any(|r| r.tags.contains_key(&column))
    }

    /// Rows satisfying the predicate; `exclude` inverts the predicate.
    pub fn filter(&self, predicate: impl Fn(&Row) -> bool, exclude: bool) -> Cube {
        Cube {
            rows: self
                .rows
                .iter()
                .filter(|r| predicate(r) != exclude)
                .cloned()
                .collect(),
        }
    }

    /// Rows whose tag at `column` equals `tag`; `exclude` inverts.
    ///
    /// Rows missing the column never match the equality, so with
    /// `exclude = true` they are retained.
    pub fn filter_eq(&self, column: Column, tag: &Tag, exclude: bool) -> Cube {
        self.filter(|r| r.tag(column) == Some(tag), exclude)
    }

    /// Rows whose text tag at `column` equals `text`; `exclude` inverts.
    pub fn filter_text(&self, column: Column, text: &str, exclude: bool) -> Cube {
        self.filter(|r| r.text(column) == Some(text), exclude)
    }

    /// Rows whose tag at `column` is any of `tags`; `exclude` inverts.
    pub fn filter_any(&self, column: Column, tags: &[Tag], exclude: bool) -> Cube {
        self.filter(
            |r| r.tag(column).map(|t| tags.contains(t)).unwrap_or(false),
            exclude,
        )
    }

    /// Group-by-then-sum on one column.
    ///
    /// Rows missing the column group under the [`UNTAGGED`] sentinel.
    /// Output rows carry only the pivot column and are ordered by tag.
    pub fn pivot(&self, column: Column) -> Cube {
        let mut groups: BTreeMap<Tag, f64> = BTreeMap::new();
        for row in &self.rows {
            let tag = row
                .tag(column)
                .cloned()
                .unwrap_or_else(|| Tag::Text(UNTAGGED.to_string()));
            *groups.entry(tag).or_insert(0.0) += row.value;
        }
        Cube {
            rows: groups
                .into_iter()
                .map(|(tag, value)| Row::new(value).with_tag(column, tag))
                .collect(),
        }
    }

    /// Key-aligned subtraction: `self − other`.
    ///
    /// Rows are aligned by their full tag key; duplicate keys on either
    /// side are summed first. Keys present on only one side contribute
    /// with the other side taken as zero — a deliberate leniency, not a
    /// swallowed error (see module docs). Output is ordered by key.
    pub fn difference(&self, other: &Cube) -> Cube {
        let mut merged: BTreeMap<RowKey, f64> = BTreeMap::new();
        for row in &self.rows {
            *merged.entry(row.key()).or_insert(0.0) += row.value;
        }
        for row in &other.rows {
            *merged.entry(row.key()).or_insert(0.0) -= row.value;
        }
        Cube {
            rows: merged
                .into_iter()
                .map(|(key, value)| Row::from_key(key, value))
                .collect(),
        }
    }

    /// True if any row value is non-finite.
    pub fn has_non_finite(&self) -> bool {
        self.rows.iter().any(|r| !r.value.is_finite())
    }
}

impl FromIterator<Row> for Cube {
    fn from_iter<I: IntoIterator<Item = Row>>(iter: I) -> Self {
        Cube {
            rows: iter.into_iter().collect(),
        }
    }
}
