//! Output schema contract between the original query and the rebuilt view.

use std::fmt;
use std::str::FromStr;

use arrow::datatypes::{Field, Fields};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How strictly two output attribute lists must agree, position by position.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaMatch {
    /// Same column names in the same positions.
    Names,
    /// Same names and data types. Nullability may differ.
    #[default]
    NamesAndTypes,
    /// Same names, data types and nullability.
    Strict,
}

impl SchemaMatch {
    fn fields_match(self, expected: &Field, actual: &Field) -> bool {
        let names = expected.name() == actual.name();
        match self {
            SchemaMatch::Names => names,
            SchemaMatch::NamesAndTypes => names && expected.data_type() == actual.data_type(),
            SchemaMatch::Strict => {
                names
                    && expected.data_type() == actual.data_type()
                    && expected.is_nullable() == actual.is_nullable()
            }
        }
    }
}

impl fmt::Display for SchemaMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaMatch::Names => write!(f, "names"),
            SchemaMatch::NamesAndTypes => write!(f, "names_and_types"),
            SchemaMatch::Strict => write!(f, "strict"),
        }
    }
}

impl FromStr for SchemaMatch {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "names" => Ok(SchemaMatch::Names),
            "names_and_types" => Ok(SchemaMatch::NamesAndTypes),
            "strict" => Ok(SchemaMatch::Strict),
            other => Err(format!(
                "unknown schema match policy '{other}' (expected names, names_and_types or strict)"
            )),
        }
    }
}

/// The original output schema and the marker-free plan schema disagree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "output schema mismatch under '{policy}' at {}: expected [{}], found [{}]",
    position_label(*position),
    expected.join(", "),
    actual.join(", ")
)]
pub struct SchemaMismatch {
    pub policy: SchemaMatch,
    /// First differing position; `None` when only the lengths differ.
    pub position: Option<usize>,
    pub expected: Vec<String>,
    pub actual: Vec<String>,
}

fn position_label(position: Option<usize>) -> String {
    match position {
        Some(i) => format!("column {i}"),
        None => "column count".to_string(),
    }
}

fn describe(field: &Field) -> String {
    if field.is_nullable() {
        format!("{}: {}", field.name(), field.data_type())
    } else {
        format!("{}: {} NOT NULL", field.name(), field.data_type())
    }
}

/// Compare two attribute lists positionally under `policy`.
pub fn check_output_schema(
    expected: &Fields,
    actual: &Fields,
    policy: SchemaMatch,
) -> Result<(), SchemaMismatch> {
    let position = expected
        .iter()
        .zip(actual.iter())
        .position(|(e, a)| !policy.fields_match(e, a));

    if position.is_none() && expected.len() == actual.len() {
        return Ok(());
    }

    Err(SchemaMismatch {
        policy,
        position,
        expected: expected.iter().map(|f| describe(f)).collect(),
        actual: actual.iter().map(|f| describe(f)).collect(),
    })
}
