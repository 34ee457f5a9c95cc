//! Core tabular data model: cells, rows, and column type taxonomy.

use serde::{Deserialize, Serialize};

// ============================================================================
// Column Type Taxonomy
// ============================================================================

/// Storage type detected for a column.
///
/// Selected once at the end of pass 1 by the type detector; fixes which
/// univariate analyzer the column is routed to for the rest of the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    /// Whole numbers (counts, identifiers, discrete measurements)
    NumericalInteger,
    /// Real-valued numbers (measurements, amounts, ratios)
    NumericalFloat,
    /// Bounded set of repeating string labels
    Categorical,
    /// Parseable timestamps within the sane year range
    DateTime,
    /// Two-state columns in any of the canonical token pairs
    Boolean,
    /// Free text with no more specific structure
    TextGeneral,
    /// Addressing text (emails, URLs)
    TextAddress,
}

impl DataType {
    /// Whether values of this type feed numeric sketches.
    pub fn is_numeric(self) -> bool {
        matches!(self, Self::NumericalInteger | Self::NumericalFloat)
    }

    /// Whether values of this type feed categorical sketches.
    pub fn is_categorical(self) -> bool {
        matches!(self, Self::Categorical | Self::Boolean)
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::NumericalInteger => "numerical_integer",
            Self::NumericalFloat => "numerical_float",
            Self::Categorical => "categorical",
            Self::DateTime => "date_time",
            Self::Boolean => "boolean",
            Self::TextGeneral => "text_general",
            Self::TextAddress => "text_address",
        };
        write!(f, "{name}")
    }
}

/// Semantic role of a column, orthogonal to [`DataType`].
///
/// Derived from column-name keywords during detection and carried through to
/// the report; never changes how values are sketched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SemanticType {
    Unknown,
    Identifier,
    Age,
    Count,
    Currency,
    Percentage,
    Rating,
    Status,
    Category,
    Demographic,
    OrganizationalUnit,
    DateTransaction,
}

impl std::fmt::Display for SemanticType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Unknown => "unknown",
            Self::Identifier => "identifier",
            Self::Age => "age",
            Self::Count => "count",
            Self::Currency => "currency",
            Self::Percentage => "percentage",
            Self::Rating => "rating",
            Self::Status => "status",
            Self::Category => "category",
            Self::Demographic => "demographic",
            Self::OrganizationalUnit => "organizational_unit",
            Self::DateTransaction => "date_transaction",
        };
        write!(f, "{name}")
    }
}

// ============================================================================
// Cells & Rows
// ============================================================================

/// One positional cell of a parsed row.
///
/// The upstream parser may deliver already-typed integers/floats; file-backed
/// sources deliver trimmed text. Empty text normalizes to `Null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Cell {
    Null,
    Integer(i64),
    Float(f64),
    Text(String),
}

impl Cell {
    /// Build a cell from a raw field: trims whitespace, maps empty to `Null`.
    pub fn from_raw(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            Self::Null
        } else {
            Self::Text(trimmed.to_string())
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Coerce to a finite double. Text parses through `f64::from_str`;
    /// non-finite results count as unparseable.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Null => None,
            Self::Integer(i) => Some(*i as f64),
            Self::Float(f) => f.is_finite().then_some(*f),
            Self::Text(s) => {
                let v: f64 = s.trim().parse().ok()?;
                v.is_finite().then_some(v)
            }
        }
    }

    /// Borrow the text payload, if any.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Render the cell as a string key for categorical sketches.
    ///
    /// Numbers render in their canonical decimal form so a column of mixed
    /// `Text("3")` / `Integer(3)` cells collapses to one category.
    pub fn to_key(&self) -> Option<String> {
        match self {
            Self::Null => None,
            Self::Integer(i) => Some(i.to_string()),
            Self::Float(f) => Some(f.to_string()),
            Self::Text(s) => Some(s.clone()),
        }
    }
}

impl std::fmt::Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => write!(f, ""),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(s) => write!(f, "{s}"),
        }
    }
}

/// A positional row delivered by the upstream parser.
///
/// `data` is ordered one cell per declared column; rows shorter than the
/// header are padded with `Null` by the consumer, never rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedRow {
    /// Zero-based row index within the source (header excluded).
    pub index: u64,
    /// Positional cells, one per declared column.
    pub data: Vec<Cell>,
    /// Original unparsed line, when the source retains it.
    pub raw: Option<String>,
}

impl ParsedRow {
    pub fn new(index: u64, data: Vec<Cell>) -> Self {
        Self {
            index,
            data,
            raw: None,
        }
    }

    /// Cell at `idx`, treating missing trailing columns as null.
    pub fn cell(&self, idx: usize) -> &Cell {
        self.data.get(idx).unwrap_or(&Cell::Null)
    }
}
