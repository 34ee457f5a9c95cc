//! Semantic sub-classification from column names.
//!
//! Runs after the data type is fixed; only refines the reported role and
//! never changes how values are sketched.

use crate::types::{DataType, SemanticType};

fn name_contains(name: &str, tokens: &[&str]) -> bool {
    tokens.iter().any(|t| name.contains(t))
}

/// Keyword table mapping (data type, column name) to a semantic role.
pub fn classify_semantic(name: &str, data_type: DataType) -> SemanticType {
    let lower = name.to_lowercase();

    if data_type.is_numeric() {
        // "age" is a notorious substring; exclude the common false friends.
        if lower.contains("age")
            && !name_contains(&lower, &["percent", "average", "usage", "damage", "package"])
        {
            return SemanticType::Age;
        }
        if name_contains(&lower, &["id", "key", "code", "uuid"])
            && data_type == DataType::NumericalInteger
        {
            return SemanticType::Identifier;
        }
        if name_contains(&lower, &["count", "quantity", "number", "total"]) {
            return SemanticType::Count;
        }
        if name_contains(&lower, &["rating", "score", "stars"]) {
            return SemanticType::Rating;
        }
        if name_contains(&lower, &["price", "cost", "salary", "revenue", "fee", "charge"]) {
            return SemanticType::Currency;
        }
        if name_contains(&lower, &["percent", "ratio", "pct"]) {
            return SemanticType::Percentage;
        }
        return SemanticType::Unknown;
    }

    match data_type {
        DataType::Categorical | DataType::Boolean => {
            if name_contains(
                &lower,
                &["gender", "sex", "ethnicity", "race", "nationality", "marital"],
            ) {
                SemanticType::Demographic
            } else if name_contains(&lower, &["status", "state", "flag", "active", "enabled"]) {
                SemanticType::Status
            } else if name_contains(
                &lower,
                &["department", "division", "team", "unit", "branch", "region", "org"],
            ) {
                SemanticType::OrganizationalUnit
            } else {
                SemanticType::Category
            }
        }
        DataType::DateTime => {
            if name_contains(&lower, &["transaction", "payment", "order", "purchase", "invoice"]) {
                SemanticType::DateTransaction
            } else {
                SemanticType::Unknown
            }
        }
        DataType::TextAddress => SemanticType::Identifier,
        _ => SemanticType::Unknown,
    }
}
