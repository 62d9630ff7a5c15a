// dqscore-core/src/domain/detection/referential.rs

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::detection::{AnomalyCandidate, DetectorKind, Signal};
use crate::domain::dimension::Dimension;
use crate::domain::error::DomainError;
use crate::domain::metric::MetricKey;

pub const FK_METRIC_NAME: &str = "fk_violation_rate";

/// A child -> parent relationship with its measured violation rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForeignKeyRelationship {
    pub child_table: String,
    pub child_column: String,
    pub parent_table: String,
    pub parent_column: String,
    pub violation_rate: f64,
}

impl fmt::Display for ForeignKeyRelationship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{} -> {}.{}",
            self.child_table, self.child_column, self.parent_table, self.parent_column
        )
    }
}

/// `"`-quoted form of an identifier, embedded quotes doubled.
pub fn quote_identifier(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Rejects relationships that cannot be trusted instead of scoring them.
/// Identifiers that are not bare SQL names (spaces, hyphens, quotes...) are
/// accepted and rendered quoted.
pub struct ForeignKeyValidator {
    bare: Regex,
}

impl ForeignKeyValidator {
    pub fn new() -> Result<Self, DomainError> {
        // Optionally schema-qualified: raw.orders
        let bare = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)?$")
            .map_err(|e| DomainError::InvariantViolation(format!("FK identifier regex: {}", e)))?;
        Ok(Self { bare })
    }

    pub fn render(&self, ident: &str) -> String {
        if self.bare.is_match(ident) {
            ident.to_string()
        } else {
            quote_identifier(ident)
        }
    }

    /// `child.column -> parent.column`, quoting what needs it.
    pub fn describe(&self, fk: &ForeignKeyRelationship) -> String {
        format!(
            "{}.{} -> {}.{}",
            self.render(&fk.child_table),
            self.render(&fk.child_column),
            self.render(&fk.parent_table),
            self.render(&fk.parent_column)
        )
    }

    pub fn check(&self, fk: &ForeignKeyRelationship) -> Result<(), DomainError> {
        let malformed = |reason: String| DomainError::MalformedForeignKey {
            relationship: self.describe(fk),
            reason,
        };

        for (role, ident) in [
            ("child table", &fk.child_table),
            ("child column", &fk.child_column),
            ("parent table", &fk.parent_table),
            ("parent column", &fk.parent_column),
        ] {
            if ident.trim().is_empty() {
                return Err(malformed(format!("empty {} identifier", role)));
            }
            if ident.chars().any(char::is_control) {
                return Err(malformed(format!(
                    "{} identifier {} contains control characters",
                    role,
                    quote_identifier(&ident.escape_debug().to_string())
                )));
            }
        }

        if !fk.violation_rate.is_finite() || !(0.0..=1.0).contains(&fk.violation_rate) {
            return Err(malformed(format!(
                "violation rate {} is outside [0, 1]",
                fk.violation_rate
            )));
        }

        Ok(())
    }

    /// One candidate per relationship, keyed on the child column.
    /// Fails on the first malformed relationship.
    pub fn candidates(
        &self,
        relationships: &[ForeignKeyRelationship],
    ) -> Result<Vec<AnomalyCandidate>, DomainError> {
        relationships
            .iter()
            .map(|fk| {
                self.check(fk)?;
                Ok(AnomalyCandidate {
                    source: DetectorKind::ReferentialDrift,
                    dimension: Dimension::Referential,
                    key: MetricKey::new(
                        fk.child_table.as_str(),
                        fk.child_column.as_str(),
                        FK_METRIC_NAME,
                    ),
                    signal: Signal::ViolationRate {
                        rate: fk.violation_rate,
                    },
                })
            })
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn fk(child_table: &str, child_column: &str, rate: f64) -> ForeignKeyRelationship {
        ForeignKeyRelationship {
            child_table: child_table.into(),
            child_column: child_column.into(),
            parent_table: "raw.customers".into(),
            parent_column: "id".into(),
            violation_rate: rate,
        }
    }

    #[test]
    fn test_valid_relationships_become_candidates() -> anyhow::Result<()> {
        let validator = ForeignKeyValidator::new()?;
        let found = validator.candidates(&[fk("raw.orders", "customer_id", 0.03)])?;
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].dimension, Dimension::Referential);
        assert_eq!(found[0].key.table, "raw.orders");
        assert_eq!(found[0].key.metric_name, FK_METRIC_NAME);
        assert_eq!(found[0].signal, Signal::ViolationRate { rate: 0.03 });
        Ok(())
    }

    #[test]
    fn test_rate_out_of_range_is_malformed() -> anyhow::Result<()> {
        let validator = ForeignKeyValidator::new()?;
        for rate in [1.5, -0.1, f64::NAN] {
            let res = validator.candidates(&[fk("orders", "customer_id", rate)]);
            assert!(matches!(res, Err(DomainError::MalformedForeignKey { .. })));
        }
        Ok(())
    }

    #[test]
    fn test_empty_or_control_identifier_is_malformed() -> anyhow::Result<()> {
        let validator = ForeignKeyValidator::new()?;
        assert!(matches!(
            validator.check(&fk("orders", "", 0.0)),
            Err(DomainError::MalformedForeignKey { .. })
        ));
        assert!(validator.check(&fk("orders", "   ", 0.0)).is_err());
        assert!(validator.check(&fk("orders\n", "customer_id", 0.0)).is_err());
        Ok(())
    }

    #[test]
    fn test_non_bare_identifiers_are_quoted_not_rejected() -> anyhow::Result<()> {
        let validator = ForeignKeyValidator::new()?;
        let relationship = fk("sales orders", "customer-id", 0.03);

        let found = validator.candidates(std::slice::from_ref(&relationship))?;
        assert_eq!(found[0].key.table, "sales orders");
        assert_eq!(found[0].key.column, "customer-id");
        assert_eq!(
            validator.describe(&relationship),
            r#""sales orders"."customer-id" -> raw.customers.id"#
        );

        assert_eq!(validator.render(r#"say "hi""#), r#""say ""hi""""#);
        assert_eq!(validator.render("orders; DROP TABLE x"), r#""orders; DROP TABLE x""#);
        Ok(())
    }
}
