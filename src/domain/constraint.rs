use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintKind {
    PrimaryKey,
    ForeignKey,
    Unique,
    Check,
    NotNull,
    Exclusion,
}

impl ConstraintKind {
    /// Maps `pg_constraint.contype`.
    pub fn from_contype(code: &str) -> Option<Self> {
        match code {
            "p" => Some(Self::PrimaryKey),
            "f" => Some(Self::ForeignKey),
            "u" => Some(Self::Unique),
            "c" => Some(Self::Check),
            "n" => Some(Self::NotNull),
            "x" => Some(Self::Exclusion),
            _ => None,
        }
    }
}

impl fmt::Display for ConstraintKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PrimaryKey => write!(f, "PRIMARY KEY"),
            Self::ForeignKey => write!(f, "FOREIGN KEY"),
            Self::Unique => write!(f, "UNIQUE"),
            Self::Check => write!(f, "CHECK"),
            Self::NotNull => write!(f, "NOT NULL"),
            Self::Exclusion => write!(f, "EXCLUDE"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstraintDescriptor {
    pub name: String,
    pub column_name: String,
    pub kind: ConstraintKind,
    /// Referenced `table.column` for foreign keys, expression for checks.
    pub detail: Option<String>,
}

impl ConstraintDescriptor {
    pub fn new(
        name: impl Into<String>,
        column_name: impl Into<String>,
        kind: ConstraintKind,
    ) -> Self {
        Self {
            name: name.into(),
            column_name: column_name.into(),
            kind,
            detail: None,
        }
    }
}

/// A constraint the user wants to add to a column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NewConstraint {
    PrimaryKey {
        column: String,
    },
    Unique {
        column: String,
    },
    NotNull {
        column: String,
    },
    Check {
        column: String,
        expression: String,
    },
    ForeignKey {
        column: String,
        references_table: String,
        references_column: String,
    },
}

impl NewConstraint {
    pub fn column(&self) -> &str {
        match self {
            Self::PrimaryKey { column }
            | Self::Unique { column }
            | Self::NotNull { column }
            | Self::Check { column, .. }
            | Self::ForeignKey { column, .. } => column,
        }
    }

    pub fn kind(&self) -> ConstraintKind {
        match self {
            Self::PrimaryKey { .. } => ConstraintKind::PrimaryKey,
            Self::Unique { .. } => ConstraintKind::Unique,
            Self::NotNull { .. } => ConstraintKind::NotNull,
            Self::Check { .. } => ConstraintKind::Check,
            Self::ForeignKey { .. } => ConstraintKind::ForeignKey,
        }
    }
}
