use serde::{Deserialize, Serialize};

use super::foreign_key::ForeignKey;

/// A table name together with the object id the database assigned to it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableIdentity {
    pub name: String,
    pub oid: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSummary {
    pub name: String,
    pub oid: Option<u32>,
    pub foreign_keys: Vec<ForeignKey>,
}

impl TableSummary {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            oid: None,
            foreign_keys: Vec::new(),
        }
    }

    pub fn with_oid(mut self, oid: u32) -> Self {
        self.oid = Some(oid);
        self
    }

    pub fn identity(&self) -> Option<TableIdentity> {
        self.oid.map(|oid| TableIdentity {
            name: self.name.clone(),
            oid,
        })
    }
}

/// Tables of the connected database, in the order the database listed them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRegistry {
    tables: Vec<TableSummary>,
}

impl TableRegistry {
    pub fn new(tables: Vec<TableSummary>) -> Self {
        Self { tables }
    }

    pub fn tables(&self) -> &[TableSummary] {
        &self.tables
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn first_name(&self) -> Option<&str> {
        self.tables.first().map(|t| t.name.as_str())
    }

    pub fn get(&self, name: &str) -> Option<&TableSummary> {
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn identity(&self, name: &str) -> Option<TableIdentity> {
        self.get(name).and_then(TableSummary::identity)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.tables.len();
        self.tables.retain(|t| t.name != name);
        self.tables.len() != before
    }

    /// Renames `from` in place, keeping its position and oid, and points
    /// foreign keys of every table at the new name.
    pub fn rename(&mut self, from: &str, to: &str) -> bool {
        let Some(table) = self.tables.iter_mut().find(|t| t.name == from) else {
            return false;
        };
        table.name = to.to_string();
        for fk in self.tables.iter_mut().flat_map(|t| t.foreign_keys.iter_mut()) {
            if fk.references_table == from {
                fk.references_table = to.to_string();
            }
        }
        true
    }

    /// Case-insensitive substring match; an empty keyword matches everything.
    pub fn search(&self, keyword: &str) -> Vec<&TableSummary> {
        let needle = keyword.trim().to_lowercase();
        self.tables
            .iter()
            .filter(|t| needle.is_empty() || t.name.to_lowercase().contains(&needle))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn registry() -> TableRegistry {
        TableRegistry::new(vec![
            TableSummary::new("users").with_oid(16384),
            TableSummary::new("user_roles").with_oid(16390),
            TableSummary::new("Orders"),
        ])
    }

    #[test]
    fn first_name_returns_leading_table() {
        assert_eq!(registry().first_name(), Some("users"));
        assert_eq!(TableRegistry::default().first_name(), None);
    }

    #[test]
    fn identity_requires_resolved_oid() {
        let registry = registry();

        assert_eq!(
            registry.identity("users"),
            Some(TableIdentity {
                name: "users".to_string(),
                oid: 16384
            })
        );
        assert_eq!(registry.identity("Orders"), None);
        assert_eq!(registry.identity("missing"), None);
    }

    #[rstest]
    #[case("user", vec!["users", "user_roles"])]
    #[case("ORDER", vec!["Orders"])]
    #[case("", vec!["users", "user_roles", "Orders"])]
    #[case("nothing", vec![])]
    fn search_matches_case_insensitively(#[case] keyword: &str, #[case] expected: Vec<&str>) {
        let registry = registry();
        let names: Vec<&str> = registry
            .search(keyword)
            .into_iter()
            .map(|t| t.name.as_str())
            .collect();

        assert_eq!(names, expected);
    }

    #[test]
    fn remove_drops_matching_entry() {
        let mut registry = registry();

        assert!(registry.remove("users"));
        assert!(!registry.contains("users"));
        assert!(!registry.remove("users"));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn rename_keeps_oid_and_updates_references() {
        let mut registry = TableRegistry::new(vec![
            TableSummary::new("users").with_oid(16384),
            TableSummary {
                foreign_keys: vec![ForeignKey {
                    name: "orders_user_id_fkey".to_string(),
                    column: "user_id".to_string(),
                    references_table: "users".to_string(),
                    references_column: "id".to_string(),
                }],
                ..TableSummary::new("orders")
            },
        ]);

        assert!(registry.rename("users", "customers"));

        assert_eq!(registry.identity("customers").map(|i| i.oid), Some(16384));
        assert!(!registry.contains("users"));
        assert_eq!(registry.tables()[1].foreign_keys[0].target(), "customers.id");
        assert!(!registry.rename("missing", "x"));
    }
}
