use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKey {
    pub name: String,
    pub column: String,
    pub references_table: String,
    pub references_column: String,
}

impl ForeignKey {
    pub fn target(&self) -> String {
        format!("{}.{}", self.references_table, self.references_column)
    }
}
