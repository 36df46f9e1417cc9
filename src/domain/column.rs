use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    pub name: String,
    pub data_type: String,
    pub nullable: bool,
    pub default: Option<String>,
    pub is_primary_key: bool,
    pub ordinal_position: i32,
}

impl ColumnDescriptor {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            nullable: true,
            default: None,
            is_primary_key: false,
            ordinal_position: 0,
        }
    }

    pub fn type_display(&self) -> String {
        let mut display = self.data_type.clone();
        if !self.nullable {
            display.push_str(" NOT NULL");
        }
        if let Some(default) = &self.default {
            display.push_str(&format!(" DEFAULT {}", default));
        }
        display
    }
}
