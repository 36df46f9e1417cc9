use tabula::domain::{ColumnDescriptor, ForeignKey, Row};

use super::FakeTable;

fn cells(values: &[&str]) -> Row {
    values.iter().map(|v| Some((*v).to_string())).collect()
}

fn column(name: &str, data_type: &str, nullable: bool, position: i32) -> ColumnDescriptor {
    let mut column = ColumnDescriptor::new(name, data_type);
    column.nullable = nullable;
    column.ordinal_position = position;
    column
}

fn key_column(name: &str) -> ColumnDescriptor {
    let mut column = column(name, "integer", false, 1);
    column.is_primary_key = true;
    column.default = Some(format!("nextval('{}_seq'::regclass)", name));
    column
}

/// `users(id, name, email)` with `count` rows: ids 1..=count, names `user<n>`.
pub fn users(count: usize) -> FakeTable {
    FakeTable {
        structure: vec![
            key_column("id"),
            column("name", "text", false, 2),
            column("email", "text", true, 3),
        ],
        primary_keys: vec!["id".to_string()],
        rows: (1..=count)
            .map(|n| {
                vec![
                    Some(n.to_string()),
                    Some(format!("user{}", n)),
                    Some(format!("user{}@example.com", n)),
                ]
            })
            .collect(),
        foreign_keys: vec![],
    }
}

/// `orders(id, user_id, total)` referencing `users.id`.
pub fn orders() -> FakeTable {
    FakeTable {
        structure: vec![
            key_column("id"),
            column("user_id", "integer", false, 2),
            column("total", "numeric", true, 3),
        ],
        primary_keys: vec!["id".to_string()],
        rows: vec![
            cells(&["1", "2", "10.00"]),
            cells(&["2", "1", "25.50"]),
        ],
        foreign_keys: vec![ForeignKey {
            name: "orders_user_id_fkey".into(),
            column: "user_id".into(),
            references_table: "users".into(),
            references_column: "id".into(),
        }],
    }
}

/// A table without a primary key.
pub fn events() -> FakeTable {
    FakeTable {
        structure: vec![
            column("kind", "text", true, 1),
            column("at", "timestamp", true, 2),
        ],
        primary_keys: vec![],
        rows: vec![
            cells(&["login", "2024-01-01 00:00:00"]),
            cells(&["logout", "2024-01-01 01:00:00"]),
        ],
        foreign_keys: vec![],
    }
}
