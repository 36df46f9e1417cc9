//! SQL text for the psql gateway. Every identifier and literal that comes
//! from the caller passes through `quote_ident` / `quote_literal`.

use tabula_domain::{
    CellEdit, ColumnValue, ContentQuery, Filter, FilterPredicate, KeyValue, NewConstraint,
    SortOrder,
};

pub const SCHEMA: &str = "public";

/// Doubles embedded double quotes and wraps in double quotes.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Doubles embedded single quotes and wraps in single quotes.
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// `"public"."table"`
pub fn qualified(table: &str) -> String {
    format!("{}.{}", quote_ident(SCHEMA), quote_ident(table))
}

fn escape_like(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

pub fn filter_condition(filter: &Filter) -> String {
    let column = quote_ident(&filter.column);
    match &filter.predicate {
        FilterPredicate::Equals(v) => format!("{}::text = {}", column, quote_literal(v)),
        FilterPredicate::NotEquals(v) => format!("{}::text <> {}", column, quote_literal(v)),
        FilterPredicate::Contains(v) => format!(
            "{}::text ILIKE {}",
            column,
            quote_literal(&format!("%{}%", escape_like(v)))
        ),
        FilterPredicate::GreaterThan(v) => format!("{} > {}", column, quote_literal(v)),
        FilterPredicate::LessThan(v) => format!("{} < {}", column, quote_literal(v)),
        FilterPredicate::IsNull => format!("{} IS NULL", column),
        FilterPredicate::IsNotNull => format!("{} IS NOT NULL", column),
    }
}

/// Incomplete filters are skipped.
pub fn where_clause(filters: &[Filter]) -> String {
    let conditions: Vec<String> = filters
        .iter()
        .filter(|f| f.is_complete())
        .map(filter_condition)
        .collect();
    if conditions.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", conditions.join(" AND "))
    }
}

pub fn order_clause(order: &[SortOrder]) -> String {
    if order.is_empty() {
        return String::new();
    }
    let terms = order
        .iter()
        .map(|o| format!("{} {}", quote_ident(&o.column), o.direction.as_sql()))
        .collect::<Vec<_>>()
        .join(", ");
    format!(" ORDER BY {}", terms)
}

pub fn content_query(query: &ContentQuery) -> String {
    format!(
        "SELECT * FROM {}{}{} LIMIT {} OFFSET {}",
        qualified(&query.table_name),
        where_clause(&query.filters),
        order_clause(&query.order),
        query.page_size,
        query.offset()
    )
}

pub fn count_query(table: &str, filters: &[Filter]) -> String {
    format!(
        "SELECT count(*) FROM {}{}",
        qualified(table),
        where_clause(filters)
    )
}

pub fn tables_query() -> String {
    format!(
        r#"
        SELECT json_agg(t.name ORDER BY t.name)
        FROM (
            SELECT c.relname as name
            FROM pg_class c
            JOIN pg_namespace n ON n.oid = c.relnamespace
            WHERE c.relkind IN ('r', 'p')
              AND n.nspname = {}
              AND has_table_privilege(c.oid, 'SELECT')
        ) t
        "#,
        quote_literal(SCHEMA)
    )
}

pub fn table_oids_query(names: &[String]) -> String {
    let list = names
        .iter()
        .map(|n| quote_literal(n))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        r#"
        SELECT json_agg(row_to_json(t))
        FROM (
            SELECT c.relname as name, c.oid::bigint as oid
            FROM pg_class c
            JOIN pg_namespace n ON n.oid = c.relnamespace
            WHERE n.nspname = {}
              AND c.relname IN ({})
        ) t
        "#,
        quote_literal(SCHEMA),
        list
    )
}

pub fn foreign_keys_query(oids: &[u32]) -> String {
    let list = oids
        .iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        r#"
        SELECT json_agg(row_to_json(fk))
        FROM (
            SELECT
                con.conrelid::bigint as oid,
                con.conname as name,
                a1.attname as column,
                c2.relname as references_table,
                a2.attname as references_column
            FROM pg_constraint con
            JOIN pg_class c2 ON c2.oid = con.confrelid
            JOIN pg_attribute a1 ON a1.attrelid = con.conrelid AND a1.attnum = con.conkey[1]
            JOIN pg_attribute a2 ON a2.attrelid = con.confrelid AND a2.attnum = con.confkey[1]
            WHERE con.contype = 'f'
              AND con.conrelid IN ({})
            ORDER BY con.conname
        ) fk
        "#,
        list
    )
}

pub fn columns_query(table: &str) -> String {
    format!(
        r#"
        SELECT json_agg(row_to_json(c) ORDER BY c.ordinal_position)
        FROM (
            SELECT
                a.attname as name,
                pg_catalog.format_type(a.atttypid, a.atttypmod) as data_type,
                NOT a.attnotnull as nullable,
                pg_get_expr(d.adbin, d.adrelid) as default,
                EXISTS (
                    SELECT 1 FROM pg_index i
                    WHERE i.indrelid = cl.oid
                      AND i.indisprimary
                      AND a.attnum = ANY(i.indkey)
                ) as is_primary_key,
                a.attnum::int as ordinal_position
            FROM pg_class cl
            JOIN pg_namespace n ON n.oid = cl.relnamespace
            JOIN pg_attribute a ON a.attrelid = cl.oid
            LEFT JOIN pg_attrdef d ON d.adrelid = cl.oid AND d.adnum = a.attnum
            WHERE n.nspname = {}
              AND cl.relname = {}
              AND a.attnum > 0
              AND NOT a.attisdropped
        ) c
        "#,
        quote_literal(SCHEMA),
        quote_literal(table)
    )
}

pub fn primary_keys_query(table: &str) -> String {
    format!(
        r#"
        SELECT COALESCE(json_agg(a.attname ORDER BY array_position(i.indkey, a.attnum)), '[]'::json)
        FROM pg_index i
        JOIN pg_class c ON c.oid = i.indrelid
        JOIN pg_namespace n ON n.oid = c.relnamespace
        JOIN pg_attribute a ON a.attrelid = c.oid AND a.attnum = ANY(i.indkey)
        WHERE i.indisprimary
          AND n.nspname = {}
          AND c.relname = {}
        "#,
        quote_literal(SCHEMA),
        quote_literal(table)
    )
}

pub fn indexes_query(table: &str) -> String {
    format!(
        r#"
        SELECT json_agg(row_to_json(i))
        FROM (
            SELECT
                idx.relname as name,
                array_agg(a.attname ORDER BY array_position(ix.indkey, a.attnum)) as columns,
                ix.indisunique as is_unique,
                ix.indisprimary as is_primary,
                am.amname as method
            FROM pg_index ix
            JOIN pg_class idx ON idx.oid = ix.indexrelid
            JOIN pg_class tbl ON tbl.oid = ix.indrelid
            JOIN pg_namespace n ON n.oid = tbl.relnamespace
            JOIN pg_am am ON am.oid = idx.relam
            JOIN pg_attribute a ON a.attrelid = tbl.oid AND a.attnum = ANY(ix.indkey)
            WHERE n.nspname = {}
              AND tbl.relname = {}
            GROUP BY idx.relname, ix.indisunique, ix.indisprimary, am.amname
            ORDER BY idx.relname
        ) i
        "#,
        quote_literal(SCHEMA),
        quote_literal(table)
    )
}

/// One row per constrained column; table-level constraints without a
/// column report an empty `column_name`.
pub fn constraints_query(table: &str) -> String {
    format!(
        r#"
        SELECT json_agg(row_to_json(k) ORDER BY k.name, k.column_name)
        FROM (
            SELECT
                con.conname as name,
                COALESCE(a.attname, '') as column_name,
                con.contype::text as contype,
                CASE
                    WHEN con.contype = 'f' THEN ref.relname || '.' || refatt.attname
                    WHEN con.contype = 'c' THEN pg_get_constraintdef(con.oid)
                END as detail
            FROM pg_constraint con
            JOIN pg_class c ON c.oid = con.conrelid
            JOIN pg_namespace n ON n.oid = c.relnamespace
            LEFT JOIN pg_attribute a ON a.attrelid = c.oid AND a.attnum = ANY(con.conkey)
            LEFT JOIN pg_class ref ON ref.oid = con.confrelid
            LEFT JOIN pg_attribute refatt
              ON refatt.attrelid = con.confrelid AND refatt.attnum = con.confkey[1]
            WHERE n.nspname = {}
              AND c.relname = {}
              AND con.contype <> 'n'
        ) k
        "#,
        quote_literal(SCHEMA),
        quote_literal(table)
    )
}

/// Columns of `oid` that carry `attnotnull`, restricted to `columns`.
pub fn not_null_query(columns: &[String], oid: u32) -> String {
    let list = columns
        .iter()
        .map(|c| quote_literal(c))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        r#"
        SELECT json_agg(row_to_json(t) ORDER BY t.attnum)
        FROM (
            SELECT c.relname as table_name, a.attname as column_name, a.attnum
            FROM pg_attribute a
            JOIN pg_class c ON c.oid = a.attrelid
            WHERE a.attrelid = {}
              AND a.attnum > 0
              AND NOT a.attisdropped
              AND a.attnotnull
              AND a.attname IN ({})
        ) t
        "#,
        oid, list
    )
}

pub fn create_table(name: &str) -> String {
    format!("CREATE TABLE {} (id serial PRIMARY KEY)", qualified(name))
}

pub fn drop_table(name: &str) -> String {
    format!("DROP TABLE {}", qualified(name))
}

pub fn truncate_table(name: &str, restart_identity: bool) -> String {
    let identity = if restart_identity {
        " RESTART IDENTITY"
    } else {
        ""
    };
    format!("TRUNCATE TABLE {}{}", qualified(name), identity)
}

pub fn rename_table(from: &str, to: &str) -> String {
    format!("ALTER TABLE {} RENAME TO {}", qualified(from), quote_ident(to))
}

fn value_literal(value: Option<&str>) -> String {
    value.map_or_else(|| "NULL".to_string(), quote_literal)
}

fn key_condition(key: &[KeyValue]) -> String {
    key.iter()
        .map(|k| format!("{}::text = {}", quote_ident(&k.column), quote_literal(&k.value)))
        .collect::<Vec<_>>()
        .join(" AND ")
}

/// Updates one cell and reads back the stored value as a JSON array
/// (`null` when no row matched the key).
pub fn update_cell(edit: &CellEdit) -> String {
    let value = value_literal(edit.value.as_deref());
    let key = key_condition(&edit.primary_key);
    format!(
        "WITH updated AS (UPDATE {table} SET {column} = {value} WHERE {key} RETURNING {column}::text AS value) \
         SELECT json_agg(value) FROM updated",
        table = qualified(&edit.table_name),
        column = quote_ident(&edit.column_key),
        value = value,
        key = key,
    )
}

/// No values inserts a row of defaults.
pub fn insert_row(table: &str, values: &[ColumnValue]) -> String {
    if values.is_empty() {
        return format!("INSERT INTO {} DEFAULT VALUES", qualified(table));
    }
    let columns = values
        .iter()
        .map(|v| quote_ident(&v.column))
        .collect::<Vec<_>>()
        .join(", ");
    let literals = values
        .iter()
        .map(|v| value_literal(v.value.as_deref()))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        qualified(table),
        columns,
        literals
    )
}

/// Deletes every keyed row and selects the number removed.
pub fn delete_rows(table: &str, keys: &[Vec<KeyValue>]) -> String {
    let condition = keys
        .iter()
        .map(|key| format!("({})", key_condition(key)))
        .collect::<Vec<_>>()
        .join(" OR ");
    format!(
        "WITH deleted AS (DELETE FROM {} WHERE {} RETURNING 1) SELECT count(*) FROM deleted",
        qualified(table),
        condition
    )
}

/// `data_type` is passed through as written so types like `varchar(20)` work.
pub fn add_column(table: &str, name: &str, data_type: &str) -> String {
    format!(
        "ALTER TABLE {} ADD COLUMN {} {}",
        qualified(table),
        quote_ident(name),
        data_type
    )
}

pub fn drop_column(table: &str, name: &str) -> String {
    format!(
        "ALTER TABLE {} DROP COLUMN {}",
        qualified(table),
        quote_ident(name)
    )
}

/// Generated name for a new constraint, following PostgreSQL's own pattern.
pub fn constraint_name(table: &str, constraint: &NewConstraint) -> String {
    let suffix = match constraint {
        NewConstraint::PrimaryKey { .. } => "pkey",
        NewConstraint::Unique { .. } => "key",
        NewConstraint::NotNull { column } => return not_null_name(table, column),
        NewConstraint::Check { .. } => "check",
        NewConstraint::ForeignKey { .. } => "fkey",
    };
    format!("{}_{}_{}", table, constraint.column(), suffix)
}

pub fn add_constraint(table: &str, name: &str, constraint: &NewConstraint) -> String {
    let target = qualified(table);
    let column = quote_ident(constraint.column());
    match constraint {
        NewConstraint::NotNull { .. } => {
            format!("ALTER TABLE {} ALTER COLUMN {} SET NOT NULL", target, column)
        }
        NewConstraint::PrimaryKey { .. } => format!(
            "ALTER TABLE {} ADD CONSTRAINT {} PRIMARY KEY ({})",
            target,
            quote_ident(name),
            column
        ),
        NewConstraint::Unique { .. } => format!(
            "ALTER TABLE {} ADD CONSTRAINT {} UNIQUE ({})",
            target,
            quote_ident(name),
            column
        ),
        NewConstraint::Check { expression, .. } => format!(
            "ALTER TABLE {} ADD CONSTRAINT {} CHECK ({})",
            target,
            quote_ident(name),
            expression
        ),
        NewConstraint::ForeignKey {
            references_table,
            references_column,
            ..
        } => format!(
            "ALTER TABLE {} ADD CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({})",
            target,
            quote_ident(name),
            column,
            qualified(references_table),
            quote_ident(references_column)
        ),
    }
}

pub fn drop_constraint(table: &str, name: &str) -> String {
    format!(
        "ALTER TABLE {} DROP CONSTRAINT {}",
        qualified(table),
        quote_ident(name)
    )
}

pub fn constraint_exists_query(table: &str, name: &str) -> String {
    format!(
        r#"
        SELECT json_agg(con.conname)
        FROM pg_constraint con
        JOIN pg_class c ON c.oid = con.conrelid
        JOIN pg_namespace n ON n.oid = c.relnamespace
        WHERE n.nspname = {}
          AND c.relname = {}
          AND con.conname = {}
        "#,
        quote_literal(SCHEMA),
        quote_literal(table),
        quote_literal(name)
    )
}

/// Name PostgreSQL gives a column's not-null marker.
pub fn not_null_name(table: &str, column: &str) -> String {
    format!("{}_{}_not_null", table, column)
}

/// Column named by a not-null marker of `table`, if `name` has that shape.
pub fn not_null_column<'a>(table: &str, name: &'a str) -> Option<&'a str> {
    name.strip_prefix(table)?
        .strip_prefix('_')?
        .strip_suffix("_not_null")
        .filter(|column| !column.is_empty())
}

/// Not-null markers are column attributes rather than catalog constraints
/// on older servers, so they are dropped through the column.
pub fn drop_not_null(table: &str, column: &str) -> String {
    format!(
        "ALTER TABLE {} ALTER COLUMN {} DROP NOT NULL",
        qualified(table),
        quote_ident(column)
    )
}
