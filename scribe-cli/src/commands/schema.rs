//! Schema command - show the table layout and SQL derived for a shape
//!
//! Needs no database connection.

use anyhow::Result;
use clap::Parser;
use serde_json::json;

use super::print_json;
use crate::models::Shape;

#[derive(Parser, Debug)]
pub struct SchemaArgs {
    /// Entity shape to describe
    #[arg(value_enum)]
    pub shape: Shape,
}

pub fn run_schema(args: SchemaArgs) -> Result<()> {
    let schema = args.shape.schema()?;

    let columns: Vec<_> = schema
        .columns()
        .map(|f| {
            json!({
                "name": f.column_name(),
                "type": f.column_type(),
                "primary_key": f.is_primary_key(),
                "default": f.default().is_some(),
            })
        })
        .collect();

    print_json(&json!({
        "shape": schema.shape(),
        "table": schema.table_name(),
        "columns": columns,
        "select": schema.select_sql(),
        "insert": schema.insert_sql(),
        "update": schema.update_sql(),
        "delete": schema.delete_sql(),
    }))
}
