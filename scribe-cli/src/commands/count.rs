//! Count command - number of stored rows for a shape

use anyhow::Result;
use clap::Parser;
use scribe_orm::{Database, Entity, Value};
use serde_json::json;

use super::print_json;
use crate::models::Shape;

#[derive(Parser, Debug)]
pub struct CountArgs {
    /// Entity shape to count
    #[arg(value_enum)]
    pub shape: Shape,

    /// SQL condition, with `?` placeholders for --arg values
    #[arg(long = "where")]
    pub filter: Option<String>,

    /// Value bound to the next `?` in --where (repeatable)
    #[arg(long = "arg", requires = "filter")]
    pub args: Vec<String>,
}

pub async fn run_count(args: CountArgs, db: &Database) -> Result<()> {
    let schema = args.shape.schema()?;
    let expr = format!("count({})", schema.primary_key_name());
    let bound: Vec<Value> = args.args.into_iter().map(Value::from).collect();

    let count = Entity::count(db, &schema, &expr, args.filter.as_deref(), &bound).await?;
    let count = count.and_then(|v| v.as_i64()).unwrap_or(0);

    print_json(&json!({
        "shape": schema.shape(),
        "count": count,
    }))
}
