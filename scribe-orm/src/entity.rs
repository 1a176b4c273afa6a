//! Entity instances and their lifecycle operations
//!
//! An [`Entity`] is one record of a shape: an ordered set of column slots
//! validated against its [`Schema`]. Records start transient (built with
//! [`Entity::new`]), become persisted through [`Entity::save`] or when
//! loaded by a finder, and are removed with [`Entity::remove`].

use std::fmt;
use std::sync::Arc;

use serde::ser::{Serialize, SerializeMap, Serializer};
use tracing::debug;

use crate::error::{OrmError, Result};
use crate::pool::Database;
use crate::query::FindOptions;
use crate::row::Row;
use crate::schema::Schema;
use crate::value::Value;

/// Column alias used by [`Entity::count`]
const COUNT_ALIAS: &str = "_num_";

/// One record of an entity shape.
#[derive(Clone)]
pub struct Entity {
    schema: Arc<Schema>,
    /// Slots in select order: primary key first, then declared fields
    values: Vec<Option<Value>>,
}

impl Entity {
    /// Empty record pending `save`.
    pub fn new(schema: Arc<Schema>) -> Self {
        let width = schema.width();
        Self {
            schema,
            values: vec![None; width],
        }
    }

    /// Record from `(column, value)` pairs; unknown columns are rejected.
    pub fn from_pairs<I, K, V>(schema: Arc<Schema>, pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        let mut entity = Self::new(schema);
        for (key, value) in pairs {
            entity.set(key.as_ref(), value)?;
        }
        Ok(entity)
    }

    /// Load a record from a result row. Columns outside the schema are
    /// ignored, so `select *` on a wider table still maps.
    pub fn from_row(schema: Arc<Schema>, row: Row) -> Self {
        let mut entity = Self::new(schema);
        for (column, value) in row {
            if let Some(idx) = entity.slot_of(&column) {
                entity.values[idx] = Some(value);
            }
        }
        entity
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    fn slot_of(&self, key: &str) -> Option<usize> {
        self.schema
            .position(key)
            .or_else(|| {
                self.schema
                    .columns()
                    .position(|f| f.column_name().eq_ignore_ascii_case(key))
            })
    }

    fn slot(&self, key: &str) -> Result<usize> {
        self.schema
            .position(key)
            .ok_or_else(|| OrmError::unknown_field(self.schema.shape(), key))
    }

    /// Value of `key`, or `None` if it has not been set.
    pub fn get(&self, key: &str) -> Result<Option<&Value>> {
        let idx = self.slot(key)?;
        Ok(self.values[idx].as_ref())
    }

    pub fn set(&mut self, key: &str, value: impl Into<Value>) -> Result<&mut Self> {
        let idx = self.slot(key)?;
        self.values[idx] = Some(value.into());
        Ok(self)
    }

    /// Builder-style [`Entity::set`]
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Result<Self> {
        self.set(key, value)?;
        Ok(self)
    }

    pub fn unset(&mut self, key: &str) -> Result<Option<Value>> {
        let idx = self.slot(key)?;
        Ok(self.values[idx].take())
    }

    /// Current value, `Null` when unset. Never consults defaults.
    pub fn value(&self, key: &str) -> Result<Value> {
        Ok(self.get(key)?.cloned().unwrap_or(Value::Null))
    }

    /// Current value, or the field default when unset or `Null`.
    /// Computed defaults are evaluated here, at the time of the call.
    pub fn value_or_default(&self, key: &str) -> Result<Value> {
        let idx = self.slot(key)?;
        Ok(self.resolve_slot(idx))
    }

    fn resolve_slot(&self, idx: usize) -> Value {
        match &self.values[idx] {
            Some(value) if !value.is_null() => value.clone(),
            _ => {
                let Some(field) = self.schema.columns().nth(idx) else {
                    return Value::Null;
                };
                match field.default() {
                    Some(default) => {
                        let value = default.resolve();
                        debug!("use default value for {}: {}", field.column_name(), value);
                        value
                    }
                    None => Value::Null,
                }
            }
        }
    }

    pub fn primary_key(&self) -> Option<&Value> {
        self.values[0].as_ref()
    }

    /// Set columns in select order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.schema
            .columns()
            .zip(self.values.iter())
            .filter_map(|(field, value)| value.as_ref().map(|v| (field.column_name(), v)))
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.iter()
                .map(|(column, value)| (column.to_string(), value.to_json()))
                .collect(),
        )
    }

    // ------------------------------------------------------------------
    // Lifecycle operations
    // ------------------------------------------------------------------

    /// Every matching record, optionally filtered, ordered and limited.
    pub async fn find_all(db: &Database, schema: &Arc<Schema>, opts: &FindOptions) -> Result<Vec<Entity>> {
        let (sql, args) = opts.build(schema.select_sql(), db.backend())?;
        let rows = db.select(&sql, &args, None).await?;
        Ok(rows
            .into_iter()
            .map(|row| Entity::from_row(schema.clone(), row))
            .collect())
    }

    /// Record by primary key; `None` when no row matches.
    pub async fn find(db: &Database, schema: &Arc<Schema>, key: impl Into<Value>) -> Result<Option<Entity>> {
        let sql = format!("{} where {}=?", schema.select_sql(), schema.primary_key_name());
        let mut rows = db.select(&sql, &[key.into()], Some(1)).await?;
        Ok(rows.pop().map(|row| Entity::from_row(schema.clone(), row)))
    }

    /// Single aggregate such as `count(id)`; `None` on an empty result.
    pub async fn count(
        db: &Database,
        schema: &Schema,
        select_expr: &str,
        filter: Option<&str>,
        args: &[Value],
    ) -> Result<Option<Value>> {
        let mut sql = format!("select {} as {} from {}", select_expr, COUNT_ALIAS, schema.table_name());
        if let Some(filter) = filter.filter(|w| !w.trim().is_empty()) {
            sql.push_str(" where ");
            sql.push_str(filter);
        }
        let rows = db.select(&sql, args, Some(1)).await?;
        Ok(rows.first().and_then(|row| row.get(COUNT_ALIAS).cloned()))
    }

    /// Insert this record, filling unset columns from their defaults.
    ///
    /// Once the insert succeeds the resolved values are written back, so a
    /// generated primary key is readable after the call. A failed insert
    /// leaves the record untouched.
    pub async fn save(&mut self, db: &Database) -> Result<u64> {
        let resolved: Vec<Value> = (0..self.schema.width())
            .map(|idx| self.resolve_slot(idx))
            .collect();

        // Insert order: non-key columns, then the key
        let mut args = resolved[1..].to_vec();
        args.push(resolved[0].clone());

        let rows = db.execute(self.schema.insert_sql(), &args).await?;
        self.values = resolved.into_iter().map(Some).collect();
        db.check_affected("insert", self.schema.table_name(), 1, rows)?;
        Ok(rows)
    }

    /// Write every non-key column as it is now. Unset columns are written
    /// as `NULL`; defaults are never applied.
    pub async fn update(&self, db: &Database) -> Result<u64> {
        let mut args: Vec<Value> = self.values[1..].iter().map(cell).collect();
        args.push(cell(&self.values[0]));

        let rows = db.execute(self.schema.update_sql(), &args).await?;
        db.check_affected("update", self.schema.table_name(), 1, rows)?;
        Ok(rows)
    }

    /// Delete the stored row with this record's primary key.
    pub async fn remove(&self, db: &Database) -> Result<u64> {
        let args = [cell(&self.values[0])];
        let rows = db.execute(self.schema.delete_sql(), &args).await?;
        db.check_affected("remove", self.schema.table_name(), 1, rows)?;
        Ok(rows)
    }
}

fn cell(slot: &Option<Value>) -> Value {
    slot.clone().unwrap_or(Value::Null)
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (column, value) in self.iter() {
            map.entry(&column, value);
        }
        map.finish()
    }
}

impl PartialEq for Entity {
    fn eq(&self, other: &Self) -> bool {
        self.schema.shape() == other.schema.shape() && self.values == other.values
    }
}

impl Serialize for Entity {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        for (column, value) in self.iter() {
            map.serialize_entry(column, value)?;
        }
        map.end()
    }
}
