//! Schema derivation for entity shapes
//!
//! A shape is declared once as an ordered list of [`Field`]s. Deriving it
//! partitions out the single primary key and precomputes the four SQL
//! templates the lifecycle operations use. Templates use `?` as the
//! portable placeholder; the executor rewrites it per backend.
//!
//! Derived schemas are cached in a [`SchemaRegistry`] keyed by shape name,
//! so declaring a shape again hands back the same `Arc<Schema>`.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use once_cell::sync::Lazy;
use tracing::{debug, info};

use crate::error::{OrmError, Result};
use crate::field::Field;

/// Table name, column layout and SQL templates for one entity shape.
#[derive(Debug, Clone)]
pub struct Schema {
    shape: String,
    table: String,
    primary_key: Field,
    fields: Vec<Field>,
    select_sql: String,
    insert_sql: String,
    update_sql: String,
    delete_sql: String,
}

impl Schema {
    pub fn builder(shape: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder {
            shape: shape.into(),
            table: None,
            fields: Vec::new(),
        }
    }

    /// Derive the schema for `shape` from its declared fields.
    ///
    /// Fails if zero or several fields are primary keys, or if two fields
    /// map to the same column.
    pub fn derive(shape: &str, declared: Vec<Field>, table: Option<&str>) -> Result<Self> {
        let table = table.unwrap_or(shape).to_string();
        info!("found model: {} (table: {})", shape, table);

        let mut seen = HashSet::new();
        let mut primary_key: Option<Field> = None;
        let mut fields = Vec::with_capacity(declared.len());

        for field in declared {
            debug!("found mapping: {} ==> {}", field.attribute(), field);
            if !seen.insert(field.column_name().to_string()) {
                return Err(OrmError::DuplicateField {
                    shape: shape.to_string(),
                    column: field.column_name().to_string(),
                });
            }
            if field.is_primary_key() {
                if let Some(existing) = &primary_key {
                    return Err(OrmError::DuplicatePrimaryKey {
                        shape: shape.to_string(),
                        first: existing.column_name().to_string(),
                        second: field.column_name().to_string(),
                    });
                }
                primary_key = Some(field);
            } else {
                fields.push(field);
            }
        }

        let primary_key = primary_key.ok_or_else(|| OrmError::MissingPrimaryKey {
            shape: shape.to_string(),
        })?;

        let pk = primary_key.column_name();
        let columns: Vec<&str> = fields.iter().map(Field::column_name).collect();

        let select_sql = if columns.is_empty() {
            format!("select {} from {}", pk, table)
        } else {
            format!("select {}, {} from {}", pk, columns.join(", "), table)
        };

        let mut insert_columns = columns.clone();
        insert_columns.push(pk);
        let insert_sql = format!(
            "insert into {} ({}) values ({})",
            table,
            insert_columns.join(", "),
            placeholders(insert_columns.len())
        );

        // A key-only shape has nothing to set; rewriting the key to itself
        // keeps the template valid SQL.
        let assignments = if columns.is_empty() {
            format!("{}=?", pk)
        } else {
            columns
                .iter()
                .map(|c| format!("{}=?", c))
                .collect::<Vec<_>>()
                .join(", ")
        };
        let update_sql = format!("update {} set {} where {}=?", table, assignments, pk);
        let delete_sql = format!("delete from {} where {}=?", table, pk);

        Ok(Self {
            shape: shape.to_string(),
            table,
            primary_key,
            fields,
            select_sql,
            insert_sql,
            update_sql,
            delete_sql,
        })
    }

    pub fn shape(&self) -> &str {
        &self.shape
    }

    pub fn table_name(&self) -> &str {
        &self.table
    }

    pub fn primary_key(&self) -> &Field {
        &self.primary_key
    }

    pub fn primary_key_name(&self) -> &str {
        self.primary_key.column_name()
    }

    /// Non-key fields in declaration order
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Non-key column names in declaration order
    pub fn column_names(&self) -> Vec<&str> {
        self.fields.iter().map(Field::column_name).collect()
    }

    /// Every column, primary key first, in select order
    pub fn columns(&self) -> impl Iterator<Item = &Field> {
        std::iter::once(&self.primary_key).chain(self.fields.iter())
    }

    /// Slot of `column` in select order (key at 0)
    pub fn position(&self, column: &str) -> Option<usize> {
        self.columns().position(|f| f.column_name() == column)
    }

    pub fn field(&self, column: &str) -> Option<&Field> {
        self.columns().find(|f| f.column_name() == column)
    }

    pub fn width(&self) -> usize {
        self.fields.len() + 1
    }

    pub fn select_sql(&self) -> &str {
        &self.select_sql
    }

    pub fn insert_sql(&self) -> &str {
        &self.insert_sql
    }

    pub fn update_sql(&self) -> &str {
        &self.update_sql
    }

    pub fn delete_sql(&self) -> &str {
        &self.delete_sql
    }
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

/// Fluent shape declaration, finished by [`SchemaBuilder::build`].
#[derive(Debug, Clone)]
pub struct SchemaBuilder {
    shape: String,
    table: Option<String>,
    fields: Vec<Field>,
}

impl SchemaBuilder {
    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    pub fn field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    pub fn shape(&self) -> &str {
        &self.shape
    }

    pub fn build(self) -> Result<Schema> {
        Schema::derive(&self.shape, self.fields, self.table.as_deref())
    }
}

static GLOBAL_REGISTRY: Lazy<SchemaRegistry> = Lazy::new(SchemaRegistry::new);

/// Cache of derived schemas keyed by shape name.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    shapes: RwLock<HashMap<String, Arc<Schema>>>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide registry backing [`Model::schema`].
    pub fn global() -> &'static SchemaRegistry {
        &GLOBAL_REGISTRY
    }

    /// Derive and cache a shape. A shape already registered under the same
    /// name is returned as-is without re-deriving.
    pub fn register(&self, builder: SchemaBuilder) -> Result<Arc<Schema>> {
        self.get_or_derive(&builder.shape.clone(), move || builder)
    }

    pub fn get(&self, shape: &str) -> Option<Arc<Schema>> {
        self.shapes
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(shape)
            .cloned()
    }

    pub fn get_or_derive<F>(&self, shape: &str, declare: F) -> Result<Arc<Schema>>
    where
        F: FnOnce() -> SchemaBuilder,
    {
        if let Some(schema) = self.get(shape) {
            return Ok(schema);
        }

        let mut shapes = self
            .shapes
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        // Another caller may have derived it between the read and the write lock.
        if let Some(schema) = shapes.get(shape) {
            return Ok(schema.clone());
        }
        let schema = Arc::new(declare().build()?);
        shapes.insert(shape.to_string(), schema.clone());
        Ok(schema)
    }

    pub fn len(&self) -> usize {
        self.shapes
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A statically declared entity shape.
///
/// ```
/// use scribe_orm::{Field, Model, Schema, SchemaBuilder};
///
/// struct Tag;
///
/// impl Model for Tag {
///     const SHAPE: &'static str = "Tag";
///
///     fn declare() -> SchemaBuilder {
///         Schema::builder(Self::SHAPE)
///             .table("tags")
///             .field(Field::string("id").primary_key())
///             .field(Field::string("label"))
///     }
/// }
///
/// let schema = Tag::schema().unwrap();
/// assert_eq!(schema.select_sql(), "select id, label from tags");
/// ```
pub trait Model {
    const SHAPE: &'static str;

    fn declare() -> SchemaBuilder;

    fn schema() -> Result<Arc<Schema>> {
        SchemaRegistry::global().get_or_derive(Self::SHAPE, Self::declare)
    }
}
