//! Field descriptors: per-column metadata for an entity shape

use std::fmt;
use std::sync::Arc;

use crate::value::Value;

/// Default applied by `save` when a column has no value.
#[derive(Clone)]
pub enum DefaultValue {
    Literal(Value),
    /// Evaluated each time it is resolved, e.g. a timestamp or a fresh id.
    Computed(Arc<dyn Fn() -> Value + Send + Sync>),
}

impl DefaultValue {
    pub fn resolve(&self) -> Value {
        match self {
            DefaultValue::Literal(v) => v.clone(),
            DefaultValue::Computed(f) => f(),
        }
    }
}

impl fmt::Debug for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefaultValue::Literal(v) => f.debug_tuple("Literal").field(v).finish(),
            DefaultValue::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

/// Metadata for one column.
///
/// `column_type` is passed through verbatim and never interpreted.
#[derive(Debug, Clone)]
pub struct Field {
    kind: &'static str,
    attribute: String,
    name: Option<String>,
    column_type: String,
    primary_key: bool,
    default: Option<DefaultValue>,
}

impl Field {
    pub fn new(attribute: impl Into<String>, column_type: impl Into<String>) -> Self {
        Self {
            kind: "Field",
            attribute: attribute.into(),
            name: None,
            column_type: column_type.into(),
            primary_key: false,
            default: None,
        }
    }

    /// `varchar(255)`, no default
    pub fn string(attribute: impl Into<String>) -> Self {
        Self {
            kind: "StringField",
            ..Self::new(attribute, "varchar(255)")
        }
    }

    /// `bigint`, defaults to 0
    pub fn integer(attribute: impl Into<String>) -> Self {
        Self {
            kind: "IntegerField",
            ..Self::new(attribute, "bigint")
        }
        .default_value(0i64)
    }

    /// `boolean`, defaults to false
    pub fn boolean(attribute: impl Into<String>) -> Self {
        Self {
            kind: "BooleanField",
            ..Self::new(attribute, "boolean")
        }
        .default_value(false)
    }

    pub fn text(attribute: impl Into<String>) -> Self {
        Self {
            kind: "TextField",
            ..Self::new(attribute, "text")
        }
    }

    pub fn float(attribute: impl Into<String>) -> Self {
        Self {
            kind: "FloatField",
            ..Self::new(attribute, "real")
        }
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    /// Store under a column name different from the attribute name.
    pub fn column(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn ddl(mut self, column_type: impl Into<String>) -> Self {
        self.column_type = column_type.into();
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(DefaultValue::Literal(value.into()));
        self
    }

    pub fn default_with<F>(mut self, f: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        self.default = Some(DefaultValue::Computed(Arc::new(f)));
        self
    }

    pub fn no_default(mut self) -> Self {
        self.default = None;
        self
    }

    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    /// Column name: the explicit name, else the attribute name
    pub fn column_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.attribute)
    }

    pub fn column_type(&self) -> &str {
        &self.column_type
    }

    pub fn is_primary_key(&self) -> bool {
        self.primary_key
    }

    pub fn default(&self) -> Option<&DefaultValue> {
        self.default.as_ref()
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}, {}:{}>", self.kind, self.column_type, self.column_name())
    }
}
