//! Options for `find_all`: filter, ordering and row limits

use std::str::FromStr;

use crate::config::Backend;
use crate::error::{OrmError, Result};
use crate::value::Value;

/// Row limit for a `find_all` query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Limit {
    /// At most `n` rows
    Count(u64),
    /// Skip `offset` rows, then return at most `count`
    Window { offset: u64, count: u64 },
}

impl Limit {
    /// Parse untyped input: a number, or a two-element `[offset, count]` array.
    pub fn from_json(value: &serde_json::Value) -> Result<Self> {
        match value {
            serde_json::Value::Number(_) => Ok(Limit::Count(non_negative(value)?)),
            serde_json::Value::Array(items) if items.len() == 2 => Ok(Limit::Window {
                offset: non_negative(&items[0])?,
                count: non_negative(&items[1])?,
            }),
            serde_json::Value::String(s) => s.parse(),
            other => Err(OrmError::invalid_argument(format!(
                "Invalid limit value: {}",
                other
            ))),
        }
    }

    /// `Count(0)` renders no limit clause at all.
    pub fn is_unbounded(self) -> bool {
        matches!(self, Limit::Count(0))
    }

    /// SQL fragment and its arguments for the given backend.
    pub(crate) fn render(self, backend: Backend) -> Result<(&'static str, Vec<Value>)> {
        match self {
            Limit::Count(n) => Ok(("limit ?", vec![to_arg(n)?])),
            Limit::Window { offset, count } if backend == Backend::Postgres => {
                Ok(("limit ? offset ?", vec![to_arg(count)?, to_arg(offset)?]))
            }
            Limit::Window { offset, count } => {
                Ok(("limit ?, ?", vec![to_arg(offset)?, to_arg(count)?]))
            }
        }
    }
}

impl FromStr for Limit {
    type Err = OrmError;

    /// `"5"` or `"10,5"` (offset, count)
    fn from_str(s: &str) -> Result<Self> {
        let parse = |part: &str| {
            part.trim()
                .parse::<u64>()
                .map_err(|_| OrmError::invalid_argument(format!("Invalid limit value: {}", s)))
        };
        let parts: Vec<&str> = s.split(',').collect();
        match parts.as_slice() {
            [count] => Ok(Limit::Count(parse(count)?)),
            [offset, count] => Ok(Limit::Window {
                offset: parse(offset)?,
                count: parse(count)?,
            }),
            _ => Err(OrmError::invalid_argument(format!(
                "Invalid limit value: {}",
                s
            ))),
        }
    }
}

impl From<u64> for Limit {
    fn from(n: u64) -> Self {
        Limit::Count(n)
    }
}

impl From<(u64, u64)> for Limit {
    fn from((offset, count): (u64, u64)) -> Self {
        Limit::Window { offset, count }
    }
}

fn non_negative(value: &serde_json::Value) -> Result<u64> {
    value
        .as_u64()
        .ok_or_else(|| OrmError::invalid_argument(format!("Invalid limit value: {}", value)))
}

fn to_arg(n: u64) -> Result<Value> {
    i64::try_from(n)
        .map(Value::Int)
        .map_err(|_| OrmError::invalid_argument(format!("limit {} out of range", n)))
}

/// Filter, ordering and limit for [`crate::Entity::find_all`].
///
/// `where` and `order by` clauses are raw SQL fragments; values belong in
/// `args`, bound to `?` placeholders in the clause.
#[derive(Debug, Clone, Default)]
pub struct FindOptions {
    pub filter: Option<String>,
    pub args: Vec<Value>,
    pub order_by: Option<String>,
    pub limit: Option<Limit>,
}

impl FindOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter<I, V>(mut self, clause: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.filter = Some(clause.into());
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn order_by(mut self, clause: impl Into<String>) -> Self {
        self.order_by = Some(clause.into());
        self
    }

    pub fn limit(mut self, limit: impl Into<Limit>) -> Self {
        self.limit = Some(limit.into());
        self
    }

    /// Append the optional clauses to `base`, returning SQL and arguments.
    pub(crate) fn build(&self, base: &str, backend: Backend) -> Result<(String, Vec<Value>)> {
        let mut sql = vec![base.to_string()];
        let mut args = self.args.clone();

        if let Some(filter) = self.filter.as_deref().filter(|w| !w.trim().is_empty()) {
            sql.push("where".to_string());
            sql.push(filter.to_string());
        }
        if let Some(order_by) = self.order_by.as_deref().filter(|o| !o.trim().is_empty()) {
            sql.push("order by".to_string());
            sql.push(order_by.to_string());
        }
        if let Some(limit) = self.limit.filter(|l| !l.is_unbounded()) {
            let (fragment, limit_args) = limit.render(backend)?;
            sql.push(fragment.to_string());
            args.extend(limit_args);
        }

        Ok((sql.join(" "), args))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn limit_from_json() {
        assert_eq!(Limit::from_json(&json!(5)).unwrap(), Limit::Count(5));
        assert_eq!(
            Limit::from_json(&json!([10, 5])).unwrap(),
            Limit::Window { offset: 10, count: 5 }
        );
        assert_eq!(Limit::from_json(&json!("3")).unwrap(), Limit::Count(3));
    }

    #[test]
    fn malformed_limits_rejected() {
        for bad in [json!([1, 2, 3]), json!(-1), json!(2.5), json!(null), json!({"n": 1})] {
            let err = Limit::from_json(&bad).unwrap_err();
            assert!(matches!(err, OrmError::InvalidArgument { .. }), "{bad}");
        }
        assert!("1,2,3".parse::<Limit>().is_err());
        assert!("ten".parse::<Limit>().is_err());
    }

    #[test]
    fn limit_parses_from_str() {
        assert_eq!("7".parse::<Limit>().unwrap(), Limit::Count(7));
        assert_eq!(
            " 10 , 5 ".parse::<Limit>().unwrap(),
            Limit::Window { offset: 10, count: 5 }
        );
    }

    #[test]
    fn builds_full_query() {
        let opts = FindOptions::new()
            .filter("user_id=?", ["u1"])
            .order_by("created_at desc")
            .limit(Limit::Window { offset: 10, count: 5 });
        let (sql, args) = opts.build("select id from blogs", Backend::Mysql).unwrap();

        assert_eq!(
            sql,
            "select id from blogs where user_id=? order by created_at desc limit ?, ?"
        );
        assert_eq!(args, vec![Value::from("u1"), Value::Int(10), Value::Int(5)]);
    }

    #[test]
    fn postgres_window_uses_offset() {
        let (sql, args) = FindOptions::new()
            .limit(Limit::Window { offset: 10, count: 5 })
            .build("select id from blogs", Backend::Postgres)
            .unwrap();
        assert_eq!(sql, "select id from blogs limit ? offset ?");
        assert_eq!(args, vec![Value::Int(5), Value::Int(10)]);
    }

    #[test]
    fn empty_options_leave_base_untouched() {
        let (sql, args) = FindOptions::new()
            .build("select id from users", Backend::Sqlite)
            .unwrap();
        assert_eq!(sql, "select id from users");
        assert!(args.is_empty());
    }

    #[test]
    fn zero_count_means_no_limit() {
        let (sql, args) = FindOptions::new()
            .limit(Limit::Count(0))
            .build("select id from users", Backend::Mysql)
            .unwrap();
        assert_eq!(sql, "select id from users");
        assert!(args.is_empty());

        // an empty window still renders
        let (sql, _) = FindOptions::new()
            .limit(Limit::Window { offset: 3, count: 0 })
            .build("select id from users", Backend::Sqlite)
            .unwrap();
        assert_eq!(sql, "select id from users limit ?, ?");
    }

    #[test]
    fn oversized_limit_rejected() {
        let err = FindOptions::new()
            .limit(u64::MAX)
            .build("select id from users", Backend::Mysql)
            .unwrap_err();
        assert!(matches!(err, OrmError::InvalidArgument { .. }));
    }
}
