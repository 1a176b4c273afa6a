//! scribe-orm: a small ORM for the scribe blog
//!
//! Entity shapes are declared once as ordered [`Field`] lists. The
//! [`Schema`] deriver turns each shape into a table layout plus
//! select/insert/update/delete templates, and [`Entity`] records run the
//! lifecycle operations through a pooled [`Database`].
//!
//! ```no_run
//! use scribe_orm::{Database, DbConfig, Entity, Field, FindOptions, Limit, Schema, SchemaRegistry};
//!
//! # async fn demo() -> scribe_orm::Result<()> {
//! let users = SchemaRegistry::global().register(
//!     Schema::builder("User")
//!         .table("users")
//!         .field(Field::string("id").primary_key())
//!         .field(Field::string("name"))
//!         .field(Field::string("image").default_value("about:blank")),
//! )?;
//!
//! let db = Database::create(&DbConfig::new("www-data", "www-data", "awesome")).await?;
//!
//! let mut user = Entity::new(users.clone()).with("id", "u1")?.with("name", "Test")?;
//! user.save(&db).await?;
//!
//! let recent = Entity::find_all(&db, &users, &FindOptions::new().limit(Limit::Count(5))).await?;
//! assert!(recent.len() <= 5);
//! db.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod entity;
pub mod error;
pub mod executor;
pub mod field;
pub mod pool;
pub mod query;
pub mod row;
pub mod schema;
pub mod value;

pub use config::{Backend, DbConfig, RowCountPolicy};
pub use entity::Entity;
pub use error::{OrmError, Result};
pub use field::{DefaultValue, Field};
pub use pool::{Database, PooledConnection};
pub use query::{FindOptions, Limit};
pub use row::Row;
pub use schema::{Model, Schema, SchemaBuilder, SchemaRegistry};
pub use value::Value;
