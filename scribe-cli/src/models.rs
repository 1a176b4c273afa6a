//! Blog entity shapes: users, blogs and comments

use std::sync::Arc;

use chrono::Utc;
use clap::ValueEnum;
use scribe_orm::{Field, Model, Schema, SchemaBuilder, Value};
use uuid::Uuid;

/// Primary key: 15-digit millisecond timestamp, uuid4 hex, `000`.
/// 50 characters, sortable by creation time.
pub fn next_id() -> String {
    format!(
        "{:015}{}000",
        Utc::now().timestamp_millis(),
        Uuid::new_v4().simple()
    )
}

/// Seconds since the epoch, with millisecond precision
pub fn unix_now() -> f64 {
    Utc::now().timestamp_millis() as f64 / 1000.0
}

fn id_field() -> Field {
    Field::string("id")
        .ddl("varchar(50)")
        .primary_key()
        .default_with(|| Value::from(next_id()))
}

fn created_at_field() -> Field {
    Field::float("created_at").default_with(|| Value::Float(unix_now()))
}

pub struct User;

impl Model for User {
    const SHAPE: &'static str = "User";

    fn declare() -> SchemaBuilder {
        Schema::builder(Self::SHAPE)
            .table("users")
            .field(id_field())
            .field(Field::string("email").ddl("varchar(50)"))
            .field(Field::string("passwd").ddl("varchar(50)"))
            .field(Field::boolean("admin"))
            .field(Field::string("name").ddl("varchar(50)"))
            .field(Field::string("image").ddl("varchar(500)"))
            .field(created_at_field())
    }
}

pub struct Blog;

impl Model for Blog {
    const SHAPE: &'static str = "Blog";

    fn declare() -> SchemaBuilder {
        Schema::builder(Self::SHAPE)
            .table("blogs")
            .field(id_field())
            .field(Field::string("user_id").ddl("varchar(50)"))
            .field(Field::string("user_name").ddl("varchar(50)"))
            .field(Field::string("user_image").ddl("varchar(500)"))
            .field(Field::string("name").ddl("varchar(50)"))
            .field(Field::string("summary").ddl("varchar(200)"))
            .field(Field::text("content"))
            .field(created_at_field())
    }
}

pub struct Comment;

impl Model for Comment {
    const SHAPE: &'static str = "Comment";

    fn declare() -> SchemaBuilder {
        Schema::builder(Self::SHAPE)
            .table("comments")
            .field(id_field())
            .field(Field::string("blog_id").ddl("varchar(50)"))
            .field(Field::string("user_id").ddl("varchar(50)"))
            .field(Field::string("user_name").ddl("varchar(50)"))
            .field(Field::string("user_image").ddl("varchar(500)"))
            .field(Field::text("content"))
            .field(created_at_field())
    }
}

/// Shape selector for commands that work on any entity
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    User,
    Blog,
    Comment,
}

impl Shape {
    pub fn schema(self) -> scribe_orm::Result<Arc<Schema>> {
        match self {
            Shape::User => User::schema(),
            Shape::Blog => Blog::schema(),
            Shape::Comment => Comment::schema(),
        }
    }
}

/// Derive and register every shape. Run once at startup so a broken
/// declaration fails before any connection is opened.
pub fn derive_all() -> scribe_orm::Result<Vec<Arc<Schema>>> {
    Shape::value_variants()
        .iter()
        .map(|shape| shape.schema())
        .collect()
}
