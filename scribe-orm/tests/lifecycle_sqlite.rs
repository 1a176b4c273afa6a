//! Entity lifecycle against a real SQLite database
//!
//! Each test gets its own database file in a temp directory; tables are
//! created by hand since the ORM never issues DDL of its own.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use scribe_orm::{
    Database, DbConfig, Entity, Field, FindOptions, Limit, OrmError, Schema, Value,
};
use tempfile::TempDir;

const USERS_DDL: &str = "create table users (
    id varchar(50) primary key,
    name varchar(50),
    email varchar(50),
    passwd varchar(50),
    image varchar(500)
)";

const POSTS_DDL: &str = "create table posts (
    id varchar(50) primary key,
    seq bigint not null,
    title varchar(200)
)";

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("scribe_orm=debug")
        .with_test_writer()
        .try_init();
}

async fn open(dir: &TempDir, config: impl FnOnce(&mut DbConfig)) -> Database {
    init_tracing();
    let path = dir.path().join("blog.db");
    let mut cfg = DbConfig::sqlite(path.display().to_string());
    cfg.maxsize = 4;
    config(&mut cfg);
    let db = Database::create(&cfg).await.expect("pool creation failed");
    db.execute(USERS_DDL, &[]).await.expect("create users");
    db.execute(POSTS_DDL, &[]).await.expect("create posts");
    db
}

fn user_schema() -> Arc<Schema> {
    Arc::new(
        Schema::builder("User")
            .table("users")
            .field(Field::string("id").ddl("varchar(50)").primary_key())
            .field(Field::string("name"))
            .field(Field::string("email"))
            .field(Field::string("passwd"))
            .field(Field::string("image").default_value("about:blank"))
            .build()
            .unwrap(),
    )
}

fn post_schema() -> Arc<Schema> {
    Arc::new(
        Schema::builder("Post")
            .table("posts")
            .field(Field::string("id").primary_key())
            .field(Field::integer("seq"))
            .field(Field::string("title").ddl("varchar(200)"))
            .build()
            .unwrap(),
    )
}

fn test_user(schema: &Arc<Schema>) -> Entity {
    Entity::from_pairs(
        schema.clone(),
        [
            ("id", "u1"),
            ("name", "Test"),
            ("email", "a@b.com"),
            ("passwd", "123456"),
        ],
    )
    .unwrap()
}

async fn seed_posts(db: &Database, n: i64) {
    let schema = post_schema();
    for seq in 0..n {
        let mut post = Entity::new(schema.clone())
            .with("id", format!("p{:02}", seq))
            .unwrap()
            .with("seq", seq)
            .unwrap()
            .with("title", format!("Post {}", seq))
            .unwrap();
        assert_eq!(post.save(db).await.unwrap(), 1);
    }
}

#[tokio::test]
async fn user_lifecycle_scenario() {
    let dir = tempfile::tempdir().unwrap();
    let db = open(&dir, |_| {}).await;
    let users = user_schema();

    let mut user = test_user(&users);
    assert_eq!(user.save(&db).await.unwrap(), 1);
    assert_eq!(user.get("image").unwrap(), Some(&Value::from("about:blank")));

    let found = Entity::find(&db, &users, "u1").await.unwrap().expect("saved user");
    assert_eq!(found, user);
    assert_eq!(found.value("image").unwrap(), Value::from("about:blank"));

    let mut renamed = found.clone();
    renamed.set("name", "Test2").unwrap();
    assert_eq!(renamed.update(&db).await.unwrap(), 1);

    let refetched = Entity::find(&db, &users, "u1").await.unwrap().unwrap();
    assert_eq!(refetched.value("name").unwrap(), Value::from("Test2"));
    assert_eq!(refetched.value("image").unwrap(), Value::from("about:blank"));

    assert_eq!(refetched.remove(&db).await.unwrap(), 1);
    assert!(Entity::find(&db, &users, "u1").await.unwrap().is_none());

    db.shutdown().await;
}

#[tokio::test]
async fn find_missing_key_is_none() {
    let dir = tempfile::tempdir().unwrap();
    let db = open(&dir, |_| {}).await;

    assert!(Entity::find(&db, &user_schema(), "nobody").await.unwrap().is_none());
}

#[tokio::test]
async fn find_all_honours_limits() {
    let dir = tempfile::tempdir().unwrap();
    let db = open(&dir, |_| {}).await;
    let posts = post_schema();
    seed_posts(&db, 20).await;

    let all = Entity::find_all(&db, &posts, &FindOptions::new()).await.unwrap();
    assert_eq!(all.len(), 20);

    let first = Entity::find_all(
        &db,
        &posts,
        &FindOptions::new().order_by("seq").limit(Limit::Count(5)),
    )
    .await
    .unwrap();
    assert_eq!(first.len(), 5);

    // rows 11-15 of the ordered set
    let window = Entity::find_all(
        &db,
        &posts,
        &FindOptions::new()
            .order_by("seq")
            .limit(Limit::Window { offset: 10, count: 5 }),
    )
    .await
    .unwrap();
    let seqs: Vec<i64> = window
        .iter()
        .map(|p| p.value("seq").unwrap().as_i64().unwrap())
        .collect();
    assert_eq!(seqs, vec![10, 11, 12, 13, 14]);
}

#[tokio::test]
async fn find_all_with_filter_and_order() {
    let dir = tempfile::tempdir().unwrap();
    let db = open(&dir, |_| {}).await;
    let posts = post_schema();
    seed_posts(&db, 20).await;

    let tail = Entity::find_all(
        &db,
        &posts,
        &FindOptions::new()
            .filter("seq >= ?", [15i64])
            .order_by("seq desc"),
    )
    .await
    .unwrap();
    let ids: Vec<Value> = tail.iter().map(|p| p.value("id").unwrap()).collect();
    assert_eq!(
        ids,
        vec!["p19", "p18", "p17", "p16", "p15"]
            .into_iter()
            .map(Value::from)
            .collect::<Vec<_>>()
    );
}

#[tokio::test]
async fn count_returns_scalar() {
    let dir = tempfile::tempdir().unwrap();
    let db = open(&dir, |_| {}).await;
    let posts = post_schema();

    let empty = Entity::count(&db, &posts, "count(id)", None, &[]).await.unwrap();
    assert_eq!(empty.and_then(|v| v.as_i64()), Some(0));

    seed_posts(&db, 8).await;
    let total = Entity::count(&db, &posts, "count(id)", None, &[]).await.unwrap();
    assert_eq!(total.and_then(|v| v.as_i64()), Some(8));

    let some = Entity::count(&db, &posts, "count(id)", Some("seq < ?"), &[Value::Int(3)])
        .await
        .unwrap();
    assert_eq!(some.and_then(|v| v.as_i64()), Some(3));
}

#[tokio::test]
async fn update_never_applies_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let db = open(&dir, |_| {}).await;
    let users = user_schema();

    let mut user = test_user(&users);
    user.set("image", "me.png").unwrap();
    user.save(&db).await.unwrap();

    // Only id and name in memory: image is written back as NULL, not the default
    let partial = Entity::from_pairs(users.clone(), [("id", "u1"), ("name", "Partial")]).unwrap();
    assert_eq!(partial.update(&db).await.unwrap(), 1);

    let stored = Entity::find(&db, &users, "u1").await.unwrap().unwrap();
    assert_eq!(stored.value("name").unwrap(), Value::from("Partial"));
    assert_eq!(stored.value("image").unwrap(), Value::Null);
}

#[tokio::test]
async fn computed_defaults_resolve_at_save_time() {
    let dir = tempfile::tempdir().unwrap();
    let db = open(&dir, |_| {}).await;

    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let schema = Arc::new(
        Schema::builder("Post")
            .table("posts")
            .field(
                Field::string("id")
                    .primary_key()
                    .default_with(|| Value::from("generated-id")),
            )
            .field(Field::integer("seq").no_default().default_with(move || {
                Value::Int(counter.fetch_add(1, Ordering::SeqCst) as i64 + 100)
            }))
            .field(Field::string("title"))
            .build()
            .unwrap(),
    );

    let mut post = Entity::new(schema.clone());
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    post.save(&db).await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(post.primary_key(), Some(&Value::from("generated-id")));

    let stored = Entity::find(&db, &schema, "generated-id").await.unwrap().unwrap();
    assert_eq!(stored.value("seq").unwrap(), Value::Int(100));
    assert_eq!(stored.value("title").unwrap(), Value::Null);
}

#[tokio::test]
async fn row_count_mismatch_only_warns_by_default() {
    let dir = tempfile::tempdir().unwrap();
    let db = open(&dir, |_| {}).await;
    let users = user_schema();

    let ghost = test_user(&users);
    assert_eq!(ghost.update(&db).await.unwrap(), 0);
    assert_eq!(ghost.remove(&db).await.unwrap(), 0);
}

#[tokio::test]
async fn strict_policy_surfaces_row_count_mismatch() {
    let dir = tempfile::tempdir().unwrap();
    let db = open(&dir, |cfg| cfg.strict_row_counts = true).await;
    let users = user_schema();

    let ghost = test_user(&users);
    match ghost.remove(&db).await {
        Err(OrmError::RowCountMismatch {
            operation,
            expected,
            actual,
            ..
        }) => {
            assert_eq!(operation, "remove");
            assert_eq!(expected, 1);
            assert_eq!(actual, 0);
        }
        other => panic!("expected RowCountMismatch, got {other:?}"),
    }
}

#[tokio::test]
async fn explicit_commit_mode() {
    let dir = tempfile::tempdir().unwrap();
    // A single connection: a transaction left open would block every later call
    let db = open(&dir, |cfg| cfg.maxsize = 1).await;
    let insert = "insert into posts (seq, title, id) values (?, ?, ?)";

    let rows = db
        .execute_with(
            insert,
            &[Value::Int(1), Value::from("first"), Value::from("p1")],
            false,
        )
        .await
        .unwrap();
    assert_eq!(rows, 1);

    // Primary key violation: rolled back, original driver error returned
    let err = db
        .execute_with(
            insert,
            &[Value::Int(2), Value::from("dup"), Value::from("p1")],
            false,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, OrmError::Database(_)), "{err:?}");

    // The connection went back to the pool clean and usable in both modes
    db.execute_with(
        insert,
        &[Value::Int(3), Value::from("second"), Value::from("p2")],
        false,
    )
    .await
    .unwrap();
    db.execute_with(
        insert,
        &[Value::Int(4), Value::from("third"), Value::from("p3")],
        true,
    )
    .await
    .unwrap();
    db.shutdown().await;

    // Committed rows are visible from an independent pool
    let path = dir.path().join("blog.db");
    let reopened = Database::create(&DbConfig::sqlite(path.display().to_string()))
        .await
        .unwrap();
    let rows = reopened
        .select("select id, title from posts order by seq", &[], None)
        .await
        .unwrap();
    let titles: Vec<_> = rows.iter().map(|r| r.get("title").cloned()).collect();
    assert_eq!(
        titles,
        vec![
            Some(Value::from("first")),
            Some(Value::from("second")),
            Some(Value::from("third")),
        ]
    );
}

#[tokio::test]
async fn boolean_columns_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let db = open(&dir, |_| {}).await;
    db.execute(
        "create table flags (id varchar(50) primary key, label varchar(50), enabled boolean)",
        &[],
    )
    .await
    .unwrap();
    let flags = Arc::new(
        Schema::builder("Flag")
            .table("flags")
            .field(Field::string("id").primary_key())
            .field(Field::string("label"))
            .field(Field::boolean("enabled"))
            .build()
            .unwrap(),
    );

    let mut off = Entity::from_pairs(flags.clone(), [("id", "f1"), ("label", "off")]).unwrap();
    off.save(&db).await.unwrap();
    let mut on = Entity::from_pairs(flags.clone(), [("id", "f2"), ("label", "on")])
        .unwrap()
        .with("enabled", true)
        .unwrap();
    on.save(&db).await.unwrap();

    let stored = Entity::find(&db, &flags, "f1").await.unwrap().unwrap();
    assert_eq!(stored.value("enabled").unwrap(), Value::Bool(false));
    let stored = Entity::find(&db, &flags, "f2").await.unwrap().unwrap();
    assert_eq!(stored.value("enabled").unwrap(), Value::Bool(true));
    assert_eq!(stored, on);

    let enabled = Entity::find_all(
        &db,
        &flags,
        &FindOptions::new().filter("enabled = ?", [true]),
    )
    .await
    .unwrap();
    assert_eq!(enabled.len(), 1);
    assert_eq!(enabled[0].value("label").unwrap(), Value::from("on"));
}

#[tokio::test]
async fn failed_save_leaves_record_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let db = open(&dir, |_| {}).await;
    let users = user_schema();

    test_user(&users).save(&db).await.unwrap();

    let mut duplicate = test_user(&users);
    let err = duplicate.save(&db).await.unwrap_err();
    assert!(matches!(err, OrmError::Database(_)), "{err:?}");
    // The default for image was never written into the record
    assert_eq!(duplicate.get("image").unwrap(), None);
    assert_eq!(duplicate, test_user(&users));
}

#[tokio::test]
async fn zero_limit_means_no_limit() {
    let dir = tempfile::tempdir().unwrap();
    let db = open(&dir, |_| {}).await;
    let posts = post_schema();
    seed_posts(&db, 6).await;

    let rows = db.select("select id from posts", &[], Some(0)).await.unwrap();
    assert_eq!(rows.len(), 6);

    let all = Entity::find_all(&db, &posts, &FindOptions::new().limit(Limit::Count(0)))
        .await
        .unwrap();
    assert_eq!(all.len(), 6);
}

#[tokio::test]
async fn configured_write_mode_is_the_default() {
    let dir = tempfile::tempdir().unwrap();
    let db = open(&dir, |cfg| cfg.autocommit = false).await;
    assert!(!db.autocommit());

    let users = user_schema();
    let mut user = test_user(&users);
    assert_eq!(user.save(&db).await.unwrap(), 1);
    assert!(Entity::find(&db, &users, "u1").await.unwrap().is_some());
}

#[tokio::test]
async fn select_limit_caps_rows() {
    let dir = tempfile::tempdir().unwrap();
    let db = open(&dir, |_| {}).await;
    seed_posts(&db, 6).await;

    let rows = db.select("select id from posts", &[], Some(2)).await.unwrap();
    assert_eq!(rows.len(), 2);

    let rows = db
        .select("select id from posts where seq > ?", &[Value::Int(3)], None)
        .await
        .unwrap();
    assert_eq!(rows.len(), 2);
}

#[tokio::test]
async fn driver_errors_propagate() {
    let dir = tempfile::tempdir().unwrap();
    let db = open(&dir, |_| {}).await;

    let err = db.select("select nope from nowhere", &[], None).await.unwrap_err();
    assert!(matches!(err, OrmError::Database(_)));
}

#[tokio::test]
async fn operations_fail_after_shutdown() {
    let dir = tempfile::tempdir().unwrap();
    let db = open(&dir, |_| {}).await;
    db.shutdown().await;

    let err = Entity::find(&db, &user_schema(), "u1").await.unwrap_err();
    assert!(matches!(err, OrmError::PoolClosed));
}
