pub mod entity;

use std::sync::Once;

use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Schema, Set};
use time::OffsetDateTime;

static TRACING: Once = Once::new();

fn init_tracing() {
    TRACING.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init()
            .ok();
    });
}

/// Fresh database for one test: connects to `sqlite::memory:` (unless
/// TEST_DATABASE_URL overrides it) and creates the test tables.
pub async fn setup() -> DatabaseConnection {
    init_tracing();
    dotenvy::dotenv().ok();

    let url =
        std::env::var("TEST_DATABASE_URL").unwrap_or_else(|_| "sqlite::memory:".to_string());

    // a single connection keeps every statement on the same in-memory database
    let mut options = ConnectOptions::new(url);
    options.max_connections(1).min_connections(1);

    let db = Database::connect(options)
        .await
        .expect("Failed to connect to test database");

    let backend = db.get_database_backend();
    let schema = Schema::new(backend);
    for statement in [
        schema.create_table_from_entity(entity::user::Entity),
        schema.create_table_from_entity(entity::profile::Entity),
        schema.create_table_from_entity(entity::post::Entity),
    ] {
        db.execute(backend.build(&statement))
            .await
            .expect("Failed to create test table");
    }

    db
}

/// New user row ready for insertion.
#[allow(dead_code)]
pub fn user_record(name: &str, email: &str) -> entity::user::ActiveModel {
    entity::user::ActiveModel {
        name: Set(name.to_string()),
        email: Set(email.to_string()),
        created_at: Set(OffsetDateTime::now_utc()),
        ..Default::default()
    }
}
