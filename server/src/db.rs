use sqlx::{
    migrate::MigrateDatabase,
    sqlite::{Sqlite, SqlitePoolOptions},
    Pool,
};

pub type DbPool = Pool<Sqlite>;

pub fn is_in_memory(url: &str) -> bool {
    url.ends_with(":memory:")
}

pub async fn ensure_database_file(url: &str) -> Result<(), sqlx::Error> {
    if is_in_memory(url) {
        return Ok(());
    }

    let exists = Sqlite::database_exists(url).await?;

    if !exists {
        Sqlite::create_database(url).await?;
    }

    Ok(())
}

/// Opens the pool and creates the envelope and membership tables.
///
/// An in-memory database only lives as long as its connection, so it is kept
/// on a single connection that is never recycled.
pub async fn init_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    ensure_database_file(database_url).await?;

    let options = if is_in_memory(database_url) {
        SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        SqlitePoolOptions::new()
    };
    let pool = options.connect(database_url).await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS envelopes (
            ordinal INTEGER PRIMARY KEY AUTOINCREMENT,
            session TEXT NOT NULL,
            source INTEGER NOT NULL,
            dest INTEGER NOT NULL,
            tag INTEGER NOT NULL,
            seq INTEGER NOT NULL,
            payload BLOB NOT NULL,
            timestamp INTEGER NOT NULL DEFAULT (strftime('%s', 'now') * 1000)
        )
        "#,
    )
    .execute(&pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS envelopes_by_dest ON envelopes (session, dest, ordinal)",
    )
    .execute(&pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS members (
            session TEXT NOT NULL,
            rank INTEGER NOT NULL,
            joined INTEGER NOT NULL DEFAULT (strftime('%s', 'now') * 1000),
            PRIMARY KEY (session, rank)
        )
        "#,
    )
    .execute(&pool)
    .await?;

    Ok(pool)
}
