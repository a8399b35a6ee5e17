use crate::Database;

const CREATE_POSTS: &str = r#"
	CREATE TABLE IF NOT EXISTS posts (
		id SERIAL PRIMARY KEY,
		title VARCHAR(255) NOT NULL,
		content TEXT,
		author_id INT,
		created_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP
	)
"#;

/// Creates the `posts` table if it does not exist yet. Safe to run on every startup.
pub async fn ensure_schema(database: &Database) -> Result<(), sqlx::Error> {
	sqlx::query(CREATE_POSTS).execute(database).await?;

	tracing::info!("ensured table 'posts' exists");

	Ok(())
}
