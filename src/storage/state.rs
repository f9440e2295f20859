use super::schema::Database;
use super::types::{DatabaseError, StoredState};
use crate::feed::FeedRuntimeState;

impl Database {
    // ========================================================================
    // Feed State Operations
    // ========================================================================

    /// Load the runtime state of `name`. A feed that never ran gets a fresh
    /// empty state.
    pub async fn load_state(&self, name: &str) -> Result<FeedRuntimeState, DatabaseError> {
        let row: Option<(String,)> = sqlx::query_as("SELECT state FROM feed_state WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(DatabaseError::from_sqlx)?;

        match row {
            Some((raw,)) => {
                let mut state =
                    FeedRuntimeState::decode(&raw).map_err(|source| DatabaseError::State {
                        feed: name.to_string(),
                        source,
                    })?;
                state.name = name.to_string();
                Ok(state)
            }
            None => {
                tracing::debug!(feed = %name, "No stored state, starting fresh");
                Ok(FeedRuntimeState::new(name))
            }
        }
    }

    /// Persist the runtime state in one transaction (upsert).
    pub async fn save_state(&self, state: &FeedRuntimeState) -> Result<(), DatabaseError> {
        let raw = state.encode().map_err(|source| DatabaseError::State {
            feed: state.name.clone(),
            source,
        })?;
        let now = chrono::Utc::now().timestamp();

        let mut tx = self.pool.begin().await.map_err(DatabaseError::from_sqlx)?;
        sqlx::query(
            r#"
            INSERT INTO feed_state (name, state, updated_at) VALUES (?, ?, ?)
            ON CONFLICT(name) DO UPDATE SET state = excluded.state, updated_at = excluded.updated_at
            "#,
        )
        .bind(&state.name)
        .bind(&raw)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(DatabaseError::from_sqlx)?;
        tx.commit().await.map_err(DatabaseError::from_sqlx)?;

        tracing::debug!(feed = %state.name, seen = state.seen.len(), "Saved feed state");
        Ok(())
    }

    /// Forget a feed's state. Returns whether a row existed.
    pub async fn delete_state(&self, name: &str) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM feed_state WHERE name = ?")
            .bind(name)
            .execute(&self.pool)
            .await
            .map_err(DatabaseError::from_sqlx)?;
        Ok(result.rows_affected() > 0)
    }

    /// All stored states, ordered by feed name.
    pub async fn list_states(&self) -> Result<Vec<StoredState>, DatabaseError> {
        let rows: Vec<(String, i64)> =
            sqlx::query_as("SELECT name, updated_at FROM feed_state ORDER BY name")
                .fetch_all(&self.pool)
                .await
                .map_err(DatabaseError::from_sqlx)?;

        Ok(rows
            .into_iter()
            .map(|(name, updated_at)| StoredState { name, updated_at })
            .collect())
    }
}
