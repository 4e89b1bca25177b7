//! SQLite implementation of [`SortedSetStore`].

use super::{Database, SortedSetStore, StoreError, range_window};
use async_trait::async_trait;

#[async_trait]
impl SortedSetStore for Database {
    async fn sorted_set_add(
        &self,
        key: &str,
        score: i64,
        member: &str,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO sorted_sets (key, member, score)
            VALUES (?, ?, ?)
            ON CONFLICT(key, member) DO UPDATE SET score = excluded.score
            "#,
        )
        .bind(key)
        .bind(member)
        .bind(score)
        .execute(self.pool())
        .await?;

        Ok(())
    }

    async fn sorted_set_remove(&self, keys: &[&str], members: &[&str]) -> Result<(), StoreError> {
        if keys.is_empty() || members.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool().begin().await?;
        for key in keys {
            for member in members {
                sqlx::query("DELETE FROM sorted_sets WHERE key = ? AND member = ?")
                    .bind(*key)
                    .bind(*member)
                    .execute(&mut *tx)
                    .await?;
            }
        }
        tx.commit().await?;

        Ok(())
    }

    async fn rev_range(
        &self,
        key: &str,
        start: i64,
        stop: i64,
    ) -> Result<Vec<String>, StoreError> {
        let Some((offset, count)) = range_window(start, stop) else {
            return Ok(Vec::new());
        };
        // SQLite treats a negative LIMIT as "no limit".
        let limit = count
            .and_then(|count| i64::try_from(count).ok())
            .unwrap_or(-1);
        let offset = i64::try_from(offset).unwrap_or(i64::MAX);

        let members = sqlx::query_scalar::<_, String>(
            r#"
            SELECT member
            FROM sorted_sets
            WHERE key = ?
            ORDER BY score DESC, member DESC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(key)
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool())
        .await?;

        Ok(members)
    }

    async fn range_by_score(
        &self,
        key: &str,
        min: i64,
        max: i64,
        limit: usize,
    ) -> Result<Vec<String>, StoreError> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let members = sqlx::query_scalar::<_, String>(
            r#"
            SELECT member
            FROM sorted_sets
            WHERE key = ? AND score >= ? AND score <= ?
            ORDER BY score ASC, member ASC
            LIMIT ?
            "#,
        )
        .bind(key)
        .bind(min)
        .bind(max)
        .bind(i64::try_from(limit).unwrap_or(-1))
        .fetch_all(self.pool())
        .await?;

        Ok(members)
    }
}
