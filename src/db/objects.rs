//! SQLite implementation of [`ObjectStore`].

use super::{Database, FieldMap, ObjectStore, StoreError};
use async_trait::async_trait;

#[async_trait]
impl ObjectStore for Database {
    async fn set_object(&self, key: &str, fields: &FieldMap) -> Result<(), StoreError> {
        self.set_objects(&[key], fields).await
    }

    async fn get_object(&self, key: &str) -> Result<Option<FieldMap>, StoreError> {
        let rows = sqlx::query_as::<_, (String, String)>(
            "SELECT field, value FROM objects WHERE key = ?",
        )
        .bind(key)
        .fetch_all(self.pool())
        .await?;

        if rows.is_empty() {
            return Ok(None);
        }
        Ok(Some(rows.into_iter().collect()))
    }

    async fn set_objects(&self, keys: &[&str], fields: &FieldMap) -> Result<(), StoreError> {
        if keys.is_empty() || fields.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool().begin().await?;
        for key in keys {
            for (field, value) in fields {
                sqlx::query(
                    r#"
                    INSERT INTO objects (key, field, value)
                    VALUES (?, ?, ?)
                    ON CONFLICT(key, field) DO UPDATE SET value = excluded.value
                    "#,
                )
                .bind(*key)
                .bind(field.as_str())
                .bind(value.as_str())
                .execute(&mut *tx)
                .await?;
            }
        }
        tx.commit().await?;

        Ok(())
    }

    async fn get_objects_fields(
        &self,
        keys: &[&str],
        fields: &[&str],
    ) -> Result<Vec<FieldMap>, StoreError> {
        let mut result = Vec::with_capacity(keys.len());
        for key in keys {
            let object = self.get_object(key).await?.unwrap_or_default();
            result.push(
                object
                    .into_iter()
                    .filter(|(field, _)| fields.contains(&field.as_str()))
                    .collect(),
            );
        }
        Ok(result)
    }
}
