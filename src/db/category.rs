use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqlitePool;

/// Whether a category tracks money coming in or going out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryKind {
    Income,
    Expense,
}

impl CategoryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CategoryKind::Income => "income",
            CategoryKind::Expense => "expense",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "income" => CategoryKind::Income,
            _ => CategoryKind::Expense,
        }
    }
}

/// A transaction category. Global categories have no owner and are
/// visible to every user but cannot be changed by them.
#[derive(Debug, Clone, Serialize)]
pub struct Category {
    pub id: i64,
    pub user_id: Option<i64>,
    pub name: String,
    pub kind: CategoryKind,
    pub icon: Option<String>,
    pub usage_count: i64,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(sqlx::FromRow)]
struct CategoryRow {
    id: i64,
    user_id: Option<i64>,
    name: String,
    kind: String,
    icon: Option<String>,
    usage_count: i64,
    created_at: String,
    updated_at: String,
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            name: row.name,
            kind: CategoryKind::from_str(&row.kind),
            icon: row.icon,
            usage_count: row.usage_count,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Clone)]
pub struct CategoryStore {
    pool: SqlitePool,
}

impl CategoryStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        user_id: i64,
        name: &str,
        kind: CategoryKind,
        icon: Option<&str>,
    ) -> Result<i64, sqlx::Error> {
        let result =
            sqlx::query("INSERT INTO categories (user_id, name, kind, icon) VALUES (?, ?, ?, ?)")
                .bind(user_id)
                .bind(name)
                .bind(kind.as_str())
                .bind(icon)
                .execute(&self.pool)
                .await?;

        Ok(result.last_insert_rowid())
    }

    /// The user's own categories plus the global ones. Own categories come
    /// first, then by usage and name.
    pub async fn list_for_user(&self, user_id: i64) -> Result<Vec<Category>, sqlx::Error> {
        let rows = sqlx::query_as::<_, CategoryRow>(
            "SELECT id, user_id, name, kind, icon, usage_count, created_at, updated_at
             FROM categories WHERE user_id = ? OR user_id IS NULL
             ORDER BY user_id IS NULL, usage_count DESC, name ASC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Category::from).collect())
    }

    /// Get a category visible to the user.
    pub async fn get_for_user(
        &self,
        user_id: i64,
        id: i64,
    ) -> Result<Option<Category>, sqlx::Error> {
        let row = sqlx::query_as::<_, CategoryRow>(
            "SELECT id, user_id, name, kind, icon, usage_count, created_at, updated_at
             FROM categories WHERE id = ? AND (user_id = ? OR user_id IS NULL)",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Category::from))
    }

    /// Update name and/or icon of one of the user's own categories.
    /// Returns false if the category does not exist or is not owned by the user.
    pub async fn update(
        &self,
        user_id: i64,
        id: i64,
        name: Option<&str>,
        icon: Option<&str>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE categories
             SET name = COALESCE(?, name), icon = COALESCE(?, icon), updated_at = datetime('now')
             WHERE id = ? AND user_id = ?",
        )
        .bind(name)
        .bind(icon)
        .bind(id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete one of the user's own categories.
    pub async fn delete(&self, user_id: i64, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM categories WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    #[tokio::test]
    async fn test_own_categories_listed_first() {
        let db = Database::open(":memory:").await.unwrap();
        let user_id = db.users().create("a@example.com", "hash").await.unwrap();
        let store = db.categories();

        let id = store
            .create(user_id, "Rent", CategoryKind::Expense, Some("house"))
            .await
            .unwrap();

        let categories = store.list_for_user(user_id).await.unwrap();
        assert_eq!(categories[0].id, id);
        assert_eq!(categories[0].icon.as_deref(), Some("house"));
        assert!(categories.len() > 1);
    }

    #[tokio::test]
    async fn test_other_users_categories_hidden() {
        let db = Database::open(":memory:").await.unwrap();
        let alice = db.users().create("a@example.com", "hash").await.unwrap();
        let bob = db.users().create("b@example.com", "hash").await.unwrap();
        let store = db.categories();

        let id = store
            .create(alice, "Rent", CategoryKind::Expense, None)
            .await
            .unwrap();

        assert!(store.get_for_user(bob, id).await.unwrap().is_none());
        assert!(!store.update(bob, id, Some("Mine"), None).await.unwrap());
        assert!(!store.delete(bob, id).await.unwrap());
        assert!(store.list_for_user(bob).await.unwrap().iter().all(|c| c.id != id));
    }

    #[tokio::test]
    async fn test_update_keeps_unset_fields() {
        let db = Database::open(":memory:").await.unwrap();
        let user_id = db.users().create("a@example.com", "hash").await.unwrap();
        let store = db.categories();
        let id = store
            .create(user_id, "Rent", CategoryKind::Expense, Some("house"))
            .await
            .unwrap();

        assert!(store.update(user_id, id, Some("Housing"), None).await.unwrap());

        let category = store.get_for_user(user_id, id).await.unwrap().unwrap();
        assert_eq!(category.name, "Housing");
        assert_eq!(category.icon.as_deref(), Some("house"));
        assert_eq!(category.kind, CategoryKind::Expense);
    }

    #[tokio::test]
    async fn test_global_categories_are_read_only() {
        let db = Database::open(":memory:").await.unwrap();
        let user_id = db.users().create("a@example.com", "hash").await.unwrap();
        let store = db.categories();

        let global = store.list_for_user(user_id).await.unwrap()[0].clone();
        assert!(global.user_id.is_none());

        assert!(!store.update(user_id, global.id, Some("X"), None).await.unwrap());
        assert!(!store.delete(user_id, global.id).await.unwrap());
        assert!(store.get_for_user(user_id, global.id).await.unwrap().is_some());
    }
}
