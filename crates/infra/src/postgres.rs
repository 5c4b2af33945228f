//! Postgres-backed store.
//!
//! ## Error Mapping
//!
//! | PostgreSQL error code | StoreError | Scenario |
//! |---|---|---|
//! | `23505` unique violation | `Conflict` | duplicate tag name/slug, email, username |
//! | `23503` foreign key violation | `Domain(InvalidField)` | unknown tag/ingredient id raced with a delete |
//! | `23514` check violation | `Domain(Validation)` | non-positive amount or cooking time |
//! | anything else | `Backend` | connection failures, pool closed, decode errors |
//!
//! ## Atomicity
//!
//! Recipe create and update run in a single transaction: the recipe row, the
//! clear of both association tables and the bulk insert of the new rows
//! commit together or not at all. Readers never see a recipe without
//! ingredients mid-update.
//!
//! Membership inserts use `ON CONFLICT DO NOTHING`; the unique constraint is
//! the only guard against two concurrent "add" requests, and the request that
//! inserts nothing reports a conflict.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgConnection, PgPool, Postgres, Row, Transaction};
use tracing::instrument;

use larder_core::{DomainError, IngredientId, RecipeId, TagId, UserId};
use larder_recipes::{
    Ingredient, IngredientAmount, MembershipKind, NewIngredient, NewRecipe, NewTag, NewUser,
    PageRequest, Paged, ProfileChanges, Recipe, RecipeChanges, RecipeContent, RecipeImage,
    RecipeIngredient, RecipeQuery, Subscription, Tag, User,
};
use larder_shopping::IngredientRow;

use crate::store::{
    CatalogStore, ImportSummary, MembershipStore, RecipeStore, StoreError, StoreResult, UserStore,
};

const SCHEMA: &str = include_str!("../migrations/0001_schema.sql");

/// Shared filter for recipe listings. `$1` authors, `$2` tag slugs,
/// `$3` favorited-by user, `$4` in-cart-of user.
const RECIPE_FILTER: &str = r#"
    WHERE (cardinality($1::bigint[]) = 0 OR r.author_id = ANY($1))
      AND (cardinality($2::text[]) = 0 OR EXISTS (
            SELECT 1 FROM recipe_tags rt JOIN tags t ON t.id = rt.tag_id
            WHERE rt.recipe_id = r.id AND t.slug = ANY($2)))
      AND ($3::bigint IS NULL OR EXISTS (
            SELECT 1 FROM favorites f WHERE f.recipe_id = r.id AND f.user_id = $3))
      AND ($4::bigint IS NULL OR EXISTS (
            SELECT 1 FROM shopping_cart c WHERE c.recipe_id = r.id AND c.user_id = $4))
"#;

#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Create tables and indexes if they do not exist yet.
    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("migrate", e))?;
        Ok(())
    }

    async fn begin(&self) -> StoreResult<Transaction<'_, Postgres>> {
        self.pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin", e))
    }

    /// Attach tags and ingredients to already-loaded recipe rows.
    async fn hydrate(&self, rows: Vec<RecipeRow>) -> StoreResult<Vec<Recipe>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<i64> = rows.iter().map(|r| r.id.get()).collect();

        let tag_rows = sqlx::query(
            r#"
            SELECT rt.recipe_id, t.id, t.name, t.color, t.slug
            FROM recipe_tags rt
            JOIN tags t ON t.id = rt.tag_id
            WHERE rt.recipe_id = ANY($1)
            ORDER BY t.name ASC
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("load_recipe_tags", e))?;

        let mut tags: HashMap<i64, Vec<Tag>> = HashMap::new();
        for row in &tag_rows {
            let recipe_id: i64 = row.try_get("recipe_id").map_err(decode_error)?;
            tags.entry(recipe_id).or_default().push(tag_from_row(row)?);
        }

        let ingredient_rows = sqlx::query(
            r#"
            SELECT ri.recipe_id, i.id, i.name, i.measurement_unit, ri.amount
            FROM recipe_ingredients ri
            JOIN ingredients i ON i.id = ri.ingredient_id
            WHERE ri.recipe_id = ANY($1)
            ORDER BY ri.id ASC
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("load_recipe_ingredients", e))?;

        let mut ingredients: HashMap<i64, Vec<RecipeIngredient>> = HashMap::new();
        for row in &ingredient_rows {
            let recipe_id: i64 = row.try_get("recipe_id").map_err(decode_error)?;
            let amount: i32 = row.try_get("amount").map_err(decode_error)?;
            ingredients.entry(recipe_id).or_default().push(RecipeIngredient {
                ingredient: ingredient_from_row(row)?,
                amount: column_u32(amount)?,
            });
        }

        Ok(rows
            .into_iter()
            .map(|r| {
                let key = r.id.get();
                Recipe {
                    id: r.id,
                    author: r.author,
                    name: r.content.name,
                    text: r.content.text,
                    cooking_time: r.content.cooking_time,
                    image: r.content.image,
                    pub_date: r.pub_date,
                    tags: tags.remove(&key).unwrap_or_default(),
                    ingredients: ingredients.remove(&key).unwrap_or_default(),
                }
            })
            .collect())
    }
}

struct RecipeRow {
    id: RecipeId,
    author: UserId,
    content: RecipeContent,
    pub_date: DateTime<Utc>,
}

fn recipe_row(row: &PgRow) -> StoreResult<RecipeRow> {
    let cooking_time: i32 = row.try_get("cooking_time").map_err(decode_error)?;
    let image: String = row.try_get("image").map_err(decode_error)?;
    Ok(RecipeRow {
        id: RecipeId::new(row.try_get("id").map_err(decode_error)?),
        author: UserId::new(row.try_get("author_id").map_err(decode_error)?),
        content: RecipeContent {
            name: row.try_get("name").map_err(decode_error)?,
            text: row.try_get("text").map_err(decode_error)?,
            cooking_time: column_u32(cooking_time)?,
            image: RecipeImage::parse(&image)?,
        },
        pub_date: row.try_get("pub_date").map_err(decode_error)?,
    })
}

fn tag_from_row(row: &PgRow) -> StoreResult<Tag> {
    Ok(Tag {
        id: TagId::new(row.try_get("id").map_err(decode_error)?),
        name: row.try_get("name").map_err(decode_error)?,
        color: row.try_get("color").map_err(decode_error)?,
        slug: row.try_get("slug").map_err(decode_error)?,
    })
}

fn ingredient_from_row(row: &PgRow) -> StoreResult<Ingredient> {
    Ok(Ingredient {
        id: IngredientId::new(row.try_get("id").map_err(decode_error)?),
        name: row.try_get("name").map_err(decode_error)?,
        measurement_unit: row.try_get("measurement_unit").map_err(decode_error)?,
    })
}

fn user_from_row(row: &PgRow) -> StoreResult<User> {
    Ok(User {
        id: UserId::new(row.try_get("id").map_err(decode_error)?),
        email: row.try_get("email").map_err(decode_error)?,
        username: row.try_get("username").map_err(decode_error)?,
        first_name: row.try_get("first_name").map_err(decode_error)?,
        last_name: row.try_get("last_name").map_err(decode_error)?,
    })
}

fn column_u32(value: i32) -> StoreResult<u32> {
    u32::try_from(value).map_err(|_| StoreError::backend(format!("negative value {value} in unsigned column")))
}

fn sql_int(field: &str, value: u32) -> StoreResult<i32> {
    i32::try_from(value)
        .map_err(|_| DomainError::invalid_field(field, "value is too large").into())
}

fn count(row: &PgRow) -> StoreResult<u64> {
    let total: i64 = row.try_get("total").map_err(decode_error)?;
    Ok(total.max(0) as u64)
}

fn decode_error(err: sqlx::Error) -> StoreError {
    map_sqlx_error("decode_row", err)
}

fn membership_table(kind: MembershipKind) -> &'static str {
    match kind {
        MembershipKind::Favorite => "favorites",
        MembershipKind::ShoppingCart => "shopping_cart",
    }
}

/// Fail with a field error naming the first id that has no row in `table`.
async fn ensure_all_exist(
    conn: &mut PgConnection,
    table: &'static str,
    field: &'static str,
    ids: &[i64],
) -> StoreResult<()> {
    let sql = format!("SELECT id FROM {table} WHERE id = ANY($1)");
    let rows = sqlx::query(&sql)
        .bind(ids)
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| map_sqlx_error("check_references", e))?;
    let mut found = Vec::with_capacity(rows.len());
    for row in &rows {
        found.push(row.try_get::<i64, _>("id").map_err(decode_error)?);
    }
    match ids.iter().find(|id| !found.contains(*id)) {
        Some(missing) => Err(DomainError::invalid_field(field, format!("unknown id {missing}")).into()),
        None => Ok(()),
    }
}

/// Clear both association sets of a recipe and insert the given ones.
async fn replace_associations(
    conn: &mut PgConnection,
    recipe: RecipeId,
    tags: &[TagId],
    ingredients: &[IngredientAmount],
) -> StoreResult<()> {
    let tag_ids: Vec<i64> = tags.iter().map(|t| t.get()).collect();
    let ingredient_ids: Vec<i64> = ingredients.iter().map(|l| l.ingredient_id.get()).collect();
    let amounts = ingredients
        .iter()
        .map(|l| sql_int("amount", l.amount))
        .collect::<StoreResult<Vec<i32>>>()?;

    ensure_all_exist(conn, "tags", "tags", &tag_ids).await?;
    ensure_all_exist(conn, "ingredients", "ingredients", &ingredient_ids).await?;

    sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = $1")
        .bind(recipe.get())
        .execute(&mut *conn)
        .await
        .map_err(|e| map_sqlx_error("clear_recipe_tags", e))?;
    sqlx::query("DELETE FROM recipe_ingredients WHERE recipe_id = $1")
        .bind(recipe.get())
        .execute(&mut *conn)
        .await
        .map_err(|e| map_sqlx_error("clear_recipe_ingredients", e))?;

    sqlx::query(
        r#"
        INSERT INTO recipe_tags (recipe_id, tag_id)
        SELECT $1, tag_id FROM unnest($2::bigint[]) AS t(tag_id)
        "#,
    )
    .bind(recipe.get())
    .bind(&tag_ids)
    .execute(&mut *conn)
    .await
    .map_err(|e| map_sqlx_error("insert_recipe_tags", e))?;

    sqlx::query(
        r#"
        INSERT INTO recipe_ingredients (recipe_id, ingredient_id, amount)
        SELECT $1, ingredient_id, amount
        FROM unnest($2::bigint[], $3::int[]) WITH ORDINALITY AS t(ingredient_id, amount, position)
        ORDER BY position
        "#,
    )
    .bind(recipe.get())
    .bind(&ingredient_ids)
    .bind(&amounts)
    .execute(&mut *conn)
    .await
    .map_err(|e| map_sqlx_error("insert_recipe_ingredients", e))?;

    Ok(())
}

#[async_trait::async_trait]
impl CatalogStore for PostgresStore {
    #[instrument(skip(self), err)]
    async fn list_tags(&self) -> StoreResult<Vec<Tag>> {
        let rows = sqlx::query("SELECT id, name, color, slug FROM tags ORDER BY name ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_tags", e))?;
        rows.iter().map(tag_from_row).collect()
    }

    #[instrument(skip(self), fields(tag_id = %id), err)]
    async fn get_tag(&self, id: TagId) -> StoreResult<Tag> {
        let row = sqlx::query("SELECT id, name, color, slug FROM tags WHERE id = $1")
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_tag", e))?
            .ok_or_else(|| StoreError::not_found("tag"))?;
        tag_from_row(&row)
    }

    #[instrument(skip(self, tag), fields(slug = %tag.slug), err)]
    async fn create_tag(&self, tag: NewTag) -> StoreResult<Tag> {
        let row = sqlx::query(
            r#"
            INSERT INTO tags (name, color, slug)
            VALUES ($1, $2, $3)
            RETURNING id, name, color, slug
            "#,
        )
        .bind(&tag.name)
        .bind(&tag.color)
        .bind(&tag.slug)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("create_tag", e))?;
        tag_from_row(&row)
    }

    #[instrument(skip(self), err)]
    async fn search_ingredients(&self, prefix: Option<&str>) -> StoreResult<Vec<Ingredient>> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, measurement_unit
            FROM ingredients
            WHERE ($1::text IS NULL OR starts_with(lower(name), lower($1)))
            ORDER BY name ASC, id ASC
            "#,
        )
        .bind(prefix)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("search_ingredients", e))?;
        rows.iter().map(ingredient_from_row).collect()
    }

    #[instrument(skip(self), fields(ingredient_id = %id), err)]
    async fn get_ingredient(&self, id: IngredientId) -> StoreResult<Ingredient> {
        let row = sqlx::query("SELECT id, name, measurement_unit FROM ingredients WHERE id = $1")
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_ingredient", e))?
            .ok_or_else(|| StoreError::not_found("ingredient"))?;
        ingredient_from_row(&row)
    }

    #[instrument(skip(self, ingredient), err)]
    async fn create_ingredient(&self, ingredient: NewIngredient) -> StoreResult<Ingredient> {
        let row = sqlx::query(
            r#"
            INSERT INTO ingredients (name, measurement_unit)
            VALUES ($1, $2)
            RETURNING id, name, measurement_unit
            "#,
        )
        .bind(&ingredient.name)
        .bind(&ingredient.measurement_unit)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("create_ingredient", e))?;
        ingredient_from_row(&row)
    }

    #[instrument(skip(self, rows), fields(rows = rows.len()), err)]
    async fn import_ingredients(&self, rows: Vec<NewIngredient>) -> StoreResult<ImportSummary> {
        let mut tx = self.begin().await?;
        let mut summary = ImportSummary::default();
        for row in rows {
            let inserted = sqlx::query(
                r#"
                INSERT INTO ingredients (name, measurement_unit)
                SELECT $1, $2
                WHERE NOT EXISTS (
                    SELECT 1 FROM ingredients WHERE name = $1 AND measurement_unit = $2
                )
                "#,
            )
            .bind(&row.name)
            .bind(&row.measurement_unit)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("import_ingredient", e))?;
            if inserted.rows_affected() == 0 {
                summary.existing += 1;
            } else {
                summary.created += 1;
            }
        }
        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_import", e))?;
        Ok(summary)
    }
}

#[async_trait::async_trait]
impl UserStore for PostgresStore {
    #[instrument(skip(self, user), err)]
    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        let row = sqlx::query(
            r#"
            INSERT INTO users (email, username, first_name, last_name)
            VALUES ($1, $2, $3, $4)
            RETURNING id, email, username, first_name, last_name
            "#,
        )
        .bind(&user.email)
        .bind(&user.username)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("create_user", e))?;
        user_from_row(&row)
    }

    #[instrument(skip(self), fields(user_id = %id), err)]
    async fn get_user(&self, id: UserId) -> StoreResult<User> {
        let row = sqlx::query(
            "SELECT id, email, username, first_name, last_name FROM users WHERE id = $1",
        )
        .bind(id.get())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_user", e))?
        .ok_or_else(|| StoreError::not_found("user"))?;
        user_from_row(&row)
    }

    #[instrument(skip(self, changes), fields(user_id = %id), err)]
    async fn update_user(&self, id: UserId, changes: ProfileChanges) -> StoreResult<User> {
        let mut tx = self.begin().await?;
        let row = sqlx::query(
            "SELECT id, email, username, first_name, last_name FROM users WHERE id = $1 FOR UPDATE",
        )
        .bind(id.get())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("lock_user", e))?
        .ok_or_else(|| StoreError::not_found("user"))?;
        let updated = changes.apply(&user_from_row(&row)?);

        sqlx::query(
            r#"
            UPDATE users
            SET email = $2, username = $3, first_name = $4, last_name = $5
            WHERE id = $1
            "#,
        )
        .bind(id.get())
        .bind(&updated.email)
        .bind(&updated.username)
        .bind(&updated.first_name)
        .bind(&updated.last_name)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("update_user", e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_update_user", e))?;
        Ok(updated)
    }

    #[instrument(skip(self), err)]
    async fn list_users(&self, page: PageRequest) -> StoreResult<Paged<User>> {
        let total = sqlx::query("SELECT COUNT(*) AS total FROM users")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("count_users", e))?;
        let rows = sqlx::query(
            r#"
            SELECT id, email, username, first_name, last_name
            FROM users
            ORDER BY id ASC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(i64::from(page.limit()))
        .bind(page.offset() as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_users", e))?;
        let users = rows.iter().map(user_from_row).collect::<StoreResult<Vec<_>>>()?;
        Ok(Paged::new(page, count(&total)?, users))
    }

    #[instrument(
        skip(self),
        fields(subscriber = %subscription.subscriber(), author = %subscription.author()),
        err
    )]
    async fn subscribe(&self, subscription: Subscription) -> StoreResult<()> {
        self.get_user(subscription.author()).await?;
        let inserted = sqlx::query(
            r#"
            INSERT INTO subscriptions (subscriber_id, author_id)
            VALUES ($1, $2)
            ON CONFLICT (subscriber_id, author_id) DO NOTHING
            "#,
        )
        .bind(subscription.subscriber().get())
        .bind(subscription.author().get())
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("subscribe", e))?;
        if inserted.rows_affected() == 0 {
            return Err(StoreError::conflict("already subscribed to this author"));
        }
        Ok(())
    }

    #[instrument(
        skip(self),
        fields(subscriber = %subscription.subscriber(), author = %subscription.author()),
        err
    )]
    async fn unsubscribe(&self, subscription: Subscription) -> StoreResult<()> {
        let deleted = sqlx::query(
            "DELETE FROM subscriptions WHERE subscriber_id = $1 AND author_id = $2",
        )
        .bind(subscription.subscriber().get())
        .bind(subscription.author().get())
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("unsubscribe", e))?;
        if deleted.rows_affected() == 0 {
            return Err(StoreError::not_found("subscription"));
        }
        Ok(())
    }

    async fn is_subscribed(&self, subscriber: UserId, author: UserId) -> StoreResult<bool> {
        let row = sqlx::query(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM subscriptions WHERE subscriber_id = $1 AND author_id = $2
            ) AS present
            "#,
        )
        .bind(subscriber.get())
        .bind(author.get())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("is_subscribed", e))?;
        row.try_get("present").map_err(decode_error)
    }

    #[instrument(skip(self), fields(subscriber = %subscriber), err)]
    async fn list_subscriptions(
        &self,
        subscriber: UserId,
        page: PageRequest,
    ) -> StoreResult<Paged<User>> {
        let total = sqlx::query("SELECT COUNT(*) AS total FROM subscriptions WHERE subscriber_id = $1")
            .bind(subscriber.get())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("count_subscriptions", e))?;
        let rows = sqlx::query(
            r#"
            SELECT u.id, u.email, u.username, u.first_name, u.last_name
            FROM subscriptions s
            JOIN users u ON u.id = s.author_id
            WHERE s.subscriber_id = $1
            ORDER BY u.id ASC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(subscriber.get())
        .bind(i64::from(page.limit()))
        .bind(page.offset() as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_subscriptions", e))?;
        let authors = rows.iter().map(user_from_row).collect::<StoreResult<Vec<_>>>()?;
        Ok(Paged::new(page, count(&total)?, authors))
    }
}

#[async_trait::async_trait]
impl RecipeStore for PostgresStore {
    #[instrument(skip(self, recipe), fields(author = %author), err)]
    async fn create_recipe(&self, author: UserId, recipe: NewRecipe) -> StoreResult<Recipe> {
        let mut tx = self.begin().await?;
        let row = sqlx::query(
            r#"
            INSERT INTO recipes (author_id, name, text, cooking_time, image)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(author.get())
        .bind(&recipe.content.name)
        .bind(&recipe.content.text)
        .bind(sql_int("cooking_time", recipe.content.cooking_time)?)
        .bind(recipe.content.image.as_str())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("create_recipe", e))?;
        let id = RecipeId::new(row.try_get("id").map_err(decode_error)?);

        replace_associations(&mut tx, id, &recipe.tags, &recipe.ingredients).await?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_create_recipe", e))?;
        tracing::info!(recipe_id = %id, "recipe created");
        self.get_recipe(id).await
    }

    #[instrument(skip(self, changes), fields(recipe_id = %id), err)]
    async fn update_recipe(&self, id: RecipeId, changes: RecipeChanges) -> StoreResult<Recipe> {
        let mut tx = self.begin().await?;
        let row = sqlx::query(
            r#"
            SELECT id, author_id, name, text, cooking_time, image, pub_date
            FROM recipes
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id.get())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("lock_recipe", e))?
        .ok_or_else(|| StoreError::not_found("recipe"))?;
        let content = changes.apply(&recipe_row(&row)?.content);

        sqlx::query(
            r#"
            UPDATE recipes
            SET name = $2, text = $3, cooking_time = $4, image = $5
            WHERE id = $1
            "#,
        )
        .bind(id.get())
        .bind(&content.name)
        .bind(&content.text)
        .bind(sql_int("cooking_time", content.cooking_time)?)
        .bind(content.image.as_str())
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("update_recipe", e))?;

        replace_associations(&mut tx, id, &changes.tags, &changes.ingredients).await?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_update_recipe", e))?;
        self.get_recipe(id).await
    }

    #[instrument(skip(self), fields(recipe_id = %id), err)]
    async fn delete_recipe(&self, id: RecipeId) -> StoreResult<()> {
        let deleted = sqlx::query("DELETE FROM recipes WHERE id = $1")
            .bind(id.get())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_recipe", e))?;
        if deleted.rows_affected() == 0 {
            return Err(StoreError::not_found("recipe"));
        }
        Ok(())
    }

    #[instrument(skip(self), fields(recipe_id = %id), err)]
    async fn get_recipe(&self, id: RecipeId) -> StoreResult<Recipe> {
        let row = sqlx::query(
            r#"
            SELECT id, author_id, name, text, cooking_time, image, pub_date
            FROM recipes
            WHERE id = $1
            "#,
        )
        .bind(id.get())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_recipe", e))?
        .ok_or_else(|| StoreError::not_found("recipe"))?;
        let mut recipes = self.hydrate(vec![recipe_row(&row)?]).await?;
        recipes.pop().ok_or_else(|| StoreError::not_found("recipe"))
    }

    #[instrument(skip(self, query), err)]
    async fn list_recipes(&self, query: &RecipeQuery, page: PageRequest) -> StoreResult<Paged<Recipe>> {
        let authors: Vec<i64> = query.authors.iter().map(|a| a.get()).collect();
        let favorited_by = query.favorited_by.map(UserId::get);
        let in_cart_of = query.in_cart_of.map(UserId::get);

        let count_sql = format!("SELECT COUNT(*) AS total FROM recipes r {RECIPE_FILTER}");
        let total = sqlx::query(&count_sql)
            .bind(&authors)
            .bind(&query.tags)
            .bind(favorited_by)
            .bind(in_cart_of)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("count_recipes", e))?;

        let list_sql = format!(
            r#"
            SELECT r.id, r.author_id, r.name, r.text, r.cooking_time, r.image, r.pub_date
            FROM recipes r
            {RECIPE_FILTER}
            ORDER BY r.pub_date DESC, r.id DESC
            LIMIT $5 OFFSET $6
            "#
        );
        let rows = sqlx::query(&list_sql)
            .bind(&authors)
            .bind(&query.tags)
            .bind(favorited_by)
            .bind(in_cart_of)
            .bind(i64::from(page.limit()))
            .bind(page.offset() as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_recipes", e))?;

        let recipe_rows = rows.iter().map(recipe_row).collect::<StoreResult<Vec<_>>>()?;
        let recipes = self.hydrate(recipe_rows).await?;
        Ok(Paged::new(page, count(&total)?, recipes))
    }

    async fn count_recipes_by(&self, author: UserId) -> StoreResult<u64> {
        let row = sqlx::query("SELECT COUNT(*) AS total FROM recipes WHERE author_id = $1")
            .bind(author.get())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("count_recipes_by", e))?;
        count(&row)
    }
}

#[async_trait::async_trait]
impl MembershipStore for PostgresStore {
    #[instrument(skip(self), fields(kind = %kind, user = %user, recipe = %recipe), err)]
    async fn add_membership(
        &self,
        kind: MembershipKind,
        user: UserId,
        recipe: RecipeId,
    ) -> StoreResult<()> {
        let exists = sqlx::query("SELECT 1 AS one FROM recipes WHERE id = $1")
            .bind(recipe.get())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_recipe", e))?;
        if exists.is_none() {
            return Err(StoreError::not_found("recipe"));
        }

        let sql = format!(
            "INSERT INTO {} (user_id, recipe_id) VALUES ($1, $2) ON CONFLICT (user_id, recipe_id) DO NOTHING",
            membership_table(kind)
        );
        let inserted = sqlx::query(&sql)
            .bind(user.get())
            .bind(recipe.get())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("add_membership", e))?;
        if inserted.rows_affected() == 0 {
            return Err(kind.already_present().into());
        }
        Ok(())
    }

    #[instrument(skip(self), fields(kind = %kind, user = %user, recipe = %recipe), err)]
    async fn remove_membership(
        &self,
        kind: MembershipKind,
        user: UserId,
        recipe: RecipeId,
    ) -> StoreResult<()> {
        let sql = format!(
            "DELETE FROM {} WHERE user_id = $1 AND recipe_id = $2",
            membership_table(kind)
        );
        let deleted = sqlx::query(&sql)
            .bind(user.get())
            .bind(recipe.get())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("remove_membership", e))?;
        if deleted.rows_affected() == 0 {
            return Err(kind.absent().into());
        }
        Ok(())
    }

    async fn has_membership(
        &self,
        kind: MembershipKind,
        user: UserId,
        recipe: RecipeId,
    ) -> StoreResult<bool> {
        let sql = format!(
            "SELECT EXISTS (SELECT 1 FROM {} WHERE user_id = $1 AND recipe_id = $2) AS present",
            membership_table(kind)
        );
        let row = sqlx::query(&sql)
            .bind(user.get())
            .bind(recipe.get())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("has_membership", e))?;
        row.try_get("present").map_err(decode_error)
    }

    #[instrument(skip(self), fields(user = %user), err)]
    async fn cart_ingredient_rows(&self, user: UserId) -> StoreResult<Vec<IngredientRow>> {
        let rows = sqlx::query(
            r#"
            SELECT i.name, i.measurement_unit, ri.amount
            FROM shopping_cart c
            JOIN recipe_ingredients ri ON ri.recipe_id = c.recipe_id
            JOIN ingredients i ON i.id = ri.ingredient_id
            WHERE c.user_id = $1
            "#,
        )
        .bind(user.get())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("cart_ingredient_rows", e))?;

        let mut out = Vec::with_capacity(rows.len());
        for row in &rows {
            let amount: i32 = row.try_get("amount").map_err(decode_error)?;
            out.push(IngredientRow::new(
                row.try_get::<String, _>("name").map_err(decode_error)?,
                row.try_get::<String, _>("measurement_unit").map_err(decode_error)?,
                column_u32(amount)?,
            ));
        }
        Ok(out)
    }
}

/// Map sqlx errors to `StoreError`, keeping the failed operation in the message.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let constraint = db_err.constraint().unwrap_or_default().to_string();
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => StoreError::Conflict(unique_violation_message(&constraint)),
                Some("23503") => {
                    let field = if constraint.contains("tag") {
                        "tags"
                    } else if constraint.contains("ingredient") {
                        "ingredients"
                    } else {
                        "reference"
                    };
                    DomainError::invalid_field(field, "references a record that does not exist").into()
                }
                Some("23514") => DomainError::validation(msg).into(),
                _ => StoreError::Backend(msg),
            }
        }
        sqlx::Error::RowNotFound => StoreError::not_found(operation.to_string()),
        sqlx::Error::PoolClosed => {
            StoreError::Backend(format!("connection pool closed in {}", operation))
        }
        _ => StoreError::Backend(format!("sqlx error in {}: {}", operation, err)),
    }
}

fn unique_violation_message(constraint: &str) -> String {
    match constraint {
        "users_email_key" => "a user with this email already exists".to_string(),
        "users_username_key" => "a user with this username already exists".to_string(),
        "tags_name_key" => "a tag with this name already exists".to_string(),
        "tags_slug_key" => "a tag with this slug already exists".to_string(),
        "unique_recipe_ingredient" => "ingredient is listed twice".to_string(),
        other => format!("unique constraint {other} violated"),
    }
}
