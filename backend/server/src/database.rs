//! # Redis
//!
//! Document store for recipes and the category registry.
//!
//! ## Requirements
//!
//! - Category values are unique per category kind
//! - View counts increment atomically, one per detail view
//! - Browsing is ordered by view count, most viewed first
//! - Small dataset, a whole filtered listing fits in one request
//!
//! ## Implementation
//!
//! Every key is prefixed with `DATABASE_NAME`, so several catalogs can share one server.
//!
//! - `{db}:categories:{kind}`: Redis set, `SADD` gives set-union semantics for free
//! - `{db}:recipes`: Redis hash, recipe id to JSON document (its `views` field is ignored on read)
//! - `{db}:views`: Redis sorted set, recipe id scored by view count
//!
//! The sorted set is the source of truth for both the view count and the listing order.
//! `ZINCRBY` keeps increments atomic and `ZREVRANGE` hands back ids already sorted.
//! Writes touching both keys go through `MULTI`/`EXEC` pipelines. Writes that only apply to an
//! existing recipe run as Lua scripts, so the existence check and the write cannot be split by
//! a concurrent delete.
use std::{sync::LazyLock, time::Duration};

use async_trait::async_trait;
use redis::{
    AsyncCommands, Client, Script,
    aio::{ConnectionManager, ConnectionManagerConfig},
};
use tracing::debug;

use crate::{
    error::AppError,
    models::{CategoryKind, Recipe, RecipeId},
    search::RecipeFilter,
    store::RecipeStore,
};

pub async fn init_redis(redis_url: &str) -> Result<ConnectionManager, AppError> {
    let config = ConnectionManagerConfig::new()
        .set_number_of_retries(1)
        .set_connection_timeout(Duration::from_millis(100));

    let client = Client::open(redis_url)?;
    let connection_manager = client.get_connection_manager_with_config(config).await?;

    Ok(connection_manager)
}

// KEYS: recipes hash, views sorted set. ARGV: id, document, views.
const REPLACE_SOURCE: &str = r"
if redis.call('HEXISTS', KEYS[1], ARGV[1]) == 1 then
    redis.call('HSET', KEYS[1], ARGV[1], ARGV[2])
    redis.call('ZADD', KEYS[2], ARGV[3], ARGV[1])
    return 1
end
return 0
";

// KEYS: recipes hash, views sorted set. ARGV: id. Nil for an unknown id.
const INCREMENT_SOURCE: &str = r"
if redis.call('HEXISTS', KEYS[1], ARGV[1]) == 1 then
    return redis.call('ZINCRBY', KEYS[2], 1, ARGV[1])
end
return false
";

static REPLACE_SCRIPT: LazyLock<Script> = LazyLock::new(|| Script::new(REPLACE_SOURCE));
static INCREMENT_SCRIPT: LazyLock<Script> = LazyLock::new(|| Script::new(INCREMENT_SOURCE));

pub struct RedisStore {
    connection: ConnectionManager,
    namespace: String,
}

impl RedisStore {
    pub fn new(connection: ConnectionManager, database_name: &str) -> Self {
        Self {
            connection,
            namespace: database_name.to_string(),
        }
    }

    fn category_key(&self, kind: CategoryKind) -> String {
        format!("{}:categories:{}", self.namespace, kind.as_str())
    }

    fn recipes_key(&self) -> String {
        format!("{}:recipes", self.namespace)
    }

    fn views_key(&self) -> String {
        format!("{}:views", self.namespace)
    }

    async fn load(&self, id: &str, document: &str) -> Result<Recipe, AppError> {
        let mut connection = self.connection.clone();
        let views: Option<f64> = connection.zscore(self.views_key(), id).await?;

        decode(document, views)
    }
}

fn decode(document: &str, views: Option<f64>) -> Result<Recipe, AppError> {
    let mut recipe: Recipe = serde_json::from_str(document)?;
    recipe.views = views.map(score_to_views).unwrap_or(0);

    Ok(recipe)
}

fn score_to_views(score: f64) -> u64 {
    if score.is_sign_negative() {
        0
    } else {
        score as u64
    }
}

#[async_trait]
impl RecipeStore for RedisStore {
    async fn categories(&self, kind: CategoryKind) -> Result<Vec<String>, AppError> {
        let mut connection = self.connection.clone();
        let mut values: Vec<String> = connection.smembers(self.category_key(kind)).await?;
        values.sort();

        Ok(values)
    }

    async fn add_category(&self, kind: CategoryKind, value: &str) -> Result<bool, AppError> {
        let mut connection = self.connection.clone();
        let added: i64 = connection.sadd(self.category_key(kind), value).await?;

        Ok(added > 0)
    }

    async fn insert_recipe(&self, recipe: Recipe) -> Result<RecipeId, AppError> {
        let mut connection = self.connection.clone();
        let id = RecipeId::generate();
        let document = serde_json::to_string(&recipe)?;

        let () = redis::pipe()
            .atomic()
            .hset(self.recipes_key(), id.to_string(), document)
            .ignore()
            .zadd(self.views_key(), id.to_string(), recipe.views)
            .ignore()
            .query_async(&mut connection)
            .await?;

        Ok(id)
    }

    async fn get_recipe(&self, id: RecipeId) -> Result<Option<Recipe>, AppError> {
        let mut connection = self.connection.clone();
        let key = id.to_string();
        let document: Option<String> = connection.hget(self.recipes_key(), &key).await?;

        match document {
            Some(document) => Ok(Some(self.load(&key, &document).await?)),
            None => Ok(None),
        }
    }

    async fn replace_recipe(&self, id: RecipeId, recipe: Recipe) -> Result<bool, AppError> {
        let mut connection = self.connection.clone();
        let key = id.to_string();

        let document = serde_json::to_string(&recipe)?;

        let replaced: bool = REPLACE_SCRIPT
            .key(self.recipes_key())
            .key(self.views_key())
            .arg(&key)
            .arg(document)
            .arg(recipe.views)
            .invoke_async(&mut connection)
            .await?;

        Ok(replaced)
    }

    async fn delete_recipe(&self, id: RecipeId) -> Result<bool, AppError> {
        let mut connection = self.connection.clone();
        let key = id.to_string();

        let (removed, _): (i64, i64) = redis::pipe()
            .atomic()
            .hdel(self.recipes_key(), &key)
            .zrem(self.views_key(), &key)
            .query_async(&mut connection)
            .await?;

        Ok(removed > 0)
    }

    async fn increment_views(&self, id: RecipeId) -> Result<Option<u64>, AppError> {
        let mut connection = self.connection.clone();
        let key = id.to_string();

        let views: Option<f64> = INCREMENT_SCRIPT
            .key(self.recipes_key())
            .key(self.views_key())
            .arg(&key)
            .invoke_async(&mut connection)
            .await?;

        Ok(views.map(score_to_views))
    }

    async fn find_recipes(
        &self,
        filter: &RecipeFilter,
    ) -> Result<Vec<(RecipeId, Recipe)>, AppError> {
        let mut connection = self.connection.clone();
        let ranked: Vec<(String, f64)> = connection
            .zrevrange_withscores(self.views_key(), 0, -1)
            .await?;

        if ranked.is_empty() {
            return Ok(Vec::new());
        }

        let keys: Vec<&str> = ranked.iter().map(|(key, _)| key.as_str()).collect();
        let documents: Vec<Option<String>> = redis::cmd("HMGET")
            .arg(self.recipes_key())
            .arg(&keys)
            .query_async(&mut connection)
            .await?;

        let mut found = Vec::new();
        for ((key, score), document) in ranked.iter().zip(documents) {
            // deleted between the two reads
            let Some(document) = document else {
                continue;
            };

            let recipe = decode(&document, Some(*score))?;
            if filter.matches(&recipe) {
                found.push((RecipeId::parse(key)?, recipe));
            }
        }

        debug!("Found {} of {} recipes", found.len(), ranked.len());

        Ok(found)
    }
}
