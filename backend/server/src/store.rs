//! # Recipe Storage
//!
//! Everything the catalog persists goes through [`RecipeStore`]:
//! - Category registry: one set of distinct lowercase values per [`CategoryKind`]
//! - Recipes: one document per [`RecipeId`], view counts kept alongside
//!
//! [`crate::database::RedisStore`] is the deployed backend. [`MemoryStore`] keeps the
//! same contract in-process and backs `DATABASE_URL=memory://` and the tests.
use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{
    error::AppError,
    models::{CategoryKind, Recipe, RecipeId},
    search::RecipeFilter,
};

#[async_trait]
pub trait RecipeStore: Send + Sync {
    /// Sorted values of one category record.
    async fn categories(&self, kind: CategoryKind) -> Result<Vec<String>, AppError>;

    /// Set-union insert. Returns true when the value was not present yet.
    async fn add_category(&self, kind: CategoryKind, value: &str) -> Result<bool, AppError>;

    async fn insert_recipe(&self, recipe: Recipe) -> Result<RecipeId, AppError>;

    async fn get_recipe(&self, id: RecipeId) -> Result<Option<Recipe>, AppError>;

    /// Full overwrite, view count included. Returns false when the id is unknown.
    /// The existence check and the write are one atomic step, so a deleted recipe stays deleted.
    async fn replace_recipe(&self, id: RecipeId, recipe: Recipe) -> Result<bool, AppError>;

    /// Returns false when the id is unknown; that is not an error.
    async fn delete_recipe(&self, id: RecipeId) -> Result<bool, AppError>;

    /// Adds exactly one view and returns the new count, or `None` once the recipe is gone.
    async fn increment_views(&self, id: RecipeId) -> Result<Option<u64>, AppError>;

    /// All matching recipes, most viewed first.
    async fn find_recipes(&self, filter: &RecipeFilter)
    -> Result<Vec<(RecipeId, Recipe)>, AppError>;
}

struct StoredRecipe {
    sequence: u64,
    recipe: Recipe,
}

#[derive(Default)]
struct MemoryInner {
    categories: HashMap<CategoryKind, BTreeSet<String>>,
    recipes: HashMap<RecipeId, StoredRecipe>,
    next_sequence: u64,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<MemoryInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecipeStore for MemoryStore {
    async fn categories(&self, kind: CategoryKind) -> Result<Vec<String>, AppError> {
        let inner = self.inner.read().await;

        Ok(inner
            .categories
            .get(&kind)
            .map(|values| values.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn add_category(&self, kind: CategoryKind, value: &str) -> Result<bool, AppError> {
        let mut inner = self.inner.write().await;

        Ok(inner
            .categories
            .entry(kind)
            .or_default()
            .insert(value.to_string()))
    }

    async fn insert_recipe(&self, recipe: Recipe) -> Result<RecipeId, AppError> {
        let mut inner = self.inner.write().await;

        let id = RecipeId::generate();
        let sequence = inner.next_sequence;
        inner.next_sequence += 1;
        inner.recipes.insert(id, StoredRecipe { sequence, recipe });

        Ok(id)
    }

    async fn get_recipe(&self, id: RecipeId) -> Result<Option<Recipe>, AppError> {
        let inner = self.inner.read().await;

        Ok(inner.recipes.get(&id).map(|stored| stored.recipe.clone()))
    }

    async fn replace_recipe(&self, id: RecipeId, recipe: Recipe) -> Result<bool, AppError> {
        let mut inner = self.inner.write().await;

        match inner.recipes.get_mut(&id) {
            Some(stored) => {
                stored.recipe = recipe;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_recipe(&self, id: RecipeId) -> Result<bool, AppError> {
        let mut inner = self.inner.write().await;

        Ok(inner.recipes.remove(&id).is_some())
    }

    async fn increment_views(&self, id: RecipeId) -> Result<Option<u64>, AppError> {
        let mut inner = self.inner.write().await;

        Ok(inner.recipes.get_mut(&id).map(|stored| {
            stored.recipe.views += 1;
            stored.recipe.views
        }))
    }

    async fn find_recipes(
        &self,
        filter: &RecipeFilter,
    ) -> Result<Vec<(RecipeId, Recipe)>, AppError> {
        let inner = self.inner.read().await;

        let mut matches: Vec<(&RecipeId, &StoredRecipe)> = inner
            .recipes
            .iter()
            .filter(|(_, stored)| filter.matches(&stored.recipe))
            .collect();

        // insertion order breaks ties
        matches.sort_by(|(_, a), (_, b)| {
            b.recipe
                .views
                .cmp(&a.recipe.views)
                .then(a.sequence.cmp(&b.sequence))
        });

        Ok(matches
            .into_iter()
            .map(|(id, stored)| (*id, stored.recipe.clone()))
            .collect())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::models::Ingredient;

    pub(crate) fn recipe(name: &str, style: &str, author: &str, views: u64) -> Recipe {
        Recipe {
            recipe_name: name.to_string(),
            style_name: style.to_string(),
            author_name: author.to_string(),
            ingredients: vec![Ingredient {
                ingredient_name: "flour".to_string(),
                quantity: "1 cup".to_string(),
            }],
            instructions: Recipe::encode_instructions("mix").unwrap(),
            allergens: false,
            allergen_name: String::new(),
            views,
        }
    }

    #[tokio::test]
    async fn test_categories_are_a_set() {
        let store = MemoryStore::new();

        assert!(store.add_category(CategoryKind::Cuisine, "thai").await.unwrap());
        assert!(store.add_category(CategoryKind::Cuisine, "french").await.unwrap());
        assert!(!store.add_category(CategoryKind::Cuisine, "thai").await.unwrap());

        assert_eq!(
            store.categories(CategoryKind::Cuisine).await.unwrap(),
            ["french", "thai"]
        );
        assert!(store.categories(CategoryKind::Authors).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_insert_get_replace_delete() {
        let store = MemoryStore::new();
        let id = store.insert_recipe(recipe("soup", "thai", "ann", 0)).await.unwrap();

        assert_eq!(
            store.get_recipe(id).await.unwrap().unwrap().recipe_name,
            "soup"
        );

        assert!(store.replace_recipe(id, recipe("stew", "thai", "ann", 9)).await.unwrap());
        let replaced = store.get_recipe(id).await.unwrap().unwrap();
        assert_eq!(replaced.recipe_name, "stew");
        assert_eq!(replaced.views, 9);

        assert!(store.delete_recipe(id).await.unwrap());
        assert!(store.get_recipe(id).await.unwrap().is_none());
        assert!(!store.delete_recipe(id).await.unwrap());
        assert!(!store.replace_recipe(id, recipe("x", "y", "z", 0)).await.unwrap());
    }

    #[tokio::test]
    async fn test_increment_views() {
        let store = MemoryStore::new();
        let id = store.insert_recipe(recipe("soup", "thai", "ann", 0)).await.unwrap();

        assert_eq!(store.increment_views(id).await.unwrap(), Some(1));
        assert_eq!(store.increment_views(id).await.unwrap(), Some(2));
        assert_eq!(store.increment_views(RecipeId::generate()).await.unwrap(), None);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_deleted_recipe_stays_deleted_under_concurrent_writes() {
        let store = Arc::new(MemoryStore::new());
        let id = store.insert_recipe(recipe("soup", "thai", "ann", 0)).await.unwrap();

        let mut writers = Vec::new();
        for views in 0..20 {
            let store = store.clone();
            writers.push(tokio::spawn(async move {
                store.replace_recipe(id, recipe("stew", "thai", "ann", views)).await.unwrap();
                store.increment_views(id).await.unwrap();
            }));
        }
        assert!(store.delete_recipe(id).await.unwrap());
        for writer in writers {
            writer.await.unwrap();
        }

        assert!(store.get_recipe(id).await.unwrap().is_none());
        assert_eq!(store.increment_views(id).await.unwrap(), None);
        assert!(store.find_recipes(&RecipeFilter::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_find_orders_by_views_then_insertion() {
        let store = MemoryStore::new();
        let first = store.insert_recipe(recipe("a", "thai", "ann", 3)).await.unwrap();
        let popular = store.insert_recipe(recipe("b", "thai", "ann", 10)).await.unwrap();
        let second = store.insert_recipe(recipe("c", "thai", "ann", 3)).await.unwrap();

        let found: Vec<RecipeId> = store
            .find_recipes(&RecipeFilter::default())
            .await
            .unwrap()
            .into_iter()
            .map(|(id, _)| id)
            .collect();

        assert_eq!(found, [popular, first, second]);
    }
}
