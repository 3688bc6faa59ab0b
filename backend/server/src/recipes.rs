//! # Recipes
//!
//! Authoring and viewing of individual recipes.
//!
//! ## Normalization
//! - Recipe, style, author, ingredient and allergen names are trimmed and lowercased
//! - Ingredient rows pair up by index and stop at the first empty ingredient name
//! - Allergens only count when the checkbox is `on`, otherwise the name is cleared
//! - Instructions are stored JSON-encoded and decoded again on the way out
//!
//! ## Category Registry
//! Every non-empty normalized style, author, ingredient and allergen is offered on the
//! search page afterwards. The registry is a set per category kind, so registering a
//! value twice is harmless and no membership check happens beforehand.
use tracing::{debug, info};

use crate::{
    error::AppError,
    forms::RecipeForm,
    models::{CategoryKind, Ingredient, Recipe, RecipeId, RecipeView},
    store::RecipeStore,
};

fn normalize(value: &str) -> String {
    value.trim().to_lowercase()
}

pub fn build_ingredients(names: &[String], quantities: &[String]) -> Vec<Ingredient> {
    names
        .iter()
        .enumerate()
        .take_while(|(_, name)| !name.trim().is_empty())
        .map(|(index, name)| Ingredient {
            ingredient_name: normalize(name),
            quantity: quantities.get(index).cloned().unwrap_or_default(),
        })
        .collect()
}

pub fn build_recipe(form: &RecipeForm, views: u64) -> Result<Recipe, AppError> {
    let (allergens, allergen_name) = if form.allergens {
        (true, normalize(form.allergen_name.as_deref().unwrap_or_default()))
    } else {
        (false, String::new())
    };

    Ok(Recipe {
        recipe_name: normalize(&form.recipe_name),
        style_name: normalize(&form.style_name),
        author_name: normalize(&form.author_name),
        ingredients: build_ingredients(&form.ingredient_names, &form.quantities),
        instructions: Recipe::encode_instructions(&form.instructions)?,
        allergens,
        allergen_name,
        views,
    })
}

async fn register_categories(store: &dyn RecipeStore, recipe: &Recipe) -> Result<(), AppError> {
    let mut values = vec![
        (CategoryKind::Cuisine, recipe.style_name.as_str()),
        (CategoryKind::Authors, recipe.author_name.as_str()),
    ];
    values.extend(
        recipe
            .ingredients
            .iter()
            .map(|ingredient| (CategoryKind::Ingredients, ingredient.ingredient_name.as_str())),
    );
    if recipe.allergens {
        values.push((CategoryKind::Allergens, recipe.allergen_name.as_str()));
    }

    for (kind, value) in values.into_iter().filter(|(_, value)| !value.is_empty()) {
        if store.add_category(kind, value).await? {
            debug!("New {} category value: {value}", kind.as_str());
        }
    }

    Ok(())
}

pub async fn create_recipe(store: &dyn RecipeStore, form: &RecipeForm) -> Result<RecipeId, AppError> {
    let recipe = build_recipe(form, 0)?;
    register_categories(store, &recipe).await?;

    let id = store.insert_recipe(recipe).await?;
    info!("Created recipe {id}");

    Ok(id)
}

/// Overwrites every field, view count included.
pub async fn update_recipe(
    store: &dyn RecipeStore,
    id: RecipeId,
    form: &RecipeForm,
) -> Result<(), AppError> {
    let recipe = build_recipe(form, form.require_views()?)?;

    // an unknown id must not leave new category values behind
    if !store.replace_recipe(id, recipe.clone()).await? {
        return Err(AppError::NotFound);
    }
    register_categories(store, &recipe).await?;
    info!("Updated recipe {id}");

    Ok(())
}

/// Deleting an unknown id changes nothing.
pub async fn delete_recipe(store: &dyn RecipeStore, id: RecipeId) -> Result<bool, AppError> {
    let removed = store.delete_recipe(id).await?;

    if removed {
        info!("Deleted recipe {id}");
    } else {
        debug!("Delete of unknown recipe {id} ignored");
    }

    Ok(removed)
}

/// Loads a recipe for the edit form without counting a view.
pub async fn load_recipe(store: &dyn RecipeStore, id: RecipeId) -> Result<RecipeView, AppError> {
    let recipe = store.get_recipe(id).await?.ok_or(AppError::NotFound)?;

    RecipeView::new(id, recipe)
}

/// Every call counts one view.
pub async fn view_recipe(store: &dyn RecipeStore, id: RecipeId) -> Result<RecipeView, AppError> {
    let mut recipe = store.get_recipe(id).await?.ok_or(AppError::NotFound)?;
    recipe.views = store
        .increment_views(id)
        .await?
        .ok_or(AppError::NotFound)?;

    RecipeView::new(id, recipe)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    fn form() -> RecipeForm {
        RecipeForm {
            recipe_name: "Victoria Sponge".to_string(),
            style_name: "British".to_string(),
            author_name: "Mary".to_string(),
            ingredient_names: strings(&["Flour", "Sugar"]),
            quantities: strings(&["2 cups", "1 cup"]),
            instructions: "mix and bake".to_string(),
            ..RecipeForm::default()
        }
    }

    #[test]
    fn test_ingredients_stop_at_first_empty_name() {
        let ingredients = build_ingredients(
            &strings(&["Flour", "", "Sugar"]),
            &strings(&["2 cups", "x", "1 cup"]),
        );

        assert_eq!(
            ingredients,
            [Ingredient {
                ingredient_name: "flour".to_string(),
                quantity: "2 cups".to_string(),
            }]
        );
    }

    #[test]
    fn test_missing_quantity_is_empty() {
        let ingredients = build_ingredients(&strings(&["Salt"]), &[]);
        assert_eq!(ingredients[0].quantity, "");
    }

    #[test]
    fn test_allergen_unchecked_clears_name() {
        let mut form = form();
        form.allergen_name = Some("Peanuts".to_string());

        let recipe = build_recipe(&form, 0).unwrap();
        assert!(!recipe.allergens);
        assert_eq!(recipe.allergen_name, "");
    }

    #[test]
    fn test_allergen_checked_is_lowercased() {
        let mut form = form();
        form.allergens = true;
        form.allergen_name = Some("Peanuts".to_string());

        let recipe = build_recipe(&form, 0).unwrap();
        assert!(recipe.allergens);
        assert_eq!(recipe.allergen_name, "peanuts");
    }

    #[tokio::test]
    async fn test_create_then_view_round_trip() {
        let store = MemoryStore::new();
        let id = create_recipe(&store, &form()).await.unwrap();

        let view = view_recipe(&store, id).await.unwrap();
        assert_eq!(view.recipe.recipe_name, "victoria sponge");
        assert_eq!(view.recipe.style_name, "british");
        assert_eq!(view.instructions_text, "mix and bake");
        assert_eq!(
            view.recipe.ingredients,
            [
                Ingredient {
                    ingredient_name: "flour".to_string(),
                    quantity: "2 cups".to_string(),
                },
                Ingredient {
                    ingredient_name: "sugar".to_string(),
                    quantity: "1 cup".to_string(),
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_each_view_counts_once() {
        let store = MemoryStore::new();
        let id = create_recipe(&store, &form()).await.unwrap();

        assert_eq!(store.get_recipe(id).await.unwrap().unwrap().views, 0);
        assert_eq!(view_recipe(&store, id).await.unwrap().recipe.views, 1);
        assert_eq!(view_recipe(&store, id).await.unwrap().recipe.views, 2);

        // the edit form does not count as a view
        assert_eq!(load_recipe(&store, id).await.unwrap().recipe.views, 2);
    }

    #[tokio::test]
    async fn test_create_registers_categories() {
        let store = MemoryStore::new();
        let mut allergic = form();
        allergic.allergens = true;
        allergic.allergen_name = Some("Gluten".to_string());

        create_recipe(&store, &allergic).await.unwrap();
        create_recipe(&store, &form()).await.unwrap();

        assert_eq!(store.categories(CategoryKind::Cuisine).await.unwrap(), ["british"]);
        assert_eq!(store.categories(CategoryKind::Authors).await.unwrap(), ["mary"]);
        assert_eq!(
            store.categories(CategoryKind::Ingredients).await.unwrap(),
            ["flour", "sugar"]
        );
        assert_eq!(store.categories(CategoryKind::Allergens).await.unwrap(), ["gluten"]);
    }

    #[tokio::test]
    async fn test_update_overwrites_everything() {
        let store = MemoryStore::new();
        let id = create_recipe(&store, &form()).await.unwrap();
        view_recipe(&store, id).await.unwrap();

        let mut edited = form();
        edited.recipe_name = "Lemon Sponge".to_string();
        edited.ingredient_names = strings(&["Lemon"]);
        edited.quantities = strings(&["1"]);
        edited.views = Some(40);

        update_recipe(&store, id, &edited).await.unwrap();

        let stored = store.get_recipe(id).await.unwrap().unwrap();
        assert_eq!(stored.recipe_name, "lemon sponge");
        assert_eq!(stored.ingredients.len(), 1);
        assert_eq!(stored.views, 40);
    }

    #[tokio::test]
    async fn test_update_requires_views_and_existing_recipe() {
        let store = MemoryStore::new();
        let id = create_recipe(&store, &form()).await.unwrap();

        assert!(matches!(
            update_recipe(&store, id, &form()).await,
            Err(AppError::MalformedPayload)
        ));

        let mut edited = form();
        edited.views = Some(1);
        assert!(matches!(
            update_recipe(&store, RecipeId::generate(), &edited).await,
            Err(AppError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_failed_update_leaves_registry_untouched() {
        let store = MemoryStore::new();
        let mut edited = form();
        edited.style_name = "Martian".to_string();
        edited.views = Some(0);

        assert!(matches!(
            update_recipe(&store, RecipeId::generate(), &edited).await,
            Err(AppError::NotFound)
        ));
        for kind in CategoryKind::ALL {
            assert!(store.categories(kind).await.unwrap().is_empty(), "{}", kind.as_str());
        }
    }

    #[tokio::test]
    async fn test_update_registers_new_values() {
        let store = MemoryStore::new();
        let id = create_recipe(&store, &form()).await.unwrap();

        let mut edited = form();
        edited.style_name = "Welsh".to_string();
        edited.views = Some(0);
        update_recipe(&store, id, &edited).await.unwrap();

        assert_eq!(
            store.categories(CategoryKind::Cuisine).await.unwrap(),
            ["british", "welsh"]
        );
    }

    #[tokio::test]
    async fn test_delete_unknown_is_noop() {
        let store = MemoryStore::new();
        let id = create_recipe(&store, &form()).await.unwrap();

        assert!(!delete_recipe(&store, RecipeId::generate()).await.unwrap());
        assert!(store.get_recipe(id).await.unwrap().is_some());

        assert!(delete_recipe(&store, id).await.unwrap());
        assert!(matches!(
            view_recipe(&store, id).await,
            Err(AppError::NotFound)
        ));
    }
}
