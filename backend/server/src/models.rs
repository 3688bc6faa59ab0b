use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecipeId(Uuid);

impl RecipeId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn parse(raw: &str) -> Result<Self, AppError> {
        Uuid::parse_str(raw.trim())
            .map(Self)
            .map_err(|_| AppError::MalformedPayload)
    }
}

impl fmt::Display for RecipeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

/// Facets offered as search choices.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CategoryKind {
    Cuisine,
    Authors,
    Ingredients,
    Allergens,
}

impl CategoryKind {
    pub const ALL: [CategoryKind; 4] = [
        CategoryKind::Cuisine,
        CategoryKind::Authors,
        CategoryKind::Ingredients,
        CategoryKind::Allergens,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CategoryKind::Cuisine => "cuisine",
            CategoryKind::Authors => "authors",
            CategoryKind::Ingredients => "ingredients",
            CategoryKind::Allergens => "allergens",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ingredient {
    pub ingredient_name: String,
    pub quantity: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipe {
    pub recipe_name: String,
    pub style_name: String,
    pub author_name: String,
    pub ingredients: Vec<Ingredient>,
    /// JSON-encoded instructions text.
    pub instructions: String,
    pub allergens: bool,
    pub allergen_name: String,
    pub views: u64,
}

impl Recipe {
    pub fn encode_instructions(text: &str) -> Result<String, AppError> {
        Ok(serde_json::to_string(text)?)
    }

    pub fn instructions_text(&self) -> Result<String, AppError> {
        Ok(serde_json::from_str(&self.instructions)?)
    }
}

/// A stored recipe plus its identifier and decoded instructions, shaped for templates.
#[derive(Clone, Debug, Serialize)]
pub struct RecipeView {
    pub id: String,
    #[serde(flatten)]
    pub recipe: Recipe,
    pub instructions_text: String,
}

impl RecipeView {
    pub fn new(id: RecipeId, recipe: Recipe) -> Result<Self, AppError> {
        let instructions_text = recipe.instructions_text()?;

        Ok(Self {
            id: id.to_string(),
            recipe,
            instructions_text,
        })
    }
}
