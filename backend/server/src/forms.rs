use serde::Deserialize;

use crate::error::AppError;

#[derive(Debug, Deserialize)]
pub struct SignInForm {
    #[serde(default)]
    pub username: String,
}

/// Recipe fields submitted by the add and edit forms.
///
/// Parsed from raw pairs since `ingredient_name` and `quantity` repeat once per row.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct RecipeForm {
    pub recipe_name: String,
    pub style_name: String,
    pub author_name: String,
    pub ingredient_names: Vec<String>,
    pub quantities: Vec<String>,
    pub instructions: String,
    pub allergens: bool,
    pub allergen_name: Option<String>,
    pub views: Option<u64>,
}

impl RecipeForm {
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Result<Self, AppError> {
        let mut recipe_name = None;
        let mut style_name = None;
        let mut author_name = None;
        let mut instructions = None;
        let mut form = RecipeForm::default();

        for (key, value) in pairs {
            match key.as_str() {
                "recipe_name" => recipe_name = Some(value),
                "style_name" => style_name = Some(value),
                "author_name" => author_name = Some(value),
                "instructions" => instructions = Some(value),
                "ingredient_name" => form.ingredient_names.push(value),
                "quantity" => form.quantities.push(value),
                "allergens" => form.allergens = value == "on",
                "allergen_name" => form.allergen_name = Some(value),
                "views" => {
                    form.views = Some(
                        value
                            .trim()
                            .parse()
                            .map_err(|_| AppError::MalformedPayload)?,
                    )
                }
                _ => {}
            }
        }

        form.recipe_name = recipe_name.ok_or(AppError::MalformedPayload)?;
        form.style_name = style_name.ok_or(AppError::MalformedPayload)?;
        form.author_name = author_name.ok_or(AppError::MalformedPayload)?;
        form.instructions = instructions.ok_or(AppError::MalformedPayload)?;

        Ok(form)
    }

    /// Views are user-editable on the edit form and required there.
    pub fn require_views(&self) -> Result<u64, AppError> {
        self.views.ok_or(AppError::MalformedPayload)
    }
}
