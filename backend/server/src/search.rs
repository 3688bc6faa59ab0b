//! # Search
//!
//! Filtered, popularity-ordered browsing of the recipe collection.
//!
//!
//!
//! ## Filter
//! - Built fresh for every request from the optional search fields
//! - One equality entry per non-empty field, values kept exactly as submitted
//! - Entries are combined with AND
//! - The ingredient entry matches when ANY ingredient of the recipe has that name
//!
//! Nothing about a search is remembered between requests. Pagination links carry the
//! filter fields as query parameters instead, so page 2 of a search is simply
//! `GET /results?style_name=thai&page=2`.
//!
//!
//!
//! ## Pagination
//! - Fixed page size of [`PAGE_SIZE`]
//! - Pages are 1-based, offset is `(page - 1) * PAGE_SIZE`
//! - A missing or non-numeric `page` parameter is page 1
//! - A page past the end is empty, not an error
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    error::AppError,
    models::{Recipe, RecipeId, RecipeView},
    store::RecipeStore,
};

pub const PAGE_SIZE: usize = 5;

pub const STYLE_NAME: &str = "style_name";
pub const AUTHOR_NAME: &str = "author_name";
pub const INGREDIENT_NAME: &str = "ingredients.ingredient_name";
pub const ALLERGEN_NAME: &str = "allergen_name";

/// Optional search fields as they arrive from the search form or a pagination link.
#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    pub style_name: Option<String>,
    pub author_name: Option<String>,
    pub ingredient_name: Option<String>,
    pub allergen_name: Option<String>,
    pub page: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RecipeFilter {
    style_name: Option<String>,
    author_name: Option<String>,
    ingredient_name: Option<String>,
    allergen_name: Option<String>,
}

fn present(value: Option<&str>) -> Option<String> {
    value
        .filter(|value| !value.trim().is_empty())
        .map(str::to_string)
}

impl RecipeFilter {
    pub fn new(
        style_name: Option<&str>,
        author_name: Option<&str>,
        ingredient_name: Option<&str>,
        allergen_name: Option<&str>,
    ) -> Self {
        Self {
            style_name: present(style_name),
            author_name: present(author_name),
            ingredient_name: present(ingredient_name),
            allergen_name: present(allergen_name),
        }
    }

    pub fn from_params(params: &SearchParams) -> Self {
        Self::new(
            params.style_name.as_deref(),
            params.author_name.as_deref(),
            params.ingredient_name.as_deref(),
            params.allergen_name.as_deref(),
        )
    }

    /// Field path to required value, one entry per supplied field.
    pub fn entries(&self) -> BTreeMap<&'static str, &str> {
        [
            (STYLE_NAME, &self.style_name),
            (AUTHOR_NAME, &self.author_name),
            (INGREDIENT_NAME, &self.ingredient_name),
            (ALLERGEN_NAME, &self.allergen_name),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.as_deref().map(|value| (key, value)))
        .collect()
    }

    /// Same entries keyed by search form field name, for building pagination links.
    pub fn form_fields(&self) -> BTreeMap<&'static str, &str> {
        [
            ("style_name", &self.style_name),
            ("author_name", &self.author_name),
            ("ingredient_name", &self.ingredient_name),
            ("allergen_name", &self.allergen_name),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.as_deref().map(|value| (key, value)))
        .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.style_name.is_none()
            && self.author_name.is_none()
            && self.ingredient_name.is_none()
            && self.allergen_name.is_none()
    }

    /// Every entry must hold. An unknown field path never matches.
    pub fn matches(&self, recipe: &Recipe) -> bool {
        self.entries()
            .into_iter()
            .all(|(field, wanted)| match field {
                STYLE_NAME => recipe.style_name == wanted,
                AUTHOR_NAME => recipe.author_name == wanted,
                ALLERGEN_NAME => recipe.allergen_name == wanted,
                INGREDIENT_NAME => recipe
                    .ingredients
                    .iter()
                    .any(|ingredient| ingredient.ingredient_name == wanted),
                _ => false,
            })
    }
}

/// 1-based page number.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Page(usize);

impl Page {
    pub fn new(page: usize) -> Self {
        Self(page.max(1))
    }

    pub fn parse(raw: Option<&str>) -> Self {
        Self::new(raw.and_then(|raw| raw.trim().parse().ok()).unwrap_or(1))
    }

    pub fn number(&self) -> usize {
        self.0
    }

    pub fn offset(&self) -> usize {
        (self.0 - 1).saturating_mul(PAGE_SIZE)
    }
}

impl Default for Page {
    fn default() -> Self {
        Self(1)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub page: usize,
    pub per_page: usize,
    pub total: usize,
    pub total_pages: usize,
    pub has_previous: bool,
    pub has_next: bool,
    /// 1-based index of the first record shown, 0 when the page is empty.
    pub first_record: usize,
    pub last_record: usize,
}

impl Pagination {
    pub fn new(page: Page, total: usize, shown: usize) -> Self {
        let offset = page.offset();

        Self {
            page: page.number(),
            per_page: PAGE_SIZE,
            total,
            total_pages: total.div_ceil(PAGE_SIZE),
            has_previous: page.number() > 1,
            has_next: offset.saturating_add(PAGE_SIZE) < total,
            first_record: if shown == 0 { 0 } else { offset + 1 },
            last_record: offset + shown,
        }
    }
}

pub struct Results {
    pub recipes: Vec<RecipeView>,
    pub pagination: Pagination,
}

pub fn paginate<T>(items: Vec<T>, page: Page) -> (Vec<T>, Pagination) {
    let total = items.len();
    let slice: Vec<T> = items
        .into_iter()
        .skip(page.offset())
        .take(PAGE_SIZE)
        .collect();
    let pagination = Pagination::new(page, total, slice.len());

    (slice, pagination)
}

pub async fn search_recipes(
    store: &dyn RecipeStore,
    filter: &RecipeFilter,
    page: Page,
) -> Result<Results, AppError> {
    let found: Vec<(RecipeId, Recipe)> = store.find_recipes(filter).await?;
    let (slice, pagination) = paginate(found, page);

    let recipes = slice
        .into_iter()
        .map(|(id, recipe)| RecipeView::new(id, recipe))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Results {
        recipes,
        pagination,
    })
}
