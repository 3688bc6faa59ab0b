use std::{collections::BTreeMap, sync::Arc};

use axum::{
    Form,
    extract::{Path, Query, State as Shared},
    response::{Html, IntoResponse, Redirect, Response},
};
use minijinja::context;
use tracing::info;

use crate::{
    error::AppError,
    forms::{RecipeForm, SignInForm},
    models::{CategoryKind, RecipeId},
    recipes,
    search::{Page, RecipeFilter, SearchParams, search_recipes},
    session::{CookieUpdates, FLASH_COOKIE, SESSION_COOKIE, Session, SignedIn},
    state::State,
    templates::render,
};

pub const ADDED_MESSAGE: &str = "You have successfully added your recipe";
pub const CHANGED_MESSAGE: &str = "You have successfully changed your recipe";
pub const REMOVED_MESSAGE: &str = "You have successfully removed your recipe";

fn page(session: &Session, html: String) -> Response {
    session.consume_flash().apply(Html(html))
}

fn redirect_with_flash(state: &State, to: &str, message: &str) -> Response {
    CookieUpdates::default()
        .set(&state.config.secret, FLASH_COOKIE, message)
        .apply(Redirect::to(to))
}

pub async fn index_handler(session: Session) -> Result<Response, AppError> {
    if session.username.is_some() {
        return Ok(Redirect::to("/search").into_response());
    }

    let html = render("index.html", context! { flash => &session.flash })?;

    Ok(page(&session, html))
}

pub async fn sign_in_handler(
    Shared(state): Shared<Arc<State>>,
    session: Session,
    Form(form): Form<SignInForm>,
) -> Result<Response, AppError> {
    let username = form.username.trim();

    if username.is_empty() {
        let html = render(
            "index.html",
            context! { flash => &session.flash, error => "Please enter a name" },
        )?;
        return Ok(page(&session, html));
    }

    info!("Signed in as {username}");

    Ok(CookieUpdates::default()
        .set(&state.config.secret, SESSION_COOKIE, username)
        .apply(Redirect::to("/search")))
}

pub async fn search_handler(
    Shared(state): Shared<Arc<State>>,
    signed_in: SignedIn,
) -> Result<Response, AppError> {
    let mut categories = BTreeMap::new();
    for kind in CategoryKind::ALL {
        categories.insert(kind.as_str(), state.store.categories(kind).await?);
    }

    let html = render(
        "search.html",
        context! {
            username => &signed_in.username,
            flash => &signed_in.session.flash,
            categories => categories,
        },
    )?;

    Ok(page(&signed_in.session, html))
}

async fn results_page(
    state: &State,
    signed_in: &SignedIn,
    filter: RecipeFilter,
    page_number: Page,
) -> Result<Response, AppError> {
    let results = search_recipes(state.store.as_ref(), &filter, page_number).await?;

    let html = render(
        "results.html",
        context! {
            username => &signed_in.username,
            flash => &signed_in.session.flash,
            choices => results.recipes,
            pagination => results.pagination,
            filters => filter.form_fields(),
        },
    )?;

    Ok(page(&signed_in.session, html))
}

pub async fn results_handler(
    Shared(state): Shared<Arc<State>>,
    signed_in: SignedIn,
    Query(params): Query<SearchParams>,
) -> Result<Response, AppError> {
    let filter = RecipeFilter::from_params(&params);
    let page_number = Page::parse(params.page.as_deref());

    results_page(&state, &signed_in, filter, page_number).await
}

/// Search form submission. The page may come from the query string or the form.
pub async fn results_form_handler(
    Shared(state): Shared<Arc<State>>,
    signed_in: SignedIn,
    Query(query): Query<SearchParams>,
    Form(params): Form<SearchParams>,
) -> Result<Response, AppError> {
    let filter = RecipeFilter::from_params(&params);
    let page_number = Page::parse(query.page.as_deref().or(params.page.as_deref()));

    results_page(&state, &signed_in, filter, page_number).await
}

pub async fn add_recipe_handler(signed_in: SignedIn) -> Result<Response, AppError> {
    let html = render(
        "addrecipe.html",
        context! { username => &signed_in.username, flash => &signed_in.session.flash },
    )?;

    Ok(page(&signed_in.session, html))
}

pub async fn insert_recipe_handler(
    Shared(state): Shared<Arc<State>>,
    _signed_in: SignedIn,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Result<Response, AppError> {
    let form = RecipeForm::from_pairs(pairs)?;
    recipes::create_recipe(state.store.as_ref(), &form).await?;

    Ok(redirect_with_flash(&state, "/search", ADDED_MESSAGE))
}

pub async fn recipe_handler(
    Shared(state): Shared<Arc<State>>,
    signed_in: SignedIn,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let recipe = recipes::view_recipe(state.store.as_ref(), RecipeId::parse(&id)?).await?;

    let html = render(
        "recipe.html",
        context! {
            username => &signed_in.username,
            flash => &signed_in.session.flash,
            recipe => recipe,
        },
    )?;

    Ok(page(&signed_in.session, html))
}

pub async fn edit_recipe_handler(
    Shared(state): Shared<Arc<State>>,
    signed_in: SignedIn,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let recipe = recipes::load_recipe(state.store.as_ref(), RecipeId::parse(&id)?).await?;

    let html = render(
        "editrecipe.html",
        context! {
            username => &signed_in.username,
            flash => &signed_in.session.flash,
            recipe => recipe,
        },
    )?;

    Ok(page(&signed_in.session, html))
}

pub async fn update_recipe_handler(
    Shared(state): Shared<Arc<State>>,
    _signed_in: SignedIn,
    Path(id): Path<String>,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Result<Response, AppError> {
    let id = RecipeId::parse(&id)?;
    let form = RecipeForm::from_pairs(pairs)?;
    recipes::update_recipe(state.store.as_ref(), id, &form).await?;

    Ok(redirect_with_flash(&state, "/results", CHANGED_MESSAGE))
}

pub async fn delete_recipe_handler(
    Shared(state): Shared<Arc<State>>,
    _signed_in: SignedIn,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    recipes::delete_recipe(state.store.as_ref(), RecipeId::parse(&id)?).await?;

    Ok(redirect_with_flash(&state, "/search", REMOVED_MESSAGE))
}

pub async fn logout_handler() -> Response {
    CookieUpdates::default()
        .clear(SESSION_COOKIE)
        .apply(Redirect::to("/"))
}
