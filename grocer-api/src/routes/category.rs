/// Category endpoints
///
/// - `POST   /api/category/add-category` (auth)
/// - `GET    /api/category/get`
/// - `PUT    /api/category/update` (auth)
/// - `DELETE /api/category/delete` (auth)

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    response::{created, ok, Envelope},
    routes::{present, required_id},
};
use axum::{extract::State, response::Response, Json};
use grocer_shared::models::category::Category;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct AddCategoryRequest {
    pub name: Option<String>,
    pub image: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCategoryRequest {
    #[serde(rename = "_id")]
    pub id: Option<String>,
    pub name: Option<String>,
    pub image: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteCategoryRequest {
    #[serde(rename = "_id")]
    pub id: Option<String>,
}

pub async fn add_category(
    State(state): State<AppState>,
    Json(req): Json<AddCategoryRequest>,
) -> ApiResult<Response> {
    let (Some(name), Some(image)) = (present(&req.name), present(&req.image)) else {
        return Err(ApiError::BadRequest("Enter required fields".to_string()));
    };

    let category = Category::create(&state.db, name, image).await?;
    tracing::info!(category_id = %category.id, "Category created");

    Ok(created("Add Category", category))
}

pub async fn get_categories(State(state): State<AppState>) -> ApiResult<Envelope<Vec<Category>>> {
    Ok(ok("Categories", Category::list(&state.db).await?))
}

pub async fn update_category(
    State(state): State<AppState>,
    Json(req): Json<UpdateCategoryRequest>,
) -> ApiResult<Envelope<Category>> {
    let id = required_id(&req.id, "Provide category _id")?;

    let category = Category::update(&state.db, id, present(&req.name), present(&req.image))
        .await?
        .ok_or_else(|| ApiError::NotFound("Category not found".to_string()))?;

    Ok(ok("Updated Category", category))
}

/// Deletes a category nothing references any more
pub async fn delete_category(
    State(state): State<AppState>,
    Json(req): Json<DeleteCategoryRequest>,
) -> ApiResult<Envelope<()>> {
    let id = required_id(&req.id, "Provide category _id")?;

    if Category::is_in_use(&state.db, id).await? {
        return Err(ApiError::BadRequest("category is already use can't delete".to_string()));
    }

    if !Category::delete(&state.db, id).await? {
        return Err(ApiError::NotFound("Category not found".to_string()));
    }

    tracing::info!(category_id = %id, "Category deleted");
    Ok(ok("Delete category successfully", ()))
}
