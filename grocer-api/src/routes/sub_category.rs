/// Sub-category endpoints
///
/// - `POST   /api/subcategory/create` (auth)
/// - `POST   /api/subcategory/get`
/// - `PUT    /api/subcategory/update` (auth)
/// - `DELETE /api/subcategory/delete` (auth)

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    response::{created, ok, Envelope},
    routes::{parse_ids, present, required_id},
};
use axum::{extract::State, response::Response, Json};
use grocer_shared::models::sub_category::{SubCategory, SubCategoryWithCategories, UpdateSubCategory};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct CreateSubCategoryRequest {
    pub name: Option<String>,
    pub image: Option<String>,
    #[serde(default)]
    pub category: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateSubCategoryRequest {
    #[serde(rename = "_id")]
    pub id: Option<String>,
    pub name: Option<String>,
    pub image: Option<String>,
    pub category: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteSubCategoryRequest {
    #[serde(rename = "_id")]
    pub id: Option<String>,
}

pub async fn create_sub_category(
    State(state): State<AppState>,
    Json(req): Json<CreateSubCategoryRequest>,
) -> ApiResult<Response> {
    let (Some(name), Some(image)) = (present(&req.name), present(&req.image)) else {
        return Err(ApiError::BadRequest("Provide name, image, category".to_string()));
    };
    if req.category.is_empty() {
        return Err(ApiError::BadRequest("Provide name, image, category".to_string()));
    }

    let category_ids = parse_ids(&req.category)?;
    let sub_category = SubCategory::create(&state.db, name, image, &category_ids).await?;
    tracing::info!(sub_category_id = %sub_category.id, "Sub-category created");

    Ok(created("Sub Category Created", sub_category))
}

/// Lists sub-categories with their categories joined
pub async fn get_sub_categories(
    State(state): State<AppState>,
) -> ApiResult<Envelope<Vec<SubCategoryWithCategories>>> {
    Ok(ok(
        "Sub Category data",
        SubCategory::list_with_categories(&state.db).await?,
    ))
}

pub async fn update_sub_category(
    State(state): State<AppState>,
    Json(req): Json<UpdateSubCategoryRequest>,
) -> ApiResult<Envelope<SubCategory>> {
    let id = required_id(&req.id, "Check your _id")?;

    let category_ids = match &req.category {
        Some(ids) if !ids.is_empty() => Some(parse_ids(ids)?),
        _ => None,
    };

    let update = UpdateSubCategory {
        name: present(&req.name).map(str::to_string),
        image: present(&req.image).map(str::to_string),
        category_ids,
    };

    let sub_category = SubCategory::update(&state.db, id, update)
        .await?
        .ok_or_else(|| ApiError::BadRequest("Check your _id".to_string()))?;

    Ok(ok("Updated Successfully", sub_category))
}

/// Deletes a sub-category; products keep their other links
pub async fn delete_sub_category(
    State(state): State<AppState>,
    Json(req): Json<DeleteSubCategoryRequest>,
) -> ApiResult<Envelope<()>> {
    let id = required_id(&req.id, "Provide _id")?;

    if !SubCategory::delete(&state.db, id).await? {
        return Err(ApiError::NotFound("Sub category not found".to_string()));
    }

    tracing::info!(sub_category_id = %id, "Sub-category deleted");
    Ok(ok("Delete successfully", ()))
}
