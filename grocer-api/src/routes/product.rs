/// Product endpoints
///
/// Reads are public; writes require an ADMIN.
///
/// - `POST   /api/product/create` (admin)
/// - `POST   /api/product/get`
/// - `POST   /api/product/get-product-by-category`
/// - `POST   /api/product/get-pruduct-by-category-and-subcategory`
/// - `POST   /api/product/get-product-details`
/// - `PUT    /api/product/update-product-details` (admin)
/// - `DELETE /api/product/delete-product` (admin)
/// - `POST   /api/product/search-product`
///
/// Paged listings answer with the page metadata next to `data`:
///
/// ```json
/// { "message": "Product data", "error": false, "success": true,
///   "data": [ ... ], "totalCount": 42, "totalNoPage": 5 }
/// ```

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    response::{created, ok, Envelope},
    routes::{parse_ids, present, required_id},
};
use axum::{extract::State, response::Response, Json};
use grocer_shared::models::{
    product::{NewProduct, Product, UpdateProduct},
    Pagination,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Default, Deserialize, Validate)]
pub struct ProductFields {
    pub name: Option<String>,
    pub image: Option<Vec<String>>,
    pub category: Option<Vec<String>>,
    #[serde(rename = "subCategory")]
    pub sub_category: Option<Vec<String>>,
    pub unit: Option<String>,

    #[validate(range(min = 0, message = "Stock cannot be negative"))]
    pub stock: Option<i32>,

    pub price: Option<Decimal>,

    #[validate(range(min = 0, max = 100, message = "Discount must be between 0 and 100"))]
    pub discount: Option<i32>,

    pub description: Option<String>,
    pub more_details: Option<serde_json::Value>,
    pub publish: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProductRequest {
    #[serde(rename = "_id")]
    pub id: Option<String>,
    #[serde(flatten)]
    pub fields: ProductFields,
}

#[derive(Debug, Deserialize)]
pub struct IdRequest {
    #[serde(rename = "_id")]
    pub id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListRequest {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub search: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ByCategoryRequest {
    pub id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ByCategoryAndSubCategoryRequest {
    #[serde(rename = "categoryId")]
    pub category_id: Option<String>,
    #[serde(rename = "subCategoryId")]
    pub sub_category_id: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct DetailsRequest {
    #[serde(rename = "productId")]
    pub product_id: Option<String>,
}

/// A page of products with its metadata
#[derive(Debug, Serialize)]
pub struct ProductPage {
    pub message: String,
    pub error: bool,
    pub success: bool,
    pub data: Vec<Product>,

    #[serde(rename = "totalCount")]
    pub total_count: i64,

    #[serde(rename = "totalNoPage", skip_serializing_if = "Option::is_none")]
    pub total_no_page: Option<i64>,

    #[serde(rename = "totalPage", skip_serializing_if = "Option::is_none")]
    pub total_page: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<i64>,
}

impl ProductPage {
    fn new(message: &str, data: Vec<Product>, total_count: i64) -> Self {
        Self {
            message: message.to_string(),
            error: false,
            success: true,
            data,
            total_count,
            total_no_page: None,
            total_page: None,
            page: None,
            limit: None,
        }
    }

    fn with_position(mut self, page: Pagination) -> Self {
        self.page = Some(page.page);
        self.limit = Some(page.limit);
        self
    }
}

fn non_empty(values: &Option<Vec<String>>) -> Option<&[String]> {
    values.as_deref().filter(|v| !v.is_empty())
}

/// Creates a product
///
/// # Errors
///
/// - `400`: a required field is missing ("Enter required fields")
/// - `422`: stock or discount out of range
pub async fn create_product(
    State(state): State<AppState>,
    Json(req): Json<ProductFields>,
) -> ApiResult<Response> {
    let (Some(name), Some(image), Some(category), Some(sub_category), Some(unit), Some(price), Some(description)) = (
        present(&req.name),
        non_empty(&req.image),
        non_empty(&req.category),
        non_empty(&req.sub_category),
        present(&req.unit),
        req.price,
        present(&req.description),
    ) else {
        return Err(ApiError::BadRequest("Enter required fields".to_string()));
    };
    req.validate()?;

    if price.is_sign_negative() {
        return Err(ApiError::BadRequest("Price cannot be negative".to_string()));
    }

    let product = Product::create(
        &state.db,
        NewProduct {
            name: name.to_string(),
            image: image.to_vec(),
            category_ids: parse_ids(category)?,
            sub_category_ids: parse_ids(sub_category)?,
            unit: unit.to_string(),
            stock: req.stock,
            price,
            discount: req.discount.unwrap_or(0),
            description: description.to_string(),
            more_details: req.more_details.clone().unwrap_or_else(|| serde_json::json!({})),
            publish: req.publish.unwrap_or(true),
        },
    )
    .await?;

    tracing::info!(product_id = %product.id, "Product created");
    Ok(created("Product Created Successfully", product))
}

/// Paged product listing with optional search
pub async fn get_products(
    State(state): State<AppState>,
    Json(req): Json<ListRequest>,
) -> ApiResult<Json<ProductPage>> {
    let page = Pagination::new(req.page, req.limit);
    let (data, total) = Product::list(&state.db, present(&req.search), page).await?;

    let mut body = ProductPage::new("Product data", data, total);
    body.total_no_page = Some(page.total_pages(total));

    Ok(Json(body))
}

/// The category shelf: newest products in a category
pub async fn get_by_category(
    State(state): State<AppState>,
    Json(req): Json<ByCategoryRequest>,
) -> ApiResult<Envelope<Vec<Product>>> {
    let category_id = required_id(&req.id, "provide category id")?;

    Ok(ok(
        "category product list",
        Product::list_by_category(&state.db, category_id).await?,
    ))
}

pub async fn get_by_category_and_sub_category(
    State(state): State<AppState>,
    Json(req): Json<ByCategoryAndSubCategoryRequest>,
) -> ApiResult<Json<ProductPage>> {
    let missing = "Provide categoryId and subCategoryId";
    let category_id = required_id(&req.category_id, missing)?;
    let sub_category_id = required_id(&req.sub_category_id, missing)?;

    let page = Pagination::new(req.page, req.limit);
    let (data, total) =
        Product::list_by_category_and_sub_category(&state.db, category_id, sub_category_id, page).await?;

    Ok(Json(ProductPage::new("Product list", data, total).with_position(page)))
}

pub async fn get_product_details(
    State(state): State<AppState>,
    Json(req): Json<DetailsRequest>,
) -> ApiResult<Envelope<Product>> {
    let product_id = required_id(&req.product_id, "provide productId")?;

    let product = Product::find_by_id(&state.db, product_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Product not found".to_string()))?;

    Ok(ok("product details", product))
}

/// Partial update; only the fields present in the body change
pub async fn update_product(
    State(state): State<AppState>,
    Json(req): Json<UpdateProductRequest>,
) -> ApiResult<Envelope<Product>> {
    let id = required_id(&req.id, "provide product _id")?;
    let fields = req.fields;
    fields.validate()?;

    if fields.price.is_some_and(|p| p.is_sign_negative()) {
        return Err(ApiError::BadRequest("Price cannot be negative".to_string()));
    }

    let update = UpdateProduct {
        name: present(&fields.name).map(str::to_string),
        image: fields.image.clone(),
        category_ids: fields.category.as_deref().map(parse_ids).transpose()?,
        sub_category_ids: fields.sub_category.as_deref().map(parse_ids).transpose()?,
        unit: fields.unit.clone(),
        stock: fields.stock,
        price: fields.price,
        discount: fields.discount,
        description: fields.description.clone(),
        more_details: fields.more_details.clone(),
        publish: fields.publish,
    };

    let product = Product::update(&state.db, id, update)
        .await?
        .ok_or_else(|| ApiError::NotFound("Product not found".to_string()))?;

    tracing::info!(product_id = %product.id, "Product updated");
    Ok(ok("updated successfully", product))
}

pub async fn delete_product(
    State(state): State<AppState>,
    Json(req): Json<IdRequest>,
) -> ApiResult<Envelope<()>> {
    let id = required_id(&req.id, "provide _id")?;

    if !Product::delete(&state.db, id).await? {
        return Err(ApiError::NotFound("Product not found".to_string()));
    }

    tracing::info!(product_id = %id, "Product deleted");
    Ok(ok("Delete successfully", ()))
}

/// Search with page metadata
pub async fn search_products(
    State(state): State<AppState>,
    Json(req): Json<ListRequest>,
) -> ApiResult<Json<ProductPage>> {
    let page = Pagination::new(req.page, req.limit);
    let (data, total) = Product::list(&state.db, present(&req.search), page).await?;

    let mut body = ProductPage::new("Product data", data, total).with_position(page);
    body.total_page = Some(page.total_pages(total));

    Ok(Json(body))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fields_accept_numeric_and_string_price() {
        let fields: ProductFields = serde_json::from_value(serde_json::json!({
            "name": "Basmati Rice",
            "price": 120.5,
            "subCategory": ["7f0c1e7e-1c39-4c1b-9a9e-0a5a1f4b8c11"]
        }))
        .unwrap();
        assert_eq!(fields.price, Some(Decimal::new(1205, 1)));
        assert_eq!(fields.sub_category.map(|v| v.len()), Some(1));

        let fields: ProductFields = serde_json::from_value(serde_json::json!({ "price": "99.90" })).unwrap();
        assert_eq!(fields.price, Some(Decimal::new(9990, 2)));
    }

    #[test]
    fn test_discount_range() {
        let fields = ProductFields {
            discount: Some(120),
            ..Default::default()
        };
        assert!(fields.validate().is_err());

        let fields = ProductFields {
            discount: Some(100),
            stock: Some(0),
            ..Default::default()
        };
        assert!(fields.validate().is_ok());
    }

    #[test]
    fn test_page_shapes() {
        let page = Pagination::new(Some(2), Some(5));

        let mut body = ProductPage::new("Product data", vec![], 12);
        body.total_no_page = Some(page.total_pages(12));
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["totalCount"], 12);
        assert_eq!(json["totalNoPage"], 3);
        assert!(json.get("page").is_none());

        let json = serde_json::to_value(ProductPage::new("Product list", vec![], 0).with_position(page)).unwrap();
        assert_eq!(json["page"], 2);
        assert_eq!(json["limit"], 5);
        assert!(json.get("totalNoPage").is_none());
        assert_eq!(json["success"], true);
    }
}
