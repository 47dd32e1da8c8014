use uuid::Uuid;

use crate::{
    dto::products::{
        CreateCategoryRequest, CreateProductRequest, ProductList, ProductQuery,
        UpdateProductRequest,
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{Category, Product},
    response::{Ack, ApiResponse, Meta},
    state::AppState,
    storage::{NewCategory, NewProduct, ProductChanges, ProductFilter},
};

pub async fn list_categories(state: &AppState) -> AppResult<ApiResponse<Vec<Category>>> {
    let categories = state.storage.list_categories().await?;
    Ok(ApiResponse::success("Categories", categories, None))
}

pub async fn create_category(
    state: &AppState,
    user: &AuthUser,
    payload: CreateCategoryRequest,
) -> AppResult<ApiResponse<Category>> {
    ensure_admin(user)?;
    let category = state
        .storage
        .create_category(NewCategory {
            name: payload.name.trim().to_string(),
            icon: payload.icon,
            color: payload.color,
            description: payload.description,
        })
        .await?;
    tracing::info!(category_id = %category.id, admin_id = %user.user_id, "category created");

    Ok(ApiResponse::success(
        "Category created",
        category,
        Some(Meta::empty()),
    ))
}

pub async fn list_products(
    state: &AppState,
    query: ProductQuery,
) -> AppResult<ApiResponse<ProductList>> {
    let (page, limit, offset) = query.pagination().normalize();
    let filter = ProductFilter {
        category_id: query.category_id,
        search: query
            .search
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty()),
        featured: query.featured,
        flash_deal: query.flash_deal,
        limit: Some(limit as u64),
        offset: offset as u64,
    };

    let (items, total) = state.storage.list_products(&filter).await?;

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success(
        "Products",
        ProductList { items },
        Some(meta),
    ))
}

pub async fn get_product(state: &AppState, id: Uuid) -> AppResult<ApiResponse<Product>> {
    let product = match state.storage.get_product(id).await? {
        Some(p) => p,
        None => return Err(AppError::NotFound),
    };
    Ok(ApiResponse::success("Product", product, None))
}

pub async fn create_product(
    state: &AppState,
    user: &AuthUser,
    payload: CreateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_admin(user)?;
    if let Some(category_id) = payload.category_id {
        if state.storage.get_category(category_id).await?.is_none() {
            return Err(AppError::BadRequest(format!(
                "category {category_id} does not exist"
            )));
        }
    }

    let product = state
        .storage
        .create_product(NewProduct {
            name: payload.name.trim().to_string(),
            description: payload.description,
            price: payload.price,
            original_price: payload.original_price,
            image: payload.image,
            images: payload.images,
            category_id: payload.category_id,
            rating: payload.rating,
            review_count: payload.review_count,
            in_stock: payload.in_stock,
            featured: payload.featured,
            flash_deal: payload.flash_deal,
            discount_percentage: payload.discount_percentage,
            delivery_time: payload.delivery_time,
            tags: payload.tags,
        })
        .await?;
    tracing::info!(product_id = %product.id, admin_id = %user.user_id, "product created");

    Ok(ApiResponse::success(
        "Product created",
        product,
        Some(Meta::empty()),
    ))
}

pub async fn update_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_admin(user)?;
    let changes = ProductChanges {
        name: payload.name.map(|n| n.trim().to_string()),
        description: payload.description,
        price: payload.price,
        original_price: payload.original_price,
        in_stock: payload.in_stock,
        featured: payload.featured,
        flash_deal: payload.flash_deal,
        discount_percentage: payload.discount_percentage,
    };

    let product = state
        .storage
        .update_product(id, changes)
        .await?
        .ok_or(AppError::NotFound)?;
    tracing::info!(product_id = %product.id, admin_id = %user.user_id, "product updated");

    Ok(ApiResponse::success(
        "Updated",
        product,
        Some(Meta::empty()),
    ))
}

pub async fn delete_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Ack>> {
    ensure_admin(user)?;
    if !state.storage.delete_product(id).await? {
        return Err(AppError::NotFound);
    }
    tracing::info!(product_id = %id, admin_id = %user.user_id, "product deleted");

    Ok(ApiResponse::success(
        "Deleted",
        Ack::ok(),
        Some(Meta::empty()),
    ))
}
