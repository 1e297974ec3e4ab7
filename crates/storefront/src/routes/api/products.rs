//! Product API route handlers.
//!
//! Thin wrappers over `ProductCatalog`; all caching decisions live there.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use storeshelf_core::{DEFAULT_RELATED_LIMIT, ListingQuery, Product};
use tracing::instrument;

use crate::catalog::CatalogStats;
use crate::error::{AppError, Result};
use crate::routes::api::ApiResponse;
use crate::state::AppState;

/// Upper bound for the `limit` parameter of the related-products route.
pub const MAX_RELATED_LIMIT: usize = 12;

/// Query parameters for the product listing.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    /// Comma-separated category names.
    pub categories: Option<String>,
    /// Comma-separated price range tokens (`under_10`, `10_25`, `25_50`, `over_50`, `free`).
    pub price: Option<String>,
    /// Sort order (`newest`, `oldest`, `price_asc`, `price_desc`, `popularity`).
    pub sort: Option<String>,
}

impl ListParams {
    fn to_query(&self) -> Result<ListingQuery> {
        ListingQuery::from_params(
            self.categories.as_deref(),
            self.price.as_deref(),
            self.sort.as_deref(),
        )
        .map_err(|e| AppError::BadRequest(e.to_string()))
    }
}

/// Query parameters for related products.
#[derive(Debug, Default, Deserialize)]
pub struct RelatedParams {
    pub limit: Option<String>,
}

impl RelatedParams {
    fn limit(&self) -> Result<usize> {
        let Some(raw) = self.limit.as_deref() else {
            return Ok(DEFAULT_RELATED_LIMIT);
        };

        match raw.trim().parse::<usize>() {
            Ok(0) | Err(_) => Err(AppError::BadRequest(format!(
                "limit must be between 1 and {MAX_RELATED_LIMIT}"
            ))),
            Ok(n) => Ok(n.min(MAX_RELATED_LIMIT)),
        }
    }
}

/// `GET /api/products`
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<ApiResponse>> {
    let query = params.to_query()?;
    let products = state.catalog().list_products(&query).await?;
    Ok(Json(ApiResponse::products(products)))
}

/// `GET /api/products/{key}` (slug, falling back to ID)
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<ApiResponse>> {
    let product = state.catalog().get_product_by_slug_or_id(&key).await?;
    Ok(Json(ApiResponse::product(Product::clone(&product))))
}

/// `GET /api/products/id/{id}`
#[instrument(skip(state))]
pub async fn show_by_id(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse>> {
    let product = state.catalog().get_product_by_id(&id).await?;
    Ok(Json(ApiResponse::product(Product::clone(&product))))
}

/// `GET /api/products/{key}/related`
#[instrument(skip(state))]
pub async fn related(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Query(params): Query<RelatedParams>,
) -> Result<Json<ApiResponse>> {
    let limit = params.limit()?;
    let catalog = state.catalog();

    let product = catalog.get_product_by_slug_or_id(&key).await?;
    let related = catalog.related_products(&product, limit).await?;
    Ok(Json(ApiResponse::products(related)))
}

/// `GET /api/catalog/stats`
pub async fn stats(State(state): State<AppState>) -> Json<CatalogStats> {
    Json(state.catalog().stats())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn related_params(limit: Option<&str>) -> RelatedParams {
        RelatedParams {
            limit: limit.map(String::from),
        }
    }

    #[test]
    fn test_related_limit_defaults_and_clamps() {
        assert_eq!(related_params(None).limit().unwrap(), DEFAULT_RELATED_LIMIT);
        assert_eq!(related_params(Some("5")).limit().unwrap(), 5);
        assert_eq!(related_params(Some("100")).limit().unwrap(), MAX_RELATED_LIMIT);
    }

    #[test]
    fn test_related_limit_rejects_garbage() {
        assert!(related_params(Some("0")).limit().is_err());
        assert!(related_params(Some("-1")).limit().is_err());
        assert!(related_params(Some("many")).limit().is_err());
    }

    #[test]
    fn test_list_params_reject_unknown_price() {
        let params = ListParams {
            price: Some("under_10,cheap".to_string()),
            ..Default::default()
        };
        assert!(matches!(params.to_query(), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn test_list_params_unknown_sort_falls_back() {
        let params = ListParams {
            sort: Some("random".to_string()),
            ..Default::default()
        };
        assert_eq!(params.to_query().unwrap(), ListingQuery::default());
    }
}
