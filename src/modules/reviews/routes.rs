use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    routing::get,
    Json, Router,
};
use bookshelf_http::AppError;
use bookshelf_kernel::AppState;
use bookshelf_store::{get_as, Refresh, SearchRequest};
use validator::Validate;

use super::models::{CreateReview, Review};
use crate::utils::{
    self,
    pagination::{Page, SortedPageParams},
    Created,
};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/reviews", get(list_reviews).post(create_review))
        .route("/reviews/", get(list_reviews).post(create_review))
        .route("/reviews/{review_id}", get(get_review))
        .with_state(state)
}

/// Fails with 404 unless the book exists. Store failures stay store failures.
pub(crate) async fn require_book(state: &AppState, book_id: &str) -> Result<(), AppError> {
    match state.store.get(&state.indices.books, book_id).await? {
        Some(_) => Ok(()),
        None => {
            tracing::warn!(book_id, "review rejected, book not found");
            Err(AppError::not_found("Book not found"))
        }
    }
}

/// Checks the parent book, then writes a new review at the given durability.
pub(crate) async fn write_review(
    state: &AppState,
    book_id: String,
    rating: i32,
    text: String,
    refresh: Refresh,
) -> Result<Created, AppError> {
    require_book(state, &book_id).await?;

    let review = Review::new(utils::gen_id(), book_id, rating, text, utils::now_iso());
    let document = serde_json::to_value(&review).map_err(anyhow::Error::from)?;
    state
        .store
        .index(&state.indices.reviews, &review.id, document, refresh)
        .await?;

    tracing::info!(review_id = %review.id, book_id = %review.book_id, "review created");
    Ok(Created { id: review.id })
}

pub(crate) async fn find_review(state: &AppState, review_id: &str) -> Result<Review, AppError> {
    get_as::<Review>(state.store.as_ref(), &state.indices.reviews, review_id)
        .await?
        .ok_or_else(|| AppError::not_found("Review not found"))
}

async fn create_review(
    State(state): State<AppState>,
    payload: Result<Json<CreateReview>, JsonRejection>,
) -> Result<Json<Created>, AppError> {
    let Json(payload) = payload?;
    payload.validate()?;

    let created = write_review(
        &state,
        payload.book_id,
        payload.rating,
        payload.text,
        Refresh::Immediate,
    )
    .await?;
    Ok(Json(created))
}

async fn get_review(
    State(state): State<AppState>,
    review_id: Result<Path<String>, PathRejection>,
) -> Result<Json<Review>, AppError> {
    let Path(review_id) = review_id?;
    Ok(Json(find_review(&state, &review_id).await?))
}

async fn list_reviews(
    State(state): State<AppState>,
    params: Result<Query<SortedPageParams>, QueryRejection>,
) -> Result<Json<Page<Review>>, AppError> {
    let Query(params) = params?;
    params.validate()?;

    let pagination = params.pagination();
    let request = SearchRequest::new(bookshelf_store::Query::MatchAll)
        .sort(params.sort_clause())
        .page(pagination.offset(), pagination.size as usize);
    let response = state
        .store
        .search(&state.indices.reviews, &request)
        .await?;

    let items = response.hits_as::<Review>()?;
    Ok(Json(Page::new(response.total, &pagination, items)))
}
