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
use bookshelf_store::{get_as, Aggregation, Refresh, SearchRequest, Sort};
use validator::Validate;

use super::models::{Book, BookWithReviews, CreateBook};
use crate::modules::reviews::{
    models::{CreateBookReview, Review},
    routes::{find_review, write_review},
};
use crate::utils::{
    self,
    pagination::{Page, PageParams, SortedPageParams, SORT_FIELD},
    Created,
};

/// Reviews shown on the book detail view.
const DETAIL_REVIEWS: usize = 100;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/books", get(list_books).post(create_book))
        .route("/books/", get(list_books).post(create_book))
        .route("/books/plus-reviews/{book_id}", get(get_book_with_reviews))
        .route("/books/{book_id}", get(get_book))
        .route(
            "/books/{book_id}/reviews",
            get(list_book_reviews).post(create_book_review),
        )
        .route(
            "/books/{book_id}/reviews/",
            get(list_book_reviews).post(create_book_review),
        )
        .route("/books/{book_id}/reviews/{review_id}", get(get_book_review))
        .with_state(state)
}

async fn find_book(state: &AppState, book_id: &str) -> Result<Book, AppError> {
    get_as::<Book>(state.store.as_ref(), &state.indices.books, book_id)
        .await?
        .ok_or_else(|| AppError::not_found("Book not found"))
}

fn reviews_of(book_id: &str) -> bookshelf_store::Query {
    bookshelf_store::Query::term("book_id", book_id)
}

async fn create_book(
    State(state): State<AppState>,
    payload: Result<Json<CreateBook>, JsonRejection>,
) -> Result<Json<Created>, AppError> {
    let Json(payload) = payload?;

    let book = payload.into_book(utils::gen_id(), utils::now_iso());
    let document = serde_json::to_value(&book).map_err(anyhow::Error::from)?;
    state
        .store
        .index(&state.indices.books, &book.id, document, Refresh::Immediate)
        .await?;

    tracing::info!(book_id = %book.id, title = %book.title, "book created");
    Ok(Json(Created { id: book.id }))
}

async fn get_book(
    State(state): State<AppState>,
    book_id: Result<Path<String>, PathRejection>,
) -> Result<Json<Book>, AppError> {
    let Path(book_id) = book_id?;
    Ok(Json(find_book(&state, &book_id).await?))
}

async fn list_books(
    State(state): State<AppState>,
    params: Result<Query<SortedPageParams>, QueryRejection>,
) -> Result<Json<Page<Book>>, AppError> {
    let Query(params) = params?;
    params.validate()?;

    let pagination = params.pagination();
    let request = SearchRequest::new(bookshelf_store::Query::MatchAll)
        .sort(params.sort_clause())
        .page(pagination.offset(), pagination.size as usize);
    let response = state.store.search(&state.indices.books, &request).await?;

    let items = response.hits_as::<Book>()?;
    Ok(Json(Page::new(response.total, &pagination, items)))
}

async fn get_book_with_reviews(
    State(state): State<AppState>,
    book_id: Result<Path<String>, PathRejection>,
) -> Result<Json<BookWithReviews>, AppError> {
    let Path(book_id) = book_id?;
    let book = find_book(&state, &book_id).await?;

    let rating = SearchRequest::new(reviews_of(&book_id))
        .aggregate("avg_rating", Aggregation::avg("rating"));
    let avg_rating = state
        .store
        .search(&state.indices.reviews, &rating)
        .await?
        .metric("avg_rating");

    let latest = SearchRequest::new(reviews_of(&book_id))
        .sort(Sort::desc(SORT_FIELD))
        .page(0, DETAIL_REVIEWS);
    let reviews = state
        .store
        .search(&state.indices.reviews, &latest)
        .await?
        .hits_as::<Review>()?;

    tracing::debug!(%book_id, ?avg_rating, reviews = reviews.len(), "book detail assembled");
    Ok(Json(BookWithReviews {
        book,
        avg_rating,
        reviews,
    }))
}

async fn create_book_review(
    State(state): State<AppState>,
    book_id: Result<Path<String>, PathRejection>,
    payload: Result<Json<CreateBookReview>, JsonRejection>,
) -> Result<Json<Created>, AppError> {
    let Path(book_id) = book_id?;
    let Json(payload) = payload?;
    payload.validate()?;

    let created = write_review(
        &state,
        book_id,
        payload.rating,
        payload.text,
        Refresh::WaitFor,
    )
    .await?;
    Ok(Json(created))
}

async fn get_book_review(
    State(state): State<AppState>,
    ids: Result<Path<(String, String)>, PathRejection>,
) -> Result<Json<Review>, AppError> {
    let Path((book_id, review_id)) = ids?;

    let review = find_review(&state, &review_id).await?;
    if review.book_id != book_id {
        tracing::warn!(%book_id, %review_id, owner = %review.book_id, "review fetched under wrong book");
        return Err(AppError::bad_request("Review does not belong to this book"));
    }
    Ok(Json(review))
}

async fn list_book_reviews(
    State(state): State<AppState>,
    book_id: Result<Path<String>, PathRejection>,
    params: Result<Query<PageParams>, QueryRejection>,
) -> Result<Json<Page<Review>>, AppError> {
    let Path(book_id) = book_id?;
    let Query(params) = params?;
    params.validate()?;

    let request = SearchRequest::new(reviews_of(&book_id))
        .sort(Sort::desc(SORT_FIELD))
        .page(params.offset(), params.size as usize);
    let response = state
        .store
        .search(&state.indices.reviews, &request)
        .await?;

    let items = response.hits_as::<Review>()?;
    Ok(Json(Page::new(response.total, &params, items)))
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use serde_json::json;
    use tower::ServiceExt;

    use super::*;
    use crate::modules::testing::down_state;

    fn post_review(body: serde_json::Value) -> Request<Body> {
        Request::post("/books/b1/reviews/")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn scoped_review_reports_store_failure_as_bad_gateway() {
        let response = router(down_state())
            .oneshot(post_review(json!({"rating": 4, "text": "x"})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn scoped_review_validates_before_the_parent_lookup() {
        let response = router(down_state())
            .oneshot(post_review(json!({"rating": 9, "text": "x"})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
