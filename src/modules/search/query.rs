//! Search request construction for `GET /search/`.

use std::collections::BTreeMap;

use bookshelf_store::{Aggregation, Query, SearchRequest, Sort};

use super::models::SearchParams;
use crate::utils::pagination::SORT_FIELD;

/// Fields searched by free text. Title weighs 3x, author 2x; the `raw`
/// subfields only match the exact stored value.
pub const TEXT_FIELDS: [&str; 5] = ["title^3", "author^2", "genres", "title.raw", "author.raw"];

pub const BY_BOOK: &str = "by_book";
pub const AVG_RATING: &str = "avg_rating";

/// Books query for one page of results.
///
/// Relevance order with free text, newest first otherwise.
pub fn books_request(params: &SearchParams) -> SearchRequest {
    let mut must = Vec::new();
    let mut filter = Vec::new();

    if let Some(text) = params.text() {
        must.push(Query::multi_match(text, TEXT_FIELDS));
    }
    if let Some(genre) = params.genre() {
        filter.push(Query::term("genres", genre));
    }
    if let Some(year) = params.year {
        filter.push(Query::term("year", year));
    }

    let query = if must.is_empty() && filter.is_empty() {
        Query::MatchAll
    } else {
        Query::Bool { must, filter }
    };

    let pagination = params.pagination();
    let mut request = SearchRequest::new(query).page(pagination.offset(), pagination.size as usize);
    if params.text().is_none() {
        request = request.sort(Sort::desc(SORT_FIELD));
    }
    request
}

/// Mean rating per book, restricted to `book_ids`.
pub fn ratings_request(book_ids: &[String]) -> SearchRequest {
    let mut per_book = BTreeMap::new();
    per_book.insert(AVG_RATING.to_string(), Aggregation::avg("rating"));

    SearchRequest::new(Query::terms("book_id", book_ids.iter().cloned())).aggregate(
        BY_BOOK,
        Aggregation::Terms {
            field: "book_id".to_string(),
            size: book_ids.len(),
            order: None,
            aggs: per_book,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params() -> SearchParams {
        SearchParams {
            page: 1,
            size: 20,
            ..Default::default()
        }
    }

    #[test]
    fn no_filters_match_everything_newest_first() {
        let request = books_request(&params());

        assert_eq!(request.query, Query::MatchAll);
        assert_eq!(request.sort, vec![Sort::desc("created_at")]);
        assert_eq!(request.from, 0);
        assert_eq!(request.size, 20);
    }

    #[test]
    fn free_text_ranks_by_relevance() {
        let request = books_request(&SearchParams {
            query_main: Some("dune".to_string()),
            ..params()
        });

        assert!(request.sort.is_empty());
        assert_eq!(
            request.query.to_json(),
            json!({
                "bool": {
                    "must": [{
                        "multi_match": {
                            "query": "dune",
                            "fields": ["title^3", "author^2", "genres", "title.raw", "author.raw"]
                        }
                    }],
                    "filter": []
                }
            })
        );
    }

    #[test]
    fn genre_and_year_become_filters() {
        let request = books_request(&SearchParams {
            genre: Some("sci-fi".to_string()),
            year: Some(1965),
            page: 3,
            size: 10,
            ..params()
        });

        assert_eq!(
            request.query,
            Query::Bool {
                must: vec![],
                filter: vec![Query::term("genres", "sci-fi"), Query::term("year", 1965)],
            }
        );
        assert_eq!(request.sort, vec![Sort::desc("created_at")]);
        assert_eq!(request.from, 20);
    }

    #[test]
    fn blank_text_is_ignored() {
        let request = books_request(&SearchParams {
            query_main: Some("   ".to_string()),
            genre: Some(String::new()),
            ..params()
        });

        assert_eq!(request.query, Query::MatchAll);
    }

    #[test]
    fn ratings_aggregate_per_returned_book() {
        let ids = vec!["b1".to_string(), "b2".to_string()];
        let request = ratings_request(&ids);

        assert_eq!(request.size, 0);
        assert_eq!(
            request.to_json()["aggs"],
            json!({
                "by_book": {
                    "terms": { "field": "book_id", "size": 2 },
                    "aggs": { "avg_rating": { "avg": { "field": "rating" } } }
                }
            })
        );
        assert_eq!(request.query, Query::terms("book_id", ["b1", "b2"]));
    }
}
