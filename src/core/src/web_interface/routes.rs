use std::sync::Arc;

use warp::{http::StatusCode, reply, Filter, Rejection, Reply};

use super::types::{ApiError, SelectResponse};
use crate::error_handling::types::FeedError;
use crate::feed::FeedSynchronizer;
use crate::presentation::StreamRow;

const DASHBOARD: &str = r#"<html><head><title>flagwatch</title></head>
<body><h1>flagwatch</h1>
<p><a href="/feed">/feed</a> lists the streams, newest first.</p>
<p><a href="/feed/selected">/feed/selected</a> shows the selected stream with its packets.</p>
<p><a href="/status">/status</a> reports the synchronization state.</p>
</body></html>"#;

/// Every dashboard route.
pub fn routes(
    feed: Arc<FeedSynchronizer>,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    dashboard_route()
        .or(list_feed_route(feed.clone()))
        .or(selected_stream_route(feed.clone()))
        .or(select_stream_route(feed.clone()))
        .or(status_route(feed))
}

fn with_feed(
    feed: Arc<FeedSynchronizer>,
) -> impl Filter<Extract = (Arc<FeedSynchronizer>,), Error = std::convert::Infallible> + Clone {
    warp::any().map(move || feed.clone())
}

/// GET /
pub fn dashboard_route() -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    warp::path::end()
        .and(warp::get())
        .map(|| reply::html(DASHBOARD))
}

/// GET /feed
pub fn list_feed_route(
    feed: Arc<FeedSynchronizer>,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    warp::path("feed")
        .and(warp::path::end())
        .and(warp::get())
        .and(with_feed(feed))
        .map(|feed: Arc<FeedSynchronizer>| {
            let rows: Vec<StreamRow> =
                feed.with_state(|state| state.streams.iter().map(StreamRow::from).collect());
            reply::json(&rows)
        })
}

/// GET /feed/selected
pub fn selected_stream_route(
    feed: Arc<FeedSynchronizer>,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    warp::path!("feed" / "selected")
        .and(warp::get())
        .and(with_feed(feed))
        .map(|feed: Arc<FeedSynchronizer>| {
            match feed.with_state(|state| state.selected().cloned()) {
                Some(entry) => reply::with_status(reply::json(&entry), StatusCode::OK),
                None => reply::with_status(
                    reply::json(&ApiError::new("No stream selected")),
                    StatusCode::NOT_FOUND,
                ),
            }
        })
}

/// POST /feed/select/:id
pub fn select_stream_route(
    feed: Arc<FeedSynchronizer>,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    warp::path!("feed" / "select" / i64)
        .and(warp::post())
        .and(with_feed(feed))
        .map(|id: i64, feed: Arc<FeedSynchronizer>| match feed.select_stream(id) {
            Ok(()) => reply::with_status(
                reply::json(&SelectResponse { selected: id }),
                StatusCode::OK,
            ),
            Err(FeedError::UnknownStream(_)) => reply::with_status(
                reply::json(&ApiError::new(format!("Stream {} is not in the feed", id))),
                StatusCode::NOT_FOUND,
            ),
            Err(e) => reply::with_status(
                reply::json(&ApiError::new(e.to_string())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        })
}

/// GET /status
pub fn status_route(
    feed: Arc<FeedSynchronizer>,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    warp::path("status")
        .and(warp::path::end())
        .and(warp::get())
        .and(with_feed(feed))
        .map(|feed: Arc<FeedSynchronizer>| reply::json(&feed.status()))
}
