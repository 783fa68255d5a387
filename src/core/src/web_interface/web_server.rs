use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use log::info;

use super::routes::routes;
use crate::error_handling::types::WebError;
use crate::feed::FeedSynchronizer;

/// Web server for the dashboard.
pub struct WebServer {
    feed: Arc<FeedSynchronizer>,
}

impl WebServer {
    pub fn new(feed: Arc<FeedSynchronizer>) -> Self {
        Self { feed }
    }

    /// Binds `addr` and returns the bound address with the future serving
    /// requests until `shutdown` resolves. Port 0 picks a free port.
    pub fn bind(
        &self,
        addr: SocketAddr,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> Result<(SocketAddr, impl Future<Output = ()> + Send + 'static), WebError> {
        let (bound, server) = warp::serve(routes(self.feed.clone()))
            .try_bind_with_graceful_shutdown(addr, shutdown)
            .map_err(|e| WebError::BindFailed(format!("{}: {}", addr, e)))?;
        info!("Dashboard listening on http://{}", bound);
        Ok((bound, server))
    }

    /// Serves the dashboard on `addr` until `shutdown` resolves.
    pub async fn start(
        &self,
        addr: SocketAddr,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> Result<(), WebError> {
        let (_, server) = self.bind(addr, shutdown)?;
        server.await;
        info!("Dashboard stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::{batch, ScriptedApi};
    use crate::feed::FeedOptions;
    use crate::notification::testing::RecordingNotifier;
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn serves_feed_until_shutdown() {
        let _ = env_logger::builder().is_test(true).try_init();
        let api = Arc::new(ScriptedApi::new());
        let feed = Arc::new(FeedSynchronizer::new(
            api.clone(),
            Arc::new(RecordingNotifier::default()),
            FeedOptions::default(),
        ));
        api.push_last_streams(Ok(batch(&[3, 2, 1])));
        feed.initial_load(3).await.unwrap();

        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let server = WebServer::new(feed);
        let (addr, serving) = server
            .bind(([127, 0, 0, 1], 0).into(), async {
                let _ = stop_rx.await;
            })
            .unwrap();
        let task = tokio::spawn(serving);

        let rows: serde_json::Value = reqwest::get(format!("http://{}/feed", addr))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(rows.as_array().unwrap().len(), 3);

        stop_tx.send(()).unwrap();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn bind_conflict_is_reported() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let taken = listener.local_addr().unwrap();
        let feed = Arc::new(FeedSynchronizer::new(
            Arc::new(ScriptedApi::new()),
            Arc::new(RecordingNotifier::default()),
            FeedOptions::default(),
        ));

        let result = WebServer::new(feed).bind(taken, async {});
        assert!(matches!(result, Err(WebError::BindFailed(_))));
    }
}
