use crate::api::utils::HandlerBody;
use crate::api::{import_json, import_spreadsheet};
use crate::config::{HandlerAction, ImportConfig, Route};
use crate::errors::{IngestError, Result};
use crate::ingestor::Ingestor;
use crate::metrics_defs::{REQUEST_DURATION, REQUESTS_INFLIGHT};
use crate::tabular::TabularReader;
use hyper::body::{Body, Bytes, Incoming};
use hyper::service::Service;
use hyper::{Request, Response};
use shared::{gauge, histogram};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;

/// Router that matches incoming import requests against configured routes
#[derive(Clone)]
pub struct Router {
    routes: Arc<Vec<Route>>,
    ingestor: Ingestor,
    reader: Arc<dyn TabularReader>,
    import: Arc<ImportConfig>,
}

impl Router {
    pub fn new(
        routes: Vec<Route>,
        ingestor: Ingestor,
        reader: Arc<dyn TabularReader>,
        import: ImportConfig,
    ) -> Self {
        Self {
            routes: Arc::new(routes),
            ingestor,
            reader,
            import: Arc::new(import),
        }
    }

    /// Routes an incoming request to the matching import handler
    pub async fn route<B>(&self, req: Request<B>) -> Response<HandlerBody>
    where
        B: Body<Data = Bytes>,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let started = Instant::now();
        let action = self.find_matching_route(&req);
        let handler = action.map_or("none", |a| a.name());

        let inflight = InflightGuard::new();
        let response = match action {
            Some(action) => {
                tracing::debug!(action = ?action, "Matched route");
                self.handle_action(req, action).await
            }
            None => {
                tracing::warn!(
                    method = %req.method(),
                    path = %req.uri().path(),
                    "No route matched"
                );
                Err(IngestError::NoRouteMatched)
            }
        }
        .unwrap_or_else(IngestError::into_response);
        drop(inflight);

        histogram!(
            REQUEST_DURATION,
            "handler" => handler,
            "status" => response.status().as_str().to_owned()
        )
        .record(started.elapsed().as_secs_f64());

        response
    }

    /// Finds the first route that matches the incoming request
    fn find_matching_route<B>(&self, req: &Request<B>) -> Option<HandlerAction> {
        self.routes
            .iter()
            .find(|route| self.matches_route(req, route))
            .map(|route| route.action)
    }

    /// Checks if a request matches a route's criteria
    fn matches_route<B>(&self, req: &Request<B>, route: &Route) -> bool {
        if let Some(expected_host) = &route.r#match.host {
            let req_host = req
                .headers()
                .get(hyper::header::HOST)
                .and_then(|h| h.to_str().ok());

            match req_host {
                Some(host) => {
                    // Strip port if present for comparison
                    let host_without_port = host.split(':').next().unwrap_or(host);
                    if host_without_port != expected_host {
                        return false;
                    }
                }
                None => return false,
            }
        }

        if let Some(expected_path) = &route.r#match.path
            && req.uri().path() != expected_path
        {
            return false;
        }

        if let Some(expected_method) = &route.r#match.method
            && expected_method != req.method()
        {
            return false;
        }

        true
    }

    async fn handle_action<B>(
        &self,
        req: Request<B>,
        action: HandlerAction,
    ) -> Result<Response<HandlerBody>>
    where
        B: Body<Data = Bytes>,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        match action {
            HandlerAction::ImportJson => {
                import_json::handle(&self.ingestor, req, self.import.max_body_bytes).await
            }
            HandlerAction::ImportSpreadsheet => {
                import_spreadsheet::handle(&self.ingestor, self.reader.clone(), req, &self.import)
                    .await
            }
        }
    }
}

/// Holds one unit of the inflight gauge, released even if the request future
/// is dropped before completing.
struct InflightGuard;

impl InflightGuard {
    fn new() -> Self {
        gauge!(REQUESTS_INFLIGHT).increment(1.0);
        InflightGuard
    }
}

impl Drop for InflightGuard {
    fn drop(&mut self) {
        gauge!(REQUESTS_INFLIGHT).decrement(1.0);
    }
}

impl Service<Request<Incoming>> for Router {
    type Response = Response<HandlerBody>;
    type Error = IngestError;
    type Future =
        Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send + 'static>>;

    fn call(&self, req: Request<Incoming>) -> Self::Future {
        let router = self.clone();
        Box::pin(async move { Ok(router.route(req).await) })
    }
}
