pub mod api;
pub mod audit;
pub mod config;
pub mod errors;
pub mod idempotency;
pub mod ingestor;
pub mod metrics_defs;
pub mod normalizer;
pub mod push_queue;
pub mod record;
pub mod router;
pub mod store;
pub mod tabular;
pub mod upsert;

#[cfg(test)]
mod testutils;

use crate::api::push::PushService;
use crate::config::Config;
use crate::errors::IngestError;
use crate::idempotency::IdempotencyCache;
use crate::ingestor::Ingestor;
use crate::push_queue::PushQueue;
use crate::router::Router;
use crate::store::mysql::MySqlStore;
use crate::tabular::WorkbookReader;
use shared::admin_service::AdminService;
use shared::http::run_http_service;
use std::sync::Arc;

/// Serves the import, push and admin listeners until one of them fails.
pub async fn run(config: Config) -> Result<(), IngestError> {
    config.validate()?;

    let store = Arc::new(MySqlStore::connect_lazy(&config.store)?);
    let ingestor = Ingestor::new(store, &config.import, &config.store);

    let (queue, _worker) = PushQueue::spawn(
        ingestor.clone(),
        config.push.queue_capacity,
        config.push.worker_concurrency,
    );
    let cache = Arc::new(IdempotencyCache::new(
        config.dedup.ttl(),
        config.dedup.max_entries,
    ));

    let router = Router::new(
        config.routes.clone(),
        ingestor,
        Arc::new(WorkbookReader),
        config.import.clone(),
    );
    let push = PushService::new(&config.push, cache, queue.clone());
    let admin = AdminService::<_, IngestError>::new(move || !queue.is_closed());

    tracing::info!(
        table = %config.import.table,
        audit_table = %config.import.audit_table,
        routes = config.routes.len(),
        "Starting ingest service"
    );

    tokio::try_join!(
        run_http_service(&config.listener.host, config.listener.port, router),
        run_http_service(&config.push_listener.host, config.push_listener.port, push),
        run_http_service(&config.admin_listener.host, config.admin_listener.port, admin),
    )?;

    Ok(())
}
