//! Fire-and-acknowledge endpoint used by the telephony platform to push call
//! sheets. The caller gets `success` as soon as the record is queued and never
//! learns how persistence went.

use crate::api::utils::HandlerBody;
use crate::config::PushConfig;
use crate::errors::{IngestError, Result};
use crate::idempotency::{IdempotencyCache, Mark};
use crate::push_queue::{PushJob, PushQueue};
use crate::record::{CanonicalRecord, Field};
use hyper::body::Incoming;
use hyper::service::Service;
use hyper::{Method, Request, Response, StatusCode};
use shared::http::make_text_response;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

pub const SUCCESS_TOKEN: &str = "success";

/// Query parameters of a pushed call sheet and the fields they fill.
pub const PUSH_PARAM_MAPPING: &[(&str, Field)] = &[
    ("CallSheetID", Field::CallId),
    ("CallNo", Field::CallerNumber),
    ("CalledNo", Field::CalleeNumber),
    ("CallType", Field::CallType),
    ("Ring", Field::CallTime),
    ("Begin", Field::AgentCallTime),
    ("Department", Field::Department),
    ("AgentName", Field::AgentName),
    ("Agent", Field::AgentId),
    ("State", Field::CallStatus),
    ("Queue", Field::SkillGroup),
    ("CallState", Field::EndNode),
    ("IVRKEY", Field::KeyTrack),
    ("Province", Field::Province),
    ("District", Field::City),
    ("PBX", Field::PbxName),
];

#[derive(Clone)]
pub struct PushService {
    path: Arc<str>,
    method: Method,
    key_param: Arc<str>,
    cache: Arc<IdempotencyCache>,
    queue: PushQueue,
}

impl PushService {
    pub fn new(config: &PushConfig, cache: Arc<IdempotencyCache>, queue: PushQueue) -> Self {
        Self {
            path: config.path.as_str().into(),
            method: config.method.as_method(),
            key_param: config.key_param.as_str().into(),
            cache,
            queue,
        }
    }

    pub async fn handle<B>(&self, request: Request<B>) -> Result<Response<HandlerBody>> {
        if request.method() != self.method || request.uri().path() != &*self.path {
            return Err(IngestError::MethodNotAllowed);
        }

        let params: HashMap<String, String> =
            url::form_urlencoded::parse(request.uri().query().unwrap_or_default().as_bytes())
                .into_owned()
                .collect();

        let key = params
            .get(&*self.key_param)
            .filter(|key| !key.is_empty())
            .cloned()
            .ok_or_else(|| IngestError::MissingParameter(self.key_param.to_string()))?;

        if self.cache.check_and_mark(key.clone()) == Mark::Duplicate {
            tracing::debug!(key = %key, "Duplicate push acknowledged without persisting");
            return Ok(make_text_response(StatusCode::OK, SUCCESS_TOKEN));
        }

        // Marking and queueing happen without yielding, so a dropped request
        // cannot leave a marked key with nothing queued behind it.
        let record = self.record_from_params(&params, &key);
        if let Err(e) = self.queue.try_enqueue(PushJob { key: key.clone(), record }) {
            // Nothing was queued, so a retry of this key must not be swallowed.
            self.cache.forget(&key);
            tracing::warn!(key = %key, error = %e, "Push refused");
            return Err(e.into());
        }

        Ok(make_text_response(StatusCode::OK, SUCCESS_TOKEN))
    }

    fn record_from_params(&self, params: &HashMap<String, String>, key: &str) -> CanonicalRecord {
        let mut record = CanonicalRecord::default();
        for (param, field) in PUSH_PARAM_MAPPING {
            if let Some(value) = params.get(*param) {
                record.set(*field, value.clone());
            }
        }
        record.set(Field::KEY, key.to_string());
        record
    }
}

impl Service<Request<Incoming>> for PushService {
    type Response = Response<HandlerBody>;
    type Error = IngestError;
    type Future =
        Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send + 'static>>;

    fn call(&self, req: Request<Incoming>) -> Self::Future {
        let service = self.clone();
        Box::pin(async move {
            Ok(service
                .handle(req)
                .await
                .unwrap_or_else(IngestError::into_response))
        })
    }
}
