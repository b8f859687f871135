use hyper::Method;
use serde::Deserialize;
use std::collections::HashSet;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigValidationError {
    #[error("Port cannot be 0")]
    InvalidPort,

    #[error("Listener address used more than once: {0}")]
    DuplicateListener(String),

    #[error("Store url cannot be empty")]
    EmptyStoreUrl,

    #[error("Invalid table name: {0:?}")]
    InvalidTableName(String),

    #[error("{0} must be greater than 0")]
    ZeroValue(&'static str),

    #[error("Push key parameter cannot be empty")]
    EmptyKeyParam,

    #[error("At least one import route is required")]
    NoRoutes,
}

/// HTTP methods supported for route matching
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_method(&self) -> Method {
        match self {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
            HttpMethod::Put => Method::PUT,
            HttpMethod::Delete => Method::DELETE,
        }
    }
}

impl PartialEq<Method> for HttpMethod {
    fn eq(&self, other: &Method) -> bool {
        self.as_method() == *other
    }
}

/// Ingestion service configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Config {
    /// Listener for the JSON and spreadsheet import endpoints
    pub listener: Listener,
    /// Listener for the fire-and-acknowledge push endpoint
    pub push_listener: Listener,
    /// Listener for health and readiness probes
    pub admin_listener: Listener,
    pub store: StoreConfig,
    #[serde(default)]
    pub import: ImportConfig,
    #[serde(default)]
    pub dedup: DedupConfig,
    #[serde(default)]
    pub push: PushConfig,
    /// Import routing rules, first match wins
    #[serde(default = "default_routes")]
    pub routes: Vec<Route>,
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        let mut addresses = HashSet::new();
        for listener in [&self.listener, &self.push_listener, &self.admin_listener] {
            listener.validate()?;
            let address = format!("{}:{}", listener.host, listener.port);
            if !addresses.insert(address.clone()) {
                return Err(ConfigValidationError::DuplicateListener(address));
            }
        }

        self.store.validate()?;
        self.import.validate()?;
        self.dedup.validate()?;
        self.push.validate()?;

        if self.routes.is_empty() {
            return Err(ConfigValidationError::NoRoutes);
        }

        Ok(())
    }
}

/// Network listener configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Listener {
    /// Host address to bind to (e.g., "0.0.0.0" or "127.0.0.1")
    pub host: String,
    /// Port number to listen on
    pub port: u16,
}

impl Listener {
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.port == 0 {
            return Err(ConfigValidationError::InvalidPort);
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct StoreConfig {
    /// Connection url, e.g. `mysql://user:pass@db:3306/callcenter`
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_acquire_timeout_secs")]
    pub acquire_timeout_secs: u64,
    /// Upper bound for each store operation of an import attempt
    #[serde(default = "default_operation_timeout_secs")]
    pub operation_timeout_secs: u64,
}

impl StoreConfig {
    pub fn operation_timeout(&self) -> Duration {
        Duration::from_secs(self.operation_timeout_secs)
    }

    fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.url.trim().is_empty() {
            return Err(ConfigValidationError::EmptyStoreUrl);
        }
        if self.max_connections == 0 {
            return Err(ConfigValidationError::ZeroValue("store.max_connections"));
        }
        if self.operation_timeout_secs == 0 {
            return Err(ConfigValidationError::ZeroValue("store.operation_timeout_secs"));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct ImportConfig {
    /// Table receiving call records, keyed by `call_id`
    pub table: String,
    /// Append-only table receiving one row per import attempt
    pub audit_table: String,
    pub chunk_size: usize,
    pub max_body_bytes: usize,
    /// Multipart field carrying the spreadsheet
    pub upload_field: String,
}

impl Default for ImportConfig {
    fn default() -> Self {
        ImportConfig {
            table: "call_records".into(),
            audit_table: "import_logs".into(),
            chunk_size: 1000,
            max_body_bytes: 32 * 1024 * 1024,
            upload_field: "file".into(),
        }
    }
}

impl ImportConfig {
    fn validate(&self) -> Result<(), ConfigValidationError> {
        for table in [&self.table, &self.audit_table] {
            if !is_identifier(table) {
                return Err(ConfigValidationError::InvalidTableName(table.clone()));
            }
        }
        if self.chunk_size == 0 {
            return Err(ConfigValidationError::ZeroValue("import.chunk_size"));
        }
        if self.max_body_bytes == 0 {
            return Err(ConfigValidationError::ZeroValue("import.max_body_bytes"));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct DedupConfig {
    pub ttl_secs: u64,
    pub max_entries: u64,
}

impl Default for DedupConfig {
    fn default() -> Self {
        DedupConfig {
            ttl_secs: 300,
            max_entries: 100_000,
        }
    }
}

impl DedupConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.ttl_secs == 0 {
            return Err(ConfigValidationError::ZeroValue("dedup.ttl_secs"));
        }
        if self.max_entries == 0 {
            return Err(ConfigValidationError::ZeroValue("dedup.max_entries"));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct PushConfig {
    pub path: String,
    pub method: HttpMethod,
    /// Query parameter carrying the idempotency key
    pub key_param: String,
    pub queue_capacity: usize,
    /// Persistence jobs allowed to run at the same time
    pub worker_concurrency: usize,
}

impl Default for PushConfig {
    fn default() -> Self {
        PushConfig {
            path: "/api/callsheet/push".into(),
            method: HttpMethod::Get,
            key_param: "CallSheetID".into(),
            queue_capacity: 1024,
            worker_concurrency: 4,
        }
    }
}

impl PushConfig {
    fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.key_param.is_empty() {
            return Err(ConfigValidationError::EmptyKeyParam);
        }
        if self.queue_capacity == 0 {
            return Err(ConfigValidationError::ZeroValue("push.queue_capacity"));
        }
        if self.worker_concurrency == 0 {
            return Err(ConfigValidationError::ZeroValue("push.worker_concurrency"));
        }
        Ok(())
    }
}

/// Routing rule configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Route {
    /// Conditions for matching incoming requests
    pub r#match: Match,
    /// Import handler serving the matched request
    pub action: HandlerAction,
}

/// Request matching criteria
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct Match {
    /// Optional hostname to match (e.g., "import.internal")
    pub host: Option<String>,
    /// Optional path to match (e.g., "/api/import/json")
    pub path: Option<String>,
    /// Optional HTTP method to match
    pub method: Option<HttpMethod>,
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum HandlerAction {
    ImportJson,
    ImportSpreadsheet,
}

impl HandlerAction {
    pub const fn name(&self) -> &'static str {
        match self {
            HandlerAction::ImportJson => "import_json",
            HandlerAction::ImportSpreadsheet => "import_spreadsheet",
        }
    }
}

fn default_routes() -> Vec<Route> {
    vec![
        Route {
            r#match: Match {
                host: None,
                path: Some("/api/import/json".into()),
                method: Some(HttpMethod::Post),
            },
            action: HandlerAction::ImportJson,
        },
        Route {
            r#match: Match {
                host: None,
                path: Some("/api/import/spreadsheet".into()),
                method: Some(HttpMethod::Post),
            },
            action: HandlerAction::ImportSpreadsheet,
        },
    ]
}

fn default_max_connections() -> u32 {
    10
}

fn default_acquire_timeout_secs() -> u64 {
    5
}

fn default_operation_timeout_secs() -> u64 {
    30
}

// Table names are spliced into SQL as identifiers, so only plain names pass.
fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
