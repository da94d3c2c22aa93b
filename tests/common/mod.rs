//! Shared harness for integration tests.
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use chrono::{DateTime, Utc};
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use tenant_platform::billing::{CheckoutRequest, CheckoutSession, PaymentProvider, ProviderError};
use tenant_platform::lifecycle::{bootstrap, Backends, Shutdown};
use tenant_platform::models::{
    AuditQuery, AuditRecord, NewAuditRecord, NewUser, Organization, OrganizationUpdate,
    SubscriptionChange, User, UserUpdate,
};
use tenant_platform::store::{
    CounterStore, CounterStoreError, MemoryCounterStore, MemoryPersistence, Persistence, StoreError,
    StoreResult, WindowDecision, WindowRequest,
};
use tenant_platform::{AppState, HttpServer, PlatformConfig};

pub const WEBHOOK_SECRET: &str = "whsec_test";

pub fn test_config() -> PlatformConfig {
    let mut config = PlatformConfig::default();
    config.auth.jwt_secret = "integration-test-secret".into();
    config.billing.secret_key = "sk_test".into();
    config.billing.webhook_secret = WEBHOOK_SECRET.into();
    config.features.billing = true;
    config
}

/// Payment provider that never leaves the process.
#[derive(Default)]
pub struct FakeProvider {
    pub customers: AtomicUsize,
    pub checkouts: AtomicUsize,
}

#[async_trait]
impl PaymentProvider for FakeProvider {
    async fn create_customer(&self, _email: &str, _org: Uuid, _name: &str) -> Result<String, ProviderError> {
        let n = self.customers.fetch_add(1, Ordering::SeqCst);
        Ok(format!("cus_test_{n}"))
    }

    async fn create_checkout_session(&self, request: CheckoutRequest<'_>) -> Result<CheckoutSession, ProviderError> {
        let n = self.checkouts.fetch_add(1, Ordering::SeqCst);
        Ok(CheckoutSession {
            id: format!("cs_test_{n}"),
            url: format!("https://checkout.test/{}/{}", request.customer_id, request.price_id),
        })
    }
}

/// Counter store that is always down.
pub struct DownCounterStore;

#[async_trait]
impl CounterStore for DownCounterStore {
    async fn admit(&self, _request: WindowRequest<'_>) -> Result<WindowDecision, CounterStoreError> {
        Err(CounterStoreError::Unavailable("connection refused".into()))
    }

    async fn ping(&self) -> Result<(), CounterStoreError> {
        Err(CounterStoreError::Unavailable("connection refused".into()))
    }
}

/// Wraps [`MemoryPersistence`], delaying or failing audit inserts.
pub struct SlowAuditPersistence {
    pub inner: Arc<MemoryPersistence>,
    pub delay: Duration,
    pub fail: bool,
}

#[async_trait]
impl Persistence for SlowAuditPersistence {
    async fn ping(&self) -> StoreResult<()> {
        self.inner.ping().await
    }

    async fn organization_by_id(&self, id: Uuid) -> StoreResult<Option<Organization>> {
        self.inner.organization_by_id(id).await
    }

    async fn organization_by_slug(&self, slug: &str) -> StoreResult<Option<Organization>> {
        self.inner.organization_by_slug(slug).await
    }

    async fn organization_by_subscription(&self, subscription_id: &str) -> StoreResult<Option<Organization>> {
        self.inner.organization_by_subscription(subscription_id).await
    }

    async fn user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        self.inner.user_by_email(email).await
    }

    async fn user_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        self.inner.user_by_id(id).await
    }

    async fn register_organization(&self, organization: Organization, admin: NewUser) -> StoreResult<(Organization, User)> {
        self.inner.register_organization(organization, admin).await
    }

    async fn record_login(&self, user_id: Uuid, at: DateTime<Utc>) -> StoreResult<()> {
        self.inner.record_login(user_id, at).await
    }

    async fn set_customer_id(&self, organization_id: Uuid, customer_id: &str) -> StoreResult<()> {
        self.inner.set_customer_id(organization_id, customer_id).await
    }

    async fn apply_subscription_change(&self, organization_id: Uuid, change: SubscriptionChange) -> StoreResult<Organization> {
        self.inner.apply_subscription_change(organization_id, change).await
    }

    async fn prune_audit_records(&self, cutoff: DateTime<Utc>) -> StoreResult<u64> {
        self.inner.prune_audit_records(cutoff).await
    }

    async fn tenant_organization(&self, tenant_id: Uuid) -> StoreResult<Organization> {
        self.inner.tenant_organization(tenant_id).await
    }

    async fn update_organization(&self, tenant_id: Uuid, update: OrganizationUpdate) -> StoreResult<Organization> {
        self.inner.update_organization(tenant_id, update).await
    }

    async fn list_users(&self, tenant_id: Uuid) -> StoreResult<Vec<User>> {
        self.inner.list_users(tenant_id).await
    }

    async fn get_user(&self, tenant_id: Uuid, user_id: Uuid) -> StoreResult<User> {
        self.inner.get_user(tenant_id, user_id).await
    }

    async fn create_user(&self, tenant_id: Uuid, user: NewUser) -> StoreResult<User> {
        self.inner.create_user(tenant_id, user).await
    }

    async fn update_user(&self, tenant_id: Uuid, user_id: Uuid, update: UserUpdate) -> StoreResult<User> {
        self.inner.update_user(tenant_id, user_id, update).await
    }

    async fn delete_user(&self, tenant_id: Uuid, user_id: Uuid) -> StoreResult<()> {
        self.inner.delete_user(tenant_id, user_id).await
    }

    async fn insert_audit_record(&self, tenant_id: Uuid, record: NewAuditRecord) -> StoreResult<AuditRecord> {
        tokio::time::sleep(self.delay).await;
        if self.fail {
            return Err(StoreError::Unavailable("audit table locked".into()));
        }
        self.inner.insert_audit_record(tenant_id, record).await
    }

    async fn query_audit_records(&self, tenant_id: Uuid, query: AuditQuery) -> StoreResult<Vec<AuditRecord>> {
        self.inner.query_audit_records(tenant_id, query).await
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub persistence: Arc<MemoryPersistence>,
    pub provider: Arc<FakeProvider>,
    pub shutdown: Shutdown,
}

pub struct AppBuilder {
    config: PlatformConfig,
    counters: Arc<dyn CounterStore>,
    audit_delay: Option<(Duration, bool)>,
}

impl AppBuilder {
    pub fn new() -> Self {
        Self {
            config: test_config(),
            counters: Arc::new(MemoryCounterStore::new()),
            audit_delay: None,
        }
    }

    pub fn config(mut self, f: impl FnOnce(&mut PlatformConfig)) -> Self {
        f(&mut self.config);
        self
    }

    pub fn counters(mut self, counters: Arc<dyn CounterStore>) -> Self {
        self.counters = counters;
        self
    }

    pub fn slow_audit(mut self, delay: Duration, fail: bool) -> Self {
        self.audit_delay = Some((delay, fail));
        self
    }

    pub fn build(self) -> TestApp {
        let memory = Arc::new(MemoryPersistence::new());
        let persistence: Arc<dyn Persistence> = match self.audit_delay {
            Some((delay, fail)) => Arc::new(SlowAuditPersistence {
                inner: memory.clone(),
                delay,
                fail,
            }),
            None => memory.clone(),
        };
        let provider = Arc::new(FakeProvider::default());
        let shutdown = Shutdown::new();

        let backends = Backends {
            persistence,
            counters: self.counters,
            payments: provider.clone(),
        };
        let platform = bootstrap(self.config, backends, &shutdown).expect("bootstrap");
        let router = HttpServer::new(platform.state.clone()).router();

        TestApp {
            router,
            state: platform.state,
            persistence: memory,
            provider,
            shutdown,
        }
    }
}

pub fn spawn_app() -> TestApp {
    AppBuilder::new().build()
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

impl TestApp {
    pub async fn request(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        self.send(builder.body(body).unwrap()).await
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        TestResponse { status, headers, body }
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> TestResponse {
        self.request(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> TestResponse {
        self.request(Method::POST, uri, token, Some(body)).await
    }

    /// Register an organization and return its admin access token.
    pub async fn register(&self, slug: &str, email: &str) -> String {
        let res = self
            .post(
                "/api/v1/auth/register",
                None,
                serde_json::json!({
                    "organization_name": slug,
                    "organization_slug": slug,
                    "email": email,
                    "password": "password123",
                }),
            )
            .await;
        assert_eq!(res.status, StatusCode::CREATED, "register {slug}: {}", res.body);
        res.body["access_token"].as_str().unwrap().to_string()
    }

    /// Wait until `n` audit records exist, or give up after a second.
    pub async fn wait_for_audit(&self, n: usize) -> bool {
        for _ in 0..100 {
            if self.persistence.audit_len() >= n {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        false
    }
}
