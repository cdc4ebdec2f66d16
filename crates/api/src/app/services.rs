use std::sync::Arc;

use tacklebox_audit::AuditWorkflow;
use tacklebox_auth::{FixedWindowLimiter, SessionIssuer};
use tacklebox_infra::{
    BusinessMutationSink, InMemoryCredentialStore, InMemoryProductStore, InMemorySaleStore,
    LoginService,
};

/// Shared application services, one instance per process.
pub struct AppServices {
    pub workers: Arc<InMemoryCredentialStore>,
    pub products: Arc<InMemoryProductStore>,
    pub sales: InMemorySaleStore,
    pub audit: AuditWorkflow,
    pub sink: BusinessMutationSink,
    pub login: LoginService,
}

pub fn build_services(sessions: Arc<SessionIssuer>) -> AppServices {
    let workers = Arc::new(InMemoryCredentialStore::new());
    let products = Arc::new(InMemoryProductStore::new());
    let sales = InMemorySaleStore::new(Arc::clone(&products), Arc::clone(&workers));
    let sink = BusinessMutationSink::new(Arc::clone(&products), Arc::clone(&workers));
    let login = LoginService::new(
        Arc::clone(&workers),
        sessions,
        FixedWindowLimiter::with_defaults(),
    );

    AppServices {
        workers,
        products,
        sales,
        audit: AuditWorkflow::new(),
        sink,
        login,
    }
}
