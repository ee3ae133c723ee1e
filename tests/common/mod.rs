//! Shared helpers for integration tests
//!
//! Each test spawns the full router on an ephemeral port with an in-memory
//! database and talks to it over real HTTP.

use std::net::SocketAddr;
use std::sync::Arc;

use bookwarden::admission::AdmissionController;
use bookwarden::auth::{hash_password, CredentialGate, TokenService};
use bookwarden::config::AdmissionConfig;
use bookwarden::database::{Database, SqliteDatabase};
use bookwarden::models::{Role, User};
use bookwarden::server::{build_router, AppState};

pub const TEST_SECRET: &str = "integration-test-secret-0123456789abcdef";

pub struct TestApp {
    pub addr: SocketAddr,
    pub client: reqwest::Client,
    pub database: Arc<SqliteDatabase>,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Insert a user directly into the store, bypassing the signup route
    pub async fn seed_user(&self, email: &str, password: &str, role: Role) -> User {
        let hash = hash_password(password).expect("password hashing failed");
        self.database
            .create_user(&User::new(email, hash, role))
            .await
            .expect("seeding user failed")
    }
}

/// Spawn the app with limits high enough to never interfere with the test
pub async fn spawn_app() -> TestApp {
    spawn_app_with_admission(AdmissionConfig {
        refill_per_sec: 10_000.0,
        burst: 10_000.0,
        sweep_interval_secs: 60,
    })
    .await
}

pub async fn spawn_app_with_admission(admission: AdmissionConfig) -> TestApp {
    let database = Arc::new(
        SqliteDatabase::in_memory()
            .await
            .expect("in-memory database failed"),
    );

    let tokens = TokenService::new(TEST_SECRET, 24, 0);
    let gate = Arc::new(CredentialGate::new(tokens, Arc::clone(&database)));
    let limiter = Arc::new(AdmissionController::new(admission));

    let state = AppState {
        gate,
        database: Arc::clone(&database),
        limiter,
    };

    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("binding test listener failed");
    let addr = listener.local_addr().expect("listener has no local addr");

    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .expect("test server failed");
    });

    let client = reqwest::Client::builder()
        .cookie_store(true)
        .build()
        .expect("building test client failed");

    TestApp {
        addr,
        client,
        database,
    }
}
