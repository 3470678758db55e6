//! End-to-end admission tests over the public API.
//!
//! Flow Overview:
//! 1. Build an `AuthState` over the in-process store and principal table.
//! 2. Issue sessions through the gate, the way a login handler would.
//! 3. Drive the router with `oneshot` and check status codes and messages.

use anyhow::Result;
use axum::{
    body::{to_bytes, Body},
    extract::ConnectInfo,
    http::{header::AUTHORIZATION, Method, Request, StatusCode},
    response::Response,
};
use counsel::{
    api::{
        self,
        handlers::auth::{
            AllowList, AuthConfig, AuthState, Claims, GateError, InMemoryPrincipals, Principal,
            TokenSigner,
        },
    },
    store::{KeyValueStore, MemoryStore},
};
use secrecy::SecretString;
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tower::ServiceExt;

const SECRET: &str = "integration-secret";

fn lawyer() -> Principal {
    Principal {
        id: 21,
        username: "dana".to_string(),
        email: "dana@counsel.dev".to_string(),
        is_admin: false,
        is_lawyer: true,
    }
}

fn config(limit: u64) -> AuthConfig {
    AuthConfig::new(SecretString::from(SECRET))
        .with_session_ttl_seconds(120)
        .with_requests_per_minute(limit)
}

fn state(store: &MemoryStore, limit: u64) -> Arc<AuthState> {
    let principals = InMemoryPrincipals::new();
    principals.insert(lawyer());
    Arc::new(AuthState::new(
        config(limit),
        Arc::new(store.clone()),
        Arc::new(principals),
        AllowList::default(),
    ))
}

fn get_me(token: &str, peer: [u8; 4]) -> Request<Body> {
    let mut request = Request::builder()
        .method(Method::GET)
        .uri("/v1/users/me")
        .header(AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    request
        .extensions_mut()
        .insert(ConnectInfo(SocketAddr::from((peer, 40000))));
    request
}

async fn detail(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    body["detail"].as_str().unwrap_or_default().to_string()
}

#[tokio::test]
async fn second_login_retires_first_token() -> Result<()> {
    let store = MemoryStore::new();
    let state = state(&store, 100);
    let app = api::router(state.clone());

    let first = state.gate().open_session(&lawyer()).await?;
    let response = app.clone().oneshot(get_me(&first, [10, 0, 0, 1])).await?;
    assert_eq!(response.status(), StatusCode::OK);

    // A distinct `iat` keeps the second token different from the first.
    let second = TokenSigner::new(&config(100)).sign_claims(&Claims {
        user_id: Some(21),
        iat: Some(1),
        exp: 4_102_444_800,
    })?;
    state
        .gate()
        .sessions()
        .store("dana@counsel.dev", &second, Duration::from_secs(120))
        .await?;

    let response = app.clone().oneshot(get_me(&first, [10, 0, 0, 1])).await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(detail(response).await, "Token is expired.");

    let response = app.oneshot(get_me(&second, [10, 0, 0, 1])).await?;
    assert_eq!(response.status(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn token_for_unknown_principal_reads_as_invalid() -> Result<()> {
    let store = MemoryStore::new();
    let app = api::router(state(&store, 100));
    let token = TokenSigner::new(&config(100)).sign(999)?;

    let response = app.oneshot(get_me(&token, [10, 0, 0, 2])).await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(detail(response).await, "Token is not valid.");
    Ok(())
}

#[tokio::test]
async fn token_signed_with_other_secret_is_invalid() -> Result<()> {
    let store = MemoryStore::new();
    let state = state(&store, 100);
    let app = api::router(state.clone());
    state.gate().open_session(&lawyer()).await?;

    let forged = TokenSigner::new(&AuthConfig::new(SecretString::from("guess"))).sign(21)?;
    let response = app.oneshot(get_me(&forged, [10, 0, 0, 3])).await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(detail(response).await, "Token is not valid.");
    Ok(())
}

#[tokio::test]
async fn rate_limit_is_per_source_and_precedes_token_checks() -> Result<()> {
    let store = MemoryStore::new();
    let state = state(&store, 2);
    let app = api::router(state.clone());
    let token = state.gate().open_session(&lawyer()).await?;

    for _ in 0..2 {
        let response = app.clone().oneshot(get_me(&token, [10, 0, 0, 4])).await?;
        assert_eq!(response.status(), StatusCode::OK);
    }
    let response = app.clone().oneshot(get_me(&token, [10, 0, 0, 4])).await?;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

    // Garbage tokens from the limited source still get 429, not 401.
    let response = app.clone().oneshot(get_me("garbage", [10, 0, 0, 4])).await?;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

    let response = app.oneshot(get_me(&token, [10, 0, 0, 5])).await?;
    assert_eq!(response.status(), StatusCode::OK);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn rate_window_closes_sixty_seconds_after_it_opened() -> Result<()> {
    let store = MemoryStore::new();
    let state = state(&store, 3);
    let limiter = state.rate_limiter();

    limiter.admit("10.0.0.6").await?;
    tokio::time::advance(Duration::from_secs(10)).await;
    limiter.admit("10.0.0.6").await?;
    tokio::time::advance(Duration::from_secs(10)).await;
    limiter.admit("10.0.0.6").await?;
    assert_eq!(
        limiter.admit("10.0.0.6").await,
        Err(GateError::TooManyRequests)
    );

    tokio::time::advance(Duration::from_secs(39)).await;
    assert_eq!(
        limiter.admit("10.0.0.6").await,
        Err(GateError::TooManyRequests)
    );

    tokio::time::advance(Duration::from_secs(1)).await;
    assert_eq!(limiter.admit("10.0.0.6").await, Ok(()));
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_logins_leave_exactly_one_active_token() -> Result<()> {
    let store = MemoryStore::new();
    let state = state(&store, 100);
    let signer = TokenSigner::new(&config(100));

    let tokens: Vec<String> = (0..8)
        .map(|n| {
            signer.sign_claims(&Claims {
                user_id: Some(21),
                iat: Some(n),
                exp: 4_102_444_800,
            })
        })
        .collect::<Result<_, _>>()?;

    let mut handles = Vec::new();
    for token in tokens.clone() {
        let state = state.clone();
        handles.push(tokio::spawn(async move {
            state
                .gate()
                .sessions()
                .store("dana@counsel.dev", &token, Duration::from_secs(120))
                .await
        }));
    }
    for handle in handles {
        handle.await??;
    }

    let mut admitted = 0;
    for token in &tokens {
        if state.gate().authenticate(token).await.is_ok() {
            admitted += 1;
        }
    }
    assert_eq!(admitted, 1);

    let stored = store.get("dana@counsel.dev").await?;
    assert!(stored.is_some_and(|value| tokens.contains(&value)));
    Ok(())
}

#[tokio::test]
async fn session_written_by_login_service_is_honored() -> Result<()> {
    let store = MemoryStore::new();
    let app = api::router(state(&store, 100));
    let token = TokenSigner::new(&config(100)).sign(21)?;

    // The login service stores the token under the bare email.
    store
        .set_with_expiry("dana@counsel.dev", &token, Duration::from_secs(120))
        .await?;

    let response = app.oneshot(get_me(&token, [10, 0, 0, 7])).await?;
    assert_eq!(response.status(), StatusCode::OK);
    Ok(())
}
