//! The public single-flight coordinator surface.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use futures::future::{BoxFuture, FutureExt, Shared};
use reqwest::Client;
use rtk_error::{ErrorCode, RtkError};
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{info, warn};

use crate::circuit::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
use crate::config::OAuth2Config;
use crate::http;
use crate::retry::{self, RefreshError, RetryConfig};
use crate::token::OAuth2Token;

type SharedRefresh = Shared<BoxFuture<'static, Result<String, RtkError>>>;

struct InFlight {
    generation: u64,
    future: SharedRefresh,
    abort: AbortHandle,
}

struct State {
    cached: OAuth2Token,
    in_flight: Option<InFlight>,
    generation: u64,
}

struct Inner {
    config: OAuth2Config,
    client: Client,
    owns_client: bool,
    retry_config: RetryConfig,
    circuit: CircuitBreaker,
    state: Mutex<State>,
    closed: AtomicBool,
}

/// The concurrent, single-flight OAuth2 token refresh coordinator.
/// Cheap to clone — every clone shares the same cached token,
/// in-flight refresh, and circuit breaker.
#[derive(Clone)]
pub struct TokenCoordinator {
    inner: Arc<Inner>,
}

impl TokenCoordinator {
    /// Builds a coordinator with an internally-created HTTP client.
    /// `close()` releases that client's resources.
    pub fn new(config: OAuth2Config) -> Result<Self, RtkError> {
        config.validate()?;
        Ok(Self::with_client(config, Client::new(), true))
    }

    /// Builds a coordinator around a caller-supplied client. `close()`
    /// will not attempt to tear it down, since it was not created here —
    /// resources are only released if the coordinator created them.
    pub fn with_injected_client(config: OAuth2Config, client: Client) -> Result<Self, RtkError> {
        config.validate()?;
        Ok(Self::with_client(config, client, false))
    }

    fn with_client(config: OAuth2Config, client: Client, owns_client: bool) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                client,
                owns_client,
                retry_config: RetryConfig::default(),
                circuit: CircuitBreaker::new(CircuitBreakerConfig::default()),
                state: Mutex::new(State { cached: OAuth2Token::invalid(), in_flight: None, generation: 0 }),
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Current breaker state, for observability, in the spirit of a
    /// pool's aggregate stats.
    #[must_use]
    pub fn circuit_state(&self) -> CircuitState {
        self.inner.circuit.state()
    }

    /// Returns a currently-valid token value, refreshing if necessary.
    pub async fn get_token(&self) -> Result<String, RtkError> {
        if self.inner.closed.load(Ordering::SeqCst) {
            return Err(RtkError::new(ErrorCode::ServiceUnavailable, "coordinator is closed"));
        }

        let (cached_valid, cached_value, stale_expiry_secs) = {
            let state = self.lock_state();
            let stale_expiry_secs = state
                .cached
                .expires_at
                .saturating_duration_since(std::time::Instant::now())
                .as_secs();
            (
                state.cached.is_valid(self.inner.config.refresh_threshold),
                state.cached.value.clone(),
                stale_expiry_secs,
            )
        };
        if cached_valid {
            return Ok(cached_value);
        }

        if !self.inner.circuit.allow_call() {
            return Err(RtkError::new(
                ErrorCode::ServiceUnavailable,
                format!("circuit breaker is open; stale token expires in {stale_expiry_secs}s"),
            ));
        }

        let shared = self.join_or_start_refresh();

        match tokio::time::timeout(self.inner.config.http_timeout, shared).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => Err(err),
            Err(_elapsed) => Err(RtkError::new(ErrorCode::ServiceUnavailable, "token refresh timed out")),
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, State> {
        self.inner.state.lock().expect("token coordinator lock poisoned")
    }

    fn join_or_start_refresh(&self) -> SharedRefresh {
        let mut state = self.lock_state();
        if let Some(in_flight) = &state.in_flight {
            return in_flight.future.clone();
        }

        state.generation += 1;
        let generation = state.generation;
        let inner = Arc::clone(&self.inner);

        let join_handle: JoinHandle<Result<String, RtkError>> =
            tokio::spawn(async move { drive_refresh(inner, generation).await });
        let abort = join_handle.abort_handle();

        let future: SharedRefresh = async move {
            match join_handle.await {
                Ok(result) => result,
                Err(_cancelled) => Err(RtkError::new(ErrorCode::ServiceUnavailable, "token refresh was canceled")),
            }
        }
        .boxed()
        .shared();

        state.in_flight = Some(InFlight { generation, future: future.clone(), abort });
        future
    }

    /// Idempotent shutdown: cancels any in-flight refresh — its waiters
    /// receive `ServiceUnavailable` rather than hanging — and, if this
    /// coordinator created its own client, releases it.
    pub fn close(&self) {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        let mut state = self.lock_state();
        if let Some(in_flight) = state.in_flight.take() {
            warn!(target: "rtk.oauth.coordinator", generation = in_flight.generation, "canceling in-flight refresh on close");
            in_flight.abort.abort();
        }
        if self.inner.owns_client {
            info!(target: "rtk.oauth.coordinator", "releasing internally-created HTTP client");
        }
    }
}

async fn drive_refresh(inner: Arc<Inner>, generation: u64) -> Result<String, RtkError> {
    let client = inner.client.clone();
    let config = inner.config.clone();

    let (result, _metadata) = retry::retry_async(&inner.retry_config, || {
        let client = client.clone();
        let config = config.clone();
        async move { http::fetch_token(&client, &config).await }
    })
    .await;

    let mut state = inner.state.lock().expect("token coordinator lock poisoned");
    let outcome = match result {
        Ok(token) => {
            inner.circuit.record_success();
            let value = token.value.clone();
            if state.generation == generation {
                state.cached = token;
            }
            Ok(value)
        }
        Err(err) => {
            inner.circuit.record_failure();
            Err(classify_refresh_error(err))
        }
    };
    if state.in_flight.as_ref().is_some_and(|f| f.generation == generation) {
        state.in_flight = None;
    }
    outcome
}

fn classify_refresh_error(err: RefreshError) -> RtkError {
    match err {
        RefreshError::Classified(e) => e,
        RefreshError::Transport(e) => {
            RtkError::with_cause(ErrorCode::ServiceUnavailable, "token endpoint unreachable", e)
        }
    }
}
