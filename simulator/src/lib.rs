use axum::{
    body::Bytes,
    extract::{Path, State as AxumState},
    http::{header, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use commonware_codec::{DecodeExt, Encode};
use commonware_cryptography::{ed25519::Batch, ed25519::PublicKey, BatchVerifier};
use commonware_utils::{from_hex, hex};
use rand::rngs::OsRng;
use serde::Serialize;
use sicbo_execution::{
    coprocessor::Simulated,
    decryption::{PrivateDecryption, PublicDecryption},
    ledger, Layer, Limits, Memory, State,
};
use sicbo_types::{
    api::{Submission, UserDecryptSubmission},
    execution::{Key, Output, Transaction, Value},
    sicbo::{Handle, Opening, Round, RoundStatus, Sealed},
    NAMESPACE,
};
use std::{
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};
use thiserror::Error;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

mod config;

pub use config::{Config, ConfigError, ValidatedConfig};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error("invalid transaction signature")]
    InvalidSignature,
    #[error("consent lasts {requested} days, at most {allowed} allowed")]
    GrantTooLong { requested: u32, allowed: u32 },
    #[error(transparent)]
    Execution(#[from] sicbo_execution::Error),
}

/// Chain state and the coprocessor it references. Locked together so a batch
/// observes one consistent view of both.
struct Inner {
    state: Memory,
    coprocessor: Simulated,
}

pub struct Simulator {
    inner: Mutex<Inner>,
    limits: Limits,
}

/// JSON view of a [Round].
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct RoundView {
    pub id: u64,
    pub player: String,
    pub stake: u64,
    pub bet_type: sicbo_types::sicbo::BetType,
    pub param_a: u8,
    pub param_b: u8,
    pub dice: Vec<String>,
    pub encrypted_payout: String,
    pub status: RoundStatus,
    pub clear_payout: Option<u64>,
    pub created_at: u64,
}

impl From<&Round> for RoundView {
    fn from(round: &Round) -> Self {
        Self {
            id: round.id,
            player: hex(round.player.as_ref()),
            stake: round.stake,
            bet_type: round.bet.bet_type,
            param_a: round.bet.a,
            param_b: round.bet.b,
            dice: round.dice.iter().map(Handle::to_string).collect(),
            encrypted_payout: round.encrypted_payout.to_string(),
            status: round.status(),
            clear_payout: round.clear_payout(),
            created_at: round.created_at,
        }
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or_default()
}

impl Simulator {
    pub async fn new(config: &ValidatedConfig) -> Self {
        let mut state = Memory::default();
        if config.bankroll > 0 {
            state
                .insert(Key::Bankroll, Value::Bankroll(config.bankroll))
                .await;
        }
        let coprocessor = Simulated::new(
            NAMESPACE,
            &config.entropy_seed,
            config.kms.clone(),
            config.kms_threshold,
        );
        info!(
            signers = config.kms.len(),
            threshold = config.kms_threshold,
            bankroll = config.bankroll,
            "simulator initialized"
        );

        Self {
            inner: Mutex::new(Inner { state, coprocessor }),
            limits: config.limits,
        }
    }

    /// Executes `transactions` as one batch at the current time.
    pub async fn submit(&self, transactions: Vec<Transaction>) -> Result<Vec<Output>, Error> {
        self.submit_at(now_secs(), transactions).await
    }

    /// Executes `transactions` as one batch at `now`. Fails without executing
    /// anything if any signature is invalid.
    pub async fn submit_at(
        &self,
        now: u64,
        transactions: Vec<Transaction>,
    ) -> Result<Vec<Output>, Error> {
        let mut batcher = Batch::new();
        for tx in &transactions {
            tx.verify_batch(&mut batcher);
        }
        if !batcher.verify(&mut OsRng) {
            return Err(Error::InvalidSignature);
        }

        let mut inner = self.inner.lock().await;
        let Inner { state, coprocessor } = &mut *inner;
        let count = transactions.len();
        let (outputs, changes) = {
            let mut layer = Layer::new(&*state, coprocessor, NAMESPACE, self.limits, now);
            let (outputs, _) = layer.execute(transactions).await;
            (outputs, layer.commit())
        };
        state.apply(changes).await;
        info!(transactions = count, outputs = outputs.len(), now, "executed batch");
        Ok(outputs)
    }

    pub async fn query_state(&self, key: &Key) -> Option<Value> {
        self.inner.lock().await.state.get(key).await
    }

    pub async fn round(&self, round_id: u64) -> Option<RoundView> {
        let inner = self.inner.lock().await;
        ledger::get(&inner.state, round_id)
            .await
            .ok()
            .map(|round| RoundView::from(&round))
    }

    pub async fn player_rounds(&self, player: &PublicKey) -> Vec<u64> {
        ledger::list_by_player(&self.inner.lock().await.state, player).await
    }

    /// Relays a public decryption. Only handles marked by a settlement
    /// request can be opened.
    pub async fn public_decrypt(&self, handle: &Handle) -> Result<Opening, Error> {
        let inner = self.inner.lock().await;
        Ok(PublicDecryption::new(&inner.coprocessor).decrypt(handle)?)
    }

    /// Relays a private decryption at the current time. The values come back
    /// sealed to the consent's ephemeral key.
    pub async fn user_decrypt(&self, submission: &UserDecryptSubmission) -> Result<Sealed, Error> {
        self.user_decrypt_at(now_secs(), submission).await
    }

    pub async fn user_decrypt_at(
        &self,
        now: u64,
        submission: &UserDecryptSubmission,
    ) -> Result<Sealed, Error> {
        let requested = submission.consent.request.duration_days;
        if requested > self.limits.grant_duration_days {
            return Err(Error::GrantTooLong {
                requested,
                allowed: self.limits.grant_duration_days,
            });
        }
        let inner = self.inner.lock().await;
        Ok(PrivateDecryption::new(&inner.coprocessor).decrypt(
            &submission.handles,
            &submission.consent,
            now,
        )?)
    }
}

pub struct Api {
    simulator: Arc<Simulator>,
}

impl Api {
    pub fn new(simulator: Arc<Simulator>) -> Self {
        Self { simulator }
    }

    pub fn router(&self) -> Router {
        // Configure CORS
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE]);

        Router::new()
            .route("/submit", post(submit))
            .route("/state/:key", get(query_state))
            .route("/rounds/:id", get(query_round))
            .route("/players/:public/rounds", get(query_player_rounds))
            .route("/decrypt/public", post(decrypt_public))
            .route("/decrypt/user", post(decrypt_user))
            .layer(cors)
            .with_state(self.simulator.clone())
    }
}

async fn submit(AxumState(simulator): AxumState<Arc<Simulator>>, body: Bytes) -> impl IntoResponse {
    let Ok(Submission::Transactions(transactions)) = Submission::decode(&mut body.as_ref()) else {
        return StatusCode::BAD_REQUEST.into_response();
    };
    match simulator.submit(transactions).await {
        Ok(outputs) => (StatusCode::OK, outputs.encode().to_vec()).into_response(),
        Err(err) => {
            warn!(%err, "rejected submission");
            StatusCode::BAD_REQUEST.into_response()
        }
    }
}

async fn query_state(
    AxumState(simulator): AxumState<Arc<Simulator>>,
    Path(key): Path<String>,
) -> impl IntoResponse {
    let Some(raw) = from_hex(&key) else {
        return StatusCode::BAD_REQUEST.into_response();
    };
    let Ok(key) = Key::decode(&mut raw.as_slice()) else {
        return StatusCode::BAD_REQUEST.into_response();
    };
    match simulator.query_state(&key).await {
        Some(value) => (StatusCode::OK, value.encode().to_vec()).into_response(),
        None => (StatusCode::NOT_FOUND, vec![]).into_response(),
    }
}

async fn query_round(
    AxumState(simulator): AxumState<Arc<Simulator>>,
    Path(round_id): Path<u64>,
) -> impl IntoResponse {
    match simulator.round(round_id).await {
        Some(round) => Json(round).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn query_player_rounds(
    AxumState(simulator): AxumState<Arc<Simulator>>,
    Path(public): Path<String>,
) -> impl IntoResponse {
    let Some(raw) = from_hex(&public) else {
        return StatusCode::BAD_REQUEST.into_response();
    };
    let Ok(public) = PublicKey::decode(&mut raw.as_slice()) else {
        return StatusCode::BAD_REQUEST.into_response();
    };
    Json(simulator.player_rounds(&public).await).into_response()
}

async fn decrypt_public(
    AxumState(simulator): AxumState<Arc<Simulator>>,
    body: Bytes,
) -> impl IntoResponse {
    let Ok(handle) = Handle::decode(&mut body.as_ref()) else {
        return StatusCode::BAD_REQUEST.into_response();
    };
    match simulator.public_decrypt(&handle).await {
        Ok(opening) => (StatusCode::OK, opening.encode().to_vec()).into_response(),
        Err(err) => {
            warn!(%handle, %err, "public decryption refused");
            StatusCode::FORBIDDEN.into_response()
        }
    }
}

async fn decrypt_user(
    AxumState(simulator): AxumState<Arc<Simulator>>,
    body: Bytes,
) -> impl IntoResponse {
    let Ok(submission) = UserDecryptSubmission::decode(&mut body.as_ref()) else {
        return StatusCode::BAD_REQUEST.into_response();
    };
    match simulator.user_decrypt(&submission).await {
        Ok(sealed) => (StatusCode::OK, sealed.encode().to_vec()).into_response(),
        Err(err) => {
            warn!(user = ?submission.consent.user, %err, "user decryption refused");
            StatusCode::FORBIDDEN.into_response()
        }
    }
}
