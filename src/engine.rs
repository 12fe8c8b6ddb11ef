//! The driver loop: ticks the state machine against the injected
//! collaborators, owning the one decision the individual state
//! functions don't make — retry vs. abort (spec §4.3's retry policy)
//! — and is the sole source of operator-facing log lines (spec §7).

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::collaborators::http::HttpClient;
use crate::collaborators::store::CertStore;
use crate::collaborators::{ChallengePublisher, CryptoProvider};
use crate::error::{AcmeError, AcmeResult};
use crate::jose::AccountSigner;
use crate::renewal::context::RenewalContext;
use crate::renewal::machine::{self, Advance, State};

/// Everything the driver needs but does not own: the core never
/// constructs these concretely, only receives them as trait objects.
pub struct Collaborators {
    pub http: Arc<dyn HttpClient>,
    pub store: Arc<dyn CertStore>,
    pub challenge_publisher: Arc<dyn ChallengePublisher>,
    pub crypto: Arc<dyn CryptoProvider>,
}

/// Runs one renewal to completion, returning `Ok(())` on success and
/// an error classified per spec §7 otherwise. The certificate install
/// (spec §4.4) has already happened by the time this returns `Ok`.
pub async fn run_renewal(
    mut ctx: RenewalContext,
    store_path: &str,
    collaborators: &Collaborators,
) -> AcmeResult<()> {
    let signer = collaborators.crypto.account_signer()?;
    let mut state = State::Ressources;
    let mut requests_sent: u32 = 0;

    loop {
        debug!(%state, retries_left = ctx.retries, "entering state");
        requests_sent += 1;

        let outcome = dispatch(state, &mut ctx, collaborators, signer.as_ref()).await;

        match outcome {
            Ok(Advance::Next(State::Challenge)) if state == State::Auth => {
                publish_challenges(&ctx, collaborators).await?;
                info!(from = %state, to = %State::Challenge, "state transition");
                state = State::Challenge;
            }
            Ok(Advance::Next(next)) => {
                info!(from = %state, to = %next, "state transition");
                if next == State::End {
                    install_if_ready(&ctx, store_path, collaborators).await?;
                    info!(total_requests = requests_sent, "renewal complete");
                    return Ok(());
                }
                state = next;
            }
            Ok(Advance::Repeat) => {
                debug!(%state, cursor = ctx.cursor, "authorization loop continues");
            }
            Err(err) => match err.disposition() {
                crate::error::Disposition::Retry if ctx.retries > 0 => {
                    ctx.retries -= 1;
                    warn!(%state, retries_left = ctx.retries, error = %err, "transient failure, retrying");
                }
                crate::error::Disposition::Retry => {
                    error!(%state, error = %err, "retry budget exhausted, aborting");
                    return Err(err);
                }
                crate::error::Disposition::Abort => {
                    error!(%state, error = %err, "terminal failure, aborting");
                    return Err(err);
                }
            },
        }
    }
}

async fn dispatch(
    state: State,
    ctx: &mut RenewalContext,
    collaborators: &Collaborators,
    signer: &dyn AccountSigner,
) -> AcmeResult<Advance> {
    let http = collaborators.http.as_ref();
    match state {
        State::Ressources => machine::ressources(http, ctx).await,
        State::NewNonce => machine::new_nonce(http, ctx).await,
        State::ChkAccount => machine::chk_account(http, signer, ctx).await,
        State::NewAccount => machine::new_account(http, signer, ctx).await,
        State::NewOrder => machine::new_order(http, signer, ctx).await,
        State::Auth => machine::auth(http, signer, ctx).await,
        State::Challenge => machine::challenge(http, signer, ctx).await,
        State::ChkChallenge => machine::chk_challenge(http, ctx).await,
        State::Finalize => machine::finalize(http, signer, ctx).await,
        State::ChkOrder => machine::chk_order(http, ctx).await,
        State::Certificate => machine::certificate(http, ctx).await,
        State::End => Ok(Advance::Next(State::End)),
    }
}

/// Triggered once, at the `AUTH → CHALLENGE` edge, once every
/// authorization's token is known: publication must complete before
/// the driver requests challenge validation (spec §4.2).
async fn publish_challenges(ctx: &RenewalContext, collaborators: &Collaborators) -> AcmeResult<()> {
    for (auth, identifier) in ctx.auths.iter().zip(ctx.identifiers.iter()) {
        let Some(token) = &auth.token else {
            continue;
        };
        let thumbprint = collaborators.crypto.account_signer()?.jwk().thumbprint();
        let key_authorization = format!("{token}.{thumbprint}");
        collaborators
            .challenge_publisher
            .publish(ctx.config.challenge, identifier, token, &key_authorization)
            .await?;
    }
    Ok(())
}

async fn install_if_ready(
    ctx: &RenewalContext,
    store_path: &str,
    collaborators: &Collaborators,
) -> AcmeResult<()> {
    let chain_pem = ctx
        .certificate_pem
        .as_deref()
        .ok_or_else(|| AcmeError::Terminal("reached END with no certificate body".to_string()))?;
    let new_key_pem = ctx
        .new_key_pem
        .as_deref()
        .ok_or_else(|| AcmeError::Configuration("renewal context missing subject key".to_string()))?;
    crate::renewal::install::install_certificate(
        collaborators.store.as_ref(),
        store_path,
        new_key_pem,
        chain_pem,
    )
    .await
}
