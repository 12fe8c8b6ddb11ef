//! The twelve-state renewal lifecycle (spec §4.3). Each state owns one
//! function that builds a request, signs it if required, dispatches it
//! through the injected `HttpClient`, and parses the response into the
//! context. The driver in `engine.rs` sequences these functions and
//! owns retry/abort decisions; nothing here decides retry policy.

use std::fmt;

use serde_json::Value;

use crate::collaborators::http::{HttpClient, HttpRequest, HttpResponse};
use crate::error::{AcmeError, AcmeResult};
use crate::jose::{AccountSigner, build_jws};
use crate::renewal::context::{Authorization, RenewalContext};
use crate::wire::account::NewAccountPayload;
use crate::wire::authorization::{self, ChallengeKind};
use crate::wire::directory::Directory;
use crate::wire::order::{self, FinalizePayload, NewOrderPayload};
use crate::wire::problem::AcmeProblem;

/// One of the renewal lifecycle's twelve states, in canonical order
/// (spec §4.3). Used for logging and for asserting state monotonicity
/// in tests (property P3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Ressources,
    NewNonce,
    ChkAccount,
    NewAccount,
    NewOrder,
    Auth,
    Challenge,
    ChkChallenge,
    Finalize,
    ChkOrder,
    Certificate,
    End,
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            State::Ressources => "RESSOURCES",
            State::NewNonce => "NEWNONCE",
            State::ChkAccount => "CHKACCOUNT",
            State::NewAccount => "NEWACCOUNT",
            State::NewOrder => "NEWORDER",
            State::Auth => "AUTH",
            State::Challenge => "CHALLENGE",
            State::ChkChallenge => "CHKCHALLENGE",
            State::Finalize => "FINALIZE",
            State::ChkOrder => "CHKORDER",
            State::Certificate => "CERTIFICATE",
            State::End => "END",
        };
        f.write_str(name)
    }
}

/// What a state asked the driver to do next, once its HTTP exchange
/// completed (spec §9's recommended `(ctx, event) -> (ctx', effect)`
/// shape, specialised to this always-one-request-per-state machine).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    Next(State),
    /// AUTH/CHALLENGE/CHKCHALLENGE loop over `auths` before moving on.
    Repeat,
}

fn absorb_nonce(response: &HttpResponse, ctx: &mut RenewalContext) {
    if let Some(nonce) = response.header("replay-nonce") {
        ctx.nonce = nonce.to_string();
    }
}

fn require_header<'a>(response: &'a HttpResponse, name: &'static str) -> AcmeResult<&'a str> {
    response.header(name).ok_or(AcmeError::MissingHeader(name))
}

fn problem_from_response(response: &HttpResponse) -> AcmeError {
    match serde_json::from_slice::<AcmeProblem>(&response.body) {
        Ok(problem) => AcmeError::Problem(problem),
        Err(_) => AcmeError::Transient(format!(
            "unexpected status {} with unparseable body: {}",
            response.status,
            response.body_str()
        )),
    }
}

fn require_success(response: &HttpResponse) -> AcmeResult<()> {
    if response.is_success() {
        Ok(())
    } else {
        Err(problem_from_response(response))
    }
}

async fn sign_and_send(
    http: &dyn HttpClient,
    signer: &dyn AccountSigner,
    ctx: &RenewalContext,
    url: &str,
    payload: Option<&Value>,
) -> AcmeResult<HttpResponse> {
    let jws = build_jws(signer, payload, &ctx.nonce, url, ctx.kid_or_none())?;
    let body = serde_json::to_vec(&jws)?;
    http.execute(HttpRequest::post_jose(url, body)).await
}

pub async fn ressources(http: &dyn HttpClient, ctx: &mut RenewalContext) -> AcmeResult<Advance> {
    let response = http.execute(HttpRequest::get(&ctx.config.uri)).await?;
    require_success(&response)?;
    absorb_nonce(&response, ctx);
    let directory: Directory = serde_json::from_slice(&response.body)?;
    ctx.directory.new_nonce = directory.new_nonce;
    ctx.directory.new_account = directory.new_account;
    ctx.directory.new_order = directory.new_order;
    Ok(Advance::Next(State::NewNonce))
}

pub async fn new_nonce(http: &dyn HttpClient, ctx: &mut RenewalContext) -> AcmeResult<Advance> {
    let response = http.execute(HttpRequest::head(&ctx.directory.new_nonce)).await?;
    require_success(&response)?;
    ctx.nonce = require_header(&response, "replay-nonce")?.to_string();
    Ok(Advance::Next(State::ChkAccount))
}

pub async fn chk_account(
    http: &dyn HttpClient,
    signer: &dyn AccountSigner,
    ctx: &mut RenewalContext,
) -> AcmeResult<Advance> {
    let payload = serde_json::to_value(NewAccountPayload::check_existing())?;
    let response = sign_and_send(http, signer, ctx, &ctx.directory.new_account.clone(), Some(&payload)).await?;
    absorb_nonce(&response, ctx);

    if response.is_success() {
        ctx.kid = require_header(&response, "location")?.to_string();
        return Ok(Advance::Next(State::NewOrder));
    }

    match serde_json::from_slice::<AcmeProblem>(&response.body) {
        Ok(problem) if problem.is_account_does_not_exist() => Ok(Advance::Next(State::NewAccount)),
        Ok(problem) => Err(AcmeError::Problem(problem)),
        Err(_) => Err(AcmeError::Transient(format!(
            "CHKACCOUNT returned {} with unparseable body",
            response.status
        ))),
    }
}

pub async fn new_account(
    http: &dyn HttpClient,
    signer: &dyn AccountSigner,
    ctx: &mut RenewalContext,
) -> AcmeResult<Advance> {
    let contact = ctx
        .config
        .contact
        .clone()
        .ok_or_else(|| AcmeError::Configuration("account has no contact email configured".to_string()))?;
    let payload = serde_json::to_value(NewAccountPayload::register(&contact))?;
    let response = sign_and_send(http, signer, ctx, &ctx.directory.new_account.clone(), Some(&payload)).await?;
    absorb_nonce(&response, ctx);
    require_success(&response)?;
    ctx.kid = require_header(&response, "location")?.to_string();
    Ok(Advance::Next(State::NewOrder))
}

pub async fn new_order(
    http: &dyn HttpClient,
    signer: &dyn AccountSigner,
    ctx: &mut RenewalContext,
) -> AcmeResult<Advance> {
    let payload = serde_json::to_value(NewOrderPayload::for_dns_names(&ctx.identifiers))?;
    let response = sign_and_send(http, signer, ctx, &ctx.directory.new_order.clone(), Some(&payload)).await?;
    absorb_nonce(&response, ctx);
    require_success(&response)?;

    ctx.order_url = require_header(&response, "location")?.to_string();
    let order: order::Order = serde_json::from_slice(&response.body)?;
    ctx.finalize_url = order.finalize;
    ctx.auths = order.authorizations.into_iter().map(Authorization::new).collect();
    if ctx.auths.is_empty() {
        return Err(AcmeError::Terminal("order carries no authorizations".to_string()));
    }
    ctx.cursor = 0;
    Ok(Advance::Next(State::Auth))
}

pub async fn auth(
    http: &dyn HttpClient,
    signer: &dyn AccountSigner,
    ctx: &mut RenewalContext,
) -> AcmeResult<Advance> {
    let want_kind = match ctx.config.challenge {
        crate::config::ChallengeKindConfig::Http01 => ChallengeKind::Http01,
        crate::config::ChallengeKindConfig::Dns01 => ChallengeKind::Dns01,
    };
    let auth_url = ctx
        .current_auth()
        .ok_or_else(|| AcmeError::Terminal("AUTH reached with no current authorization".to_string()))?
        .auth_url
        .clone();

    let response = sign_and_send(http, signer, ctx, &auth_url, None).await?;
    absorb_nonce(&response, ctx);
    require_success(&response)?;

    let authz: authorization::Authorization = serde_json::from_slice(&response.body)?;
    let chosen = authz
        .challenges
        .into_iter()
        .find(|challenge| challenge.kind == want_kind)
        .ok_or_else(|| AcmeError::Terminal("authorization offers no matching challenge type".to_string()))?;

    let current = ctx
        .current_auth_mut()
        .expect("current_auth_mut after successful current_auth lookup above");
    current.chall = Some(chosen.url);
    current.token = Some(chosen.token);

    if ctx.advance_cursor() {
        Ok(Advance::Next(State::Challenge))
    } else {
        Ok(Advance::Repeat)
    }
}

/// Shared by CHALLENGE and CHKCHALLENGE: both validate a challenge
/// object the same way (fail on an `error` field or `status:invalid`),
/// mirroring the original's single `acme_res_challenge` used for both.
fn validate_challenge_body(response: &HttpResponse) -> AcmeResult<()> {
    let challenge: authorization::Challenge = serde_json::from_slice(&response.body)?;
    if let Some(error) = challenge.error {
        return Err(AcmeError::Terminal(format!("challenge reported error: {error}")));
    }
    if challenge.status == authorization::ChallengeStatus::Invalid {
        return Err(AcmeError::Terminal("challenge status is invalid".to_string()));
    }
    Ok(())
}

pub async fn challenge(
    http: &dyn HttpClient,
    signer: &dyn AccountSigner,
    ctx: &mut RenewalContext,
) -> AcmeResult<Advance> {
    let chall_url = ctx
        .current_auth()
        .and_then(|a| a.chall.clone())
        .ok_or_else(|| AcmeError::Terminal("CHALLENGE reached with no challenge url".to_string()))?;

    let payload = serde_json::json!({});
    let response = sign_and_send(http, signer, ctx, &chall_url, Some(&payload)).await?;
    absorb_nonce(&response, ctx);
    require_success(&response)?;
    validate_challenge_body(&response)?;

    if ctx.advance_cursor() {
        Ok(Advance::Next(State::ChkChallenge))
    } else {
        Ok(Advance::Repeat)
    }
}

pub async fn chk_challenge(http: &dyn HttpClient, ctx: &mut RenewalContext) -> AcmeResult<Advance> {
    let chall_url = ctx
        .current_auth()
        .and_then(|a| a.chall.clone())
        .ok_or_else(|| AcmeError::Terminal("CHKCHALLENGE reached with no challenge url".to_string()))?;

    let response = http.execute(HttpRequest::get(&chall_url)).await?;
    absorb_nonce(&response, ctx);
    require_success(&response)?;
    validate_challenge_body(&response)?;

    if ctx.advance_cursor() {
        Ok(Advance::Next(State::Finalize))
    } else {
        Ok(Advance::Repeat)
    }
}

pub async fn finalize(
    http: &dyn HttpClient,
    signer: &dyn AccountSigner,
    ctx: &mut RenewalContext,
) -> AcmeResult<Advance> {
    let payload = serde_json::to_value(FinalizePayload { csr: crate::jose::base64url::encode(&ctx.csr_der) })?;
    let response =
        sign_and_send(http, signer, ctx, &ctx.finalize_url.clone(), Some(&payload)).await?;
    absorb_nonce(&response, ctx);
    require_success(&response)?;
    Ok(Advance::Next(State::ChkOrder))
}

pub async fn chk_order(http: &dyn HttpClient, ctx: &mut RenewalContext) -> AcmeResult<Advance> {
    let response = http.execute(HttpRequest::get(&ctx.order_url)).await?;
    absorb_nonce(&response, ctx);
    require_success(&response)?;

    let parsed: order::Order = serde_json::from_slice(&response.body)?;
    if !parsed.status.eq_ignore_ascii_case("valid") {
        if parsed.status.eq_ignore_ascii_case("invalid") {
            return Err(AcmeError::Terminal("order status is invalid".to_string()));
        }
        // still processing: treated as transient so the driver polls
        // again against the retry budget rather than aborting outright
        return Err(AcmeError::Transient(format!("order status is {}, not yet valid", parsed.status)));
    }
    ctx.certificate_url = parsed
        .certificate
        .ok_or_else(|| AcmeError::Terminal("valid order carries no certificate url".to_string()))?;
    Ok(Advance::Next(State::Certificate))
}

pub async fn certificate(http: &dyn HttpClient, ctx: &mut RenewalContext) -> AcmeResult<Advance> {
    let response = http.execute(HttpRequest::get(&ctx.certificate_url)).await?;
    absorb_nonce(&response, ctx);
    require_success(&response)?;
    ctx.certificate_pem = Some(response.body_str().into_owned());
    Ok(Advance::Next(State::End))
}
