//! Warp routes and handlers for the storefront.
//!
//! Pages are rendered server-side; the purchase flow underneath them is
//! driven by a small JSON API. Every reply that touches a session carries
//! the `sid` cookie so the next request lands on the same flow.

use {
    crate::{
        conf::SiteConf,
        pages::{chapter_by_slug, Chapter, Pages, CHAPTERS},
        session::{SessionStore, ACCESS_COOKIE, SESSION_COOKIE},
    },
    minijinja::context,
    serde::Deserialize,
    serde_json::json,
    std::sync::Arc,
    warp::{http::StatusCode, Filter, Rejection, Reply},
    webbook_sdk::{
        access::{AccessClient, GateState, SecretGate},
        price::PriceFeed,
        verify::{
            crypto_amount, FlowError, FlowState, VerificationClient, VerificationOutcome,
            TRANSPORT_FAILURE_MESSAGE,
        },
    },
};

/// Shared handles every handler needs. Cheap to clone per request.
#[derive(Clone)]
pub(crate) struct SiteContext {
    pub(crate) conf: Arc<SiteConf>,
    pub(crate) pages: Arc<Pages>,
    pub(crate) sessions: SessionStore,
    pub(crate) price: PriceFeed,
    pub(crate) verify: Arc<VerificationClient>,
    pub(crate) access: Arc<AccessClient>,
    pub(crate) gate: SecretGate,
}

/// Builds the complete route tree for the site.
pub(crate) fn routes(
    ctx: SiteContext,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    let landing = warp::get()
        .and(warp::path::end())
        .and(with_ctx(ctx.clone()))
        .and_then(landing_handler);

    let walkthrough = warp::get()
        .and(warp::path("walkthrough"))
        .and(warp::path::end())
        .and(with_ctx(ctx.clone()))
        .and_then(walkthrough_handler);

    let toc = warp::get()
        .and(warp::path("webbook"))
        .and(warp::path::end())
        .and(with_ctx(ctx.clone()))
        .and_then(toc_handler);

    let chapter = warp::get()
        .and(warp::path("webbook"))
        .and(warp::path::param::<String>())
        .and(warp::path::end())
        .and(warp::cookie::optional::<String>(SESSION_COOKIE))
        .and(warp::cookie::optional::<String>(ACCESS_COOKIE))
        .and(with_ctx(ctx.clone()))
        .and_then(chapter_handler);

    let sample = warp::get()
        .and(warp::path("sample"))
        .and(warp::path::end())
        .and(warp::fs::file(ctx.conf.book.sample_path.clone()));

    let api_price = warp::get()
        .and(warp::path!("api" / "price"))
        .and(warp::cookie::optional::<String>(SESSION_COOKIE))
        .and(with_ctx(ctx.clone()))
        .and_then(price_handler);

    let api_purchase = warp::post()
        .and(warp::path!("api" / "purchase"))
        .and(warp::cookie::optional::<String>(SESSION_COOKIE))
        .and(warp::body::json())
        .and(with_ctx(ctx.clone()))
        .and_then(purchase_handler);

    let api_verify = warp::post()
        .and(warp::path!("api" / "verify"))
        .and(warp::cookie::optional::<String>(SESSION_COOKIE))
        .and(warp::body::json())
        .and(with_ctx(ctx.clone()))
        .and_then(verify_handler);

    let api_gate = warp::post()
        .and(warp::path!("api" / "gate"))
        .and(warp::cookie::optional::<String>(SESSION_COOKIE))
        .and(warp::body::json())
        .and(with_ctx(ctx))
        .and_then(gate_handler);

    let health = warp::get()
        .and(warp::path("health"))
        .map(|| warp::reply::with_status("", StatusCode::OK));

    landing
        .or(walkthrough)
        .or(toc)
        .or(chapter)
        .or(sample)
        .or(api_price)
        .or(api_purchase)
        .or(api_verify)
        .or(api_gate)
        .or(health)
}

fn with_ctx(
    ctx: SiteContext,
) -> impl Filter<Extract = (SiteContext,), Error = std::convert::Infallible> + Clone {
    warp::any().map(move || ctx.clone())
}

fn reply_json(
    status: StatusCode,
    body: &serde_json::Value,
) -> warp::reply::WithStatus<warp::reply::Json> {
    warp::reply::with_status(warp::reply::json(body), status)
}

fn with_session_cookie(reply: impl Reply, sid: &str) -> impl Reply {
    warp::reply::with_header(
        reply,
        "set-cookie",
        format!("{}={}; Path=/; HttpOnly", SESSION_COOKIE, sid),
    )
}

// == Request bodies ==

#[derive(Debug, Deserialize)]
struct PurchaseBody {
    #[serde(default)]
    email: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VerifyBody {
    #[serde(default)]
    transaction_id: String,
}

#[derive(Debug, Deserialize)]
struct GateBody {
    #[serde(default)]
    passphrase: String,
}

// == Page handlers ==

async fn landing_handler(ctx: SiteContext) -> Result<impl Reply, Rejection> {
    let quote = ctx.price.latest();
    let book = &ctx.conf.book;

    let html = ctx.pages.render(
        "landing.html",
        context! {
            title => book.title.clone(),
            price_usd => format!("{:.2}", book.price_usd),
            amount => format!("{:.2}", crypto_amount(book.price_usd, quote.usd_value)),
            ticker => book.ticker.clone(),
            loading => ctx.price.is_loading(),
        },
    );

    Ok(warp::reply::html(html))
}

async fn walkthrough_handler(ctx: SiteContext) -> Result<impl Reply, Rejection> {
    let book = &ctx.conf.book;

    let html = ctx.pages.render(
        "walkthrough.html",
        context! {
            title => book.title.clone(),
            ticker => book.ticker.clone(),
            payment_address => book.payment_address.clone(),
        },
    );

    Ok(warp::reply::html(html))
}

async fn toc_handler(ctx: SiteContext) -> Result<impl Reply, Rejection> {
    let html = ctx.pages.render(
        "toc.html",
        context! {
            title => ctx.conf.book.title.clone(),
            chapters => CHAPTERS,
        },
    );

    Ok(warp::reply::html(html))
}

async fn chapter_handler(
    slug: String,
    sid: Option<String>,
    access_token: Option<String>,
    ctx: SiteContext,
) -> Result<impl Reply, Rejection> {
    let sid = ctx.sessions.ensure(sid).await;

    let (html, status) = match chapter_by_slug(&slug) {
        None => ("Chapter not found.".to_string(), StatusCode::NOT_FOUND),
        Some(chapter) if !chapter.premium => (render_chapter(&ctx, chapter), StatusCode::OK),
        Some(chapter) => {
            // A passphrase grant sticks to the session; the token-based
            // check runs fresh on every page load.
            let session_gate = ctx.sessions.with(&sid, |session| session.gate).await;
            let granted =
                session_gate.is_granted() || ctx.access.check(access_token.as_deref()).await;

            match GateState::resolve(granted) {
                GateState::Granted => (render_chapter(&ctx, chapter), StatusCode::OK),
                _ => (
                    ctx.pages.render(
                        "denied.html",
                        context! {
                            title => ctx.conf.book.title.clone(),
                            chapter => chapter,
                        },
                    ),
                    StatusCode::OK,
                ),
            }
        }
    };

    Ok(with_session_cookie(
        warp::reply::with_status(warp::reply::html(html), status),
        &sid,
    ))
}

fn render_chapter(ctx: &SiteContext, chapter: &Chapter) -> String {
    ctx.pages.render(
        "chapter.html",
        context! {
            title => ctx.conf.book.title.clone(),
            chapter => chapter,
        },
    )
}

// == API handlers ==

async fn price_handler(sid: Option<String>, ctx: SiteContext) -> Result<impl Reply, Rejection> {
    let quote = ctx.price.latest();

    // A pending purchase follows the quote until its proof is submitted.
    if let Some(sid) = sid {
        ctx.sessions
            .with_existing(&sid, |session| session.flow.reprice(&quote))
            .await;
    }

    Ok(reply_json(
        StatusCode::OK,
        &json!({
            "pair": quote.pair,
            "usd": quote.usd_value,
            "fetchedAt": quote.fetched_at,
            "loading": ctx.price.is_loading(),
        }),
    ))
}

async fn purchase_handler(
    sid: Option<String>,
    body: PurchaseBody,
    ctx: SiteContext,
) -> Result<impl Reply, Rejection> {
    let sid = ctx.sessions.ensure(sid).await;
    let quote = ctx.price.latest();
    let price_usd = ctx.conf.book.price_usd;

    let result = ctx
        .sessions
        .with(&sid, |session| {
            session.flow.begin(&body.email, price_usd, &quote)
        })
        .await;

    let reply = match result {
        Ok(intent) => reply_json(
            StatusCode::OK,
            &json!({
                "state": FlowState::Awaiting,
                "paymentAddress": ctx.conf.book.payment_address,
                "asset": ctx.conf.book.asset_id,
                "amount": intent.crypto_amount,
                "priceUsd": intent.price_usd,
            }),
        ),
        Err(e @ FlowError::MissingEmail) => reply_json(
            StatusCode::UNPROCESSABLE_ENTITY,
            &json!({
                "error": "validation_error",
                "details": e.to_string(),
            }),
        ),
        Err(e) => reply_json(
            StatusCode::CONFLICT,
            &json!({
                "error": "invalid_state",
                "details": e.to_string(),
            }),
        ),
    };

    Ok(with_session_cookie(reply, &sid))
}

async fn verify_handler(
    sid: Option<String>,
    body: VerifyBody,
    ctx: SiteContext,
) -> Result<impl Reply, Rejection> {
    let sid = ctx.sessions.ensure(sid).await;

    let begun = ctx
        .sessions
        .with(&sid, |session| {
            session.flow.begin_submit(&body.transaction_id)
        })
        .await;

    let request = match begun {
        Ok(request) => request,
        Err(e @ FlowError::InvalidProof(_)) => {
            let reply = reply_json(
                StatusCode::UNPROCESSABLE_ENTITY,
                &json!({
                    "error": "validation_error",
                    "details": e.to_string(),
                }),
            );
            return Ok(with_session_cookie(reply, &sid));
        }
        Err(e) => {
            let reply = reply_json(
                StatusCode::CONFLICT,
                &json!({
                    "error": "invalid_state",
                    "details": e.to_string(),
                }),
            );
            return Ok(with_session_cookie(reply, &sid));
        }
    };

    let reply = match ctx.verify.submit(&request).await {
        Ok(VerificationOutcome::Confirmed { transaction }) => {
            let resolved = ctx
                .sessions
                .with(&sid, |session| session.flow.confirm(transaction))
                .await;
            if let Err(e) = resolved {
                log::warn!("Dropping stale confirmation for session: {}", e);
            }

            reply_json(
                StatusCode::OK,
                &json!({
                    "state": FlowState::Confirmed,
                    "transactionId": request.transaction_id(),
                    "message": "Payment confirmed. Your download link is on its way to your inbox.",
                }),
            )
        }
        Ok(VerificationOutcome::Rejected { error }) => {
            let resolved = ctx
                .sessions
                .with(&sid, |session| session.flow.reject(error.clone()))
                .await;
            if let Err(e) = resolved {
                log::warn!("Dropping stale rejection for session: {}", e);
            }

            reply_json(
                StatusCode::OK,
                &json!({
                    "state": FlowState::Awaiting,
                    "error": error,
                }),
            )
        }
        Err(e) => {
            // "Server down", "timeout" and "malformed response" all look
            // the same to the buyer; the distinction only goes to the log.
            log::warn!("Verification submit failed: {}", e);

            let resolved = ctx
                .sessions
                .with(&sid, |session| session.flow.reject(TRANSPORT_FAILURE_MESSAGE))
                .await;
            if let Err(e) = resolved {
                log::warn!("Dropping stale failure for session: {}", e);
            }

            reply_json(
                StatusCode::OK,
                &json!({
                    "state": FlowState::Awaiting,
                    "error": TRANSPORT_FAILURE_MESSAGE,
                }),
            )
        }
    };

    Ok(with_session_cookie(reply, &sid))
}

async fn gate_handler(
    sid: Option<String>,
    body: GateBody,
    ctx: SiteContext,
) -> Result<impl Reply, Rejection> {
    let sid = ctx.sessions.ensure(sid).await;
    let granted = ctx.gate.unlock(&body.passphrase);

    ctx.sessions
        .with(&sid, |session| {
            // A failed attempt never revokes an earlier grant.
            if granted {
                session.gate = GateState::Granted;
            } else if !session.gate.is_granted() {
                session.gate = GateState::Denied;
            }
        })
        .await;

    let reply = reply_json(StatusCode::OK, &json!({ "granted": granted }));

    Ok(with_session_cookie(reply, &sid))
}
