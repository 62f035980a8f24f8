//! # Access Extractors
//!
//! Each extractor runs one guard chain before the handler body.
//!
//! ```rust,ignore
//! async fn list_users(AdminOnly(admin): AdminOnly, State(state): State<AppState>) { ... }
//! ```

use crate::error::ApiError;
use crate::state::AppState;
use axum::{
    extract::{FromRequestParts, Query},
    http::{header::AUTHORIZATION, request::Parts},
};
use bistro_core::{BistroError, GuardChain, Identity, RequestContext};
use serde::Deserialize;

/// `?email=` on self-scoped routes
#[derive(Debug, Default, Deserialize)]
struct EmailQuery {
    email: Option<String>,
}

async fn run_chain(
    parts: &Parts,
    chain: &GuardChain,
    scoped_email: Option<String>,
) -> Result<RequestContext, ApiError> {
    let header = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok());
    let mut ctx = RequestContext::from_authorization(header).with_scoped_email(scoped_email);
    chain.run(&mut ctx).await?;
    Ok(ctx)
}

fn verified(ctx: RequestContext) -> Result<Identity, ApiError> {
    ctx.identity
        .ok_or_else(|| BistroError::Unauthorized("request is not authenticated".to_string()).into())
}

/// Any caller with a valid bearer token
pub struct Authenticated(pub Identity);

impl FromRequestParts<AppState> for Authenticated {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let ctx = run_chain(parts, &state.guards.authenticated, None).await?;
        Ok(Self(verified(ctx)?))
    }
}

/// Authenticated caller whose account holds the admin role
pub struct AdminOnly(pub Identity);

impl FromRequestParts<AppState> for AdminOnly {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let ctx = run_chain(parts, &state.guards.admin, None).await?;
        Ok(Self(verified(ctx)?))
    }
}

/// Authenticated caller reading their own data. `email` is the verified
/// scope: the query email when it matches, otherwise the caller's own.
pub struct SelfScoped {
    pub identity: Identity,
    pub email: String,
}

impl FromRequestParts<AppState> for SelfScoped {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        // A malformed query is only reported to a caller who passed the chain
        let query = Query::<EmailQuery>::try_from_uri(&parts.uri);
        let scoped = query.as_ref().ok().and_then(|Query(q)| q.email.clone());

        let ctx = run_chain(parts, &state.guards.self_scoped, scoped).await?;
        query.map_err(|e| BistroError::InvalidRequest(e.body_text()))?;
        let email = ctx.scoped_email.clone();
        let identity = verified(ctx)?;

        Ok(Self {
            email: email.unwrap_or_else(|| identity.email.clone()),
            identity,
        })
    }
}
