//! # Access Guards
//!
//! Authorization runs as an ordered chain of predicates over a
//! [`RequestContext`]. Each predicate either lets the request continue or
//! ends it with a terminal error; the handler only runs when every guard
//! passes. Guards read state but never mutate the store.
//!
//! ```text
//!   RequireBearer ──► RequireRole(admin) ──► handler        (admin policy)
//!   RequireBearer ──► RequireSelf ─────────► handler        (self-scoped policy)
//!   RequireBearer ─────────────────────────► handler        (authenticated policy)
//! ```

use crate::error::{BistroError, BistroResult};
use crate::identity::{Identity, Role};
use crate::store::SharedStore;
use crate::token::{TokenError, TokenService};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Extract the token from an `Authorization: Bearer <token>` header value
pub fn parse_bearer(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// Per-request state the guards read and enrich.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    /// Raw bearer token, if the request carried one
    pub bearer: Option<String>,
    /// Email the request wants to read data for (`?email=`)
    pub scoped_email: Option<String>,
    /// Set by `RequireBearer` once the token verifies
    pub identity: Option<Identity>,
}

impl RequestContext {
    /// Build a context from the raw `Authorization` header value
    pub fn from_authorization(header: Option<&str>) -> Self {
        Self {
            bearer: header.and_then(parse_bearer).map(str::to_string),
            ..Self::default()
        }
    }

    pub fn with_scoped_email(mut self, email: Option<String>) -> Self {
        self.scoped_email = email;
        self
    }

    /// The verified identity; guards placed before authentication see `Unauthorized`
    pub fn identity(&self) -> BistroResult<&Identity> {
        self.identity
            .as_ref()
            .ok_or_else(|| BistroError::Unauthorized("request is not authenticated".to_string()))
    }
}

/// A single step in a guard chain
#[async_trait]
pub trait GuardPredicate: Send + Sync {
    /// Continue with `Ok(())` or end the request with an error.
    async fn check(&self, ctx: &mut RequestContext) -> BistroResult<()>;

    /// Short name for logs
    fn name(&self) -> &'static str;
}

/// Stage 1: a valid, unexpired bearer token is required.
pub struct RequireBearer {
    tokens: TokenService,
}

impl RequireBearer {
    pub fn new(tokens: TokenService) -> Self {
        Self { tokens }
    }
}

#[async_trait]
impl GuardPredicate for RequireBearer {
    async fn check(&self, ctx: &mut RequestContext) -> BistroResult<()> {
        let token = ctx
            .bearer
            .as_deref()
            .ok_or_else(|| BistroError::Unauthorized("missing bearer token".to_string()))?;

        let claim = self.tokens.verify(token).map_err(|e| match e {
            TokenError::Expired => BistroError::Unauthorized("token expired".to_string()),
            other => BistroError::Unauthorized(other.to_string()),
        })?;

        ctx.identity = Some(Identity::new(claim.email));
        Ok(())
    }

    fn name(&self) -> &'static str {
        "require_bearer"
    }
}

/// Stage 2: the authenticated account must hold `role` in the account store.
pub struct RequireRole {
    store: SharedStore,
    role: Role,
}

impl RequireRole {
    pub fn new(store: SharedStore, role: Role) -> Self {
        Self { store, role }
    }
}

#[async_trait]
impl GuardPredicate for RequireRole {
    async fn check(&self, ctx: &mut RequestContext) -> BistroResult<()> {
        let email = ctx.identity()?.email.clone();
        let account = self
            .store
            .find_user_by_email(&email)
            .await?
            .ok_or_else(|| BistroError::Forbidden("forbidden access!".to_string()))?;

        if !account.role().satisfies(self.role) {
            return Err(BistroError::Forbidden("forbidden access!".to_string()));
        }

        if let Some(identity) = ctx.identity.as_mut() {
            identity.role = account.role();
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "require_role"
    }
}

/// The scoped email, when present, must be the caller's own. An absent scope
/// is narrowed to the caller.
pub struct RequireSelf;

#[async_trait]
impl GuardPredicate for RequireSelf {
    async fn check(&self, ctx: &mut RequestContext) -> BistroResult<()> {
        let identity = ctx.identity()?.clone();
        match ctx.scoped_email.as_deref() {
            Some(email) if !identity.owns(email) => {
                Err(BistroError::Forbidden("forbidden access!".to_string()))
            }
            Some(_) => Ok(()),
            None => {
                ctx.scoped_email = Some(identity.email);
                Ok(())
            }
        }
    }

    fn name(&self) -> &'static str {
        "require_self"
    }
}

/// Ordered list of guards evaluated front to back
#[derive(Clone, Default)]
pub struct GuardChain {
    guards: Vec<Arc<dyn GuardPredicate>>,
}

impl GuardChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a guard
    pub fn then(mut self, guard: impl GuardPredicate + 'static) -> Self {
        self.guards.push(Arc::new(guard));
        self
    }

    /// Any valid token
    pub fn authenticated(tokens: TokenService) -> Self {
        Self::new().then(RequireBearer::new(tokens))
    }

    /// Valid token whose account is an admin
    pub fn admin(tokens: TokenService, store: SharedStore) -> Self {
        Self::authenticated(tokens).then(RequireRole::new(store, Role::Admin))
    }

    /// Valid token reading only its own data
    pub fn self_scoped(tokens: TokenService) -> Self {
        Self::authenticated(tokens).then(RequireSelf)
    }

    pub fn len(&self) -> usize {
        self.guards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.guards.is_empty()
    }

    /// Run every guard in order, stopping at the first rejection.
    pub async fn run(&self, ctx: &mut RequestContext) -> BistroResult<()> {
        for guard in &self.guards {
            if let Err(e) = guard.check(ctx).await {
                debug!(guard = guard.name(), error = %e, "request rejected");
                return Err(e);
            }
        }
        Ok(())
    }
}

/// The three policies the API uses, built once at startup
#[derive(Clone)]
pub struct AccessGuards {
    pub authenticated: GuardChain,
    pub admin: GuardChain,
    pub self_scoped: GuardChain,
}

impl AccessGuards {
    pub fn new(tokens: TokenService, store: SharedStore) -> Self {
        Self {
            authenticated: GuardChain::authenticated(tokens.clone()),
            admin: GuardChain::admin(tokens.clone(), store),
            self_scoped: GuardChain::self_scoped(tokens),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::NewUser;
    use crate::store::{MemoryStore, Store};
    use crate::token::Claim;
    use chrono::Duration;

    fn tokens() -> TokenService {
        TokenService::new("guard-test-secret-0123456789", Duration::hours(1))
    }

    fn bearer(tokens: &TokenService, email: &str) -> String {
        format!("Bearer {}", tokens.issue(&Claim::new(email)).unwrap())
    }

    async fn store_with(users: &[(&str, Option<Role>)]) -> SharedStore {
        let store = MemoryStore::new();
        for (email, role) in users {
            let mut account = NewUser {
                name: None,
                email: email.to_string(),
                photo_url: None,
            }
            .into_account();
            account.role = *role;
            store.insert_user(account).await.unwrap();
        }
        store.shared()
    }

    #[test]
    fn test_parse_bearer() {
        assert_eq!(parse_bearer("Bearer abc.def.ghi"), Some("abc.def.ghi"));
        assert_eq!(parse_bearer("bearer   tok "), Some("tok"));
        assert_eq!(parse_bearer("Basic dXNlcg=="), None);
        assert_eq!(parse_bearer("Bearer "), None);
        assert_eq!(parse_bearer("Bearer"), None);
    }

    #[tokio::test]
    async fn test_missing_token_is_unauthorized() {
        let chain = GuardChain::authenticated(tokens());
        let mut ctx = RequestContext::from_authorization(None);

        let err = chain.run(&mut ctx).await.unwrap_err();
        assert!(matches!(err, BistroError::Unauthorized(_)));
        assert!(ctx.identity.is_none());
    }

    #[tokio::test]
    async fn test_bad_token_is_unauthorized() {
        let chain = GuardChain::authenticated(tokens());
        let mut ctx = RequestContext::from_authorization(Some("Bearer not.a.token"));

        let err = chain.run(&mut ctx).await.unwrap_err();
        assert_eq!(err.status_code(), 401);
    }

    #[tokio::test]
    async fn test_valid_token_attaches_identity() {
        let tokens = tokens();
        let chain = GuardChain::authenticated(tokens.clone());
        let header = bearer(&tokens, "a@b.com");
        let mut ctx = RequestContext::from_authorization(Some(&header));

        chain.run(&mut ctx).await.unwrap();
        assert_eq!(ctx.identity().unwrap().email, "a@b.com");
    }

    #[tokio::test]
    async fn test_admin_chain() {
        let tokens = tokens();
        let store = store_with(&[("boss@b.com", Some(Role::Admin)), ("user@b.com", None)]).await;
        let chain = GuardChain::admin(tokens.clone(), store);
        assert_eq!(chain.len(), 2);

        let header = bearer(&tokens, "boss@b.com");
        let mut ctx = RequestContext::from_authorization(Some(&header));
        chain.run(&mut ctx).await.unwrap();
        assert!(ctx.identity().unwrap().role.is_admin());

        let header = bearer(&tokens, "user@b.com");
        let mut ctx = RequestContext::from_authorization(Some(&header));
        let err = chain.run(&mut ctx).await.unwrap_err();
        assert!(matches!(err, BistroError::Forbidden(_)));

        let header = bearer(&tokens, "ghost@b.com");
        let mut ctx = RequestContext::from_authorization(Some(&header));
        let err = chain.run(&mut ctx).await.unwrap_err();
        assert!(matches!(err, BistroError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_admin_chain_without_token_never_reaches_store() {
        let chain = GuardChain::admin(tokens(), store_with(&[]).await);
        let mut ctx = RequestContext::from_authorization(None);

        let err = chain.run(&mut ctx).await.unwrap_err();
        assert!(matches!(err, BistroError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_self_scope_mismatch_is_forbidden() {
        let tokens = tokens();
        let chain = GuardChain::self_scoped(tokens.clone());
        let header = bearer(&tokens, "alice@b.com");

        let mut ctx = RequestContext::from_authorization(Some(&header))
            .with_scoped_email(Some("bob@b.com".to_string()));
        let err = chain.run(&mut ctx).await.unwrap_err();
        assert!(matches!(err, BistroError::Forbidden(_)));

        let mut ctx = RequestContext::from_authorization(Some(&header))
            .with_scoped_email(Some("alice@b.com".to_string()));
        chain.run(&mut ctx).await.unwrap();
    }

    #[tokio::test]
    async fn test_self_scope_defaults_to_caller() {
        let tokens = tokens();
        let chain = GuardChain::self_scoped(tokens.clone());
        let header = bearer(&tokens, "alice@b.com");
        let mut ctx = RequestContext::from_authorization(Some(&header));

        chain.run(&mut ctx).await.unwrap();
        assert_eq!(ctx.scoped_email.as_deref(), Some("alice@b.com"));
    }

    #[tokio::test]
    async fn test_misordered_guard_fails_closed() {
        let chain = GuardChain::new().then(RequireSelf);
        let mut ctx = RequestContext::default().with_scoped_email(Some("a@b.com".to_string()));

        let err = chain.run(&mut ctx).await.unwrap_err();
        assert!(matches!(err, BistroError::Unauthorized(_)));
    }
}
