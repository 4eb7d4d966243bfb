//! Bearer-token authentication and rule-based authorization.
//!
//! [`Auth`] does two jobs, in order:
//!
//! 1. **Authenticate** — turn an `Authorization: Bearer <token>` header into
//!    verified [`Claims`], or a trusted 401. Signature, expiry, and issuer
//!    are all checked against key material fixed at construction.
//! 2. **Authorize** — evaluate a named [`Rule`] against those claims, or a
//!    trusted 403. The rule set is closed: routes pick from this enum at
//!    registration time, nothing is looked up by string at request time.
//!
//! A failure at either step is terminal for the request and invisible to the
//! process. Raw token material is never logged and never echoed into errors.

use std::fmt;

use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::context::Context;
use crate::error::Error;

/// Role granted to operators.
pub const ROLE_ADMIN: &str = "ADMIN";

/// Role granted to regular users.
pub const ROLE_USER: &str = "USER";

// ── Claims ────────────────────────────────────────────────────────────────────

/// The verified identity extracted from a bearer token.
///
/// Immutable once constructed: the authenticate middleware attaches a value
/// to the execution context and everything downstream only reads it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject — the user id this token was issued to.
    pub sub: String,

    /// Role names granted to the subject.
    #[serde(default)]
    pub roles: Vec<String>,

    /// Expiry as seconds since the Unix epoch.
    pub exp: u64,

    /// Issuer that signed the token.
    pub iss: String,
}

impl Claims {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

// ── Rule ──────────────────────────────────────────────────────────────────────

/// A named authorization policy. The set is closed on purpose — every valid
/// rule is known here, and routes reference them by variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    /// Any authenticated subject holding at least one known role.
    Any,
    /// Requires the `ADMIN` role.
    AdminOnly,
    /// Requires the `USER` role.
    UserOnly,
    /// Requires the `ADMIN` role, or that the token subject matches the
    /// target resource id extracted from the request path.
    AdminOrSubject,
}

impl Rule {
    /// Stable rule name, used in audit log lines.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Any => "rule_any",
            Self::AdminOnly => "rule_admin_only",
            Self::UserOnly => "rule_user_only",
            Self::AdminOrSubject => "rule_admin_or_subject",
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Auth ──────────────────────────────────────────────────────────────────────

/// Token verifier and rule evaluator. Construct once at startup, share via
/// `Arc` with the authenticate/authorize middleware.
pub struct Auth {
    key: DecodingKey,
    validation: Validation,
}

impl Auth {
    /// Builds an authenticator around existing key material.
    ///
    /// The issuer is pinned: tokens signed by anyone else are rejected even
    /// with a valid signature.
    pub fn new(key: DecodingKey, algorithm: Algorithm, issuer: &str) -> Self {
        let mut validation = Validation::new(algorithm);
        validation.set_required_spec_claims(&["exp", "iss"]);
        validation.set_issuer(&[issuer]);
        Self { key, validation }
    }

    /// HS256 convenience constructor for a shared-secret deployment.
    pub fn from_secret(secret: &[u8], issuer: &str) -> Self {
        Self::new(DecodingKey::from_secret(secret), Algorithm::HS256, issuer)
    }

    /// Validates a bearer token and returns its claims.
    ///
    /// `header` is the raw `Authorization` header value (or `""` when the
    /// header is absent). Every failure mode — missing header, malformed
    /// prefix, bad signature, expired, wrong issuer — collapses into a
    /// trusted 401; callers learn that authentication failed, not why the
    /// verifier is unhappy.
    pub fn authenticate(&self, ctx: &Context, header: &str) -> Result<Claims, Error> {
        ctx.check_deadline()?;

        let token = parse_bearer(header)?;
        let data = jsonwebtoken::decode::<Claims>(token, &self.key, &self.validation)
            .map_err(|e| Error::Authentication(format!("invalid token: {e}")))?;

        Ok(data.claims)
    }

    /// Evaluates `rule` against verified claims.
    ///
    /// `target_subject` is the resource id the request is about (the `{id}`
    /// path parameter), consulted only by identity-scoped rules. On rejection
    /// the error records the rule name and attempted roles for the audit log;
    /// the response body stays generic.
    pub fn authorize(
        &self,
        ctx: &Context,
        claims: &Claims,
        target_subject: Option<&str>,
        rule: Rule,
    ) -> Result<(), Error> {
        ctx.check_deadline()?;

        let allowed = match rule {
            Rule::Any => claims.has_role(ROLE_ADMIN) || claims.has_role(ROLE_USER),
            Rule::AdminOnly => claims.has_role(ROLE_ADMIN),
            Rule::UserOnly => claims.has_role(ROLE_USER),
            Rule::AdminOrSubject => {
                claims.has_role(ROLE_ADMIN)
                    || target_subject.is_some_and(|subject| subject == claims.sub)
            }
        };

        if !allowed {
            return Err(Error::Authorization { rule, roles: claims.roles.clone() });
        }
        Ok(())
    }
}

fn parse_bearer(header: &str) -> Result<&str, Error> {
    header
        .strip_prefix("Bearer ")
        .filter(|token| !token.is_empty())
        .ok_or_else(|| {
            Error::Authentication("expected authorization header format: Bearer <token>".to_owned())
        })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
