//! Authentication and authorization middleware.
//!
//! The pair runs in sequence on protected routes: [`authenticate`] turns the
//! `Authorization` header into claims on the execution context, then
//! [`authorize`] gates on a named rule. A failure at either step
//! short-circuits — the business handler never runs.

use std::sync::Arc;

use crate::auth::{Auth, Rule};
use crate::context::Context;
use crate::error::Error;
use crate::handler::{BoxedHandler, ErasedHandler, Handler};
use crate::middleware::Mw;
use crate::request::Request;

/// Validates the bearer token and attaches the resulting claims to the
/// execution context. A missing, malformed, expired, or forged token is a
/// trusted 401 and the inner handler is never invoked.
pub fn authenticate(auth: Arc<Auth>) -> Mw {
    Arc::new(move |next: BoxedHandler| -> BoxedHandler {
        let auth = Arc::clone(&auth);
        let h = move |mut ctx: Context, req: Request| {
            let auth = Arc::clone(&auth);
            let next = Arc::clone(&next);
            async move {
                let header = req.header("authorization").unwrap_or_default();
                let claims = auth.authenticate(&ctx, header)?;
                ctx.set_claims(claims);

                next.call(ctx, req).await
            }
        };
        h.into_boxed_handler()
    })
}

/// Requires that [`authenticate`] already attached claims, then evaluates
/// `rule` against them. Identity-scoped rules compare the token subject to
/// the request's `{id}` path parameter. A rejection is a trusted 403 and the
/// inner handler is never invoked.
pub fn authorize(auth: Arc<Auth>, rule: Rule) -> Mw {
    Arc::new(move |next: BoxedHandler| -> BoxedHandler {
        let auth = Arc::clone(&auth);
        let h = move |ctx: Context, req: Request| {
            let auth = Arc::clone(&auth);
            let next = Arc::clone(&next);
            async move {
                match ctx.claims() {
                    None => {
                        // Misordered route registration, or authorize used
                        // without authenticate. Either way the caller has no
                        // verified identity.
                        return Err(Error::Authentication(
                            "not authorized for that action, no claims".to_owned(),
                        ));
                    }
                    Some(claims) => auth.authorize(&ctx, claims, req.param("id"), rule)?,
                }

                next.call(ctx, req).await
            }
        };
        h.into_boxed_handler()
    })
}
