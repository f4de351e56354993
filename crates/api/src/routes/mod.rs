//! Route definitions.

use axum::{Router, middleware};

use crate::{AppState, middleware::auth::auth_middleware};

pub mod concepts;
pub mod finance;
pub mod health;
pub mod invoices;
pub mod payment_intents;
pub mod payments;

/// Creates the REST router: public health plus authenticated finance resources.
#[allow(clippy::needless_pass_by_value)]
pub fn api_routes_with_state(state: AppState) -> Router<AppState> {
    let protected_routes = Router::new()
        .merge(payments::routes())
        .merge(concepts::routes())
        .merge(invoices::routes())
        .merge(payment_intents::routes())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .merge(health::routes())
        .merge(protected_routes)
}

/// Creates the HTML finance router; every page requires a session.
pub fn finance_routes_with_state(state: AppState) -> Router<AppState> {
    finance::routes().layer(middleware::from_fn_with_state(state, auth_middleware))
}
