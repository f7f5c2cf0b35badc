//! # CountBot Gateway
//! Receives the bridge's webhooks and exposes a small read API.
//!
//! | Route | |
//! |-------|---|
//! | `GET /health` | liveness, no secret |
//! | `POST /webhook/participants` | membership event, 202 |
//! | `POST /webhook/messages` | chat message / command, 202 |
//! | `GET /api/counters?date=` | counter rows of a day |
//! | `GET /api/report?date=` | report preview, nothing sent |

pub mod routes;
pub mod server;

pub use server::{build_router, serve, AppState, SECRET_HEADER};
