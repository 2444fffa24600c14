//! Tekton trigger transport boundary.
//!
//! Two axum routers sit on top of the [`trigger`] crate:
//!
//! - [`build_event_router`] receives CloudEvents on `POST /events` and hands
//!   each one to the [`trigger::EventDispatcher`].
//! - [`build_webhook_router`] exposes webhook registration under `/webhooks/`
//!   backed by the [`trigger::WebhookRegistry`].
//!
//! Both are wrapped by [`with_limits`] and run by [`serve`].
//!
//! ## Status codes
//!
//! | Outcome | Status |
//! |---------|--------|
//! | Event handled, skipped or ignored | `202` |
//! | Malformed envelope, wrong version/type, undecodable payload | `400` |
//! | Pipeline run submission failed | `502` |
//! | Webhook registered | `201` |
//! | Webhook validation or source creation failed | `400` |
//! | Webhook store failed | `500` |

pub mod error;
pub mod events;
pub mod server;
pub mod webhooks;

#[cfg(test)]
mod test_utils;

pub use axum::Router;
pub use error::{EventRejection, WebhookApiError};
pub use events::{build_event_router, EventState};
pub use server::{serve, shutdown_signal, with_limits, ServerLimits};
pub use webhooks::{build_webhook_router, WebhookState};
