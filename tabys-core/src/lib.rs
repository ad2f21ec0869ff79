//! Tabys Core
//!
//! Session and permission core of the Tabys admin chat bot. Staff log in with
//! a one-time token issued by the Tabys backend; the bot keeps their session
//! in Redis and gates every action on a (role, module, operation) check.
//!
//! # Architecture
//!
//! - [`rbac`] - static permission table, role hierarchy and guards
//! - [`kv`] - key-value backends (Redis, in-memory)
//! - [`session`] - session records, lifecycle and rate limiting
//! - [`gate`] - per-event composition of the above
//! - [`gateway`] - typed client for the admin backend
//! - [`auth`] - login, logout and restore flows
//! - [`content`] - cached, permission-checked collection browsing
//! - [`app`] - composition root
//!
//! # Example
//!
//! ```rust,no_run
//! use tabys_core::config::TabysConfig;
//! use tabys_core::gate::{GateOutcome, InboundEvent};
//! use tabys_core::App;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let app = App::connect(TabysConfig::load()?).await?;
//!
//! match app.handle(&InboundEvent::message("42", "/start")).await? {
//!     GateOutcome::Proceed(ctx) if ctx.is_authenticated() => {
//!         println!("modules: {:?}", ctx.rbac().accessible_modules());
//!     }
//!     GateOutcome::Proceed(_) => println!("please /login"),
//!     GateOutcome::TooManyRequests { .. } => println!("slow down"),
//! }
//!
//! app.close().await;
//! # Ok(())
//! # }
//! ```

pub mod app;
pub mod auth;
pub mod cache;
pub mod config;
pub mod content;
pub mod gate;
pub mod gateway;
pub mod kv;
pub mod logging;
pub mod rbac;
pub mod session;

pub use app::App;
pub use config::TabysConfig;
