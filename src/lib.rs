//! Motion core for the portfolio landing page.
//!
//! Everything above the `browser` and `frontend` modules is plain Rust that
//! drives animations through the [`scheduler::Scheduler`] trait, so it runs
//! and tests natively against a manual clock.

pub mod ambient;
pub mod carousel;
pub mod config;
pub mod ease;
pub mod error;
pub mod intro;
pub mod reveal;
pub mod scheduler;
pub mod scroll;
pub mod spotlight;
pub mod stagger;
pub mod throttle;

#[cfg(test)]
mod testing;

#[cfg(target_arch = "wasm32")]
pub mod browser;
#[cfg(target_arch = "wasm32")]
pub mod frontend;

#[cfg(not(target_arch = "wasm32"))]
pub mod server;
