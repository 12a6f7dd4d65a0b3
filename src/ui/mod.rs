//! Terminal output with automatic fallback to plain text in CI
//!
//! Status lines go to stderr so that stdout stays machine-readable.
//!
//! # Example
//!
//! ```rust,ignore
//! use tlsetup::ui::{self, UiContext, TaskSpinner};
//!
//! let ctx = UiContext::detect();
//! let mut spinner = TaskSpinner::new(&ctx);
//! spinner.start("Setting up TeX Live...");
//! // ... do work ...
//! spinner.stop("TeX Live 2024 ready");
//!
//! ui::key_value(&ctx, "cache-hit", "true");
//! ```

mod context;
mod output;
mod progress;

pub use context::UiContext;
pub use output::{key_value, step_ok, step_warn, step_warn_hint};
pub use progress::TaskSpinner;
