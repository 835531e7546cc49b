//! CLI command implementations.
//!
//! | Module  | Commands handled |
//! |---------|------------------|
//! | `serve` | `Serve`, `Init`  |
//! | `watch` | `Watch`          |

pub mod serve;
pub mod watch;

pub use serve::{cmd_init, cmd_serve};
pub use watch::cmd_watch;
