//! One module per subcommand, each exposing a `run` function `main.rs`
//! dispatches into.

pub mod activate;
pub mod add;
pub mod compat;
pub mod gc;
pub mod instantiate;
pub mod pin;
pub mod rm;
pub mod status;
pub mod up;
