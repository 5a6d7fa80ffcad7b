//! Builders for the CTB applications.
//!
//! Each builder returns a validated [`crate::graph::App`] ready to be added
//! to a [`crate::graph::System`].

mod boardcontroller;
mod ctb_hsi;

pub use boardcontroller::get_boardcontroller_app;
pub use ctb_hsi::get_ctb_hsi_app;

/// Name given to the CTB application and its `CTBModule` instance.
pub const DEFAULT_NICKNAME: &str = "ctb";
