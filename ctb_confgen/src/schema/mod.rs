//! Typed configuration schemas with their defaults.
//!
//! - [`ctbmodule`] describes the `CTBModule` plugin configuration, including
//!   the board JSON sent to the CTB firmware.
//! - [`readout`] describes the `HSIDataLinkHandler` plugin configuration.
//! - [`confgen`] describes the generator's own input.

pub mod confgen;
pub mod ctbmodule;
pub mod readout;

/// Hexadecimal zero, the firmware's "unset" mask and prescale value.
pub(crate) fn hex_zero() -> String {
    String::from("0x0")
}
