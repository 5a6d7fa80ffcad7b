//! Running test bodies inside a `figment::Jail`.
//!
//! A jail gives the closure a private working directory and restores any
//! environment variables it sets, so configuration tests can stage
//! `ctb.toml` files and `CTBMODULES_GEN_*` variables without leaking them.

use anyhow::{Result, anyhow};

/// Runs `f` inside a [`figment::Jail`] and hands back its value.
///
/// # Errors
///
/// Fails when the jail cannot be set up or `f` returns an error.
///
/// # Examples
///
/// ```
/// use ctb_confgen_test_helpers::figment::with_jail;
///
/// let text = with_jail(|j| {
///     j.create_file("ctb.toml", "[boot]\nuse_k8s = true\n")?;
///     Ok(std::fs::read_to_string("ctb.toml").unwrap_or_default())
/// })
/// .expect("jail runs");
/// assert!(text.contains("use_k8s"));
/// ```
pub fn with_jail<F, T>(f: F) -> Result<T>
where
    F: FnOnce(&mut figment::Jail) -> figment::error::Result<T>,
{
    let mut slot = None;
    figment::Jail::try_with(|jail| {
        slot = Some(f(jail)?);
        Ok(())
    })
    .map_err(|err| anyhow!("jailed test failed: {err}"))?;
    slot.ok_or_else(|| anyhow!("jail closure produced no value"))
}

/// Turns any displayable error into a [`figment::Error`] so library errors
/// can be propagated with `?` inside [`with_jail`].
#[expect(
    clippy::needless_pass_by_value,
    reason = "used as a map_err adapter, which passes errors by value"
)]
pub fn figment_error<E: ToString>(err: E) -> figment::Error {
    figment::Error::from(err.to_string())
}
