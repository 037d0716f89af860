//! Configuration loading helpers.
//!
//! Provides a wrapper around `ortho_config` that tolerates a missing `site`
//! field by falling back to command-line values.

use std::sync::Arc;

use figment::error::{Error as FigmentError, Kind as FigmentKind};
use ortho_config::{OrthoConfig, OrthoError, load_and_merge_subcommand_for};

fn missing_site(err: &FigmentError) -> bool {
    // FigmentError yields its causes only by value; clone to inspect without ownership.
    err.clone()
        .into_iter()
        .any(|e| matches!(e.kind, FigmentKind::MissingField(ref f) if f == "site"))
}

/// Load configuration for a set of CLI arguments, falling back when `site`
/// is absent from every configuration source.
///
/// # Errors
///
/// Returns an [`OrthoError`] if configuration gathering fails for reasons
/// other than a missing site field.
#[expect(
    clippy::result_large_err,
    reason = "configuration loading errors can be verbose"
)]
pub fn load_with_site_fallback<T>(cli_args: T) -> Result<T, Arc<OrthoError>>
where
    T: OrthoConfig + serde::Serialize + Default + clap::CommandFactory + Clone,
{
    match load_and_merge_subcommand_for::<T>(&cli_args) {
        Ok(v) => Ok(v),
        Err(e) => match &*e {
            OrthoError::Gathering(fe) if missing_site(fe) => Ok(cli_args),
            _ => Err(e),
        },
    }
}
