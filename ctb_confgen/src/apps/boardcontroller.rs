//! Stand-alone board controller application.

use crate::ConfgenResult;
use crate::graph::{App, DaqModule, ModuleGraph};
use crate::schema::ctbmodule;

/// Builds an application with a single `CTBModule` using the default board
/// configuration, hosted on `localhost`.
///
/// # Errors
///
/// Returns an error when the module configuration cannot be serialised or
/// `nickname` is not a valid module name.
///
/// # Examples
///
/// ```rust
/// use ctb_confgen::apps::get_boardcontroller_app;
///
/// let app = get_boardcontroller_app("ctb").expect("controller app");
/// assert_eq!(app.host(), "localhost");
/// assert_eq!(app.modulegraph().modules().len(), 1);
/// ```
pub fn get_boardcontroller_app(nickname: &str) -> ConfgenResult<App> {
    tracing::info!(nickname, "generating board controller app");
    let module = DaqModule::new(nickname, "CTBModule", &ctbmodule::Conf::default())?;
    App::on_localhost(nickname, ModuleGraph::new(vec![module], Vec::new()))
}
