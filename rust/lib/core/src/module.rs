use axum::Router;

/// A service module that contributes HTTP routes.
///
/// The binary entry point collects modules and merges their routes
/// into a single Router.
pub trait Module: Send + Sync {
    /// Module name, used for logging.
    fn name(&self) -> &str;

    /// Return the module's routes. They are already stateful-resolved
    /// and carry their own path prefix.
    fn routes(&self) -> Router;
}
