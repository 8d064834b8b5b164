pub mod api;
pub mod bootstrap;
pub mod health;
pub mod reconcile;

pub use api::{router, AppState, Repositories};
pub use bootstrap::{bootstrap, bootstrap_with_config, Application, BootstrapError};
pub use reconcile::{RecordQuery, RecordReconciler, Resolution, ResolutionSource};
