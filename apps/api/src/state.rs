//! Shared application state.

use tienda_db::Database;
use tienda_settlement::SettlementEngine;

/// State handed to every handler. Cloning is cheap: the engine and the
/// database are pool handles.
#[derive(Clone)]
pub struct AppState {
    pub engine: SettlementEngine,
    pub db: Database,
}
