use merx_order::LedgerEngine;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<LedgerEngine>,
}

impl AppState {
    pub fn new(engine: LedgerEngine) -> Self {
        Self {
            engine: Arc::new(engine),
        }
    }
}
