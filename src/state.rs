use crate::storage::SharedStorage;

#[derive(Clone)]
pub struct AppState {
    pub storage: SharedStorage,
}

impl AppState {
    pub fn new(storage: SharedStorage) -> Self {
        Self { storage }
    }
}
