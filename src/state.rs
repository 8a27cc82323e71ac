//! Application state management

use std::sync::Arc;

use crate::document::DocumentService;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    documents: DocumentService,
}

impl AppState {
    pub fn new(documents: DocumentService) -> Self {
        Self {
            inner: Arc::new(AppStateInner { documents }),
        }
    }

    /// Get the document service
    pub fn documents(&self) -> &DocumentService {
        &self.inner.documents
    }
}
