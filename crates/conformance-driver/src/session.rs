use std::fmt;
use std::sync::Arc;

use conformance_core::MilvusService;

/// One independent client connection to the service under test.
#[derive(Clone)]
pub struct Session {
    alias: String,
    service: Arc<dyn MilvusService>,
}

impl Session {
    pub fn new(alias: impl Into<String>, service: Arc<dyn MilvusService>) -> Self {
        Self {
            alias: alias.into(),
            service,
        }
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    pub fn service(&self) -> &dyn MilvusService {
        self.service.as_ref()
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session").field("alias", &self.alias).finish()
    }
}
