use std::sync::Arc;

use configs::AdminConfig;
use service::ResponseRepository;

/// Shared handler state, built once at startup.
#[derive(Clone)]
pub struct ServerState {
    pub responses: Arc<dyn ResponseRepository>,
    pub admin: Arc<AdminConfig>,
}

impl ServerState {
    pub fn new(responses: Arc<dyn ResponseRepository>, admin: AdminConfig) -> Self {
        Self { responses, admin: Arc::new(admin) }
    }

    /// Plain string equality against the configured admin secret.
    pub fn is_admin_password(&self, candidate: Option<&str>) -> bool {
        candidate == Some(self.admin.password.as_str())
    }
}
