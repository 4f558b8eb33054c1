//! Shared application state for Axum routers.

use std::sync::Arc;
use std::time::Instant;

use csos_storage::{FsLocalFiles, RuleCache, RuleLoader, SupabaseStorage};

use crate::auth::AuthConfig;
use crate::config::{ApiConfig, BackendConfig, RulesConfig};
use crate::error::{ApiError, ApiResult};
use crate::role_store::{RestRoleStore, RoleStore};

/// Everything the routers need, built once at startup.
#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<RuleCache>,
    pub roles: Arc<dyn RoleStore>,
    pub auth_config: AuthConfig,
    pub api_config: ApiConfig,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(
        cache: Arc<RuleCache>,
        roles: Arc<dyn RoleStore>,
        auth_config: AuthConfig,
        api_config: ApiConfig,
    ) -> Self {
        Self {
            cache,
            roles,
            auth_config,
            api_config,
            start_time: Instant::now(),
        }
    }

    /// Wire the production backends: backend storage with a local fallback
    /// for rules, and the backend REST interface for roles.
    pub fn from_config(
        backend: &BackendConfig,
        rules: &RulesConfig,
        auth_config: AuthConfig,
        api_config: ApiConfig,
    ) -> ApiResult<Self> {
        let storage = SupabaseStorage::new(
            &backend.url,
            backend.service_role_key.clone(),
            backend.timeout,
        )
        .map_err(|e| ApiError::internal_error(e.to_string()))?;
        let local = FsLocalFiles::new(rules.local_dir.clone());
        let loader = RuleLoader::new(Arc::new(storage), Arc::new(local));
        let cache = Arc::new(RuleCache::new(
            loader,
            Arc::new(csos_storage::SystemClock),
            rules.cache_config(),
        ));

        let roles = RestRoleStore::new(
            &backend.url,
            backend.service_role_key.clone(),
            backend.timeout,
        )?;

        Ok(Self::new(cache, Arc::new(roles), auth_config, api_config))
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("cache", &self.cache.config())
            .field("auth_config", &self.auth_config)
            .field("api_config", &self.api_config)
            .finish_non_exhaustive()
    }
}
