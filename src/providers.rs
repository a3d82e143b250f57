use std::sync::Arc;

use findiff_api::ApiConfig;
use findiff_provider::{ConnectionProvider, DocumentCatalog, SessionProvider, StaticSession};
use findiff_provider_mock::{MockConnectionProvider, MockDocumentCatalog, MOCK_PROVIDER_ID};
use findiff_provider_ws::{HttpDocumentCatalog, WsConnectionProvider, WS_PROVIDER_ID};

use crate::config::EnvConfig;
use crate::error::FindiffError;

pub const DEFAULT_PROVIDER_ID: &str = MOCK_PROVIDER_ID;

/// Everything the runtime needs to reach the outside world.
pub struct Backends {
    pub connections: Arc<dyn ConnectionProvider>,
    pub catalog: Arc<dyn DocumentCatalog>,
    pub session: Arc<dyn SessionProvider>,
}

pub fn backends_from_config(config: &EnvConfig) -> Result<Backends, FindiffError> {
    let api = config.api_config();
    Ok(Backends {
        connections: provider_for_id(&config.provider, api.clone())?,
        catalog: catalog_for_id(&config.provider, api)?,
        session: Arc::new(StaticSession::from_id_token(config.id_token.clone())),
    })
}

pub fn provider_for_id(
    provider_id: &str,
    api: ApiConfig,
) -> Result<Arc<dyn ConnectionProvider>, FindiffError> {
    match provider_id {
        MOCK_PROVIDER_ID => Ok(Arc::new(MockConnectionProvider::default())),
        WS_PROVIDER_ID => Ok(Arc::new(WsConnectionProvider::new(api)?)),
        unknown => Err(FindiffError::UnsupportedProvider(unknown.to_string())),
    }
}

pub fn catalog_for_id(
    provider_id: &str,
    api: ApiConfig,
) -> Result<Arc<dyn DocumentCatalog>, FindiffError> {
    match provider_id {
        MOCK_PROVIDER_ID => Ok(Arc::new(MockDocumentCatalog::new())),
        WS_PROVIDER_ID => Ok(Arc::new(HttpDocumentCatalog::new(api)?)),
        unknown => Err(FindiffError::UnsupportedProvider(unknown.to_string())),
    }
}
