//! Shared services handed to every background service.

use crate::config::SharedConfig;
use crate::features::FeatureFlags;
use crate::http::{ClientError, ResilientClient};
use crate::lifecycle::Shutdown;
use crate::observability::AppInfo;

pub struct AppContext {
    pub info: AppInfo,
    pub config: SharedConfig,
    pub features: FeatureFlags,
    pub http_client: ResilientClient,
    pub shutdown: Shutdown,
}

impl AppContext {
    pub fn new(info: AppInfo, config: SharedConfig, shutdown: Shutdown) -> Result<Self, ClientError> {
        let http_client = ResilientClient::new(config.load().http_client.clone(), &info.user_agent())?;
        let features = FeatureFlags::new(config.clone());

        Ok(Self {
            info,
            config,
            features,
            http_client,
            shutdown,
        })
    }
}
