//! Service configuration.
//!
//! Each remote collaborator is selected by a base URL. When the variable
//! is unset or blank the deterministic local stub is used instead.

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[cfg(not(target_arch = "wasm32"))]
use crate::core::illustration::HttpIllustrationService;
use crate::core::illustration::{IllustrationService, StubIllustrationService};
#[cfg(not(target_arch = "wasm32"))]
use crate::core::orders::HttpOrderService;
use crate::core::orders::{OrderService, StubOrderService};

pub const ILLUSTRATION_API_VAR: &str = "STORYBOOK_ILLUSTRATION_API";
pub const ORDER_API_VAR: &str = "STORYBOOK_ORDER_API";
pub const STUB_LATENCY_VAR: &str = "STORYBOOK_STUB_LATENCY_MS";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} must be an http(s) URL, got '{value}'")]
    InvalidBaseUrl { var: &'static str, value: String },
    #[error("{var} must be a whole number of milliseconds, got '{value}'")]
    InvalidLatency { var: &'static str, value: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Base URL of the fine-tune + illustration backend.
    pub illustration_api: Option<String>,
    /// Base URL of the print order backend.
    pub order_api: Option<String>,
    /// Artificial delay applied by the stubs to each call.
    pub stub_latency: Duration,
}

impl ServiceConfig {
    /// Read the configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read the configuration through `lookup`, which maps a variable
    /// name to its value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let illustration_api = base_url(ILLUSTRATION_API_VAR, lookup(ILLUSTRATION_API_VAR))?;
        let order_api = base_url(ORDER_API_VAR, lookup(ORDER_API_VAR))?;
        let stub_latency = match lookup(STUB_LATENCY_VAR) {
            Some(value) if !value.trim().is_empty() => {
                let millis = value.trim().parse::<u64>().map_err(|_| ConfigError::InvalidLatency {
                    var: STUB_LATENCY_VAR,
                    value: value.clone(),
                })?;
                Duration::from_millis(millis)
            }
            _ => Duration::ZERO,
        };
        Ok(Self {
            illustration_api,
            order_api,
            stub_latency,
        })
    }

    /// The HTTP client when a base URL is set. Browser builds have no
    /// HTTP client here and always get the stub.
    pub fn illustration_service(&self) -> Arc<dyn IllustrationService> {
        #[cfg(not(target_arch = "wasm32"))]
        if let Some(base) = &self.illustration_api {
            tracing::info!(base_url = %base, "using remote illustration service");
            return Arc::new(HttpIllustrationService::new(base.clone()));
        }
        tracing::info!("using local illustration stub");
        Arc::new(StubIllustrationService::with_latency(self.stub_latency))
    }

    pub fn order_service(&self) -> Arc<dyn OrderService> {
        #[cfg(not(target_arch = "wasm32"))]
        if let Some(base) = &self.order_api {
            tracing::info!(base_url = %base, "using remote order service");
            return Arc::new(HttpOrderService::new(base.clone()));
        }
        tracing::info!("using local order stub");
        Arc::new(StubOrderService::with_latency(self.stub_latency))
    }
}

fn base_url(var: &'static str, value: Option<String>) -> Result<Option<String>, ConfigError> {
    let Some(value) = value else {
        return Ok(None);
    };
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(ConfigError::InvalidBaseUrl {
            var,
            value: value.clone(),
        });
    }
    Ok(Some(trimmed.trim_end_matches('/').to_string()))
}
