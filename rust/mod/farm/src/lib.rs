//! Farm module: poultry flock management.
//!
//! # Resources
//!
//! - **User**: farmer account, argon2 password, JWT sessions
//! - **Flock**: a batch of birds from placement to sale
//! - **DailyCheck**: per-flock daily observations with batched events
//! - **Event**: idempotent mortality, feed, vaccination and weight records
//! - **Alert**: rule-engine output with deduplication and a lifecycle
//! - **InventoryItem**: stock with movement history
//! - **Expenditure / Sale**: farm finance
//! - **BiosecurityCheck**: dated hygiene checklists
//! - **VetConsultation**: vet visits, optionally tied to a flock
//! - **Subscription**: plan billing settled by a mobile-money callback
//!
//! # Usage
//!
//! ```ignore
//! use farm::{FarmModule, payment::SandboxGateway, service::FarmConfig};
//!
//! let module = FarmModule::new(sql, FarmConfig::default(), Arc::new(SandboxGateway::new("174379")))?;
//! let router = module.routes(); // Serves /api/v1/...
//! ```

pub mod model;
pub mod service;
pub mod alerts;
pub mod schedule;
pub mod payment;
pub mod worker;
pub mod api;

use std::sync::Arc;

use axum::Router;

use henhouse_core::{Module, ServiceError};
use henhouse_sql::SQLStore;

use crate::payment::PaymentGateway;
use crate::service::{FarmConfig, FarmService};

/// Farm module implementing the Module trait.
pub struct FarmModule {
    service: Arc<FarmService>,
}

impl FarmModule {
    /// Create a new FarmModule, initializing the schema.
    pub fn new(
        sql: Arc<dyn SQLStore>,
        config: FarmConfig,
        gateway: Arc<dyn PaymentGateway>,
    ) -> Result<Self, ServiceError> {
        let service = FarmService::new(sql, config, gateway).map_err(ServiceError::from)?;
        Ok(Self { service })
    }

    /// Get a reference to the underlying FarmService.
    pub fn service(&self) -> &Arc<FarmService> {
        &self.service
    }
}

impl Module for FarmModule {
    fn name(&self) -> &str {
        "farm"
    }

    fn routes(&self) -> Router {
        api::build_router(self.service.clone())
    }
}
