use std::sync::Arc;

use crate::{
    db::MovieStore,
    services::{catalog::CatalogApi, oracle::MovieOracle, recommendations::RecommendationService},
};

/// Shared application state
///
/// Every collaborator sits behind a trait object so handlers can be exercised
/// against in-memory fakes.
#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<dyn CatalogApi>,
    pub recommender: Arc<RecommendationService>,
    pub oracle: Arc<dyn MovieOracle>,
    pub store: Arc<dyn MovieStore>,
    pub limits: ResultLimits,
}

/// Bounds on the number of recommendations a caller may request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResultLimits {
    pub default: usize,
    pub max: usize,
}

impl Default for ResultLimits {
    fn default() -> Self {
        Self {
            default: 20,
            max: 100,
        }
    }
}

impl AppState {
    pub fn new(
        catalog: Arc<dyn CatalogApi>,
        recommender: Arc<RecommendationService>,
        oracle: Arc<dyn MovieOracle>,
        store: Arc<dyn MovieStore>,
    ) -> Self {
        Self {
            catalog,
            recommender,
            oracle,
            store,
            limits: ResultLimits::default(),
        }
    }

    pub fn with_limits(mut self, limits: ResultLimits) -> Self {
        self.limits = limits;
        self
    }
}
