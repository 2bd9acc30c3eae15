//! Health report for the hub's runtime components
//!
//! `GET /health` returns one [`HealthStatus`] assembled by
//! `AppContext::health_check`.

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Components whose failure makes the hub unhealthy regardless of score.
const CRITICAL_COMPONENTS: &[&str] = &["database", "broker"];

/// Overall health of the hub
///
/// # Example
/// ```
/// use integrahub_api::utils::health::{ComponentHealth, HealthStatus};
///
/// let mut status = HealthStatus::new()
///     .add_component(ComponentHealth::healthy("database"))
///     .add_component(ComponentHealth::unhealthy("workers", "1 of 3 stopped"));
/// status.calculate_score();
///
/// assert_eq!(status.score, 0.5);
/// assert!(!status.is_healthy);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub is_healthy: bool,

    /// Fraction of healthy components, 0.0 to 1.0.
    pub score: f64,

    pub message: Option<String>,

    pub components: Vec<ComponentHealth>,

    /// Unix timestamp (seconds) of the check.
    pub timestamp: i64,
}

impl HealthStatus {
    pub fn new() -> Self {
        Self {
            is_healthy: true,
            score: 1.0,
            message: None,
            components: Vec::new(),
            timestamp: Utc::now().timestamp(),
        }
    }

    pub fn add_component(mut self, component: ComponentHealth) -> Self {
        self.components.push(component);
        self
    }

    /// Recompute `score` and `is_healthy` from the components.
    ///
    /// Healthy means a score of at least 0.8 and no failing critical
    /// component.
    pub fn calculate_score(&mut self) {
        if self.components.is_empty() {
            return;
        }

        let healthy_count = self.components.iter().filter(|c| c.is_healthy).count();
        self.score = healthy_count as f64 / self.components.len() as f64;

        let critical_down: Vec<&str> = self
            .components
            .iter()
            .filter(|c| !c.is_healthy && CRITICAL_COMPONENTS.contains(&c.name.as_str()))
            .map(|c| c.name.as_str())
            .collect();

        self.is_healthy = self.score >= 0.8 && critical_down.is_empty();
        self.message = if critical_down.is_empty() {
            None
        } else {
            Some(format!("critical components down: {}", critical_down.join(", ")))
        };
    }
}

impl Default for HealthStatus {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    /// Component identifier (`database`, `broker`, `workers`, ...)
    pub name: String,
    pub is_healthy: bool,
    pub message: Option<String>,
}

impl ComponentHealth {
    pub fn healthy(name: impl Into<String>) -> Self {
        Self { name: name.into(), is_healthy: true, message: None }
    }

    pub fn unhealthy(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self { name: name.into(), is_healthy: false, message: Some(message.into()) }
    }
}
