use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Instant;

/// Health status of a service or dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        matches!(self, HealthStatus::Healthy)
    }
}

/// Health of a single dependency.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependencyHealth {
    pub name: String,
    pub status: HealthStatus,
    pub latency_ms: Option<f64>,
    pub message: Option<String>,
}

impl DependencyHealth {
    pub fn healthy(name: impl Into<String>, latency_ms: f64) -> Self {
        Self {
            name: name.into(),
            status: HealthStatus::Healthy,
            latency_ms: Some(latency_ms),
            message: None,
        }
    }

    pub fn degraded(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: HealthStatus::Degraded,
            latency_ms: None,
            message: Some(message.into()),
        }
    }

    pub fn unhealthy(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: HealthStatus::Unhealthy,
            latency_ms: None,
            message: Some(message.into()),
        }
    }
}

/// Aggregated health check result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatedHealth {
    pub status: HealthStatus,
    pub version: String,
    pub uptime_seconds: u64,
    pub dependencies: Vec<DependencyHealth>,
}

impl AggregatedHealth {
    pub fn new(version: String, uptime_seconds: u64, dependencies: Vec<DependencyHealth>) -> Self {
        let status = Self::aggregate_status(&dependencies);
        Self {
            status,
            version,
            uptime_seconds,
            dependencies,
        }
    }

    fn aggregate_status(dependencies: &[DependencyHealth]) -> HealthStatus {
        if dependencies
            .iter()
            .any(|d| d.status == HealthStatus::Unhealthy)
        {
            HealthStatus::Unhealthy
        } else if dependencies
            .iter()
            .any(|d| d.status == HealthStatus::Degraded)
        {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        }
    }
}

/// Probes the dependencies a service needs to serve traffic: its database
/// and, where wired, the event broker.
pub struct HealthChecker {
    pool: PgPool,
    broker_client: Option<Arc<rskafka::client::Client>>,
    start_time: Instant,
}

impl HealthChecker {
    pub fn new(pool: PgPool, broker_client: Option<Arc<rskafka::client::Client>>) -> Self {
        Self {
            pool,
            broker_client,
            start_time: Instant::now(),
        }
    }

    pub async fn check(&self) -> AggregatedHealth {
        let mut dependencies = vec![self.check_database().await];
        if self.broker_client.is_some() {
            dependencies.push(self.check_broker().await);
        }

        AggregatedHealth::new(
            env!("CARGO_PKG_VERSION").to_string(),
            self.start_time.elapsed().as_secs(),
            dependencies,
        )
    }

    /// Readiness is the database alone; the broker degrades but does not
    /// block traffic.
    pub async fn is_ready(&self) -> bool {
        self.check_database().await.status.is_healthy()
    }

    async fn check_database(&self) -> DependencyHealth {
        let start = Instant::now();
        match sqlx::query("SELECT 1").fetch_one(&self.pool).await {
            Ok(_) => {
                DependencyHealth::healthy("database", start.elapsed().as_secs_f64() * 1000.0)
            }
            Err(e) => DependencyHealth::unhealthy("database", e.to_string()),
        }
    }

    async fn check_broker(&self) -> DependencyHealth {
        let start = Instant::now();
        match self.broker_client.as_ref() {
            Some(client) => match client.list_topics().await {
                Ok(_) => {
                    DependencyHealth::healthy("broker", start.elapsed().as_secs_f64() * 1000.0)
                }
                Err(e) => DependencyHealth::degraded("broker", e.to_string()),
            },
            None => DependencyHealth::degraded("broker", "not configured"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aggregate_status_all_healthy() {
        let health = AggregatedHealth::new(
            "0.1.0".to_string(),
            1,
            vec![DependencyHealth::healthy("database", 1.0)],
        );
        assert_eq!(health.status, HealthStatus::Healthy);
    }

    #[test]
    fn test_aggregate_status_degraded_wins_over_healthy() {
        let health = AggregatedHealth::new(
            "0.1.0".to_string(),
            1,
            vec![
                DependencyHealth::healthy("database", 1.0),
                DependencyHealth::degraded("broker", "unreachable"),
            ],
        );
        assert_eq!(health.status, HealthStatus::Degraded);
    }

    #[test]
    fn test_aggregate_status_unhealthy_wins() {
        let health = AggregatedHealth::new(
            "0.1.0".to_string(),
            1,
            vec![
                DependencyHealth::unhealthy("database", "down"),
                DependencyHealth::degraded("broker", "unreachable"),
            ],
        );
        assert_eq!(health.status, HealthStatus::Unhealthy);
    }
}
