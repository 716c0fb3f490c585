use crate::error::{AppError, Result};
use anyhow::anyhow;
use chrono::Utc;
use rskafka::client::partition::{Compression, PartitionClient, UnknownTopicHandling};
use rskafka::client::ClientBuilder;
use rskafka::record::Record;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Configuration for the broker producer.
#[derive(Debug, Clone)]
pub struct ProducerConfig {
    pub brokers: Vec<String>,
    /// Bound on a single send; delivery is at-most-once and a timeout is a
    /// publish failure, not a retry trigger.
    pub send_timeout: Duration,
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self {
            brokers: vec!["localhost:9092".to_string()],
            send_timeout: Duration::from_secs(3),
        }
    }
}

/// Broker producer with a per-topic partition-client cache.
pub struct EventProducer {
    config: ProducerConfig,
    client: Arc<rskafka::client::Client>,
    partition_clients: RwLock<BTreeMap<String, Arc<PartitionClient>>>,
}

impl EventProducer {
    /// Connects to the broker cluster.
    pub async fn connect(config: ProducerConfig) -> Result<Self> {
        info!("Connecting producer to brokers: {:?}", config.brokers);

        let client = ClientBuilder::new(config.brokers.clone())
            .build()
            .await
            .map_err(|e| AppError::Internal(anyhow!("failed to connect to broker: {e}")))?;

        Ok(Self {
            config,
            client: Arc::new(client),
            partition_clients: RwLock::new(BTreeMap::new()),
        })
    }

    async fn partition_client(&self, topic: &str) -> Result<Arc<PartitionClient>> {
        {
            let clients = self.partition_clients.read().await;
            if let Some(client) = clients.get(topic) {
                return Ok(client.clone());
            }
        }

        let partition_client = self
            .client
            .partition_client(topic.to_string(), 0, UnknownTopicHandling::Retry)
            .await
            .map_err(|e| AppError::Publish(format!("failed to open topic {topic}: {e}")))?;

        let client = Arc::new(partition_client);
        let mut clients = self.partition_clients.write().await;
        clients.insert(topic.to_string(), client.clone());
        Ok(client)
    }

    /// Sends one JSON payload to `topic`. A single attempt bounded by the
    /// send timeout; errors surface as `AppError::Publish`.
    pub async fn send<T: Serialize>(&self, topic: &str, key: &str, payload: &T) -> Result<i64> {
        let value = serde_json::to_vec(payload)
            .map_err(|e| AppError::Publish(format!("failed to serialize payload: {e}")))?;

        let record = Record {
            key: Some(key.as_bytes().to_vec()),
            value: Some(value),
            headers: BTreeMap::new(),
            timestamp: Utc::now(),
        };

        let partition_client = self.partition_client(topic).await?;
        let produce = partition_client.produce(vec![record], Compression::NoCompression);

        let offsets = tokio::time::timeout(self.config.send_timeout, produce)
            .await
            .map_err(|_| AppError::Publish(format!("send to {topic} timed out")))?
            .map_err(|e| AppError::Publish(format!("send to {topic} failed: {e}")))?;

        let offset = offsets.first().copied().unwrap_or(0);
        debug!(topic, offset, "event published");
        Ok(offset)
    }

    pub fn config(&self) -> &ProducerConfig {
        &self.config
    }

    /// Underlying broker client, shared with the health checker.
    pub fn client(&self) -> Arc<rskafka::client::Client> {
        self.client.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_producer_config_default() {
        let config = ProducerConfig::default();
        assert_eq!(config.brokers, vec!["localhost:9092".to_string()]);
        assert_eq!(config.send_timeout, Duration::from_secs(3));
    }
}
