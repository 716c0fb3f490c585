use crate::error::{AppError, Result};
use anyhow::anyhow;
use async_trait::async_trait;
use rskafka::client::partition::{Compression, PartitionClient, UnknownTopicHandling};
use rskafka::client::ClientBuilder;
use rskafka::record::RecordAndOffset;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

/// Configuration for the event consumer.
#[derive(Debug, Clone)]
pub struct ConsumerConfig {
    pub brokers: Vec<String>,
    pub topics: Vec<String>,
    /// Poison messages are forwarded here and acknowledged without requeue.
    pub dead_letter_topic: Option<String>,
    pub fetch_max_wait_ms: i32,
    pub max_poll_records: usize,
    /// Backoff before re-fetching a message whose handling failed with a
    /// retryable error.
    pub retry_backoff: Duration,
    /// Idle delay between empty polls.
    pub poll_interval: Duration,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            brokers: vec!["localhost:9092".to_string()],
            topics: vec!["bank.operations.transfer.completed".to_string()],
            dead_letter_topic: Some("bank.operations.dlq".to_string()),
            fetch_max_wait_ms: 500,
            max_poll_records: 100,
            retry_backoff: Duration::from_millis(500),
            poll_interval: Duration::from_millis(10),
        }
    }
}

/// Message received from the broker.
#[derive(Debug, Clone)]
pub struct ConsumedMessage {
    pub topic: String,
    pub offset: i64,
    pub key: Option<Vec<u8>>,
    pub value: Vec<u8>,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl ConsumedMessage {
    /// Deserializes the message value as JSON. Failure is a poison-message
    /// condition, not a retryable one.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.value)
            .map_err(|e| AppError::invalid_argument(format!("malformed event payload: {e}")))
    }
}

/// Handler invoked once per consumed message.
///
/// Returning `Ok` acknowledges the message. A retryable error (`AppError::
/// is_retryable`) acts as a negative-ack with requeue: the consumer does not
/// advance past the message and retries it after a backoff. Any other error
/// marks the message poison: it is forwarded to the dead-letter topic and
/// acknowledged so it cannot loop forever.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle(&self, message: &ConsumedMessage) -> Result<()>;

    /// Called when a message is routed to the dead-letter topic.
    async fn on_dead_letter(&self, message: &ConsumedMessage, error: &AppError) {
        error!(
            topic = %message.topic,
            offset = message.offset,
            error = %error,
            "message routed to dead-letter topic"
        );
    }
}

/// Event consumer with manual offset management.
///
/// Offsets advance only after a message is acknowledged, so a crash between
/// fetch and ack redelivers — processing is at-least-once and downstream
/// storage tolerates duplicates.
pub struct EventConsumer {
    config: ConsumerConfig,
    client: Arc<rskafka::client::Client>,
    partition_clients: RwLock<BTreeMap<String, Arc<PartitionClient>>>,
    offsets: RwLock<BTreeMap<String, AtomicI64>>,
    running: AtomicBool,
}

impl EventConsumer {
    /// Connects to the broker cluster and opens every configured topic.
    pub async fn connect(config: ConsumerConfig) -> Result<Self> {
        info!("Connecting consumer to brokers: {:?}", config.brokers);

        let client = ClientBuilder::new(config.brokers.clone())
            .build()
            .await
            .map_err(|e| AppError::Internal(anyhow!("failed to connect to broker: {e}")))?;

        let consumer = Self {
            config,
            client: Arc::new(client),
            partition_clients: RwLock::new(BTreeMap::new()),
            offsets: RwLock::new(BTreeMap::new()),
            running: AtomicBool::new(false),
        };

        for topic in consumer.config.topics.clone() {
            consumer.partition_client(&topic).await?;
        }

        Ok(consumer)
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
            .map_err(|e| AppError::Internal(anyhow!("failed to open topic {topic}: {e}")))?;

        let client = Arc::new(partition_client);
        {
            let mut clients = self.partition_clients.write().await;
            clients.insert(topic.to_string(), client.clone());
        }
        {
            let mut offsets = self.offsets.write().await;
            offsets
                .entry(topic.to_string())
                .or_insert_with(|| AtomicI64::new(0));
        }
        Ok(client)
    }

    async fn offset(&self, topic: &str) -> i64 {
        let offsets = self.offsets.read().await;
        offsets
            .get(topic)
            .map(|o| o.load(Ordering::SeqCst))
            .unwrap_or(0)
    }

    /// Acknowledges everything up to and including `offset`.
    async fn ack(&self, topic: &str, offset: i64) {
        let offsets = self.offsets.read().await;
        if let Some(o) = offsets.get(topic) {
            o.store(offset + 1, Ordering::SeqCst);
        }
    }

    /// Fetches unacknowledged messages from one topic. Does not advance the
    /// consumer position; acknowledgement is explicit.
    pub async fn poll(&self, topic: &str) -> Result<Vec<ConsumedMessage>> {
        let partition_client = self.partition_client(topic).await?;
        let current = self.offset(topic).await;

        let (records, _high_watermark) = partition_client
            .fetch_records(current, 1..1_000_000, self.config.fetch_max_wait_ms)
            .await
            .map_err(|e| AppError::Internal(anyhow!("failed to fetch records: {e}")))?;

        let messages: Vec<ConsumedMessage> = records
            .into_iter()
            .take(self.config.max_poll_records)
            .map(|r: RecordAndOffset| ConsumedMessage {
                topic: topic.to_string(),
                offset: r.offset,
                key: r.record.key,
                value: r.record.value.unwrap_or_default(),
                timestamp: r.record.timestamp,
            })
            .collect();

        debug!(topic, count = messages.len(), "polled messages");
        Ok(messages)
    }

    /// Runs the consume loop until `stop` is called.
    pub async fn start<H: MessageHandler + 'static>(&self, handler: Arc<H>) -> Result<()> {
        self.running.store(true, Ordering::SeqCst);
        info!("Starting consumer for topics: {:?}", self.config.topics);

        while self.running.load(Ordering::SeqCst) {
            let mut idle = true;

            for topic in self.config.topics.clone() {
                let messages = match self.poll(&topic).await {
                    Ok(messages) => messages,
                    Err(e) => {
                        warn!(topic = %topic, error = %e, "poll failed");
                        continue;
                    }
                };

                for message in messages {
                    idle = false;
                    match handler.handle(&message).await {
                        Ok(()) => {
                            self.ack(&topic, message.offset).await;
                        }
                        Err(e) if e.is_retryable() => {
                            // Requeue: leave the offset where it is so the
                            // message is fetched again after the backoff.
                            warn!(
                                topic = %topic,
                                offset = message.offset,
                                error = %e,
                                "retryable failure, message requeued"
                            );
                            tokio::time::sleep(self.config.retry_backoff).await;
                            break;
                        }
                        Err(e) => {
                            handler.on_dead_letter(&message, &e).await;
                            if let Some(dlq) = self.config.dead_letter_topic.clone() {
                                if let Err(dlq_err) = self.send_to_dlq(&dlq, &message).await {
                                    error!(error = %dlq_err, "failed to forward to dead-letter topic");
                                }
                            }
                            self.ack(&topic, message.offset).await;
                        }
                    }
                }
            }

            if idle {
                tokio::time::sleep(self.config.poll_interval).await;
            }
        }

        info!("Consumer stopped");
        Ok(())
    }

    async fn send_to_dlq(&self, dlq_topic: &str, message: &ConsumedMessage) -> Result<()> {
        let partition_client = self.partition_client(dlq_topic).await?;

        let record = rskafka::record::Record {
            key: message.key.clone(),
            value: Some(message.value.clone()),
            headers: BTreeMap::from([
                ("original_topic".to_string(), message.topic.as_bytes().to_vec()),
                (
                    "original_offset".to_string(),
                    message.offset.to_string().into_bytes(),
                ),
            ]),
            timestamp: chrono::Utc::now(),
        };

        partition_client
            .produce(vec![record], Compression::NoCompression)
            .await
            .map_err(|e| AppError::Internal(anyhow!("failed to send to dead-letter topic: {e}")))?;

        warn!(topic = dlq_topic, "message sent to dead-letter topic");
        Ok(())
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        info!("Consumer stop requested");
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn config(&self) -> &ConsumerConfig {
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
    fn test_consumer_config_default() {
        let config = ConsumerConfig::default();
        assert_eq!(config.brokers, vec!["localhost:9092".to_string()]);
        assert_eq!(
            config.dead_letter_topic.as_deref(),
            Some("bank.operations.dlq")
        );
    }

    #[test]
    fn test_consumed_message_deserialize() {
        #[derive(serde::Deserialize, PartialEq, Debug)]
        struct TestPayload {
            id: i32,
            name: String,
        }

        let message = ConsumedMessage {
            topic: "test".to_string(),
            offset: 0,
            key: None,
            value: br#"{"id": 1, "name": "test"}"#.to_vec(),
            timestamp: chrono::Utc::now(),
        };

        let payload: TestPayload = message.deserialize().unwrap();
        assert_eq!(payload.id, 1);
        assert_eq!(payload.name, "test");
    }

    #[test]
    fn test_malformed_payload_is_not_retryable() {
        let message = ConsumedMessage {
            topic: "test".to_string(),
            offset: 0,
            key: None,
            value: b"not json".to_vec(),
            timestamp: chrono::Utc::now(),
        };

        let err = message.deserialize::<serde_json::Value>().unwrap_err();
        assert!(!err.is_retryable());
    }
}
