pub mod consumer;
pub mod producer;
pub mod publisher;
pub mod types;

pub use consumer::{ConsumedMessage, ConsumerConfig, EventConsumer, MessageHandler};
pub use producer::{EventProducer, ProducerConfig};
pub use publisher::OperationEventPublisher;
pub use types::{MoneyPayload, OperationCompletedEvent};
