use serde::Deserialize;

/// Process configuration, read once at startup. Values come from the
/// optional `config/default` file with `APP__`-prefixed environment
/// overrides (`APP__LEDGER_DATABASE__URL=...`); there is no hot reload.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub ledger_database: DatabaseSettings,
    pub analytics_database: DatabaseSettings,
    pub broker: BrokerSettings,
    pub ledger: ServiceSettings,
    pub analytics: ServiceSettings,
    pub gateway: GatewaySettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    pub url: String,
    #[serde(default = "default_pool_min")]
    pub pool_min: u32,
    #[serde(default = "default_pool_max")]
    pub pool_max: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BrokerSettings {
    /// Comma-separated broker addresses.
    pub brokers: String,
    #[serde(default = "default_exchange")]
    pub exchange: String,
    #[serde(default = "default_dead_letter_topic")]
    pub dead_letter_topic: String,
}

impl BrokerSettings {
    pub fn broker_list(&self) -> Vec<String> {
        self.brokers.split(',').map(|s| s.trim().to_string()).collect()
    }

    /// Topic carrying completed transfer events.
    pub fn transfer_completed_topic(&self) -> String {
        format!("{}.transfer.completed", self.exchange)
    }

    /// Topic carrying completed top-up events.
    pub fn topup_completed_topic(&self) -> String {
        format!("{}.topup.completed", self.exchange)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceSettings {
    pub port: u16,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GatewaySettings {
    pub port: u16,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Base URLs of the internal services.
    pub ledger_url: String,
    pub analytics_url: String,
    /// Deadline applied to every internal RPC, in milliseconds.
    #[serde(default = "default_rpc_timeout_ms")]
    pub rpc_timeout_ms: u64,
}

fn default_pool_min() -> u32 {
    5
}

fn default_pool_max() -> u32 {
    25
}

fn default_exchange() -> String {
    "bank.operations".to_string()
}

fn default_dead_letter_topic() -> String {
    "bank.operations.dlq".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_rpc_timeout_ms() -> u64 {
    5000
}

impl Settings {
    pub fn new() -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(config::Environment::with_prefix("APP").separator("__"));

        builder.build()?.try_deserialize()
    }
}
