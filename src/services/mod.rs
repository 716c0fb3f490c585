pub mod analytics_service;
pub mod ingest_service;
pub mod ledger_service;

pub use analytics_service::{AnalyticsService, OperationPage};
pub use ingest_service::OperationIngestor;
pub use ledger_service::{DepositCommand, LedgerService, TransferCommand};
