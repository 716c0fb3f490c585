pub mod account;
pub mod money;
pub mod operation;
pub mod transfer;

pub use account::Account;
pub use money::{validate_currency, Money, MONEY_SCALE};
pub use operation::{Operation, OperationKind};
pub use transfer::{Transfer, TransferKind, TransferStatus};
