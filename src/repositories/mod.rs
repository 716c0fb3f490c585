pub mod account_repository;
pub mod operation_repository;
pub mod transfer_repository;

pub use account_repository::AccountRepository;
pub use operation_repository::OperationRepository;
pub use transfer_repository::TransferRepository;
