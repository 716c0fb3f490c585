//! Versioned wire contracts shared by the RPC servers and their clients.

pub mod v1;
