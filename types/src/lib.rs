pub mod api;
pub mod execution;
pub mod sicbo;

pub use execution::{transaction_namespace, NAMESPACE, TRANSACTION_SUFFIX};
