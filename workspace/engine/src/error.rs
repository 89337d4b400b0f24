use rust_decimal::Decimal;
use sea_orm::{DbErr, TransactionError};
use thiserror::Error;

/// Error types for the deal and installment engine
#[derive(Error, Debug)]
pub enum EngineError {
    /// Malformed or inconsistent input, rejected before any store mutation
    #[error("Validation error: {0}")]
    Validation(String),

    /// The plan generator found no bracket for this category and price
    #[error("No installment plan available for category '{category}' at price {price}")]
    NoPlanAvailable { category: String, price: Decimal },

    /// Another active deal already claims the product
    #[error("Product {product_id} is already claimed by an active deal")]
    DealConflict { product_id: i32 },

    /// A referenced deal, product or binding does not exist
    #[error("{0} not found")]
    NotFound(String),

    /// A lifecycle transition failed after the conflict guard passed;
    /// the surrounding transaction rolled back, so a retry is safe
    #[error("Deal activation failed: {0}")]
    ActivationFailed(#[source] DbErr),

    /// Error from the database operations
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl From<TransactionError<EngineError>> for EngineError {
    fn from(error: TransactionError<EngineError>) -> Self {
        match error {
            TransactionError::Connection(err) => EngineError::Database(err),
            TransactionError::Transaction(err) => err,
        }
    }
}

/// Type alias for Result with EngineError
pub type Result<T> = std::result::Result<T, EngineError>;
