pub use allocation::{
    AccountingEntryType, AllocatedAmount, AmountAccumulator, FEE_ACCOUNT, FEE_COST_CENTER,
    RoundingError, split_transactions,
};
pub use allocation_rules::{AccountCostCenter, ProductToAccountCostCenter};
pub use error::EngineError;
pub use exports::{Aggregation, ExportStatus};
pub use ops::{Engine, EngineBuilder};
pub use payments::{CompletedPayment, LocalPaymentSource, PaymentSource};
pub use reconcile::{Mismatch, diff};
pub use sie::SieSettings;
pub use stripe::{StripeConfig, StripePaymentSource};
pub use transactions::{Transaction, TransactionContent, TransactionStatus};
pub use verification::{Verification, create_verifications};

mod allocation;
pub mod allocation_rules;
pub mod accounts;
pub mod cost_centers;
mod error;
pub mod exports;
pub mod members;
mod money;
mod ops;
mod payments;
pub mod products;
mod reconcile;
pub mod sie;
mod stripe;
pub mod transaction_contents;
pub mod transactions;
mod verification;

type ResultEngine<T> = Result<T, EngineError>;
