use sea_orm::DatabaseConnection;

use crate::{Aggregation, SieSettings};

mod allocation_rules;
mod exports;
mod members;
mod transactions;

/// Run a block inside a DB transaction, committing on success and rolling back on error.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let $tx = $self.database.begin().await?;
        let result = $body;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }};
}

pub(crate) use with_tx;

#[derive(Debug)]
pub struct Engine {
    database: DatabaseConnection,
    sie: SieSettings,
    aggregation: Aggregation,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }
}

/// The builder for `Engine`
#[derive(Default)]
pub struct EngineBuilder {
    database: DatabaseConnection,
    sie: SieSettings,
    aggregation: Aggregation,
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// Identity written into SIE headers.
    pub fn sie(mut self, sie: SieSettings) -> EngineBuilder {
        self.sie = sie;
        self
    }

    /// Verification bucketing granularity (defaults to monthly).
    pub fn aggregation(mut self, aggregation: Aggregation) -> EngineBuilder {
        self.aggregation = aggregation;
        self
    }

    /// Construct `Engine`
    pub async fn build(self) -> crate::ResultEngine<Engine> {
        Ok(Engine {
            database: self.database,
            sie: self.sie,
            aggregation: self.aggregation,
        })
    }
}
