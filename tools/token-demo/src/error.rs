use ledger_client::LedgerError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DemoError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}
