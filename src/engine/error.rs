use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("malformed event: {0}")]
    MalformedEvent(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("detector timed out after {0}ms")]
    DetectorTimeout(u64),

    #[error("ledger write failed after {attempts} attempts")]
    LedgerWrite { attempts: u32 },

    #[error("{0} timed out")]
    OperationTimeout(&'static str),

    #[error("cache unavailable: {0}")]
    CacheUnavailable(String),

    #[error("corrupt ledger record: {0}")]
    CorruptRecord(String),

    #[error("execution failed: {0}")]
    Execution(String),

    #[error("configuration error: {0}")]
    Config(String),
}
