// Error types for parsing at the edges of the engine.
// The forecast computation itself never fails; only textual input does.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ForecastError {
    #[error("invalid month: {0:?} (expected YYYY-MM or YYYY-MM-DD)")]
    InvalidMonth(String),

    #[error("year {year} is outside the supported range {min}..={max}")]
    YearOutOfRange { year: i32, min: i32, max: i32 },

    #[error("invalid event id: {0:?}")]
    InvalidEventId(String),

    #[error("unknown market scope: {0:?} (expected GCC, EU, US or Canada)")]
    UnknownMarket(String),

    #[error("unknown export format: {0:?} (expected csv, text or json)")]
    UnknownFormat(String),
}

pub type ForecastResult<T> = Result<T, ForecastError>;
