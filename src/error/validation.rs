use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("QPS must be a finite value > 0 (got {value}).")]
    InvalidQps { value: f64 },
    #[error("Resolution must be a finite value > 0 seconds (got {value}).")]
    InvalidResolution { value: f64 },
    #[error("Number of threads must be >= 1.")]
    NumThreadsZero,
    #[error("Number of streams must be >= 1.")]
    StreamsZero,
    #[error("Run duration must be > 0.")]
    RunDurationZero,
    #[error("Exact call count must be > 0.")]
    CallCountZero,
    #[error("Destination must not be empty.")]
    DestinationEmpty,
    #[error("Cannot set both --duration and --exactly.")]
    DurationAndCountConflict,
    #[error("TLS server needs both a certificate and a key.")]
    IncompleteServerIdentity,
    #[error("Duration must not be empty.")]
    DurationEmpty,
    #[error("Invalid duration '{value}'.")]
    InvalidDurationFormat { value: String },
    #[error("Invalid duration '{value}': {source}")]
    InvalidDurationNumber {
        value: String,
        #[source]
        source: std::num::ParseIntError,
    },
    #[error("Duration must be > 0.")]
    DurationZero,
    #[error("Duration overflow.")]
    DurationOverflow,
    #[error("Invalid duration unit '{unit}'.")]
    InvalidDurationUnit { unit: String },
    #[error("Value must be >= {min}.")]
    ValueTooSmall { min: u64 },
    #[error("Invalid value: {source}")]
    InvalidNumber {
        #[source]
        source: std::num::ParseIntError,
    },
    #[error("Invalid value '{value}': {source}")]
    InvalidFloat {
        value: String,
        #[source]
        source: std::num::ParseFloatError,
    },
    #[error("Test expectation failed: {message}")]
    TestExpectation { message: &'static str },
    #[error("Test expectation failed: {message}: {value}")]
    TestExpectationValue {
        message: &'static str,
        value: String,
    },
}
