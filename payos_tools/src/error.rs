use thiserror::Error;

#[derive(Debug, Error)]
pub enum PayOsApiError {
    #[error("Could not initialize client: {0}")]
    Initialization(String),
    #[error("Invalid REST response: {0}")]
    RestResponseError(String),
    #[error("Could not deserialize JSON: {0}")]
    JsonError(String),
    #[error("Query failed. Error {status}. {message}")]
    QueryError { status: u16, message: String },
    #[error("PayOS rejected the request. Code {code}. {desc}")]
    Rejected { code: String, desc: String },
    #[error("PayOS returned a successful response without any data")]
    EmptyResponse,
    #[error("The response signature from PayOS is invalid. {0}")]
    InvalidSignature(String),
}
