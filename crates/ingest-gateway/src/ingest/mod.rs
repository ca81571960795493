//! The ingest route: credential, validation, pipeline and HTTP mapping.

pub mod credential;
pub mod handler;
pub mod response;
pub mod validation;

pub use credential::{constant_time_compare, extract_token, API_TOKEN_PARAM};
pub use handler::{handle_ingest, IngestOutcome, IngestionHandler};
pub use response::ErrorBody;
pub use validation::{JsonValidator, PayloadValidator};
