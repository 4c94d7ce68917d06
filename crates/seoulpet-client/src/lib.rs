pub mod client;
pub mod error;
pub mod seoul;

pub use client::{ApiClient, ApiSession, ClientConfig};
pub use error::ClientError;
pub use seoul::{SeoulOpenApi, MAX_ROWS_PER_REQUEST};
