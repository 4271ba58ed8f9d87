pub mod error;
pub mod handlers;
pub mod items;
pub mod middleware;
pub mod references;
pub mod routes;

pub use error::{ApiError, ErrorResponse, InfoResponse};
pub use routes::create_router;
