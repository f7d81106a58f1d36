pub mod dto;
pub mod error;
pub mod handlers;
pub mod openapi;
pub mod routes;

pub use dto::*;
pub use error::*;
pub use handlers::*;
pub use routes::*;
