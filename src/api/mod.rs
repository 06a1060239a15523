pub mod endpoints;
pub mod error;
pub mod router;
pub mod server;
pub mod state;
pub mod types;

pub use error::ApiError;
pub use router::build_router;
pub use state::AppState;
