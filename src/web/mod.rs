pub mod api;
pub mod error;
pub mod server;
pub mod state;
pub mod ws;

pub use error::ApiError;
pub use server::start_server;
pub use state::AppState;
