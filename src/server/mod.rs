mod app;
mod middleware;
mod state;

pub use app::{cors_layer, create_app};
pub use middleware::{api_key_auth, origin_allowed, ANY_ORIGIN, API_KEY_HEADER};
pub use state::AppState;
