mod app;

pub use app::{build_router, AppState, RouterOptions};
