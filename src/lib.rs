pub mod audit;
pub mod errors;
pub mod model;
pub mod routes;
pub mod shortcode;
pub mod store;
pub mod utils;
