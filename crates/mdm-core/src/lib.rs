pub mod classify;
pub mod config;
pub mod dashboard;
pub mod finish;
pub mod gate;
pub mod logging;
pub mod model;
pub mod monitor;
pub mod quality;
pub mod resolver;
pub mod scheduler;
pub mod store;
pub mod throttle;
pub mod transfer;
pub mod url_model;
