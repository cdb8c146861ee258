pub mod bot;
pub mod error;
pub mod quiz;
pub mod results;

pub type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;
