pub mod capabilities;
pub mod codec;
pub mod config;
pub mod errors;
pub mod intent;
pub mod orchestrator;
pub mod providers;
pub mod server;
pub mod util;

pub use codec::ImageReference;
pub use errors::{AgentError, ImageError, PipelineError, ServiceError};
pub use orchestrator::{PipelineRouter, PipelineStage, RouteOutcome, process_image};
pub use providers::{GenerativeClient, gemini::GeminiClient};
