pub mod api_types;
pub mod engine;
pub mod history;
pub mod llm;
pub mod machine;
pub mod progress;
pub mod prompts;
pub mod providers;
pub mod quick_replies;
pub mod replies;

pub use engine::{ChatEngine, EngineSettings, Outcome, Reply};
pub use history::HistoryWindowBuilder;
pub use llm::{BackendError, CompletionParams, LlmClient};
pub use machine::{ConversationStateMachine, Step};
pub use progress::ProgressEngine;
