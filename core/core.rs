pub mod backend;
pub mod config;
pub mod document;
pub mod error;
pub mod gather;
pub mod progress;
pub mod prompts;
pub mod rules;

pub use backend::{BackendSettings, ChatMessage, MockBackend, OpenAiBackend, Retry, Role, TextBackend};
pub use config::Config;
pub use document::{DocWriter, save_doc};
pub use error::{AppError, Result};
pub use gather::{FileRecord, ReadOutcome, SkipReason, SkippedFile, TraversalResult, read_text_file, traverse};
pub use progress::{NoProgress, ProgressReporter, RecordingProgress};
pub use prompts::{FilePrompt, Language, PromptBuilder, PromptTemplates};
pub use rules::{IgnoreRule, IgnoreRules, RelativePath};
