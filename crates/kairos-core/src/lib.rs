pub mod ai;
pub mod animate;
pub mod attachments;
pub mod config;
pub mod document;
pub mod history;
pub mod markup;
pub mod relay;
pub mod session;
pub mod state;
pub mod storage;

// Re-export main types for convenience
pub use ai::{GeminiClient, GeminiError, GenerationRequest};
pub use animate::{animate, Clock, SystemClock, Timing, TypingAnimation, VirtualClock};
pub use config::Config;
pub use document::LiveDocument;
pub use markup::{compile, compile_html, Fragment, MarkupNode, Tag};
pub use relay::{HttpRelayClient, RelayClient, RelayError, RelayRequest, RelayResponse};
pub use session::{ChatSession, ChatSurface, SendError, Tick, VoiceInput};
pub use state::{ChatMessage, ChatRole};
pub use storage::{FileStore, KeyValueStore, MemoryStore, StorageError};
