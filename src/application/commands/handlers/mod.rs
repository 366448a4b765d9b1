//! Command Handlers

mod book_handlers;
mod character_handlers;
mod script_handlers;
mod synthesis_handlers;
mod voice_handlers;

pub use book_handlers::{
    CreateBookFromTextHandler, CreateBookResponse, DeleteBookHandler, SegmentBookHandler,
    SegmentBookResponse,
};
pub use character_handlers::{MergeCharactersHandler, RecordAliasHandler, UpsertCharacterHandler};
pub use script_handlers::{AttributeBookHandler, AttributeResponse, AttributeSegmentHandler};
pub use synthesis_handlers::{
    CancelSynthesisHandler, ResubmitFailedHandler, ResubmitResponse, StartSynthesisHandler,
    StartSynthesisResponse,
};
pub use voice_handlers::{BindVoiceHandler, RegisterVoiceHandler};
