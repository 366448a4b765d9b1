//! Query Handlers

mod book_handlers;
mod character_handlers;
mod script_handlers;
mod synthesis_handlers;
mod voice_handlers;

pub use book_handlers::{GetBookHandler, GetBookSegmentsHandler, ListBooksHandler};
pub use character_handlers::{
    GetBookCharactersHandler, GetCharacterAliasesHandler, GetMergeHistoryHandler,
};
pub use script_handlers::{GetScriptHandler, GetSegmentSentencesHandler};
pub use synthesis_handlers::{GetBookAudioStatusHandler, GetTaskProgressHandler, TaskProgress};
pub use voice_handlers::{
    ListAvailableVoicesHandler, ResolveCharacterVoiceHandler, ResolvedVoice,
};
