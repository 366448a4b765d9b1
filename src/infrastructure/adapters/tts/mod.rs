//! TTS Adapters - TTS 引擎适配器

mod fake_tts_client;

pub use fake_tts_client::{FakeTtsClient, FakeTtsClientConfig};
