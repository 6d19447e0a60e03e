//! Text processing for the TTS service
//!
//! - **Detection**: identify the language of request text from its Unicode scripts
//! - **Resolution**: pick the language a request is synthesized in

mod detect;
mod resolve;

pub use detect::{Script, ScriptDetector};
pub use resolve::{LanguageResolver, LanguageSource, Resolution};
