//! eSpeak phonemization
//!
//! Text is converted to IPA by running `espeak -q --ipa` as a subprocess,
//! then mapped to the symbol ids the conditioner graph was exported with.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use zonos_tts_config::PhonemizerConfig;
use zonos_tts_core::{Error, LanguageTag, Result};

const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Runs eSpeak to obtain an IPA transcription
#[derive(Debug, Clone)]
pub struct EspeakPhonemizer {
    command: String,
    timeout: Duration,
}

impl EspeakPhonemizer {
    pub fn new(config: &PhonemizerConfig) -> Self {
        Self {
            command: config.command.clone(),
            timeout: Duration::from_millis(config.timeout_ms),
        }
    }

    /// IPA transcription of `text` using the eSpeak voice for `language`
    pub fn phonemize(&self, text: &str, language: &LanguageTag) -> Result<String> {
        let mut child = Command::new(&self.command)
            .args(["-q", "--ipa", "--stdin", "-v", language.as_str()])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                Error::Phonemizer(format!("failed to run '{}': {}", self.command, e))
            })?;

        // drain output before feeding input so a full pipe can't stall the child
        let stdout = child.stdout.take().map(read_to_string_in_background);
        let stderr = child.stderr.take().map(read_to_string_in_background);

        if let Some(mut stdin) = child.stdin.take() {
            if let Err(e) = stdin.write_all(text.as_bytes()) {
                return Err(abandon(&mut child, format!("failed to write input: {}", e)));
            }
        }

        let deadline = Instant::now() + self.timeout;
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) if Instant::now() >= deadline => {
                    return Err(abandon(
                        &mut child,
                        format!(
                            "'{}' did not finish within {}ms",
                            self.command,
                            self.timeout.as_millis()
                        ),
                    ));
                }
                Ok(None) => thread::sleep(POLL_INTERVAL),
                Err(e) => {
                    return Err(abandon(&mut child, format!("failed to poll '{}': {}", self.command, e)));
                }
            }
        };

        let stdout = stdout.map(|h| h.join().unwrap_or_default()).unwrap_or_default();
        let stderr = stderr.map(|h| h.join().unwrap_or_default()).unwrap_or_default();

        if !stderr.trim().is_empty() {
            return Err(Error::Phonemizer(stderr.trim().to_string()));
        }

        if !status.success() {
            return Err(Error::Phonemizer(format!("'{}' exited with {}", self.command, status)));
        }

        let ipa = stdout.split_whitespace().collect::<Vec<_>>().join(" ");
        if ipa.is_empty() {
            return Err(Error::Phonemizer("empty transcription".to_string()));
        }

        tracing::debug!(language = %language, ipa = %ipa, "Phonemized text");
        Ok(ipa)
    }
}

/// Kill and reap a child that will not be waited on normally.
/// Closing its pipes lets the reader threads finish.
fn abandon(child: &mut Child, reason: String) -> Error {
    let _ = child.kill();
    let _ = child.wait();
    Error::Phonemizer(reason)
}

fn read_to_string_in_background<R: Read + Send + 'static>(mut reader: R) -> thread::JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = String::new();
        let _ = reader.read_to_string(&mut buf);
        buf
    })
}

pub const PAD_ID: i64 = 0;
pub const UNK_ID: i64 = 1;
pub const BOS_ID: i64 = 2;
pub const EOS_ID: i64 = 3;

const PUNCTUATION: &str = ";:,.!?¡¿—…\"«»“” ";
const LETTERS: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";
const LETTERS_IPA: &str = "ɑɐɒæɓʙβɔɕçɗɖðʤəɘɚɛɜɝɞɟʄɡɠɢʛɦɧħɥʜɨɪʝɭɬɫɮʟɱɯɰŋɳɲɴøɵɸθœɶʘɹɺɾɻʀʁɽʂʃʈʧʉʊʋⱱʌɣɤʍχʎʏʑʐʒʔʡʕʢǀǁǂǃˈˌːˑʼʴʰʱʲʷˠˤ˞↓↑→↗↘'̩ᵻ";

/// IPA symbol table
#[derive(Debug, Clone)]
pub struct PhonemeVocabulary {
    ids: HashMap<char, i64>,
}

impl PhonemeVocabulary {
    pub fn new() -> Self {
        let mut ids = HashMap::new();
        let mut next = EOS_ID + 1;

        for c in PUNCTUATION.chars().chain(LETTERS.chars()).chain(LETTERS_IPA.chars()) {
            ids.entry(c).or_insert_with(|| {
                let id = next;
                next += 1;
                id
            });
        }

        Self { ids }
    }

    /// Number of ids including the special tokens
    pub fn len(&self) -> usize {
        self.ids.len() + 4
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn id(&self, symbol: char) -> i64 {
        self.ids.get(&symbol).copied().unwrap_or(UNK_ID)
    }

    /// `[BOS, symbols..., EOS]`
    pub fn encode(&self, ipa: &str) -> Vec<i64> {
        let mut out = Vec::with_capacity(ipa.chars().count() + 2);
        out.push(BOS_ID);
        out.extend(ipa.chars().map(|c| self.id(c)));
        out.push(EOS_ID);
        out
    }
}

impl Default for PhonemeVocabulary {
    fn default() -> Self {
        Self::new()
    }
}
