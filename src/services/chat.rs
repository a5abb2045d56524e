use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::{info, instrument, warn};

use crate::archive;
use crate::config::{Config, FallbackPolicy, PromptSettings};
use crate::domains::message::Message;
use crate::error::{ParleyError, Result};
use crate::interfaces::providers::TextGenerator;
use crate::privacy;
use crate::prompt;
use crate::providers::ollama::OllamaProvider;
use crate::store::MessageStore;

/// One chat session: the transcript plus everything needed to extend or
/// archive it.
///
/// Mutating flows (exchanges and archives) run one at a time behind
/// `writer`. Readers only take the transcript lock, so listing messages never
/// waits on the model.
pub struct ChatService {
    generator: Arc<dyn TextGenerator>,
    prompt: PromptSettings,
    fallback: FallbackPolicy,
    archive_dir: PathBuf,
    transcript: RwLock<MessageStore>,
    writer: Mutex<()>,
}

impl ChatService {
    pub fn new(generator: Arc<dyn TextGenerator>, config: &Config) -> Self {
        Self {
            generator,
            prompt: config.prompt.clone(),
            fallback: config.fallback,
            archive_dir: PathBuf::from(&config.archive_dir),
            transcript: RwLock::new(MessageStore::new()),
            writer: Mutex::new(()),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let provider = OllamaProvider::new(&config.ollama)?;
        info!(
            base_url = %config.ollama.base_url,
            model = %provider.model(),
            history_window = config.prompt.history_window,
            redact_privacy = config.prompt.redact_privacy,
            "Chat service ready"
        );
        Ok(Self::new(Arc::new(provider), config))
    }

    pub fn archive_dir(&self) -> &Path {
        &self.archive_dir
    }

    pub async fn messages(&self) -> Vec<Message> {
        self.transcript.read().await.all().to_vec()
    }

    /// Records the user's message, asks the model for a reply and records
    /// that too. Generation failures are answered with fallback text.
    ///
    /// The exchange runs on its own task, so a caller that stops waiting
    /// (a dropped HTTP connection) still leaves a complete user/assistant
    /// pair behind.
    pub async fn post_message(self: &Arc<Self>, raw: &str) -> Result<Message> {
        let text = raw.trim();
        if text.is_empty() {
            return Err(ParleyError::Validation("Message is required".to_string()));
        }

        let service = Arc::clone(self);
        let text = text.to_string();
        tokio::spawn(async move { service.exchange(&text).await })
            .await
            .map_err(|e| ParleyError::Runtime(format!("Chat exchange aborted: {e}")))
    }

    #[instrument(skip_all, fields(prompt_chars = text.len()))]
    async fn exchange(&self, text: &str) -> Message {
        let _writer = self.writer.lock().await;
        let flagged = privacy::contains_sensitive_data(text);

        let serialized = {
            let mut transcript = self.transcript.write().await;
            transcript.append(Message::user(text, flagged));
            prompt::serialize(
                transcript.tail(self.prompt.history_window),
                text,
                &self.prompt,
            )
        };

        let reply = match self.generator.generate(&serialized).await {
            Ok(reply) => reply,
            Err(err) => {
                warn!(fallback = ?self.fallback, "Generation failed: {err}");
                self.fallback.reply(text, &err.to_string())
            }
        };

        let assistant = Message::assistant(reply, flagged);
        self.transcript.write().await.append(assistant.clone());
        info!(privacy = flagged, "Recorded chat exchange");
        assistant
    }

    /// Writes the transcript to a new archive file and clears it. The
    /// transcript is left untouched if anything fails.
    ///
    /// The file is written from a snapshot, so readers are only locked out
    /// for the final `clear()`.
    pub async fn archive(&self, conversation_id: Option<&str>) -> Result<PathBuf> {
        let _writer = self.writer.lock().await;
        let snapshot = self.messages().await;
        let conversation_id = conversation_id.map(str::to_string);
        let dir = self.archive_dir.clone();

        let path = tokio::task::spawn_blocking(move || {
            archive::save(&snapshot, conversation_id.as_deref(), &dir)
        })
        .await
        .map_err(|e| ParleyError::Runtime(format!("Archive task aborted: {e}")))??;

        self.transcript.write().await.clear();
        Ok(path)
    }
}
