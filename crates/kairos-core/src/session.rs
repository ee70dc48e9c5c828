//! Chat session
//!
//! One `ChatSession` is the whole client-side chat: the transcript, the input
//! being composed, and the reply currently being typed out. Front ends own a
//! session, forward user actions to it and call [`ChatSession::tick`] from
//! their event loop to advance the typing animation.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::animate::{Clock, RenderCommand, Timing, TypingAnimation};
use crate::document::LiveDocument;
use crate::history::{clear_history, load_history, load_logo, save_history, save_logo};
use crate::markup::{compile, compile_html};
use crate::relay::{RelayClient, RelayError, RelayRequest};
use crate::state::{ChatMessage, ChatRole};
use crate::storage::KeyValueStore;

pub const GREETING_HTML: &str = "<p><strong>Hola, soy Kairos.</strong> Tu asistente especializado en simulación de escaneo 3D con brazo robótico.</p>\
<p class=\"message-hint\">Puedo ayudarte con:</p>\
<ul class=\"hint-list\">\
<li>Calibración y configuración del brazo</li>\
<li>Parámetros del escaneo 3D</li>\
<li>Corrección de errores</li>\
<li>Exportación de nube de puntos</li>\
</ul>";
pub const GREETING_TIME: &str = "Ahora";
pub const IMAGE_ONLY_LABEL: &str = "📸 [Imagen para análisis]";
pub const VOICE_UNSUPPORTED: &str = "Tu navegador no soporta reconocimiento de voz";
pub const CLEAR_CONFIRMATION: &str = "¿Estás seguro de que quieres limpiar el chat?";

/// Display hooks a front end provides. All default to doing nothing.
pub trait ChatSurface {
    fn scroll_to_bottom(&mut self) {}
    fn set_send_enabled(&mut self, _enabled: bool) {}
    /// Blocking notice for the user
    fn notify(&mut self, _message: &str) {}
    fn stats_changed(&mut self, _user_messages: usize) {}
}

/// Speech-to-text capture
pub trait VoiceInput: Send {
    fn is_listening(&self) -> bool;
    fn start(&mut self) -> anyhow::Result<()>;
    fn stop(&mut self);
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SendError {
    #[error("nothing to send")]
    EmptyInput,

    #[error("a request is already in flight")]
    Busy,
}

/// What a call to [`ChatSession::tick`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    Idle,
    Progressed,
    Completed,
}

#[derive(Debug, Clone)]
pub struct Entry {
    message: ChatMessage,
    document: LiveDocument,
    animating: bool,
    persisted: bool,
}

impl Entry {
    fn settled(message: ChatMessage) -> Self {
        let document = LiveDocument::from_markup(&message.content);
        Self {
            message,
            document,
            animating: false,
            persisted: true,
        }
    }

    fn greeting() -> Self {
        let mut entry = Self::settled(ChatMessage::with_timestamp(
            ChatRole::System,
            GREETING_HTML,
            GREETING_TIME,
        ));
        entry.persisted = false;
        entry
    }

    /// The message with its final markup
    pub fn message(&self) -> &ChatMessage {
        &self.message
    }

    /// What is on screen right now
    pub fn document(&self) -> &LiveDocument {
        &self.document
    }

    pub fn is_animating(&self) -> bool {
        self.animating
    }
}

struct ActiveAnimation {
    entry: usize,
    animation: TypingAnimation,
}

pub struct ChatSession<S: ChatSurface> {
    surface: S,
    store: Box<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    timing: Timing,
    voice: Option<Box<dyn VoiceInput>>,
    entries: Vec<Entry>,
    active: Option<ActiveAnimation>,
    input: String,
    image: Option<String>,
    pending: bool,
    logo: Option<String>,
    started: Duration,
}

impl<S: ChatSurface> ChatSession<S> {
    /// Open a session, restoring history and logo from `store`
    pub fn open(store: Box<dyn KeyValueStore>, surface: S, clock: Arc<dyn Clock>) -> Self {
        let history = load_history(store.as_ref());
        let entries = if history.is_empty() {
            vec![Entry::greeting()]
        } else {
            history.into_iter().map(Entry::settled).collect()
        };
        let logo = load_logo(store.as_ref());
        let started = clock.now();

        tracing::debug!(entries = entries.len(), has_logo = logo.is_some(), "chat session opened");

        let mut session = Self {
            surface,
            store,
            clock,
            timing: Timing::default(),
            voice: None,
            entries,
            active: None,
            input: String::new(),
            image: None,
            pending: false,
            logo,
            started,
        };
        let count = session.user_message_count();
        session.surface.stats_changed(count);
        session.surface.scroll_to_bottom();
        session
    }

    pub fn with_timing(mut self, timing: Timing) -> Self {
        self.timing = timing;
        self
    }

    pub fn with_voice(mut self, voice: Box<dyn VoiceInput>) -> Self {
        self.voice = Some(voice);
        self
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn store(&self) -> &dyn KeyValueStore {
        self.store.as_ref()
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn input_mut(&mut self) -> &mut String {
        &mut self.input
    }

    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
    }

    pub fn image(&self) -> Option<&str> {
        self.image.as_deref()
    }

    /// Attach an image (as a data URL) to the next message
    pub fn select_image(&mut self, data_url: impl Into<String>) {
        self.image = Some(data_url.into());
    }

    pub fn remove_image(&mut self) {
        self.image = None;
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    pub fn is_animating(&self) -> bool {
        self.active.is_some()
    }

    pub fn is_listening(&self) -> bool {
        self.voice.as_ref().is_some_and(|voice| voice.is_listening())
    }

    /// Validate the composed message and move it into the transcript.
    ///
    /// Returns the request to hand to a [`RelayClient`]; pair it with
    /// [`ChatSession::complete_send`] once the relay answers.
    pub fn prepare_send(&mut self) -> Result<RelayRequest, SendError> {
        if self.pending {
            return Err(SendError::Busy);
        }

        let message = self.input.trim().to_string();
        let image = self.image.take().filter(|image| !image.is_empty());
        if message.is_empty() && image.is_none() {
            return Err(SendError::EmptyInput);
        }

        let shown = if message.is_empty() { IMAGE_ONLY_LABEL } else { message.as_str() };
        self.add_message(shown, ChatRole::User);
        self.input.clear();

        self.pending = true;
        self.surface.set_send_enabled(false);

        Ok(RelayRequest { message, image })
    }

    /// Show the relay's answer for the request from [`ChatSession::prepare_send`]
    pub fn complete_send(&mut self, result: Result<String, RelayError>) {
        match result {
            Ok(reply) => self.start_reply(&reply),
            Err(e) => {
                tracing::warn!(error = %e, "relay request failed");
                self.add_message(&e.user_message(), ChatRole::Error);
            }
        }

        self.pending = false;
        self.surface.set_send_enabled(true);
        let count = self.user_message_count();
        self.surface.stats_changed(count);
    }

    pub async fn send(&mut self, relay: &dyn RelayClient) -> Result<(), SendError> {
        let request = self.prepare_send()?;
        let result = relay.send(&request).await;
        self.complete_send(result);
        Ok(())
    }

    /// Send a canned question as if it had been typed
    pub async fn send_quick_question(&mut self, question: &str, relay: &dyn RelayClient) -> Result<(), SendError> {
        self.set_input(question);
        self.send(relay).await
    }

    /// Append a settled message without animation
    pub fn add_message(&mut self, text: &str, role: ChatRole) {
        let message = ChatMessage::new(role, compile_html(text));
        self.entries.push(Entry::settled(message));
        self.surface.scroll_to_bottom();
        self.persist();
    }

    /// When the running animation next needs a tick
    pub fn next_due(&self) -> Option<Duration> {
        self.active.as_ref().and_then(|active| active.animation.next_due())
    }

    /// Advance the running animation to the session clock's current time
    pub fn tick(&mut self) -> Tick {
        let now = self.clock.now();
        let Some(active) = self.active.as_mut() else {
            return Tick::Idle;
        };
        let Some(entry) = self.entries.get_mut(active.entry) else {
            self.active = None;
            return Tick::Idle;
        };

        let surface = &mut self.surface;
        let progress = active.animation.poll_with(now, &mut entry.document, |command, _| {
            if matches!(command, RenderCommand::Reveal(_)) {
                surface.scroll_to_bottom();
            }
        });

        if progress.cancelled {
            self.active = None;
            return Tick::Idle;
        }
        if progress.finished {
            entry.animating = false;
            self.active = None;
            self.persist();
            return Tick::Completed;
        }
        if progress.applied > 0 {
            Tick::Progressed
        } else {
            Tick::Idle
        }
    }

    /// Render the running animation to the end immediately
    pub fn finish_animation(&mut self) {
        let Some(mut active) = self.active.take() else {
            return;
        };
        if let Some(entry) = self.entries.get_mut(active.entry) {
            active.animation.finish_now(&mut entry.document);
            entry.animating = false;
        }
        self.surface.scroll_to_bottom();
        self.persist();
    }

    pub fn toggle_voice(&mut self) {
        let Some(voice) = self.voice.as_mut() else {
            self.surface.notify(VOICE_UNSUPPORTED);
            return;
        };

        if voice.is_listening() {
            voice.stop();
        } else {
            self.input.clear();
            if let Err(e) = voice.start() {
                tracing::warn!(error = %e, "could not start voice input");
            }
        }
    }

    /// Replace the input with recognized speech
    pub fn apply_transcript(&mut self, transcript: &str) {
        self.input = transcript.to_string();
    }

    /// Forget the conversation and show the greeting again
    pub fn clear(&mut self) {
        if let Some(active) = self.active.take() {
            active.animation.cancel();
        }
        self.entries = vec![Entry::greeting()];
        if let Err(e) = clear_history(self.store.as_mut()) {
            tracing::warn!(error = %e, "could not remove chat history");
        }
        self.surface.scroll_to_bottom();
        self.surface.stats_changed(0);
    }

    pub fn logo(&self) -> Option<&str> {
        self.logo.as_deref()
    }

    pub fn set_logo(&mut self, data_url: impl Into<String>) {
        let data_url = data_url.into();
        if let Err(e) = save_logo(self.store.as_mut(), &data_url) {
            tracing::warn!(error = %e, "could not store logo");
        }
        self.logo = Some(data_url);
    }

    pub fn user_message_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.message.role == ChatRole::User)
            .count()
    }

    /// Time since the session opened, as "MM:SS"
    pub fn elapsed_label(&self) -> String {
        let elapsed = self.clock.now().saturating_sub(self.started).as_secs();
        format!("{:02}:{:02}", elapsed / 60, elapsed % 60)
    }

    fn start_reply(&mut self, reply: &str) {
        self.finish_animation();

        let tree = compile(reply);
        let message = ChatMessage::new(ChatRole::System, compile_html(reply));
        self.entries.push(Entry {
            message,
            document: LiveDocument::new(),
            animating: true,
            persisted: true,
        });
        self.active = Some(ActiveAnimation {
            entry: self.entries.len() - 1,
            animation: TypingAnimation::new(tree, self.timing, self.clock.now()),
        });
        self.surface.scroll_to_bottom();
    }

    fn persist(&mut self) {
        let messages: Vec<ChatMessage> = self
            .entries
            .iter()
            .filter(|entry| entry.persisted && !entry.animating)
            .map(|entry| ChatMessage {
                content: entry.document.to_html(),
                ..entry.message.clone()
            })
            .collect();

        if let Err(e) = save_history(self.store.as_mut(), &messages) {
            tracing::warn!(error = %e, "could not save chat history");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animate::VirtualClock;
    use crate::relay::CONNECTION_ERROR;
    use crate::storage::{MemoryStore, HISTORY_KEY, LOGO_KEY};
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Debug, Default)]
    struct RecordingSurface {
        scrolls: usize,
        send_enabled: Vec<bool>,
        notices: Vec<String>,
        stats: Vec<usize>,
    }

    impl ChatSurface for RecordingSurface {
        fn scroll_to_bottom(&mut self) {
            self.scrolls += 1;
        }

        fn set_send_enabled(&mut self, enabled: bool) {
            self.send_enabled.push(enabled);
        }

        fn notify(&mut self, message: &str) {
            self.notices.push(message.to_string());
        }

        fn stats_changed(&mut self, user_messages: usize) {
            self.stats.push(user_messages);
        }
    }

    enum Reply {
        Text(&'static str),
        Rejected(Option<&'static str>),
        Malformed,
    }

    struct FakeRelay {
        reply: Reply,
        requests: Mutex<Vec<RelayRequest>>,
    }

    impl FakeRelay {
        fn new(reply: Reply) -> Self {
            Self {
                reply,
                requests: Mutex::new(Vec::new()),
            }
        }

        fn requests(&self) -> Vec<RelayRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl RelayClient for FakeRelay {
        async fn send(&self, request: &RelayRequest) -> Result<String, RelayError> {
            self.requests.lock().unwrap().push(request.clone());
            match &self.reply {
                Reply::Text(text) => Ok(text.to_string()),
                Reply::Rejected(reason) => Err(RelayError::Rejected(reason.map(str::to_string))),
                Reply::Malformed => Err(RelayError::Malformed),
            }
        }
    }

    fn session_with(store: MemoryStore) -> (ChatSession<RecordingSurface>, Arc<VirtualClock>) {
        let clock = Arc::new(VirtualClock::new());
        let session = ChatSession::open(Box::new(store), RecordingSurface::default(), clock.clone());
        (session, clock)
    }

    fn run_to_completion(session: &mut ChatSession<RecordingSurface>, clock: &VirtualClock) {
        clock.advance(Duration::from_secs(60));
        assert_eq!(session.tick(), Tick::Completed);
    }

    #[test]
    fn test_new_session_shows_greeting() {
        let (session, _) = session_with(MemoryStore::new());
        assert_eq!(session.entries().len(), 1);
        let greeting = &session.entries()[0];
        assert_eq!(greeting.message().role, ChatRole::System);
        assert_eq!(greeting.message().timestamp, GREETING_TIME);
        assert_eq!(greeting.document().to_html(), GREETING_HTML);
        assert_eq!(session.user_message_count(), 0);
    }

    #[tokio::test]
    async fn test_send_then_type_reply_and_persist() {
        let (mut session, clock) = session_with(MemoryStore::new());
        let relay = FakeRelay::new(Reply::Text("**Hola!** ¿Cómo estás?"));

        session.set_input("hola");
        session.send(&relay).await.unwrap();

        assert_eq!(
            relay.requests(),
            vec![RelayRequest { message: "hola".to_string(), image: None }]
        );
        assert_eq!(session.input(), "");
        assert!(!session.is_pending());
        assert!(session.is_animating());
        assert_eq!(session.surface().send_enabled, vec![false, true]);

        let user = &session.entries()[1];
        assert_eq!(user.message().role, ChatRole::User);
        assert_eq!(user.document().to_html(), "<p>hola</p>");

        let reply = &session.entries()[2];
        assert!(reply.is_animating());
        assert!(reply.document().is_empty());

        // Only the user message is stored while the reply is typing
        assert_eq!(load_history(session.store()).len(), 1);

        run_to_completion(&mut session, &clock);

        let reply = &session.entries()[2];
        assert!(!reply.is_animating());
        assert_eq!(
            reply.document().to_html(),
            "<p><strong>Hola!</strong> ¿Cómo estás?</p>"
        );

        let stored = load_history(session.store());
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].role, ChatRole::User);
        assert_eq!(stored[0].content, "<p>hola</p>");
        assert_eq!(stored[1].role, ChatRole::System);
        assert_eq!(stored[1].content, "<p><strong>Hola!</strong> ¿Cómo estás?</p>");
        assert_eq!(session.user_message_count(), 1);
        assert_eq!(session.surface().stats.last(), Some(&1));
    }

    #[test]
    fn test_tick_reveals_gradually() {
        let (mut session, clock) = session_with(MemoryStore::new());
        session.set_input("hola");
        session.prepare_send().unwrap();
        session.complete_send(Ok("abc".to_string()));

        // Open, BeginText and the empty prefix are due immediately
        assert_eq!(session.tick(), Tick::Progressed);
        assert_eq!(session.entries()[2].document().to_html(), "<p></p>");

        clock.advance(Duration::from_millis(18));
        assert_eq!(session.tick(), Tick::Progressed);
        assert_eq!(session.entries()[2].document().to_html(), "<p>a</p>");

        assert_eq!(session.tick(), Tick::Idle);
        assert_eq!(session.next_due(), Some(Duration::from_millis(36)));
    }

    #[test]
    fn test_zero_timing_types_in_one_tick() {
        let clock = Arc::new(VirtualClock::new());
        let mut session = ChatSession::open(Box::new(MemoryStore::new()), RecordingSurface::default(), clock)
            .with_timing(Timing {
                char_delay: Duration::ZERO,
                paragraph_delay: Duration::ZERO,
            });
        session.set_input("hola");
        session.prepare_send().unwrap();
        session.complete_send(Ok("- uno\n- dos".to_string()));

        assert_eq!(session.tick(), Tick::Completed);
        assert_eq!(session.entries()[2].document().to_html(), "<ul><li>uno</li><li>dos</li></ul>");
        assert_eq!(load_history(session.store()).len(), 2);
    }

    #[test]
    fn test_empty_input_is_rejected() {
        let (mut session, _) = session_with(MemoryStore::new());
        session.set_input("   \n ");
        assert_eq!(session.prepare_send(), Err(SendError::EmptyInput));
        assert_eq!(session.entries().len(), 1);
        assert!(session.surface().send_enabled.is_empty());
        assert!(session.store().get(HISTORY_KEY).is_none());
    }

    #[test]
    fn test_image_only_message() {
        let (mut session, _) = session_with(MemoryStore::new());
        session.select_image("data:image/png;base64,AAAA");

        let request = session.prepare_send().unwrap();
        assert_eq!(request.message, "");
        assert_eq!(request.image.as_deref(), Some("data:image/png;base64,AAAA"));
        assert_eq!(session.image(), None);
        assert_eq!(
            session.entries()[1].document().to_html(),
            "<p>📸 [Imagen para análisis]</p>"
        );
    }

    #[test]
    fn test_second_send_while_pending_is_busy() {
        let (mut session, _) = session_with(MemoryStore::new());
        session.set_input("uno");
        session.prepare_send().unwrap();
        session.set_input("dos");
        assert_eq!(session.prepare_send(), Err(SendError::Busy));
        assert_eq!(session.input(), "dos");
        assert_eq!(session.user_message_count(), 1);
    }

    #[tokio::test]
    async fn test_relay_rejection_shows_reason() {
        let (mut session, _) = session_with(MemoryStore::new());
        let relay = FakeRelay::new(Reply::Rejected(Some("Mensaje o imagen vacíos")));
        session.set_input("hola");
        session.send(&relay).await.unwrap();

        let error = session.entries().last().unwrap();
        assert_eq!(error.message().role, ChatRole::Error);
        assert_eq!(error.document().plain_text(), "Error: Mensaje o imagen vacíos");
        assert!(!session.is_animating());
        assert_eq!(load_history(session.store()).len(), 2);
    }

    #[tokio::test]
    async fn test_rejection_without_reason_and_transport_failure() {
        let (mut session, _) = session_with(MemoryStore::new());

        session.set_input("a");
        session.send(&FakeRelay::new(Reply::Rejected(None))).await.unwrap();
        assert_eq!(
            session.entries().last().unwrap().document().plain_text(),
            "Error: No se pudo conectar con la API"
        );

        session.set_input("b");
        session.send(&FakeRelay::new(Reply::Malformed)).await.unwrap();
        assert_eq!(
            session.entries().last().unwrap().document().plain_text(),
            CONNECTION_ERROR
        );
        assert_eq!(session.surface().send_enabled, vec![false, true, false, true]);
    }

    #[test]
    fn test_new_reply_fast_forwards_running_animation() {
        let (mut session, _) = session_with(MemoryStore::new());
        session.set_input("uno");
        session.prepare_send().unwrap();
        session.complete_send(Ok("primera respuesta".to_string()));

        session.set_input("dos");
        session.prepare_send().unwrap();
        assert!(session.entries()[2].is_animating());
        assert_eq!(load_history(session.store()).len(), 2);

        session.complete_send(Ok("segunda".to_string()));
        assert!(!session.entries()[2].is_animating());
        assert_eq!(session.entries()[2].document().to_html(), "<p>primera respuesta</p>");
        assert!(session.entries()[4].is_animating());
        assert_eq!(load_history(session.store()).len(), 3);
    }

    #[test]
    fn test_restore_replaces_greeting() {
        let mut store = MemoryStore::new();
        store
            .set(
                HISTORY_KEY,
                r#"[{"type":"user","content":"<p>hola</p>"},{"type":"system","content":"<p><em>hey</em></p>"}]"#,
            )
            .unwrap();
        store.set(LOGO_KEY, "data:image/png;base64,AA==").unwrap();

        let (session, _) = session_with(store);
        assert_eq!(session.entries().len(), 2);
        assert!(session.entries().iter().all(|entry| !entry.is_animating()));
        assert_eq!(session.entries()[1].document().to_html(), "<p><em>hey</em></p>");
        assert_eq!(session.logo(), Some("data:image/png;base64,AA=="));
        assert_eq!(session.surface().stats, vec![1]);
    }

    #[test]
    fn test_clear_resets_to_greeting() {
        let (mut session, _) = session_with(MemoryStore::new());
        session.set_input("hola");
        session.prepare_send().unwrap();
        session.complete_send(Ok("respuesta".to_string()));

        session.clear();
        assert!(!session.is_animating());
        assert_eq!(session.entries().len(), 1);
        assert_eq!(session.entries()[0].document().to_html(), GREETING_HTML);
        assert!(session.store().get(HISTORY_KEY).is_none());
        assert_eq!(session.surface().stats.last(), Some(&0));
        assert_eq!(session.tick(), Tick::Idle);
    }

    #[test]
    fn test_voice_unavailable_notifies() {
        let (mut session, _) = session_with(MemoryStore::new());
        session.toggle_voice();
        assert_eq!(session.surface().notices, vec![VOICE_UNSUPPORTED.to_string()]);
    }

    #[derive(Default)]
    struct FakeVoice {
        listening: bool,
    }

    impl VoiceInput for FakeVoice {
        fn is_listening(&self) -> bool {
            self.listening
        }

        fn start(&mut self) -> anyhow::Result<()> {
            self.listening = true;
            Ok(())
        }

        fn stop(&mut self) {
            self.listening = false;
        }
    }

    #[test]
    fn test_voice_toggle_and_transcript() {
        let (session, _) = session_with(MemoryStore::new());
        let mut session = session.with_voice(Box::new(FakeVoice::default()));
        session.set_input("borrador");

        session.toggle_voice();
        assert!(session.is_listening());
        assert_eq!(session.input(), "");

        session.apply_transcript("¿cómo calibro el brazo?");
        session.toggle_voice();
        assert!(!session.is_listening());
        assert_eq!(session.input(), "¿cómo calibro el brazo?");
        assert!(session.surface().notices.is_empty());
    }

    #[test]
    fn test_logo_is_stored() {
        let (mut session, _) = session_with(MemoryStore::new());
        session.set_logo("data:image/png;base64,BB==");
        assert_eq!(session.logo(), Some("data:image/png;base64,BB=="));
        assert_eq!(
            session.store().get(LOGO_KEY).as_deref(),
            Some("data:image/png;base64,BB==")
        );
    }

    #[test]
    fn test_elapsed_label() {
        let (session, clock) = session_with(MemoryStore::new());
        assert_eq!(session.elapsed_label(), "00:00");
        clock.advance(Duration::from_secs(75));
        assert_eq!(session.elapsed_label(), "01:15");
        clock.advance(Duration::from_secs(3600));
        assert_eq!(session.elapsed_label(), "61:15");
    }

    #[tokio::test]
    async fn test_quick_question() {
        let (mut session, _) = session_with(MemoryStore::new());
        let relay = FakeRelay::new(Reply::Text("ok"));
        session
            .send_quick_question("¿Cómo exporto la nube de puntos?", &relay)
            .await
            .unwrap();
        assert_eq!(relay.requests()[0].message, "¿Cómo exporto la nube de puntos?");
        assert_eq!(session.user_message_count(), 1);
    }
}
