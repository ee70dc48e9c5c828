use std::path::Path;
use std::sync::Arc;

use kairos_core::attachments::image_data_url;
use kairos_core::relay::{RelayClient, RelayError};
use kairos_core::{ChatSession, ChatSurface, Tick};
use tokio::task::JoinHandle;

/// Canned questions, sent with keys 1-4 in normal mode
pub const QUICK_QUESTIONS: [&str; 4] = [
    "¿Cómo calibro y configuro el brazo robótico?",
    "¿Qué parámetros de escaneo 3D me recomiendas?",
    "¿Cómo corrijo errores en el escaneo?",
    "¿Cómo exporto la nube de puntos?",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

/// Terminal side of the session's display hooks
#[derive(Debug)]
pub struct TerminalSurface {
    /// Keep the transcript pinned to the newest line
    pub follow_bottom: bool,
    pub send_enabled: bool,
    /// Modal notice waiting to be dismissed
    pub notice: Option<String>,
    pub user_messages: usize,
}

impl Default for TerminalSurface {
    fn default() -> Self {
        Self {
            follow_bottom: true,
            send_enabled: true,
            notice: None,
            user_messages: 0,
        }
    }
}

impl ChatSurface for TerminalSurface {
    fn scroll_to_bottom(&mut self) {
        self.follow_bottom = true;
    }

    fn set_send_enabled(&mut self, enabled: bool) {
        self.send_enabled = enabled;
    }

    fn notify(&mut self, message: &str) {
        self.notice = Some(message.to_string());
    }

    fn stats_changed(&mut self, user_messages: usize) {
        self.user_messages = user_messages;
    }
}

pub struct App {
    pub should_quit: bool,
    pub input_mode: InputMode,
    pub session: ChatSession<TerminalSurface>,
    pub relay: Arc<dyn RelayClient>,
    pub relay_url: String,
    pub relay_task: Option<JoinHandle<Result<String, RelayError>>>,

    pub input_cursor: usize, // cursor position in the session input, in chars
    pub chat_scroll: u16,
    pub chat_height: u16, // Inner height of the transcript, for scroll calculations
    pub chat_width: u16,  // Inner width of the transcript, for wrap calculations

    pub show_clear_confirm: bool,

    // 0-2 for ellipsis animation
    pub animation_frame: u8,
    ticks: u8,
}

impl App {
    pub fn new(session: ChatSession<TerminalSurface>, relay: Arc<dyn RelayClient>, relay_url: &str) -> Self {
        Self {
            should_quit: false,
            input_mode: InputMode::Editing,
            session,
            relay,
            relay_url: relay_url.to_string(),
            relay_task: None,
            input_cursor: 0,
            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,
            show_clear_confirm: false,
            animation_frame: 0,
            ticks: 0,
        }
    }

    pub fn is_waiting(&self) -> bool {
        self.relay_task.is_some()
    }

    /// Send the composed message in the background
    pub fn submit(&mut self) {
        match self.session.prepare_send() {
            Ok(request) => {
                self.input_cursor = 0;
                let relay = self.relay.clone();
                self.relay_task = Some(tokio::spawn(async move { relay.send(&request).await }));
            }
            Err(e) => tracing::debug!(error = %e, "send refused"),
        }
    }

    pub fn send_quick_question(&mut self, index: usize) {
        let Some(question) = QUICK_QUESTIONS.get(index) else {
            return;
        };
        // The draft stays untouched while a reply is outstanding
        if self.is_waiting() {
            return;
        }
        self.session.set_input(*question);
        self.submit();
    }

    /// Hand a finished relay request back to the session
    pub async fn poll_relay(&mut self) {
        if !self.relay_task.as_ref().is_some_and(|task| task.is_finished()) {
            return;
        }
        let Some(task) = self.relay_task.take() else {
            return;
        };

        let result = match task.await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!(error = %e, "relay task failed");
                Err(RelayError::Malformed)
            }
        };
        self.session.complete_send(result);
    }

    pub async fn tick(&mut self) {
        self.poll_relay().await;

        if self.session.tick() == Tick::Completed {
            tracing::debug!("reply finished typing");
        }

        // The ellipsis moves every 20 ticks
        if self.is_waiting() {
            self.ticks = (self.ticks + 1) % 20;
            if self.ticks == 0 {
                self.animation_frame = (self.animation_frame + 1) % 3;
            }
        }
    }

    /// Run a slash command typed in the input box.
    /// Returns false when the input isn't a known command.
    pub fn run_command(&mut self, line: &str) -> bool {
        let line = line.trim();
        let (command, argument) = match line.split_once(char::is_whitespace) {
            Some((command, argument)) => (command, argument.trim()),
            None => (line, ""),
        };

        match command {
            "/imagen" | "/image" => self.attach_image(Path::new(argument)),
            "/quitar" | "/unattach" => self.session.remove_image(),
            "/logo" => self.load_logo(Path::new(argument)),
            "/limpiar" | "/clear" => self.show_clear_confirm = true,
            "/salir" | "/quit" => self.should_quit = true,
            _ => return false,
        }

        self.session.input_mut().clear();
        self.input_cursor = 0;
        true
    }

    pub fn attach_image(&mut self, path: &Path) {
        match image_data_url(path) {
            Ok(data_url) => self.session.select_image(data_url),
            Err(e) => self.session.surface_mut().notify(&format!("No se pudo adjuntar la imagen: {}", e)),
        }
    }

    pub fn load_logo(&mut self, path: &Path) {
        match image_data_url(path) {
            Ok(data_url) => self.session.set_logo(data_url),
            Err(e) => self.session.surface_mut().notify(&format!("No se pudo cargar el logo: {}", e)),
        }
    }

    pub fn confirm_clear(&mut self) {
        self.show_clear_confirm = false;
        self.session.clear();
        self.chat_scroll = 0;
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.session.surface_mut().follow_bottom = false;
        self.chat_scroll = self.chat_scroll.saturating_sub(lines);
    }

    pub fn scroll_down(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_add(lines);
    }

    pub fn scroll_to_bottom(&mut self) {
        self.session.surface_mut().follow_bottom = true;
    }

    /// Clamp the scroll offset for a transcript of `total_lines` rows
    pub fn fit_scroll(&mut self, total_lines: u16) {
        let max_scroll = total_lines.saturating_sub(self.chat_height);
        if self.session.surface().follow_bottom || self.chat_scroll >= max_scroll {
            self.chat_scroll = max_scroll;
            self.session.surface_mut().follow_bottom = true;
        }
    }
}
