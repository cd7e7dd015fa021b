//! Application state for the terminal interface.
//!
//! Conversation state lives in the workbench controllers; what is held here
//! is purely presentational. Which tab is showing, the input line, list
//! cursors, and handles to in-flight background work. Controller actions run
//! on spawned tasks and write their results into shared controller state, so
//! a finished task has nothing to hand back; the handles are kept only so
//! the tick can prune them and the configuration flow can report its outcome
//! on the status line.

use banter_core::{TabKind, Workbench, AVAILABLE_CHAT_MODELS};
use ratatui::widgets::ListState;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputMode {
    #[default]
    Normal,
    Editing,
}

/// What the input line feeds when submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputPurpose {
    /// Chat message, image prompt, or coding question for the active tab
    #[default]
    Message,
    /// GitHub Personal Access Token on the coding tab
    Token,
    /// Local file path for the chat or image upload endpoints
    UploadPath,
}

pub struct App {
    pub workbench: Workbench,
    pub should_quit: bool,
    pub active_tab: TabKind,

    pub input_mode: InputMode,
    pub input_purpose: InputPurpose,
    pub input: String,
    /// Cursor position in `input`, counted in characters
    pub input_cursor: usize,

    // Configuration popup
    pub show_config: bool,
    pub api_key_input: String,
    pub config_model_idx: usize,

    // Coding tab list cursors
    pub repository_state: ListState,
    pub file_state: ListState,

    /// Transient line at the bottom, replaced by the next outcome
    pub status: Option<String>,

    // In-flight background work
    pub config_task: Option<JoinHandle<Result<String, String>>>,
    pub model_task: Option<JoinHandle<String>>,
    pub action_tasks: Vec<JoinHandle<()>>,

    pub animation_frame: u8,
    /// Transcript scroll, counted in lines up from the latest message
    pub scroll_offset: u16,
    // Transcript viewport recorded during render for scroll math
    pub transcript_height: u16,
    pub transcript_width: u16,
}

impl App {
    pub fn new(workbench: Workbench) -> Self {
        // First run opens on the configuration form
        let show_config = !workbench.is_configured();
        let chat_model = workbench.chat_model();
        let config_model_idx = AVAILABLE_CHAT_MODELS
            .iter()
            .position(|m| *m == chat_model)
            .unwrap_or(0);

        Self {
            workbench,
            should_quit: false,
            active_tab: TabKind::Chat,
            input_mode: InputMode::default(),
            input_purpose: InputPurpose::default(),
            input: String::new(),
            input_cursor: 0,
            show_config,
            api_key_input: String::new(),
            config_model_idx,
            repository_state: ListState::default(),
            file_state: ListState::default(),
            status: None,
            config_task: None,
            model_task: None,
            action_tasks: Vec::new(),
            animation_frame: 0,
            scroll_offset: 0,
            transcript_height: 0,
            transcript_width: 0,
        }
    }

    /// True while the active tab has a request in flight.
    pub fn active_tab_busy(&self) -> bool {
        match self.active_tab {
            TabKind::Chat => {
                self.workbench.chat().is_typing() || self.workbench.chat().is_uploading()
            }
            TabKind::Image => {
                self.workbench.image().is_generating() || self.workbench.image().is_uploading()
            }
            TabKind::Coding => {
                self.workbench.coding().is_loading() || self.workbench.coding().status().is_busy()
            }
        }
    }

    pub fn select_tab(&mut self, tab: TabKind) {
        if tab != self.active_tab {
            self.active_tab = tab;
            self.input.clear();
            self.input_cursor = 0;
            self.input_mode = InputMode::Normal;
            self.input_purpose = InputPurpose::Message;
            self.scroll_offset = 0;
        }
    }

    pub fn begin_editing(&mut self, purpose: InputPurpose) {
        self.input_mode = InputMode::Editing;
        self.input_purpose = purpose;
        self.status = None;
    }

    /// Takes the input buffer, trimmed, leaving it empty.
    pub fn take_input(&mut self) -> String {
        self.input_cursor = 0;
        std::mem::take(&mut self.input).trim().to_string()
    }

    // Coding tab list navigation

    pub fn repository_nav_down(&mut self) {
        let len = self.workbench.coding().repositories().len();
        if len > 0 {
            let i = self.repository_state.selected().unwrap_or(0);
            self.repository_state.select(Some((i + 1).min(len - 1)));
        }
    }

    pub fn repository_nav_up(&mut self) {
        let i = self.repository_state.selected().unwrap_or(0);
        self.repository_state.select(Some(i.saturating_sub(1)));
    }

    pub fn file_nav_down(&mut self) {
        let len = self.workbench.coding().available_files().len();
        if len > 0 {
            let i = self.file_state.selected().unwrap_or(0);
            self.file_state.select(Some((i + 1).min(len - 1)));
        }
    }

    pub fn file_nav_up(&mut self) {
        let i = self.file_state.selected().unwrap_or(0);
        self.file_state.select(Some(i.saturating_sub(1)));
    }

    /// Advances the spinner while the active tab is waiting on the backend.
    pub fn tick_animation(&mut self) {
        if self.active_tab_busy() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    /// Harvests finished background work. Called from the tick handler so
    /// results surface without a keypress.
    pub async fn reap_tasks(&mut self) {
        if self.config_task.as_ref().map_or(false, |t| t.is_finished()) {
            if let Some(task) = self.config_task.take() {
                match task.await {
                    Ok(Ok(message)) => {
                        self.show_config = false;
                        self.api_key_input.clear();
                        self.status = Some(message);
                    }
                    Ok(Err(message)) => self.status = Some(message),
                    Err(_) => self.status = Some("Configuration task failed".to_string()),
                }
            }
        }

        if self.model_task.as_ref().map_or(false, |t| t.is_finished()) {
            if let Some(task) = self.model_task.take() {
                self.status = Some(
                    task.await
                        .unwrap_or_else(|_| "Model update task failed".to_string()),
                );
            }
        }

        self.action_tasks.retain(|task| !task.is_finished());
    }
}
