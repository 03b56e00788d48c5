use std::path::PathBuf;
use std::sync::Arc;

use ratatui::layout::Rect;
use ratatui::widgets::ListState;
use tokio::task::{JoinError, JoinHandle};
use tracing::{error, info, warn};

use crate::config::Config;
use crate::gemini::{GeminiClient, ModelError, VisionModel};
use crate::image::ImagePayload;
use crate::session::{ModelRequest, Session};
use crate::summary::format_vehicle_summary;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    EditingPath,
    EditingQuestion,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusPane {
    Response,
    Chat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseView {
    Raw,
    Summary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub severity: Severity,
    pub text: String,
}

/// Single-line text field with a character-based cursor.
#[derive(Debug, Clone, Default)]
pub struct TextInput {
    pub value: String,
    pub cursor: usize,
}

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

impl TextInput {
    pub fn with_value(value: &str) -> Self {
        Self {
            value: value.to_string(),
            cursor: value.chars().count(),
        }
    }

    pub fn insert(&mut self, c: char) {
        let byte_pos = char_to_byte_index(&self.value, self.cursor);
        self.value.insert(byte_pos, c);
        self.cursor += 1;
    }

    pub fn backspace(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let byte_pos = char_to_byte_index(&self.value, self.cursor);
            self.value.remove(byte_pos);
        }
    }

    pub fn delete(&mut self) {
        if self.cursor < self.value.chars().count() {
            let byte_pos = char_to_byte_index(&self.value, self.cursor);
            self.value.remove(byte_pos);
        }
    }

    pub fn left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.value.chars().count());
    }

    pub fn home(&mut self) {
        self.cursor = 0;
    }

    pub fn end(&mut self) {
        self.cursor = self.value.chars().count();
    }

    pub fn clear(&mut self) {
        self.value.clear();
        self.cursor = 0;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestKind {
    Describe,
    FollowUp { question: String },
}

pub struct PendingRequest {
    pub kind: RequestKind,
    handle: JoinHandle<Result<String, ModelError>>,
}

pub struct App {
    pub should_quit: bool,
    pub input_mode: InputMode,
    pub focus: FocusPane,

    // Inputs
    pub path_input: TextInput,
    pub question_input: TextInput,

    // The image currently in the upload field; copied into the session on "tell me"
    pub uploaded: Option<ImagePayload>,
    pub session: Session,

    pub view: ResponseView,
    pub status: Option<StatusMessage>,
    pub pending: Option<PendingRequest>,
    pub animation_frame: u8,

    // Scrolling; sizes and areas are written during render
    pub response_scroll: u16,
    pub chat_scroll: u16,
    pub chat_height: u16,
    pub chat_width: u16,
    pub response_area: Option<Rect>,
    pub chat_area: Option<Rect>,

    // Model picker
    pub show_model_picker: bool,
    pub available_models: Vec<String>,
    pub model_picker_state: ListState,
    pub selected_model: String,

    model: Arc<dyn VisionModel>,
}

impl App {
    pub fn new(model: Arc<dyn VisionModel>, selected_model: String) -> Self {
        Self {
            should_quit: false,
            input_mode: InputMode::Normal,
            focus: FocusPane::Response,

            path_input: TextInput::default(),
            question_input: TextInput::default(),

            uploaded: None,
            session: Session::new(),

            view: ResponseView::Raw,
            status: Some(StatusMessage {
                severity: Severity::Info,
                text: "Please upload an image to begin (press 'u').".to_string(),
            }),
            pending: None,
            animation_frame: 0,

            response_scroll: 0,
            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,
            response_area: None,
            chat_area: None,

            show_model_picker: false,
            available_models: Vec::new(),
            model_picker_state: ListState::default(),
            selected_model,

            model,
        }
    }

    pub fn set_status(&mut self, severity: Severity, text: impl Into<String>) {
        self.status = Some(StatusMessage {
            severity,
            text: text.into(),
        });
    }

    pub fn is_busy(&self) -> bool {
        self.pending.is_some()
    }

    /// Load the image named in the upload field.
    pub fn upload_from_input(&mut self) {
        let path = expand_home(self.path_input.value.trim());
        match ImagePayload::load(&path) {
            Ok(image) => {
                info!(?image, "image uploaded");
                self.set_status(
                    Severity::Info,
                    format!(
                        "Loaded {} ({}, {}). Press 't' to tell me about this vehicle.",
                        image.file_name,
                        image.mime_type,
                        image.display_size()
                    ),
                );
                self.uploaded = Some(image);
            }
            Err(e) => {
                warn!(error = %e, path = %path.display(), "image upload failed");
                self.set_status(Severity::Error, format!("Error: {}", e));
            }
        }
    }

    /// "Tell me about this vehicle"
    pub fn request_description(&mut self) {
        if self.is_busy() {
            self.set_status(Severity::Info, "Still waiting for the model...");
            return;
        }

        match self.session.begin_description(self.uploaded.as_ref()) {
            Ok(request) => {
                self.view = ResponseView::Raw;
                self.response_scroll = 0;
                self.set_status(Severity::Info, "Asking the model about this vehicle...");
                self.spawn_request(RequestKind::Describe, request);
            }
            Err(e) => self.set_status(Severity::Error, format!("Error: {}", e)),
        }
    }

    pub fn summarize(&mut self) {
        if self.session.raw_response().is_none() {
            self.set_status(Severity::Warning, "Nothing to summarize yet. Press 't' first.");
            return;
        }
        self.view = ResponseView::Summary;
        self.response_scroll = 0;
        self.set_status(Severity::Info, "Summarized vehicle overview.");
    }

    pub fn show_raw(&mut self) {
        if self.session.raw_response().is_some() {
            self.view = ResponseView::Raw;
            self.response_scroll = 0;
        }
    }

    /// Start editing a follow-up question; only offered once a description exists.
    pub fn start_question(&mut self) {
        if self.session.raw_response().is_none() {
            self.set_status(
                Severity::Warning,
                "Please press 't' (Tell me about this vehicle) first to initialize data.",
            );
            return;
        }
        self.focus = FocusPane::Chat;
        self.input_mode = InputMode::EditingQuestion;
        self.question_input.end();
    }

    pub fn submit_question(&mut self) {
        let question = self.question_input.value.trim().to_string();
        if question.is_empty() {
            return;
        }
        if self.is_busy() {
            self.set_status(Severity::Info, "Still waiting for the model...");
            return;
        }

        match self.session.prepare_followup(&question) {
            Ok(request) => {
                self.question_input.clear();
                self.input_mode = InputMode::Normal;
                self.status = None;
                self.spawn_request(RequestKind::FollowUp { question }, request);
                self.scroll_chat_to_bottom();
            }
            Err(e) => self.set_status(Severity::Warning, e.to_string()),
        }
    }

    fn spawn_request(&mut self, kind: RequestKind, request: ModelRequest) {
        let model = Arc::clone(&self.model);
        let model_name = self.selected_model.clone();
        let handle = tokio::spawn(async move {
            model.generate(&model_name, &request.prompt, &request.image).await
        });
        self.animation_frame = 0;
        self.pending = Some(PendingRequest { kind, handle });
    }

    /// Collect the pending request if it has finished. Never blocks.
    pub async fn poll_pending(&mut self) {
        let finished = self
            .pending
            .as_ref()
            .map(|p| p.handle.is_finished())
            .unwrap_or(false);

        if finished {
            if let Some(pending) = self.pending.take() {
                let result = pending.handle.await;
                self.finish_request(pending.kind, result);
            }
        }
    }

    fn finish_request(&mut self, kind: RequestKind, result: Result<Result<String, ModelError>, JoinError>) {
        let result = match result {
            Ok(inner) => inner.map_err(|e| e.to_string()),
            Err(join_err) => Err(join_err.to_string()),
        };

        match (kind, result) {
            (RequestKind::Describe, Ok(text)) => {
                info!(chars = text.len(), "vehicle description received");
                self.session.record_description(text);
                self.set_status(
                    Severity::Info,
                    "Press 's' to summarize or 'a' to ask more about the vehicle.",
                );
            }
            (RequestKind::Describe, Err(e)) => {
                error!(error = %e, "description request failed");
                self.set_status(Severity::Error, format!("Error: {}", e));
            }
            (RequestKind::FollowUp { question }, Ok(answer)) => {
                self.session.record_followup(question, answer);
                self.scroll_chat_to_bottom();
            }
            (RequestKind::FollowUp { .. }, Err(e)) => {
                error!(error = %e, "follow-up request failed");
                self.set_status(Severity::Error, format!("Chat error: {}", e));
            }
        }
    }

    /// Forget the description, image and chat, and start over.
    pub fn new_session(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.handle.abort();
        }
        self.session.reset();
        self.uploaded = None;
        self.path_input.clear();
        self.question_input.clear();
        self.view = ResponseView::Raw;
        self.response_scroll = 0;
        self.chat_scroll = 0;
        self.input_mode = InputMode::Normal;
        self.set_status(Severity::Info, "New session. Please upload an image to begin.");
        info!("session reset");
    }

    /// Text for the response pane in the current view.
    pub fn response_text(&self) -> Option<String> {
        let raw = self.session.raw_response()?;
        Some(match self.view {
            ResponseView::Raw => raw.to_string(),
            ResponseView::Summary => format_vehicle_summary(raw),
        })
    }

    pub fn tick_animation(&mut self) {
        if self.is_busy() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    pub fn scroll_down(&mut self) {
        match self.focus {
            FocusPane::Response => self.response_scroll = self.response_scroll.saturating_add(1),
            FocusPane::Chat => self.chat_scroll = self.chat_scroll.saturating_add(1),
        }
    }

    pub fn scroll_up(&mut self) {
        match self.focus {
            FocusPane::Response => self.response_scroll = self.response_scroll.saturating_sub(1),
            FocusPane::Chat => self.chat_scroll = self.chat_scroll.saturating_sub(1),
        }
    }

    pub fn scroll_top(&mut self) {
        match self.focus {
            FocusPane::Response => self.response_scroll = 0,
            FocusPane::Chat => self.chat_scroll = 0,
        }
    }

    /// Scroll chat to bottom so the latest answer (or "Thinking...") is visible
    pub fn scroll_chat_to_bottom(&mut self) {
        let wrap_width = if self.chat_width > 0 {
            self.chat_width as usize
        } else {
            50
        };

        let mut total_lines: u16 = 0;
        for msg in self.session.history() {
            // role line, content, blank line after message
            total_lines = total_lines
                .saturating_add(1)
                .saturating_add(wrapped_line_count(&msg.content, wrap_width))
                .saturating_add(1);
        }

        if matches!(self.pending.as_ref().map(|p| &p.kind), Some(RequestKind::FollowUp { .. })) {
            // Pending question, role line and "Thinking..."
            total_lines = total_lines.saturating_add(4);
        }

        let visible_height = if self.chat_height > 0 { self.chat_height } else { 20 };
        self.chat_scroll = total_lines.saturating_sub(visible_height);
    }

    pub fn open_model_picker(&mut self) {
        self.available_models = GeminiClient::list_models();
        if !self.available_models.contains(&self.selected_model) {
            self.available_models.insert(0, self.selected_model.clone());
        }
        let current_idx = self
            .available_models
            .iter()
            .position(|m| m == &self.selected_model)
            .unwrap_or(0);
        self.model_picker_state.select(Some(current_idx));
        self.show_model_picker = true;
    }

    pub fn model_picker_nav_down(&mut self) {
        let len = self.available_models.len();
        if len == 0 {
            return;
        }
        let i = self.model_picker_state.selected().map(|i| (i + 1) % len).unwrap_or(0);
        self.model_picker_state.select(Some(i));
    }

    pub fn model_picker_nav_up(&mut self) {
        let len = self.available_models.len();
        if len == 0 {
            return;
        }
        let i = self
            .model_picker_state
            .selected()
            .map(|i| if i == 0 { len - 1 } else { i - 1 })
            .unwrap_or(0);
        self.model_picker_state.select(Some(i));
    }

    pub fn select_model(&mut self) {
        if let Some(model) = self
            .model_picker_state
            .selected()
            .and_then(|i| self.available_models.get(i))
            .cloned()
        {
            if let Err(e) = Config::save_default_model(&model) {
                warn!(error = %e, "could not save default model");
            }
            info!(model = %model, "model selected");
            self.set_status(Severity::Info, format!("Using model {}", model));
            self.selected_model = model;
        }
        self.show_model_picker = false;
    }
}

/// Number of terminal rows `text` takes when wrapped at `width` columns.
pub fn wrapped_line_count(text: &str, width: usize) -> u16 {
    let width = width.max(1);
    let mut lines: u16 = 0;
    for line in text.lines() {
        let char_count = line.chars().count();
        let rows = if char_count == 0 { 1 } else { char_count.div_ceil(width) };
        lines = lines.saturating_add(rows as u16);
    }
    lines
}

/// Expand a leading `~/` to the home directory.
fn expand_home(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::ChatRole;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Model that replays scripted answers and records every prompt it gets.
    #[derive(Default)]
    struct ScriptedModel {
        replies: Mutex<VecDeque<Result<String, String>>>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedModel {
        fn with_replies(replies: Vec<Result<&str, &str>>) -> Arc<Self> {
            let replies = replies
                .into_iter()
                .map(|r| r.map(str::to_string).map_err(str::to_string))
                .collect();
            Arc::new(Self {
                replies: Mutex::new(replies),
                prompts: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.prompts.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl VisionModel for ScriptedModel {
        async fn generate(&self, _model: &str, prompt: &str, _image: &ImagePayload) -> Result<String, ModelError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            match self.replies.lock().unwrap().pop_front() {
                Some(Ok(text)) => Ok(text),
                Some(Err(body)) => Err(ModelError::Api { status: 500, body }),
                None => Err(ModelError::Empty),
            }
        }
    }

    fn app_with(model: Arc<ScriptedModel>) -> App {
        let mut app = App::new(model, "gemini-1.5-flash".to_string());
        app.uploaded = Some(ImagePayload::new("car.jpg", "image/jpeg", vec![0xff, 0xd8]));
        app
    }

    async fn wait(app: &mut App) {
        let pending = app.pending.take().expect("no request in flight");
        let result = pending.handle.await;
        app.finish_request(pending.kind, result);
    }

    async fn ask(app: &mut App, question: &str) {
        app.question_input = TextInput::with_value(question);
        app.submit_question();
        wait(app).await;
    }

    #[tokio::test]
    async fn test_describe_then_summarize() {
        let model = ScriptedModel::with_replies(vec![Ok("Brand: Toyota\nModel: Fortuner\nType: SUV")]);
        let mut app = app_with(model.clone());

        app.request_description();
        assert!(app.is_busy());
        wait(&mut app).await;

        assert_eq!(app.session.raw_response(), Some("Brand: Toyota\nModel: Fortuner\nType: SUV"));
        assert_eq!(app.response_text().unwrap(), "Brand: Toyota\nModel: Fortuner\nType: SUV");

        app.summarize();
        assert_eq!(app.view, ResponseView::Summary);
        let summary = app.response_text().unwrap();
        assert!(summary.contains("- Brand: Toyota"));
        assert!(summary.contains("- Type: SUV"));
        assert_eq!(model.calls(), 1);
    }

    #[tokio::test]
    async fn test_describe_without_upload_is_an_error() {
        let model = ScriptedModel::with_replies(vec![]);
        let mut app = App::new(model.clone(), "gemini-1.5-flash".to_string());

        app.request_description();
        assert!(!app.is_busy());
        let status = app.status.clone().unwrap();
        assert_eq!(status.severity, Severity::Error);
        assert_eq!(status.text, "Error: No image file uploaded");
        assert_eq!(model.calls(), 0);
    }

    #[tokio::test]
    async fn test_describe_failure_keeps_image_but_no_response() {
        let model = ScriptedModel::with_replies(vec![Err("quota exceeded")]);
        let mut app = app_with(model);

        app.request_description();
        wait(&mut app).await;

        assert!(app.session.image().is_some());
        assert!(app.session.raw_response().is_none());
        let status = app.status.clone().unwrap();
        assert_eq!(status.severity, Severity::Error);
        assert!(status.text.contains("quota exceeded"));
    }

    #[tokio::test]
    async fn test_followup_rejected_before_description() {
        let model = ScriptedModel::with_replies(vec![Ok("unused")]);
        let mut app = app_with(model.clone());

        app.question_input = TextInput::with_value("How fast is it?");
        app.submit_question();

        assert!(!app.is_busy());
        assert_eq!(app.status.as_ref().unwrap().severity, Severity::Warning);
        assert!(app.session.history().is_empty());
        assert_eq!(model.calls(), 0);
    }

    #[tokio::test]
    async fn test_followups_append_in_order() {
        let model = ScriptedModel::with_replies(vec![
            Ok("Brand: Royal Enfield"),
            Ok("About 35 km/l."),
            Ok("Yes, ABS is standard."),
        ]);
        let mut app = app_with(model.clone());
        app.request_description();
        wait(&mut app).await;

        ask(&mut app, "What mileage does it get?").await;
        ask(&mut app, "  Does it have ABS?  ").await;

        let history = app.session.history();
        assert_eq!(history.len(), 4);
        assert_eq!(history[0].role, ChatRole::User);
        assert_eq!(history[0].content, "What mileage does it get?");
        assert_eq!(history[1].role, ChatRole::Assistant);
        assert_eq!(history[1].content, "About 35 km/l.");
        assert_eq!(history[2].content, "Does it have ABS?");
        assert_eq!(history[3].content, "Yes, ABS is standard.");

        let prompts = model.prompts.lock().unwrap();
        assert!(prompts[2].contains("Vehicle Info:\nBrand: Royal Enfield"));
        assert!(prompts[2].ends_with("User: Does it have ABS?\nAutoSage:"));
        assert!(app.question_input.value.is_empty());
    }

    #[tokio::test]
    async fn test_failed_followup_appends_nothing() {
        let model = ScriptedModel::with_replies(vec![Ok("Brand: Tata"), Err("network down")]);
        let mut app = app_with(model);
        app.request_description();
        wait(&mut app).await;

        ask(&mut app, "Price?").await;

        assert!(app.session.history().is_empty());
        let status = app.status.clone().unwrap();
        assert_eq!(status.severity, Severity::Error);
        assert!(status.text.starts_with("Chat error:"));
    }

    #[tokio::test]
    async fn test_second_request_rejected_while_busy() {
        let model = ScriptedModel::with_replies(vec![Ok("Brand: Kia"), Ok("unused")]);
        let mut app = app_with(model.clone());

        app.request_description();
        app.request_description();
        wait(&mut app).await;

        assert_eq!(model.calls(), 1);
        assert!(!app.is_busy());
    }

    #[tokio::test]
    async fn test_summarize_without_response_warns() {
        let mut app = app_with(ScriptedModel::with_replies(vec![]));
        app.summarize();
        assert_eq!(app.view, ResponseView::Raw);
        assert_eq!(app.status.as_ref().unwrap().severity, Severity::Warning);
    }

    #[tokio::test]
    async fn test_new_session_clears_state() {
        let model = ScriptedModel::with_replies(vec![Ok("Brand: Bajaj"), Ok("Yes.")]);
        let mut app = app_with(model);
        app.request_description();
        wait(&mut app).await;
        ask(&mut app, "Is it cheap?").await;

        app.new_session();
        assert!(app.session.raw_response().is_none());
        assert!(app.session.history().is_empty());
        assert!(app.uploaded.is_none());
        assert!(app.response_text().is_none());
    }

    #[test]
    fn test_text_input_handles_multibyte() {
        let mut input = TextInput::with_value("héllo");
        input.left();
        input.left();
        input.backspace();
        assert_eq!(input.value, "hélo");
        input.home();
        input.delete();
        assert_eq!(input.value, "élo");
        input.insert('D');
        assert_eq!(input.value, "Délo");
        input.end();
        input.right();
        assert_eq!(input.cursor, 4);
    }

    #[test]
    fn test_chat_scroll_saturates_on_huge_answer() {
        let mut app = app_with(ScriptedModel::with_replies(vec![]));
        app.chat_height = 10;
        app.chat_width = 40;
        app.session.record_followup("q".to_string(), "x\n".repeat(70_000));
        app.session.record_followup("again".to_string(), "ok".to_string());

        app.scroll_chat_to_bottom();
        assert_eq!(app.chat_scroll, u16::MAX - 10);
    }

    #[test]
    fn test_wrapped_line_count() {
        assert_eq!(wrapped_line_count("", 10), 0);
        assert_eq!(wrapped_line_count("a\n\nb", 10), 3);
        assert_eq!(wrapped_line_count("0123456789", 10), 1);
        assert_eq!(wrapped_line_count("0123456789x", 10), 2);
    }
}
