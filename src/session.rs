//! Per-session state: the last description, the image it was made from, and
//! the follow-up conversation.

use thiserror::Error;

use crate::image::ImagePayload;
use crate::prompt::{build_followup_prompt, VEHICLE_PROMPT};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("No image file uploaded")]
    NoImage,
    #[error("Please press 't' (Tell me about this vehicle) first to initialize data.")]
    NotInitialized,
}

/// A chat message in the follow-up conversation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    User,
    Assistant,
}

impl ChatRole {
    pub fn label(&self) -> &'static str {
        match self {
            ChatRole::User => "You",
            ChatRole::Assistant => crate::prompt::ASSISTANT_NAME,
        }
    }
}

/// A model request ready to be sent.
#[derive(Debug, Clone)]
pub struct ModelRequest {
    pub prompt: String,
    pub image: ImagePayload,
}

#[derive(Debug, Default)]
pub struct Session {
    raw_response: Option<String>,
    image: Option<ImagePayload>,
    history: Vec<ChatMessage>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop everything and start over.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn raw_response(&self) -> Option<&str> {
        self.raw_response.as_deref()
    }

    pub fn image(&self) -> Option<&ImagePayload> {
        self.image.as_ref()
    }

    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    /// Store the uploaded image and build the description request for it.
    ///
    /// The image is kept even if the request later fails.
    pub fn begin_description(&mut self, uploaded: Option<&ImagePayload>) -> Result<ModelRequest, SessionError> {
        let image = uploaded.cloned().ok_or(SessionError::NoImage)?;
        self.image = Some(image.clone());
        Ok(ModelRequest {
            prompt: VEHICLE_PROMPT.to_string(),
            image,
        })
    }

    pub fn record_description(&mut self, response: String) {
        self.raw_response = Some(response);
    }

    /// Build a follow-up request, or refuse if nothing has been described yet.
    pub fn prepare_followup(&self, question: &str) -> Result<ModelRequest, SessionError> {
        match (&self.raw_response, &self.image) {
            (Some(raw), Some(image)) => Ok(ModelRequest {
                prompt: build_followup_prompt(raw, question),
                image: image.clone(),
            }),
            _ => Err(SessionError::NotInitialized),
        }
    }

    /// Append a completed exchange. Both turns go in together so the history
    /// always alternates user/assistant.
    pub fn record_followup(&mut self, question: String, answer: String) {
        self.history.push(ChatMessage {
            role: ChatRole::User,
            content: question,
        });
        self.history.push(ChatMessage {
            role: ChatRole::Assistant,
            content: answer,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image() -> ImagePayload {
        ImagePayload::new("car.jpg", "image/jpeg", vec![1, 2, 3])
    }

    #[test]
    fn test_new_session_is_empty() {
        let session = Session::new();
        assert!(session.raw_response().is_none());
        assert!(session.image().is_none());
        assert!(session.history().is_empty());
    }

    #[test]
    fn test_description_requires_image() {
        let mut session = Session::new();
        assert_eq!(session.begin_description(None).unwrap_err(), SessionError::NoImage);
        assert!(session.image().is_none());
    }

    #[test]
    fn test_description_stores_image() {
        let mut session = Session::new();
        let request = session.begin_description(Some(&image())).unwrap();
        assert_eq!(request.prompt, VEHICLE_PROMPT);
        assert_eq!(request.image, image());
        assert_eq!(session.image(), Some(&image()));
    }

    #[test]
    fn test_followup_rejected_before_description() {
        let mut session = Session::new();
        assert_eq!(session.prepare_followup("hi").unwrap_err(), SessionError::NotInitialized);

        // An image alone is not enough.
        session.begin_description(Some(&image())).unwrap();
        assert_eq!(session.prepare_followup("hi").unwrap_err(), SessionError::NotInitialized);
    }

    #[test]
    fn test_followup_uses_stored_context() {
        let mut session = Session::new();
        session.begin_description(Some(&image())).unwrap();
        session.record_description("Brand: Honda".to_string());

        let request = session.prepare_followup("What is the mileage?").unwrap();
        assert!(request.prompt.contains("Vehicle Info:\nBrand: Honda"));
        assert!(request.prompt.ends_with("User: What is the mileage?\nAutoSage:"));
        assert_eq!(request.image, image());
    }

    #[test]
    fn test_history_alternates() {
        let mut session = Session::new();
        for i in 0..3 {
            session.record_followup(format!("q{i}"), format!("a{i}"));
        }

        let history = session.history();
        assert_eq!(history.len(), 6);
        for (i, msg) in history.iter().enumerate() {
            let expected = if i % 2 == 0 { ChatRole::User } else { ChatRole::Assistant };
            assert_eq!(msg.role, expected);
        }
        assert_eq!(history[4].content, "q2");
        assert_eq!(history[5].content, "a2");
    }

    #[test]
    fn test_role_labels() {
        assert_eq!(ChatRole::User.label(), "You");
        assert_eq!(ChatRole::Assistant.label(), "AutoSage");
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut session = Session::new();
        session.begin_description(Some(&image())).unwrap();
        session.record_description("Brand: Honda".to_string());
        session.record_followup("q".to_string(), "a".to_string());

        session.reset();
        assert!(session.raw_response().is_none());
        assert!(session.image().is_none());
        assert!(session.history().is_empty());
    }
}
