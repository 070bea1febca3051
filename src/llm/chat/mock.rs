use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

use super::{ ChatClient, CompletionRequest, CompletionResponse };
use crate::llm::{ LlmError, LlmType };

enum Scripted {
    Reply(String),
    Fail(String),
}

type Responder = Box<dyn Fn(&CompletionRequest) -> Result<String, String> + Send + Sync>;

/// Scripted client: replies are handed out in order and every request is recorded.
/// A responder, when set, answers every request instead of the queue.
#[derive(Default)]
pub struct MockChatClient {
    replies: Mutex<VecDeque<Scripted>>,
    requests: Mutex<Vec<CompletionRequest>>,
    responder: Option<Responder>,
}

impl MockChatClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_responder<F>(responder: F) -> Self
    where
        F: Fn(&CompletionRequest) -> Result<String, String> + Send + Sync + 'static,
    {
        Self {
            responder: Some(Box::new(responder)),
            ..Default::default()
        }
    }

    pub fn push_ok(&self, text: &str) {
        self.replies.lock().unwrap().push_back(Scripted::Reply(text.to_string()));
    }

    pub fn push_err(&self, message: &str) {
        self.replies.lock().unwrap().push_back(Scripted::Fail(message.to_string()));
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatClient for MockChatClient {
    async fn complete(
        &self,
        request: &CompletionRequest
    ) -> Result<CompletionResponse, LlmError> {
        self.requests.lock().unwrap().push(request.clone());
        if let Some(responder) = &self.responder {
            return responder(request)
                .map(|response| CompletionResponse { response })
                .map_err(|body| LlmError::Status { status: 500, body });
        }
        let next = self.replies.lock().unwrap().pop_front();
        match next {
            Some(Scripted::Reply(text)) => Ok(CompletionResponse { response: text }),
            Some(Scripted::Fail(message)) => Err(LlmError::Status { status: 500, body: message }),
            None => Err(LlmError::EmptyResponse),
        }
    }

    fn get_model(&self) -> String {
        "mock".to_string()
    }

    fn get_base_url(&self) -> Option<String> {
        None
    }

    fn llm_type(&self) -> LlmType {
        LlmType::Gemini
    }
}
