//! In-memory agent that replays scripted sessions.

use crate::agent::{Agent, EventStream};
use crate::errors::SessionError;
use crate::stream::AgentEvent;
use async_trait::async_trait;
use futures::{StreamExt, stream};
use std::collections::VecDeque;
use std::sync::Mutex;

type SideEffect = Box<dyn Fn() + Send + Sync>;

/// One scripted session: a side effect run on submit (the agent "writing
/// files") and the events it then streams back.
pub struct ScriptedSession {
    events: Vec<Result<AgentEvent, SessionError>>,
    on_submit: Option<SideEffect>,
    hang: bool,
}

impl ScriptedSession {
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
            on_submit: None,
            hang: false,
        }
    }

    pub fn text(mut self, text: &str) -> Self {
        self.events.push(Ok(AgentEvent::Text(text.to_string())));
        self
    }

    pub fn event(mut self, event: AgentEvent) -> Self {
        self.events.push(Ok(event));
        self
    }

    pub fn failure(mut self, error: SessionError) -> Self {
        self.events.push(Err(error));
        self
    }

    pub fn finished(self) -> Self {
        self.event(AgentEvent::Finished {
            is_error: false,
            result: None,
        })
    }

    /// Never end the stream after the scripted events.
    pub fn hang(mut self) -> Self {
        self.hang = true;
        self
    }

    pub fn on_submit(mut self, effect: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_submit = Some(Box::new(effect));
        self
    }
}

/// Replays queued sessions in order; once the queue is empty every further
/// session just finishes without doing anything.
#[derive(Default)]
pub struct ScriptedAgent {
    sessions: Mutex<VecDeque<ScriptedSession>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedAgent {
    pub fn new(sessions: Vec<ScriptedSession>) -> Self {
        Self {
            sessions: Mutex::new(sessions.into()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn submit_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl Agent for ScriptedAgent {
    async fn submit(&self, prompt: &str) -> Result<EventStream, SessionError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        let session = self
            .sessions
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| ScriptedSession::new().finished());

        if let Some(effect) = &session.on_submit {
            effect();
        }
        let events = stream::iter(session.events);
        if session.hang {
            Ok(Box::pin(events.chain(stream::pending())))
        } else {
            Ok(Box::pin(events))
        }
    }
}
