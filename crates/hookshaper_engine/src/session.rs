//! Conversation and result state, advanced only through [`Session::apply`].
//!
//! Every submission gets an increasing id. Events carry the id of the
//! submission they answer, and anything answering an older submission than
//! the latest one is dropped, so a slow superseded round trip can never
//! overwrite fresher results.

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::diagnostics::Report;
use crate::pipeline::Preview;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct SubmissionId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// The model answered (or failed to answer) a submission
    ModelResponded {
        id: SubmissionId,
        result: Result<String, String>,
    },
    /// The pipeline finished for a submission's response
    PreviewCompleted {
        id: SubmissionId,
        result: Result<Preview, Report>,
    },
}

impl SessionEvent {
    pub fn id(&self) -> SubmissionId {
        match self {
            SessionEvent::ModelResponded { id, .. } | SessionEvent::PreviewCompleted { id, .. } => {
                *id
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Accepted,
    Stale,
}

#[derive(Debug, Default, Serialize)]
pub struct Session {
    next_id: u64,
    latest: Option<SubmissionId>,
    awaiting_model: bool,
    messages: Vec<Message>,
    generated_code: Option<String>,
    events: Option<Vec<Value>>,
    last_report: Option<Report>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a user instruction; it supersedes every earlier submission
    pub fn submit(&mut self, text: impl Into<String>) -> SubmissionId {
        let id = SubmissionId(self.next_id);
        self.next_id += 1;
        self.latest = Some(id);
        self.awaiting_model = true;
        self.messages.push(Message {
            role: Role::User,
            content: text.into(),
        });
        debug!(submission = id.0, "Submission recorded");
        id
    }

    /// Single state transition for completed asynchronous work
    pub fn apply(&mut self, event: SessionEvent) -> Applied {
        if self.latest != Some(event.id()) {
            debug!(submission = event.id().0, "Dropping stale event");
            return Applied::Stale;
        }

        match event {
            SessionEvent::ModelResponded { result, .. } => {
                self.awaiting_model = false;
                let content = match result {
                    Ok(text) => text,
                    Err(message) => format!("Error: {message}"),
                };
                self.messages.push(Message {
                    role: Role::Assistant,
                    content,
                });
            }
            SessionEvent::PreviewCompleted { result, .. } => match result {
                Ok(preview) => {
                    self.generated_code = Some(preview.source.into_code());
                    self.events = Some(preview.events);
                    self.last_report = None;
                }
                Err(report) => {
                    self.events = None;
                    self.last_report = Some(report);
                }
            },
        }

        Applied::Accepted
    }

    /// Record a failure that happened outside any submission's pipeline
    pub fn fail(&mut self, report: Report) {
        self.events = None;
        self.last_report = Some(report);
    }

    /// New sample input invalidates the previous results
    pub fn reset_results(&mut self) {
        self.events = None;
        self.last_report = None;
    }

    pub fn is_awaiting_model(&self) -> bool {
        self.awaiting_model
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn generated_code(&self) -> Option<&str> {
        self.generated_code.as_deref()
    }

    pub fn events(&self) -> Option<&[Value]> {
        self.events.as_deref()
    }

    pub fn last_report(&self) -> Option<&Report> {
        self.last_report.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Category;
    use crate::engine::ConsoleOutput;
    use crate::extract::{ExtractedSource, Provenance};
    use serde_json::json;

    fn preview(code: &str, events: Vec<Value>) -> Preview {
        Preview {
            source: ExtractedSource::new(code, Provenance::FencedBlock).unwrap(),
            evaluated_source: code.to_string(),
            injected_helpers: Vec::new(),
            events,
            console: ConsoleOutput::default(),
        }
    }

    #[test]
    fn test_submit_then_complete() {
        let mut session = Session::new();
        let id = session.submit("map email to customer id");
        assert!(session.is_awaiting_model());

        let applied = session.apply(SessionEvent::ModelResponded {
            id,
            result: Ok("```js\nfunction handler(p) { return []; }\n```".into()),
        });
        assert_eq!(applied, Applied::Accepted);
        assert!(!session.is_awaiting_model());
        assert_eq!(session.messages().len(), 2);

        session.apply(SessionEvent::PreviewCompleted {
            id,
            result: Ok(preview("function handler(p) { return []; }", vec![])),
        });
        assert_eq!(
            session.generated_code(),
            Some("function handler(p) { return []; }")
        );
        assert_eq!(session.events(), Some(&[][..]));
    }

    #[test]
    fn test_superseded_results_are_dropped() {
        let mut session = Session::new();
        let first = session.submit("first");
        let second = session.submit("second");
        assert!(first < second);

        session.apply(SessionEvent::PreviewCompleted {
            id: second,
            result: Ok(preview("function handler(p) { return [2]; }", vec![json!(2)])),
        });

        let applied = session.apply(SessionEvent::PreviewCompleted {
            id: first,
            result: Ok(preview("function handler(p) { return [1]; }", vec![json!(1)])),
        });
        assert_eq!(applied, Applied::Stale);
        assert_eq!(session.events(), Some(&[json!(2)][..]));
    }

    #[test]
    fn test_failure_clears_events() {
        let mut session = Session::new();
        let id = session.submit("x");
        session.apply(SessionEvent::PreviewCompleted {
            id,
            result: Ok(preview("function handler(p) { return []; }", vec![json!({})])),
        });
        let id = session.submit("y");
        session.apply(SessionEvent::PreviewCompleted {
            id,
            result: Err(Report {
                display_message: "boom".into(),
                category: Category::ExecutionFailure,
            }),
        });
        assert!(session.events().is_none());
        assert_eq!(
            session.last_report().map(|r| r.category),
            Some(Category::ExecutionFailure)
        );
    }

    #[test]
    fn test_model_error_recorded_as_message() {
        let mut session = Session::new();
        let id = session.submit("x");
        session.apply(SessionEvent::ModelResponded {
            id,
            result: Err("invalid api key".into()),
        });
        assert_eq!(session.messages()[1].content, "Error: invalid api key");
    }
}
