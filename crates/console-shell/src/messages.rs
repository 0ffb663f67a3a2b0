use std::collections::VecDeque;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Info,
    Success,
    Warning,
    Danger,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    pub kind: MessageKind,
    pub text: String,
}

/// Bounded message log shown to the operator; oldest entries fall off first.
#[derive(Debug, Clone)]
pub struct Messages {
    entries: VecDeque<Message>,
    capacity: usize,
}

impl Messages {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn add(&mut self, kind: MessageKind, text: impl Into<String>) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(Message {
            kind,
            text: text.into(),
        });
    }

    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.entries.iter()
    }

    pub fn latest(&self) -> Option<&Message> {
        self.entries.back()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// An error raised somewhere in the shell, with optional origin.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorReport {
    pub source_class: Option<String>,
    pub source_method: Option<String>,
    pub msg: Option<String>,
}

impl ErrorReport {
    pub fn new(msg: impl Into<String>) -> Self {
        Self {
            msg: Some(msg.into()),
            ..Self::default()
        }
    }

    pub fn from_source(class: impl Into<String>, method: impl Into<String>, msg: impl Into<String>) -> Self {
        Self {
            source_class: Some(class.into()),
            source_method: Some(method.into()),
            msg: Some(msg.into()),
        }
    }
}

/// Renders `Class.method(): message`, omitting whichever origin parts are missing.
pub fn error_as_string(error: &ErrorReport) -> String {
    let class = error.source_class.as_deref().unwrap_or("");
    let method = error
        .source_method
        .as_deref()
        .map(|m| format!(".{m}(): "))
        .unwrap_or_default();
    let msg = error
        .msg
        .as_deref()
        .filter(|m| !m.is_empty())
        .unwrap_or("(No description provided)");
    format!("{class}{method}{msg}")
}
