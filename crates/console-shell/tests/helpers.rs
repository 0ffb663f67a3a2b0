//! Shared helpers for shell integration tests.
//!
//! Each integration test compiles this module separately, so some helpers
//! may look unused from a given test file.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use console_shell::{Controller, ControllerFactory, ShellContext, ShellError};

/// Lifecycle calls in order, formatted as `"<hook>:<id>"`.
pub type Journal = Rc<RefCell<Vec<String>>>;

/// Records every hook into a shared journal and fails the hooks it is told to.
pub struct RecordingController {
    id: String,
    journal: Journal,
    fail: Rc<HashSet<&'static str>>,
}

impl RecordingController {
    fn hook(&self, hook: &'static str) -> Result<(), ShellError> {
        self.journal.borrow_mut().push(format!("{hook}:{}", self.id));
        if self.fail.contains(hook) {
            return Err(ShellError::Controller {
                id: self.id.clone(),
                message: format!("{hook} refused"),
            });
        }
        Ok(())
    }
}

impl Controller for RecordingController {
    fn init(&mut self, _ctx: &mut ShellContext<'_>) -> Result<(), ShellError> {
        self.hook("init")
    }

    fn on_launch(&mut self, _ctx: &mut ShellContext<'_>) -> Result<(), ShellError> {
        self.hook("launch")
    }

    fn finish_init(&mut self, _ctx: &mut ShellContext<'_>) -> Result<(), ShellError> {
        self.hook("finish")
    }

    fn on_destroy(&mut self, _ctx: &mut ShellContext<'_>) -> Result<(), ShellError> {
        self.hook("destroy")
    }
}

/// Builtin factory whose fallback builds recording controllers.
pub fn recording_factory(journal: &Journal) -> ControllerFactory {
    failing_factory(journal, &[])
}

/// Like [`recording_factory`], but the listed hooks return errors.
pub fn failing_factory(journal: &Journal, fail: &[&'static str]) -> ControllerFactory {
    let journal = journal.clone();
    let fail = Rc::new(fail.iter().copied().collect::<HashSet<_>>());
    ControllerFactory::builtin().with_fallback(move |id| {
        Box::new(RecordingController {
            id: id.to_string(),
            journal: journal.clone(),
            fail: fail.clone(),
        })
    })
}

pub fn journal() -> Journal {
    Rc::new(RefCell::new(Vec::new()))
}

pub fn take(journal: &Journal) -> Vec<String> {
    journal.borrow_mut().drain(..).collect()
}
