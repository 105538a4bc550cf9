use std::cell::RefCell;

use regex::Regex;
use serde_json::Value;

use crate::ipc::DocumentId;

/// Session-local view of the document currently open in the editor pane.
/// The core process owns the content; the shell only tracks identity and
/// the counters it needs for popups and the status line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentInfo {
    pub id: DocumentId,
    pub title: String,
    pub words: u64,
    pub chars: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOp {
    Next { term: String, regex: bool },
    Replace {
        term: String,
        replacement: String,
        all: bool,
    },
}

/// Editor collaborator: current-document query, search/replace, and a
/// generic command hook for one-shot editing actions (formatting markers,
/// tag searches).
pub trait Editor {
    fn current_document(&self) -> Option<DocumentInfo>;
    fn search(&self, op: SearchOp);
    fn dispatch_command(&self, name: &str, payload: Value);
}

/// Production editor pane. Search terms flagged as regex are compiled up
/// front; an invalid pattern drops the operation with a log line instead of
/// reaching the search machinery.
#[derive(Default)]
pub struct EditorPane {
    current: RefCell<Option<DocumentInfo>>,
    last_search: RefCell<Option<SearchOp>>,
    commands: RefCell<Vec<(String, Value)>>,
}

impl EditorPane {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_current(&self, doc: Option<DocumentInfo>) {
        *self.current.borrow_mut() = doc;
    }

    pub fn last_search(&self) -> Option<SearchOp> {
        self.last_search.borrow().clone()
    }

    /// Commands dispatched so far, oldest first
    pub fn commands(&self) -> Vec<(String, Value)> {
        self.commands.borrow().clone()
    }
}

impl Editor for EditorPane {
    fn current_document(&self) -> Option<DocumentInfo> {
        self.current.borrow().clone()
    }

    fn search(&self, op: SearchOp) {
        if let SearchOp::Next { term, regex: true } = &op {
            if let Err(err) = Regex::new(term) {
                log::warn!("invalid search pattern {term:?}: {err}");
                return;
            }
        }
        log::debug!("editor search: {op:?}");
        *self.last_search.borrow_mut() = Some(op);
    }

    fn dispatch_command(&self, name: &str, payload: Value) {
        log::debug!("editor command {name}: {payload}");
        self.commands.borrow_mut().push((name.to_string(), payload));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_regex_search_is_dropped() {
        let pane = EditorPane::new();
        pane.search(SearchOp::Next {
            term: "[unclosed".into(),
            regex: true,
        });
        assert!(pane.last_search().is_none());

        pane.search(SearchOp::Next {
            term: "[unclosed".into(),
            regex: false,
        });
        assert!(pane.last_search().is_some());
    }

    #[test]
    fn commands_are_recorded_in_order() {
        let pane = EditorPane::new();
        pane.dispatch_command("insert-marker", Value::String("**".into()));
        pane.dispatch_command("insert-marker", Value::String("*".into()));
        let names: Vec<String> = pane.commands().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["insert-marker", "insert-marker"]);
    }
}
