//! Execution tracing.
//!
//! The executor reports every pipeline stage to an optional
//! [`StepObserver`]. Steps nest: a subquery evaluated while a `where` step is
//! open shows up as a child of that step.

use serde::Serialize;

use crate::ast::SourceRange;
use crate::table::Table;

/// Receives pipeline steps as they are entered and left.
pub trait StepObserver {
    /// A step starts. `before` is the table the step consumes, if any.
    fn open_step(&mut self, name: &str, range: SourceRange, before: Option<&Table>);

    /// The innermost open step finished. `after` is None when it failed.
    fn close_step(&mut self, after: Option<&Table>);
}

/// One recorded pipeline step with its nested steps.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceStep {
    pub name: String,
    pub range: SourceRange,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub before: Option<Table>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub after: Option<Table>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub steps: Vec<TraceStep>,
}

/// Observer that keeps every step as a tree of snapshots.
#[derive(Debug, Default)]
pub struct TraceRecorder {
    open: Vec<TraceStep>,
    roots: Vec<TraceStep>,
}

impl TraceRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Finish recording and return the top-level steps. Steps still open
    /// (the query failed inside them) are closed without a result.
    pub fn finish(mut self) -> Vec<TraceStep> {
        while !self.open.is_empty() {
            self.close_step(None);
        }
        self.roots
    }
}

impl StepObserver for TraceRecorder {
    fn open_step(&mut self, name: &str, range: SourceRange, before: Option<&Table>) {
        self.open.push(TraceStep {
            name: name.to_string(),
            range,
            before: before.cloned(),
            after: None,
            steps: Vec::new(),
        });
    }

    fn close_step(&mut self, after: Option<&Table>) {
        let Some(mut step) = self.open.pop() else {
            return;
        };
        step.after = after.cloned();
        match self.open.last_mut() {
            Some(parent) => parent.steps.push(step),
            None => self.roots.push(step),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recorder_nests_steps() {
        let mut recorder = TraceRecorder::new();
        recorder.open_step("query", SourceRange::new(0, 10), None);
        recorder.open_step("where", SourceRange::new(5, 10), Some(&Table::seed()));
        recorder.close_step(Some(&Table::new()));
        recorder.close_step(Some(&Table::seed()));

        let steps = recorder.finish();
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].name, "query");
        assert_eq!(steps[0].steps.len(), 1);
        assert_eq!(steps[0].steps[0].name, "where");
        assert_eq!(steps[0].steps[0].before, Some(Table::seed()));
        assert_eq!(steps[0].steps[0].after, Some(Table::new()));
    }

    #[test]
    fn test_finish_closes_open_steps() {
        let mut recorder = TraceRecorder::new();
        recorder.open_step("query", SourceRange::new(0, 3), None);
        recorder.open_step("from", SourceRange::new(1, 3), None);

        let steps = recorder.finish();
        assert_eq!(steps.len(), 1);
        assert!(steps[0].after.is_none());
        assert_eq!(steps[0].steps[0].name, "from");
    }

    #[test]
    fn test_serialize_skips_empty_parts() {
        let step = TraceStep {
            name: "limit".to_string(),
            range: SourceRange::new(1, 2),
            before: None,
            after: None,
            steps: Vec::new(),
        };
        let json = serde_json::to_value(&step).unwrap();
        assert_eq!(json, serde_json::json!({"name": "limit", "range": {"start": 1, "end": 2}}));
    }
}
