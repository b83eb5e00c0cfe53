// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Root trace record.

use serde::{Deserialize, Serialize};

use super::id::StepId;
use super::io::StepIO;
use super::span::Span;
use super::step::{HasChildren, StepData, StepType};

/// Root record of one end-to-end execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trace {
    #[serde(flatten)]
    pub step: StepData,

    #[serde(default)]
    pub spans: Vec<Span>,
}

impl Trace {
    pub fn new(input: StepIO) -> Self {
        Self {
            step: StepData::new(StepType::Trace, input),
            spans: Vec::new(),
        }
    }

    /// Total number of spans in the tree.
    pub fn span_count(&self) -> usize {
        self.iter_spans().count()
    }

    /// Depth-first, pre-order iterator over every span in the tree.
    pub fn iter_spans(&self) -> SpanIter<'_> {
        SpanIter {
            stack: self.spans.iter().rev().collect(),
        }
    }

    /// Find a span anywhere in the tree by id.
    pub fn find_span(&self, id: &StepId) -> Option<&Span> {
        self.iter_spans().find(|s| &s.step().id == id)
    }

    /// Mutable lookup of a span anywhere in the tree.
    pub fn find_span_mut(&mut self, id: &StepId) -> Option<&mut Span> {
        find_in(&mut self.spans, id)
    }
}

fn find_in<'a>(spans: &'a mut [Span], id: &StepId) -> Option<&'a mut Span> {
    for span in spans {
        if &span.step().id == id {
            return Some(span);
        }
        if let Some(container) = span.as_container_mut() {
            if let Some(found) = find_in(container.spans_mut(), id) {
                return Some(found);
            }
        }
    }
    None
}

impl HasChildren for Trace {
    fn step(&self) -> &StepData {
        &self.step
    }

    fn step_mut(&mut self) -> &mut StepData {
        &mut self.step
    }

    fn spans(&self) -> &[Span] {
        &self.spans
    }

    fn spans_mut(&mut self) -> &mut Vec<Span> {
        &mut self.spans
    }
}

/// Iterator returned by [`Trace::iter_spans`].
pub struct SpanIter<'a> {
    stack: Vec<&'a Span>,
}

impl<'a> Iterator for SpanIter<'a> {
    type Item = &'a Span;

    fn next(&mut self) -> Option<Self::Item> {
        let span = self.stack.pop()?;
        self.stack.extend(span.children().iter().rev());
        Some(span)
    }
}
