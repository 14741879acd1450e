// Copyright 2026 the MetaFFI CDTS Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use crate::resolver::{DefaultLabelResolver, LabelResolver, default_array_label};
use cdts::trace::{ScopeKind, TraceMask, TraceSink};
use cdts::{MetaffiType, SerError};
use std::string::String;
use std::vec::Vec;

type BackendGuard = tracy_client::Span;

struct ScopeEntry {
    kind: ScopeKind,
    depth: usize,
    // Owned for as long as the zone it names is open.
    label: String,
    _guard: Option<BackendGuard>,
}

/// A `TraceSink` that emits Tracy zones via `tracy-client`.
///
/// Each open array becomes a zone; failed operations become messages. Errors are also counted so
/// callers without a Tracy client can still see them.
pub struct ProfilingTraceSink<R = DefaultLabelResolver> {
    resolver: R,
    stack: Vec<ScopeEntry>,
    errors: usize,
}

impl ProfilingTraceSink<DefaultLabelResolver> {
    /// Create a new sink with tag-based labels.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl<R: LabelResolver> ProfilingTraceSink<R> {
    /// Create a new sink that names array zones with `resolver`.
    #[must_use]
    pub fn with_resolver(resolver: R) -> Self {
        Self {
            resolver,
            stack: Vec::new(),
            errors: 0,
        }
    }

    /// Number of array zones currently open.
    #[must_use]
    pub fn open_scopes(&self) -> usize {
        self.stack.len()
    }

    /// Number of failed operations seen.
    #[must_use]
    pub fn errors(&self) -> usize {
        self.errors
    }

    fn on_scope_enter(&mut self, kind: ScopeKind, depth: usize, element_type: MetaffiType) {
        let label = self
            .resolver
            .array_label(kind, element_type)
            .unwrap_or_else(|| default_array_label(kind, element_type));
        let guard = start_scope(kind, &label, depth);
        self.stack.push(ScopeEntry {
            kind,
            depth,
            label,
            _guard: guard,
        });
    }

    fn on_scope_exit(&mut self, kind: ScopeKind, depth: usize) {
        self.close_deeper_than(depth);
        if let Some(top) = self.stack.last()
            && top.kind == kind
            && top.depth == depth
        {
            self.stack.pop();
            return;
        }
        // Exits out of step with the enters seen; close everything.
        self.close_deeper_than(0);
    }

    // Pops in LIFO order so nested zones close inner-to-outer.
    fn close_deeper_than(&mut self, depth: usize) {
        while self.stack.last().is_some_and(|entry| entry.depth > depth) {
            self.stack.pop();
        }
    }
}

fn start_scope(kind: ScopeKind, label: &str, depth: usize) -> Option<BackendGuard> {
    let function_name = match kind {
        ScopeKind::Write => "cdts.add_array",
        ScopeKind::Read => "cdts.get_array",
    };
    let line = u32::try_from(depth).unwrap_or(u32::MAX);
    let client = tracy_client::Client::running()?;
    Some(client.span_alloc(Some(label), function_name, "cdts", line, 0))
}

impl<R: LabelResolver> TraceSink for ProfilingTraceSink<R> {
    fn mask(&self) -> TraceMask {
        TraceMask::ARRAY | TraceMask::ERROR
    }

    fn scope_enter(
        &mut self,
        kind: ScopeKind,
        depth: usize,
        _length: usize,
        element_type: MetaffiType,
    ) {
        self.on_scope_enter(kind, depth, element_type);
    }

    fn scope_exit(&mut self, kind: ScopeKind, depth: usize) {
        self.on_scope_exit(kind, depth);
    }

    fn scopes_unwound(&mut self, depth: usize) {
        self.close_deeper_than(depth);
    }

    fn error(&mut self, op: &'static str, depth: usize, error: &SerError) {
        self.errors += 1;
        if let Some(client) = tracy_client::Client::running() {
            client.message(&format!("cdts.{op} failed at depth {depth}: {error}"), 0);
        }
    }
}

impl<R> Default for ProfilingTraceSink<R>
where
    R: LabelResolver + Default,
{
    fn default() -> Self {
        Self::with_resolver(R::default())
    }
}

impl<R> std::fmt::Debug for ProfilingTraceSink<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProfilingTraceSink")
            .field("stack_depth", &self.stack.len())
            .field("innermost", &self.stack.last().map(|e| e.label.as_str()))
            .field("errors", &self.errors)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::{ProfilingTraceSink, start_scope};
    use crate::TypeNameResolver;
    use cdts::trace::{ScopeKind, TraceSink};
    use cdts::{Cdts, MetaffiType, Serializer};

    #[test]
    fn array_zone_is_skipped_when_no_client_runs() {
        assert!(start_scope(ScopeKind::Write, "test", 0).is_none());
    }

    #[test]
    fn scopes_follow_the_array_stack() {
        let mut sink = ProfilingTraceSink::with_resolver(TypeNameResolver::default());
        let mut data = Cdts::new(1);
        let mut ser = Serializer::new(&mut data).with_sink(&mut sink);
        ser.add_array_begin(1, MetaffiType::INT8).unwrap();
        ser.add_array_begin(0, MetaffiType::INT8).unwrap();
        ser.add_array_end().unwrap();
        assert!(ser.add_array_end().is_ok());
        assert!(ser.add_int8(1).is_err());
        drop(ser);
        assert_eq!(sink.open_scopes(), 0);
        assert_eq!(sink.errors(), 1);
    }

    #[test]
    fn reset_closes_open_zones() {
        let mut sink = ProfilingTraceSink::new();
        let mut data = Cdts::new(1);
        let mut ser = Serializer::new(&mut data).with_sink(&mut sink);
        ser.add_array_begin(1, MetaffiType::INT8).unwrap();
        ser.add_array_begin(1, MetaffiType::INT8).unwrap();
        ser.reset();
        let cursor = ser.into_cursor();
        assert_eq!(cursor.depth(), 0);
        assert_eq!(sink.open_scopes(), 0);
    }

    #[test]
    fn unwinding_keeps_outer_zones() {
        let mut sink = ProfilingTraceSink::new();
        for depth in 1..=3 {
            sink.on_scope_enter(ScopeKind::Write, depth, MetaffiType::INT8);
        }
        sink.scopes_unwound(1);
        assert_eq!(sink.open_scopes(), 1);
        sink.scope_exit(ScopeKind::Write, 1);
        assert_eq!(sink.open_scopes(), 0);
    }

    #[test]
    fn out_of_sync_exit_closes_everything() {
        let mut sink = ProfilingTraceSink::new();
        sink.on_scope_enter(ScopeKind::Read, 1, MetaffiType::INT8);
        sink.on_scope_enter(ScopeKind::Read, 2, MetaffiType::INT8);
        sink.on_scope_exit(ScopeKind::Write, 2);
        assert_eq!(sink.open_scopes(), 0);
    }
}
