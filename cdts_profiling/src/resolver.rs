// Copyright 2026 the MetaFFI CDTS Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use cdts::MetaffiType;
use cdts::trace::ScopeKind;
use std::collections::HashMap;
use std::string::String;

/// Optional label resolver for array scopes.
///
/// Return `None` to fall back to the default tag-based labels.
pub trait LabelResolver {
    /// Resolve a label for an array scope.
    fn array_label(&mut self, _kind: ScopeKind, _element_type: MetaffiType) -> Option<String> {
        None
    }
}

/// Default resolver that keeps stable tag-based labels.
#[derive(Default, Debug)]
pub struct DefaultLabelResolver;

impl LabelResolver for DefaultLabelResolver {}

/// Resolver that names scopes after the array type, such as `write:metaffi_int32_array`.
#[derive(Default, Debug)]
pub struct TypeNameResolver {
    cache: HashMap<(ScopeKind, MetaffiType), String>,
}

impl LabelResolver for TypeNameResolver {
    fn array_label(&mut self, kind: ScopeKind, element_type: MetaffiType) -> Option<String> {
        if let Some(label) = self.cache.get(&(kind, element_type)) {
            return Some(label.clone());
        }
        let name = element_type.array_of().name()?;
        let label = format!("{}:{name}", direction(kind));
        self.cache.insert((kind, element_type), label.clone());
        Some(label)
    }
}

pub(crate) fn direction(kind: ScopeKind) -> &'static str {
    match kind {
        ScopeKind::Write => "write",
        ScopeKind::Read => "read",
    }
}

pub(crate) fn default_array_label(kind: ScopeKind, element_type: MetaffiType) -> String {
    format!("{}:array type={}", direction(kind), element_type.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_names_are_cached() {
        let mut r = TypeNameResolver::default();
        let label = r.array_label(ScopeKind::Write, MetaffiType::INT32);
        assert_eq!(label.as_deref(), Some("write:metaffi_int32_array"));
        assert_eq!(r.cache.len(), 1);
        assert_eq!(r.array_label(ScopeKind::Write, MetaffiType::INT32), label);
        assert_eq!(r.cache.len(), 1);
    }

    #[test]
    fn unknown_types_fall_back() {
        let mut r = TypeNameResolver::default();
        assert_eq!(r.array_label(ScopeKind::Read, MetaffiType(3)), None);
        assert_eq!(
            default_array_label(ScopeKind::Read, MetaffiType(3)),
            "read:array type=3"
        );
    }
}
