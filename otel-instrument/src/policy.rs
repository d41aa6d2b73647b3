//! Process-wide naming and default-attribute policy.
//!
//! The policy is shared, mutable, and read-mostly: it is expected to be
//! configured during application startup and read on every wrapped call.
//! Both halves live behind an `RwLock`, so concurrent configuration during
//! steady-state traffic is safe, with last-writer-wins semantics.

use std::sync::{LazyLock, RwLock};

use opentelemetry::KeyValue;

use crate::target::FnTarget;
use crate::{inst_debug, util};

type NamingScheme = Box<dyn Fn(&FnTarget) -> String + Send + Sync>;

static NAMING_SCHEME: LazyLock<RwLock<NamingScheme>> =
    LazyLock::new(|| RwLock::new(Box::new(default_naming_scheme)));

static DEFAULT_ATTRIBUTES: LazyLock<RwLock<Vec<KeyValue>>> =
    LazyLock::new(|| RwLock::new(Vec::new()));

/// The built-in naming scheme: the callable's fully qualified name, i.e.
/// its module path followed by its scope-qualified name.
pub fn default_naming_scheme(target: &FnTarget) -> String {
    format!("{}::{}", target.module_path(), target.qualified_name())
}

/// Replaces the process-wide function used to derive a span's display name
/// when no explicit `span_name` is given.
///
/// The scheme is resolved lazily, on every wrapped call, so a replacement
/// affects all subsequently *invoked* wrapped calls, including callables
/// that were wrapped before the replacement.
///
/// ```
/// use otel_instrument::policy;
///
/// policy::set_naming_scheme(|target| format!("app/{}", target.qualified_name()));
/// # policy::set_naming_scheme(policy::default_naming_scheme);
/// ```
pub fn set_naming_scheme<F>(scheme: F)
where
    F: Fn(&FnTarget) -> String + Send + Sync + 'static,
{
    let mut guard = match NAMING_SCHEME.write() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    *guard = Box::new(scheme);
    inst_debug!(name: "naming_scheme_replaced");
}

/// Merges the given key/value pairs into the process-wide default-attribute
/// table. Every span created by a wrapper afterwards carries these
/// attributes. Later writes win per key; an empty iterator is a no-op.
pub fn set_default_attributes<I>(attributes: I)
where
    I: IntoIterator<Item = KeyValue>,
{
    let mut guard = match DEFAULT_ATTRIBUTES.write() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    let mut added = 0usize;
    for attribute in attributes {
        util::merge_attribute(&mut guard, attribute);
        added += 1;
    }
    inst_debug!(name: "default_attributes_merged", count = added);
}

/// Applies the current naming scheme to `target`.
pub(crate) fn span_name_for(target: &FnTarget) -> String {
    let guard = match NAMING_SCHEME.read() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    guard(target)
}

/// Snapshot of the current default attributes.
pub(crate) fn default_attributes() -> Vec<KeyValue> {
    let guard = match DEFAULT_ATTRIBUTES.read() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    guard.clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fn_target;

    #[test]
    fn default_scheme_is_module_qualified() {
        let target = fn_target!("Handler::fetch");
        assert_eq!(
            default_naming_scheme(&target),
            format!("{}::Handler::fetch", module_path!())
        );
    }

    #[test]
    fn default_attributes_merge_last_writer_wins() {
        set_default_attributes([KeyValue::new("policy.test.env", "staging")]);
        set_default_attributes([KeyValue::new("policy.test.env", "prod")]);
        let merged = default_attributes();
        let values: Vec<_> = merged
            .iter()
            .filter(|kv| kv.key.as_str() == "policy.test.env")
            .collect();
        assert_eq!(values.len(), 1);
        assert_eq!(values[0].value.as_str(), "prod");
    }

    // The table is process-wide and other tests write to it concurrently,
    // so this checks a key nobody else uses rather than the table size.
    #[test]
    fn empty_update_is_a_noop() {
        let absent =
            || default_attributes().iter().all(|kv| kv.key.as_str() != "policy.test.phantom");
        assert!(absent());
        set_default_attributes([]);
        assert!(absent());
    }
}
