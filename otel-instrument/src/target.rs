//! Static metadata describing an instrumentation target.

/// Code-location metadata for a wrapped callable.
///
/// An `FnTarget` is captured once, at configuration time, and read on every
/// span creation to populate the `code.*` semantic attributes and to feed
/// the naming scheme. The [`fn_target!`] macro captures the enclosing
/// module path, file, and line automatically:
///
/// ```
/// use otel_instrument::{fn_target, FnTarget};
///
/// let target: FnTarget = fn_target!("Handler::fetch");
/// assert_eq!(target.qualified_name(), "Handler::fetch");
/// ```
///
/// [`fn_target!`]: crate::fn_target
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FnTarget {
    module_path: &'static str,
    qualified_name: &'static str,
    file: &'static str,
    line: u32,
}

impl FnTarget {
    /// Creates target metadata from its parts.
    ///
    /// `qualified_name` is the name of the callable within its module,
    /// including any enclosing type (`"Handler::fetch"`); the module path
    /// itself goes in `module_path`.
    pub const fn new(
        module_path: &'static str,
        qualified_name: &'static str,
        file: &'static str,
        line: u32,
    ) -> Self {
        FnTarget {
            module_path,
            qualified_name,
            file,
            line,
        }
    }

    /// The module path the callable is defined in.
    pub fn module_path(&self) -> &'static str {
        self.module_path
    }

    /// The callable's name, qualified by its enclosing scopes but not its
    /// module.
    pub fn qualified_name(&self) -> &'static str {
        self.qualified_name
    }

    /// The source file the callable is defined in.
    pub fn file(&self) -> &'static str {
        self.file
    }

    /// The source line the callable starts on.
    pub fn line(&self) -> u32 {
        self.line
    }
}

/// Captures an [`FnTarget`] for the given qualified name at the use site.
///
/// Module path, file, and line are taken from the invocation location.
#[macro_export]
macro_rules! fn_target {
    ($qualified_name:expr) => {
        $crate::FnTarget::new(
            ::core::module_path!(),
            $qualified_name,
            ::core::file!(),
            ::core::line!(),
        )
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn captures_use_site_metadata() {
        let target = fn_target!("probe");
        assert_eq!(target.module_path(), module_path!());
        assert_eq!(target.qualified_name(), "probe");
        assert!(target.file().ends_with("target.rs"));
        assert!(target.line() > 0);
    }
}
