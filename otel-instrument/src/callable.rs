//! The uniform calling convention for instrumentation targets.

/// A callable taking its arguments as a tuple.
///
/// This is the calling convention the wrappers preserve: a wrapped callable
/// implements `Callable<Args>` with the same `Args` and `Output` as the
/// original. Implementations are provided for `Fn` closures and function
/// pointers of up to eight arguments.
///
/// ```
/// use otel_instrument::Callable;
///
/// fn add(a: i64, b: i64) -> i64 {
///     a + b
/// }
/// assert_eq!(add.call((40, 2)), 42);
/// ```
pub trait Callable<Args> {
    /// The callable's return type.
    type Output;

    /// Invokes the callable with the given argument tuple.
    fn call(&self, args: Args) -> Self::Output;
}

macro_rules! impl_callable {
    ($($ty:ident $arg:ident),*) => {
        impl<F, R, $($ty),*> Callable<($($ty,)*)> for F
        where
            F: Fn($($ty),*) -> R,
        {
            type Output = R;

            fn call(&self, ($($arg,)*): ($($ty,)*)) -> R {
                self($($arg),*)
            }
        }
    };
}

impl_callable!();
impl_callable!(A1 a1);
impl_callable!(A1 a1, A2 a2);
impl_callable!(A1 a1, A2 a2, A3 a3);
impl_callable!(A1 a1, A2 a2, A3 a3, A4 a4);
impl_callable!(A1 a1, A2 a2, A3 a3, A4 a4, A5 a5);
impl_callable!(A1 a1, A2 a2, A3 a3, A4 a4, A5 a5, A6 a6);
impl_callable!(A1 a1, A2 a2, A3 a3, A4 a4, A5 a5, A6 a6, A7 a7);
impl_callable!(A1 a1, A2 a2, A3 a3, A4 a4, A5 a5, A6 a6, A7 a7, A8 a8);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closures_and_fn_items_are_callable() {
        let double = |x: i64| x * 2;
        assert_eq!(double.call((21,)), 42);

        fn concat(a: &str, b: &str) -> String {
            format!("{a}{b}")
        }
        assert_eq!(concat.call(("foo", "bar")), "foobar");

        let nullary = || 7;
        assert_eq!(nullary.call(()), 7);
    }
}
