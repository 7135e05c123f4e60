/// Calls a function with its arguments packed in a tuple.
///
/// Implemented for every `Fn` of arity 0 through 8, so `Profiled::call((a, b))`
/// forwards to `f(a, b)`.
pub trait Invoke<Args> {
    type Output;

    fn invoke(&self, args: Args) -> Self::Output;
}

macro_rules! impl_invoke {
    ($($ty:ident),*) => {
        #[allow(non_snake_case)]
        impl<Func, Out, $($ty,)*> Invoke<($($ty,)*)> for Func
        where
            Func: Fn($($ty),*) -> Out,
        {
            type Output = Out;

            fn invoke(&self, ($($ty,)*): ($($ty,)*)) -> Out {
                (self)($($ty),*)
            }
        }
    };
}

impl_invoke!();
impl_invoke!(A1);
impl_invoke!(A1, A2);
impl_invoke!(A1, A2, A3);
impl_invoke!(A1, A2, A3, A4);
impl_invoke!(A1, A2, A3, A4, A5);
impl_invoke!(A1, A2, A3, A4, A5, A6);
impl_invoke!(A1, A2, A3, A4, A5, A6, A7);
impl_invoke!(A1, A2, A3, A4, A5, A6, A7, A8);

/// Best-effort name of a callable, from its type name.
///
/// Named fn items yield their last path segment with generic arguments
/// stripped. Closures, fn pointers and trait objects yield `None`.
pub(crate) fn callable_name<F: ?Sized>() -> Option<String> {
    let full = std::any::type_name::<F>();
    if full.contains("{{closure}}") || full.contains("dyn ") {
        return None;
    }

    let mut depth = 0usize;
    let mut segment_start = 0;
    let bytes = full.as_bytes();
    for (i, &b) in bytes.iter().enumerate() {
        match b {
            b'<' | b'(' => depth += 1,
            b'>' | b')' => depth = depth.saturating_sub(1),
            b':' if depth == 0 && bytes.get(i + 1) == Some(&b':') => segment_start = i + 2,
            _ => {}
        }
    }

    let segment = &full[segment_start.min(full.len())..];
    let name = segment.split('<').next().unwrap_or(segment);
    let is_ident = name
        .chars()
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_')
        && name.chars().all(|c| c.is_alphanumeric() || c == '_');

    is_ident.then(|| name.to_string())
}
