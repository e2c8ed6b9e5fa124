//! Helpers shared by the per-crate error enums.

use std::error::Error as StdError;

/// Boxed error used as a `#[source]` in crate error enums.
pub type BoxError = Box<dyn StdError + Send + Sync>;

/// Error types buildable from a message, optionally wrapping a cause.
pub trait FromMessage: Sized {
    fn from_message(message: String) -> Self;

    /// Wrap `source` under `context`. The default flattens both into a
    /// message; override it to keep the source chain.
    fn from_source(context: String, source: BoxError) -> Self {
        Self::from_message(format!("{context}: {source}"))
    }
}

/// Generate a crate-local `Context` trait adding `.context()` and
/// `.with_context()` to `Result` and `Option`.
///
/// The argument is the crate's error type, which must implement
/// [`FromMessage`]. Failed results keep their error as the source; empty
/// options become a plain message.
///
/// ```ignore
/// // in crates/foo/src/error.rs
/// skillet_common::impl_context!(Error);
/// ```
#[macro_export]
macro_rules! impl_context {
    ($error:ty) => {
        pub trait Context<T> {
            fn context(self, context: impl Into<String>) -> std::result::Result<T, $error>;

            fn with_context<C, F>(self, f: F) -> std::result::Result<T, $error>
            where
                C: Into<String>,
                F: FnOnce() -> C;
        }

        impl<T, E> Context<T> for std::result::Result<T, E>
        where
            E: std::error::Error + Send + Sync + 'static,
        {
            fn context(self, context: impl Into<String>) -> std::result::Result<T, $error> {
                self.map_err(|source| {
                    <$error as $crate::FromMessage>::from_source(context.into(), Box::new(source))
                })
            }

            fn with_context<C, F>(self, f: F) -> std::result::Result<T, $error>
            where
                C: Into<String>,
                F: FnOnce() -> C,
            {
                self.map_err(|source| {
                    <$error as $crate::FromMessage>::from_source(f().into(), Box::new(source))
                })
            }
        }

        impl<T> Context<T> for Option<T> {
            fn context(self, context: impl Into<String>) -> std::result::Result<T, $error> {
                self.ok_or_else(|| <$error as $crate::FromMessage>::from_message(context.into()))
            }

            fn with_context<C, F>(self, f: F) -> std::result::Result<T, $error>
            where
                C: Into<String>,
                F: FnOnce() -> C,
            {
                self.ok_or_else(|| <$error as $crate::FromMessage>::from_message(f().into()))
            }
        }
    };
}
