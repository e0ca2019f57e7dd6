//! Authentication state trait and macro.

use super::cookie::CookieSettings;
use crate::jwt::TokenCodec;

/// Trait for state types that provide token verification and cookie
/// settings for authentication.
pub trait HasAuthBackend {
    fn codec(&self) -> &TokenCodec;
    fn cookies(&self) -> &CookieSettings;
}

/// Macro to implement `HasAuthBackend` for state structs with the standard fields.
///
/// The struct must have these fields:
/// - `codec: Arc<TokenCodec>`
/// - `cookies: CookieSettings`
///
/// # Example
/// ```ignore
/// use crate::impl_has_auth_backend;
///
/// #[derive(Clone)]
/// pub struct MyState {
///     pub codec: Arc<TokenCodec>,
///     pub cookies: CookieSettings,
///     // ... other fields
/// }
///
/// impl_has_auth_backend!(MyState);
/// ```
#[macro_export]
macro_rules! impl_has_auth_backend {
    ($state_type:ty) => {
        impl $crate::auth::HasAuthBackend for $state_type {
            fn codec(&self) -> &$crate::jwt::TokenCodec {
                &self.codec
            }
            fn cookies(&self) -> &$crate::auth::CookieSettings {
                &self.cookies
            }
        }
    };
}
