//! Plain-HTTP retailer login backing `slotbot_core::session::SessionProvider`.

pub mod form;
pub mod http;

pub use form::{FormError, LoginForm};
pub use http::{HttpSession, HttpSessionProvider, HttpSessionSettings, CSRF_HEADER};
