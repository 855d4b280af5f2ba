pub mod errors;
pub mod toasts;

pub use errors::{ConfigError, PortalError};
pub use toasts::{Toast, ToastLevel, ToastQueue};

pub type Result<T> = std::result::Result<T, PortalError>;
