//! Strategy activity logging.
//!
//! Events go to the `commerce_gateway` and `commerce_shipping` targets. The
//! subscriber decides whether those targets are on, so a disabled debug flag
//! costs one filter check per call.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const GATEWAY_TARGET: &str = "commerce_gateway";
pub const SHIPPING_TARGET: &str = "commerce_shipping";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

macro_rules! emit {
    ($target:literal, $owner_field:ident, $level:expr, $owner:expr, $message:expr, $context:expr) => {
        match $level {
            LogLevel::Debug => {
                tracing::debug!(target: $target, $owner_field = %$owner, context = %$context, "{}", $message)
            }
            LogLevel::Info => {
                tracing::info!(target: $target, $owner_field = %$owner, context = %$context, "{}", $message)
            }
            LogLevel::Warn => {
                tracing::warn!(target: $target, $owner_field = %$owner, context = %$context, "{}", $message)
            }
            LogLevel::Error => {
                tracing::error!(target: $target, $owner_field = %$owner, context = %$context, "{}", $message)
            }
        }
    };
}

pub(crate) fn gateway_event(level: LogLevel, gateway: &str, message: &str, context: &Value) {
    emit!("commerce_gateway", gateway, level, gateway, message, context);
}

pub(crate) fn shipping_event(level: LogLevel, method: &str, message: &str, context: &Value) {
    emit!("commerce_shipping", method, level, method, message, context);
}
