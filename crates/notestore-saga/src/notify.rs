use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use tracing::warn;

/// Deliver a fire-and-forget notification to `receiver`.
///
/// A panic in the receiver is logged and swallowed so it cannot interrupt
/// the transaction that sent the notification.
pub fn notify_contained(receiver: &str, notify: impl FnOnce()) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(notify)) {
        warn!(
            receiver,
            panic = %panic_message(payload.as_ref()),
            "notification receiver panicked"
        );
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
