//! Process-level hook registration.
//!
//! The classification core treats registration as an external concern; this
//! module is that adapter: it wires the panic hook and process-termination
//! report to a [`FaultHandler`] handle.

use std::panic;
use std::sync::Arc;

use faultline::{FaultHandler, LogSink};

use crate::stderr::GcpStderrSink;

/// Replaces the global panic hook with one that reports the panic as an
/// uncaught exception, then chains to the previous hook.
pub fn install_panic_hook(handler: Arc<FaultHandler>) {
    let previous = panic::take_hook();

    panic::set_hook(Box::new(move |info| {
        let message = payload_message(info.payload());
        let (file, line) = match info.location() {
            Some(location) => (location.file(), location.line()),
            None => ("", 0),
        };

        handler.on_exception(message, file, line);
        previous(info);
    }));

    tracing::debug!("panic hook installed");
}

fn payload_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}

/// Reports the process-termination signal when dropped.
///
/// Hold it for the life of the process, typically bound at the bottom of
/// `main`. Fatal residue recorded on the handler is re-reported at drop;
/// everything else is dropped silently.
pub struct ShutdownGuard {
    handler: Arc<FaultHandler>,
}

impl ShutdownGuard {
    pub fn new(handler: Arc<FaultHandler>) -> ShutdownGuard {
        ShutdownGuard { handler }
    }

    pub fn handler(&self) -> &Arc<FaultHandler> {
        &self.handler
    }
}

impl Drop for ShutdownGuard {
    fn drop(&mut self) {
        self.handler.on_process_end();
    }
}

/// Wires the three interception points to the given sink: builds the
/// handler, installs the panic hook, and returns the handle plus the
/// shutdown guard.
///
/// Calling this again replaces the active handler for panics going
/// forward; hooks installed earlier keep their captured handle alive.
pub fn init(sink: Arc<dyn LogSink>) -> (Arc<FaultHandler>, ShutdownGuard) {
    let handler = Arc::new(FaultHandler::new(sink));
    install_panic_hook(handler.clone());
    (handler.clone(), ShutdownGuard::new(handler))
}

/// [`init`] defaulting to the stderr reference sink.
pub fn init_stderr() -> (Arc<FaultHandler>, ShutdownGuard) {
    init(Arc::new(GcpStderrSink::new()))
}
