//! Logging helpers
//!
//! Library code reports diagnostics through these wrappers so the output
//! format stays under the control of the subscriber installed in `main`.

pub fn debug(message: impl AsRef<str>) {
    tracing::debug!("{}", message.as_ref());
}

pub fn info(message: impl AsRef<str>) {
    tracing::info!("{}", message.as_ref());
}

pub fn warn(message: impl AsRef<str>) {
    tracing::warn!("{}", message.as_ref());
}
