//! Clock helpers

/// Milliseconds since the Unix epoch, read through chrono so the same code
/// runs on `wasm32-unknown-unknown`, where chrono uses the JavaScript clock.
pub fn now_ms() -> i64 {
  chrono::Utc::now().timestamp_millis()
}
