/// Liveness probe handler.
///
/// Returns "OK" while the process is serving. Does not touch the key store.
pub async fn health_check() -> &'static str {
    "OK"
}
