/// Errors surfaced by the fanout server's lifecycle. Per-client failures
/// (write errors, EOF, malformed packets) are not represented here: they
/// are handled locally by removing the offending client, never by
/// propagating an error out of the server (spec §7).
#[derive(Debug, thiserror::Error)]
pub enum FanoutError {
    #[error("failed to bind {addr}: {source}")]
    Bind { addr: std::net::SocketAddr, source: std::io::Error },
}
