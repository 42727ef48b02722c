// Client-side error types.
//
// `TransportError` is anything that stops a message reaching the server.
// `ClientError` adds the requests the controller refuses to send because
// the replica says they cannot succeed (no user id yet, not in a lobby).
// Rejections from the server are not errors here: they arrive as
// `error` messages and surface as `SessionChange::Rejected`.

use flow_pvp_protocol::FramingError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connect failed: {0}")]
    Connect(#[source] std::io::Error),
    #[error("send failed: {0}")]
    Send(#[from] FramingError),
    #[error("connection closed")]
    Closed,
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("no user id yet; request one first")]
    NoUserId,
    #[error("not in a lobby")]
    NotInLobby,
}
