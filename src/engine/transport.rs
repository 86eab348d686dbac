use crate::error::SmppResult;
use bytes::Bytes;

/// The byte sink the engine writes encoded PDUs to.
///
/// Reads flow the other way: whoever owns the socket feeds received bytes
/// into `SmppEngine::data_received`.
pub trait Transport: Send {
    fn write(&mut self, data: Bytes) -> SmppResult<()>;

    /// Close the underlying connection. Called at most once per connection.
    fn lose_connection(&mut self);
}
