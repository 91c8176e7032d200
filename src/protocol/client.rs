//! Client for the bridge protocol
//!
//! `Client` sends one request at a time and waits for its response. Typed
//! methods unwrap the expected reply variant; [`Client::call`] exposes the raw
//! response for anything else, including the unsupported operations.

use super::messages::{BlockLocation, FileStatus, Reply, Request, Response};
use super::transport::{
    framed, recv_message, send_message, FrameLimits, FramedTransport, Transport,
};
use crate::error::RpcError;
use tokio::net::{TcpStream, ToSocketAddrs};

/// Connection to a bridge server
pub struct Client<T: Transport = TcpStream> {
    transport: FramedTransport<T>,
}

impl Client<TcpStream> {
    /// Connect over TCP
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established.
    pub async fn connect<A: ToSocketAddrs>(addr: A) -> Result<Self, RpcError> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        Ok(Self::from_transport(stream))
    }
}

impl<T: Transport> Client<T> {
    /// Speak the protocol over an already connected transport
    #[must_use]
    pub fn from_transport(transport: T) -> Self {
        Self {
            transport: framed(transport, FrameLimits::client()),
        }
    }

    /// Send `request` and wait for its response
    ///
    /// # Errors
    ///
    /// Returns an error only for transport failures; service failures are
    /// inside the returned [`Response`].
    pub async fn call(&mut self, request: Request) -> Result<Response, RpcError> {
        send_message(&mut self.transport, &request).await?;
        recv_message(&mut self.transport)
            .await?
            .ok_or(RpcError::ConnectionClosed)
    }

    async fn invoke(&mut self, request: Request) -> Result<Reply, RpcError> {
        Ok(self.call(request).await??)
    }

    /// Open `path` for reading
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails or the server rejects it.
    pub async fn open(&mut self, path: &str) -> Result<i64, RpcError> {
        match self.invoke(Request::Open { path: path.into() }).await? {
            Reply::Handle(handle) => Ok(handle),
            other => Err(unexpected("open", &other)),
        }
    }

    /// Create `path` for writing
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails or the server rejects it.
    pub async fn create(&mut self, path: &str) -> Result<i64, RpcError> {
        match self.invoke(Request::Create { path: path.into() }).await? {
            Reply::Handle(handle) => Ok(handle),
            other => Err(unexpected("create", &other)),
        }
    }

    /// Read up to `size` bytes at `offset`
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails or the server rejects it.
    pub async fn read(&mut self, handle: i64, offset: i64, size: i32) -> Result<Vec<u8>, RpcError> {
        let request = Request::Read {
            handle,
            offset,
            size,
        };
        match self.invoke(request).await? {
            Reply::Data(data) => Ok(data),
            other => Err(unexpected("read", &other)),
        }
    }

    /// Append `data` to a write handle; `false` for unknown handles
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails or the server rejects it.
    pub async fn write(&mut self, handle: i64, data: &[u8]) -> Result<bool, RpcError> {
        let request = Request::Write {
            handle,
            data: data.to_vec(),
        };
        match self.invoke(request).await? {
            Reply::Bool(written) => Ok(written),
            other => Err(unexpected("write", &other)),
        }
    }

    /// Release a read handle
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails.
    pub async fn close_read(&mut self, handle: i64) -> Result<bool, RpcError> {
        match self.invoke(Request::CloseReadHandle { handle }).await? {
            Reply::Bool(closed) => Ok(closed),
            other => Err(unexpected("closeReadHandle", &other)),
        }
    }

    /// Release a write handle
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails.
    pub async fn close_write(&mut self, handle: i64) -> Result<bool, RpcError> {
        match self.invoke(Request::CloseWriteHandle { handle }).await? {
            Reply::Bool(closed) => Ok(closed),
            other => Err(unexpected("closeWriteHandle", &other)),
        }
    }

    /// List `path`; `None` if it does not exist
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails or the server rejects it.
    pub async fn list_status(&mut self, path: &str) -> Result<Option<Vec<FileStatus>>, RpcError> {
        match self.invoke(Request::ListStatus { path: path.into() }).await? {
            Reply::Statuses(statuses) => Ok(statuses),
            other => Err(unexpected("listStatus", &other)),
        }
    }

    /// Block placement for a byte range of `path`
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails or the server rejects it.
    pub async fn get_file_block_locations(
        &mut self,
        path: &str,
        start: i64,
        length: i64,
    ) -> Result<Vec<BlockLocation>, RpcError> {
        let request = Request::GetFileBlockLocations {
            path: path.into(),
            start,
            length,
        };
        match self.invoke(request).await? {
            Reply::Blocks(blocks) => Ok(blocks),
            other => Err(unexpected("getFileBlockLocations", &other)),
        }
    }
}

fn unexpected(operation: &'static str, reply: &Reply) -> RpcError {
    RpcError::UnexpectedReply {
        operation,
        reply: format!("{reply:?}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServiceError;

    /// Answer every request on `server` with `response`
    async fn answer_with(server: tokio::io::DuplexStream, response: Response) {
        let mut server = framed(server, FrameLimits::default());
        while let Ok(Some(_request)) = recv_message::<_, Request>(&mut server).await {
            send_message(&mut server, &response).await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_service_error_surfaces() {
        let (client, server) = tokio::io::duplex(4096);
        tokio::spawn(answer_with(
            server,
            Err(ServiceError::UnknownHandle {
                kind: crate::HandleKind::Read,
                handle: 9,
            }),
        ));

        let mut client = Client::from_transport(client);
        let err = client.read(9, 0, 1).await.unwrap_err();
        assert!(matches!(
            err,
            RpcError::Service(ServiceError::UnknownHandle { handle: 9, .. })
        ));
    }

    #[tokio::test]
    async fn test_mismatched_reply_is_reported() {
        let (client, server) = tokio::io::duplex(4096);
        tokio::spawn(answer_with(server, Ok(Reply::Bool(true))));

        let mut client = Client::from_transport(client);
        let err = client.open("/a").await.unwrap_err();
        assert!(matches!(
            err,
            RpcError::UnexpectedReply {
                operation: "open",
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_hangup_is_connection_closed() {
        let (client, server) = tokio::io::duplex(4096);
        tokio::spawn(async move {
            let mut server = framed(server, FrameLimits::default());
            let _ = recv_message::<_, Request>(&mut server).await;
        });

        let mut client = Client::from_transport(client);
        let err = client.close_read(1).await.unwrap_err();
        assert!(matches!(err, RpcError::ConnectionClosed));
    }
}
