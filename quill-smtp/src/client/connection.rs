//! The byte stream under an SMTP session, plain or TLS.

use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
};
use tokio_rustls::client::TlsStream;

use quill_common::{config::TlsSettings, tracing};

use super::{
    error::{ClientError, Result},
    tls,
};

pub(crate) enum ClientConnection {
    Plain(TcpStream),
    Tls(Box<TlsStream<TcpStream>>),
}

impl ClientConnection {
    /// Wrap a freshly connected socket in TLS before anything is exchanged.
    pub(crate) async fn tls(stream: TcpStream, settings: &TlsSettings, host: &str) -> Result<Self> {
        Self::Plain(stream).upgrade(settings, host).await
    }

    pub(crate) const fn is_encrypted(&self) -> bool {
        matches!(self, Self::Tls(_))
    }

    pub(crate) async fn send(&mut self, data: &[u8]) -> Result<()> {
        match self {
            Self::Plain(stream) => {
                stream.write_all(data).await?;
                stream.flush().await?;
            }
            Self::Tls(stream) => {
                stream.write_all(data).await?;
                stream.flush().await?;
            }
        }
        Ok(())
    }

    pub(crate) async fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let n = match self {
            Self::Plain(stream) => stream.read(buf).await?,
            Self::Tls(stream) => stream.read(buf).await?,
        };
        if n == 0 {
            return Err(ClientError::ConnectionClosed);
        }
        Ok(n)
    }

    /// Run the TLS handshake over a plain connection.
    pub(crate) async fn upgrade(self, settings: &TlsSettings, host: &str) -> Result<Self> {
        match self {
            Self::Plain(stream) => {
                let (connector, server_name) = tls::connector_for(settings, host)?;

                let stream = connector
                    .connect(server_name, stream)
                    .await
                    .map_err(|e| ClientError::TlsError(e.to_string()))?;

                if let Some(protocol) = stream.get_ref().1.protocol_version() {
                    tracing::debug!(?protocol, host, "TLS established");
                }

                Ok(Self::Tls(Box::new(stream)))
            }
            Self::Tls(_) => Err(ClientError::TlsError("Connection is already TLS".to_string())),
        }
    }
}
