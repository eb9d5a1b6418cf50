//! # Message Channel
//!
//! The client talks to the Cortex service through a [`Channel`]: an ordered,
//! bidirectional stream of text frames. [`WsChannel`] is the production
//! implementation over `tokio-tungstenite`.
//!
//! ## TLS Note
//!
//! The Cortex service runs at `wss://localhost:6868` with a self-signed
//! certificate. For localhost URLs (or when `allow_insecure_tls` is set)
//! the channel installs a `rustls` verifier that accepts any server
//! certificate while still checking handshake signatures. Every other
//! `wss://` URL is verified against the webpki roots.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::{CryptoProvider, aws_lc_rs, verify_tls12_signature, verify_tls13_signature};
use rustls::{ClientConfig, DigitallySignedStruct, SignatureScheme};
use rustls_pki_types::{CertificateDer, ServerName, UnixTime};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{Connector, MaybeTlsStream, WebSocketStream, connect_async_tls_with_config};

use crate::config::RoverConfig;
use crate::error::{CortexError, CortexResult};

/// Ordered bidirectional text channel to the Cortex service.
///
/// `recv` yields the next text frame; non-text frames are the
/// implementation's business. A closed channel reports
/// [`CortexError::ConnectionLost`].
pub trait Channel: Send {
    /// Send one text frame.
    fn send(&mut self, text: String) -> impl Future<Output = CortexResult<()>> + Send;

    /// Wait for the next text frame.
    fn recv(&mut self) -> impl Future<Output = CortexResult<String>> + Send;

    /// Close the channel. Closing twice is not an error.
    fn close(&mut self) -> impl Future<Output = CortexResult<()>> + Send;
}

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// WebSocket channel to the Cortex service.
pub struct WsChannel {
    stream: WsStream,
    closed: bool,
}

impl WsChannel {
    /// Open a WebSocket connection using the URL, TLS and connect-timeout
    /// settings from `config`.
    pub async fn connect(config: &RoverConfig) -> CortexResult<Self> {
        let url = config.cortex_url.clone();
        let connect_timeout = Duration::from_secs(config.timeouts.connect_timeout_secs);

        let connector = if url.starts_with("wss://") && config.should_accept_invalid_certs() {
            tracing::debug!(url, "Accepting self-signed certificates for this endpoint");
            Some(Connector::Rustls(Arc::new(insecure_client_config()?)))
        } else {
            None
        };

        let connect_fut = connect_async_tls_with_config(url.as_str(), None, true, connector);

        let (stream, response) = tokio::time::timeout(connect_timeout, connect_fut)
            .await
            .map_err(|_| CortexError::Timeout {
                waited: connect_timeout,
            })?
            .map_err(|e| CortexError::ConnectionFailed {
                url: url.clone(),
                reason: format!("WebSocket connection failed: {e}"),
            })?;

        tracing::info!(url, status = %response.status(), "Connected to Cortex API");

        Ok(Self {
            stream,
            closed: false,
        })
    }
}

impl Channel for WsChannel {
    async fn send(&mut self, text: String) -> CortexResult<()> {
        if self.closed {
            return Err(CortexError::ConnectionLost {
                reason: "channel already closed".into(),
            });
        }
        self.stream
            .send(Message::Text(text.into()))
            .await
            .map_err(|e| CortexError::WebSocket(format!("Send error: {e}")))
    }

    async fn recv(&mut self) -> CortexResult<String> {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => {
                    tracing::trace!(raw = %text, "Received frame");
                    return Ok(text.as_str().to_owned());
                }
                Some(Ok(Message::Close(frame))) => {
                    tracing::info!(?frame, "Cortex WebSocket closed by server");
                    self.closed = true;
                    return Err(CortexError::ConnectionLost {
                        reason: "Cortex WebSocket closed".into(),
                    });
                }
                Some(Ok(_)) => {
                    // Binary frames, pings, pongs
                }
                Some(Err(e)) => {
                    tracing::warn!(error = %e, "WebSocket read error");
                    return Err(e.into());
                }
                None => {
                    self.closed = true;
                    return Err(CortexError::ConnectionLost {
                        reason: "Cortex WebSocket stream ended".into(),
                    });
                }
            }
        }
    }

    async fn close(&mut self) -> CortexResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        if let Err(e) = self.stream.close(None).await {
            tracing::debug!(error = %e, "WebSocket close handshake failed");
        }
        Ok(())
    }
}

// ─── TLS ────────────────────────────────────────────────────────────────

fn insecure_client_config() -> CortexResult<ClientConfig> {
    let provider = Arc::new(aws_lc_rs::default_provider());
    let config = ClientConfig::builder_with_provider(Arc::clone(&provider))
        .with_safe_default_protocol_versions()?
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(AcceptAnyServerCert { provider }))
        .with_no_client_auth();
    Ok(config)
}

/// Accepts any server certificate. Handshake signatures are still verified
/// with the provider's algorithms.
#[derive(Debug)]
struct AcceptAnyServerCert {
    provider: Arc<CryptoProvider>,
}

impl ServerCertVerifier for AcceptAnyServerCert {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls12_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls13_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider
            .signature_verification_algorithms
            .supported_schemes()
    }
}
