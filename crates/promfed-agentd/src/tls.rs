use std::{io, net::SocketAddr, sync::Arc, time::Duration};

use rustls::{
    RootCertStore, ServerConfig,
    crypto::{CryptoProvider, ring},
    pki_types::{CertificateDer, PrivateKeyDer},
    server::WebPkiClientVerifier,
};
use tokio::{
    net::{TcpListener, TcpStream},
    sync::mpsc,
    time::timeout,
};
use tokio_rustls::{TlsAcceptor, server::TlsStream};
use tracing::{debug, warn};

use promfed_model::TlsPem;

use crate::config::ConfigError;

const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);
const PENDING_CONNECTIONS: usize = 64;

/// Server-side TLS for the scrape endpoint.
///
/// Non-blank `ca_pool` entries become the trust roots for client certificates. Clients
/// without a certificate are still accepted.
pub fn server_config(identity: &TlsPem, ca_pool: &[String]) -> Result<Arc<ServerConfig>, ConfigError> {
    let provider = Arc::new(ring::default_provider());
    let chain = parse_certs(&identity.cert_chain)?;
    if chain.is_empty() {
        return Err(ConfigError::InvalidTls("no certificate in ssl_certificate.cert_chain".into()));
    }
    let key = parse_key(&identity.private_key)?;

    let builder = ServerConfig::builder_with_provider(Arc::clone(&provider))
        .with_safe_default_protocol_versions()
        .map_err(tls_error)?;

    let roots = client_roots(ca_pool)?;
    let builder = if roots.is_empty() {
        builder.with_no_client_auth()
    } else {
        let verifier = WebPkiClientVerifier::builder_with_provider(Arc::new(roots), provider)
            .allow_unauthenticated()
            .build()
            .map_err(tls_error)?;
        builder.with_client_cert_verifier(verifier)
    };

    let mut config = builder.with_single_cert(chain, key).map_err(tls_error)?;
    config.alpn_protocols = vec![b"http/1.1".to_vec()];
    Ok(Arc::new(config))
}

fn tls_error(e: impl std::fmt::Display) -> ConfigError {
    ConfigError::InvalidTls(e.to_string())
}

fn parse_certs(pem: &str) -> Result<Vec<CertificateDer<'static>>, ConfigError> {
    rustls_pemfile::certs(&mut pem.as_bytes())
        .collect::<Result<Vec<_>, _>>()
        .map_err(tls_error)
}

fn parse_key(pem: &str) -> Result<PrivateKeyDer<'static>, ConfigError> {
    rustls_pemfile::private_key(&mut pem.as_bytes())
        .map_err(tls_error)?
        .ok_or_else(|| ConfigError::InvalidTls("no private key in ssl_certificate.private_key".into()))
}

fn client_roots(ca_pool: &[String]) -> Result<RootCertStore, ConfigError> {
    let mut roots = RootCertStore::empty();
    for pem in ca_pool.iter().filter(|pem| !pem.trim().is_empty()) {
        let certs = parse_certs(pem)?;
        if certs.is_empty() {
            return Err(ConfigError::InvalidTls(format!("no certificate in ca_pool entry:\n{pem}")));
        }
        for cert in certs {
            roots.add(cert).map_err(tls_error)?;
        }
    }
    Ok(roots)
}

/// TCP listener that hands out established TLS streams to [`axum::serve`].
///
/// Handshakes run on their own tasks, so a slow or broken client never blocks
/// other connections. Failed handshakes are logged and dropped.
pub struct TlsListener {
    incoming: mpsc::Receiver<(TlsStream<TcpStream>, SocketAddr)>,
    local_addr: SocketAddr,
}

impl TlsListener {
    pub async fn bind(addr: SocketAddr, config: Arc<ServerConfig>) -> io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        let (tx, rx) = mpsc::channel(PENDING_CONNECTIONS);
        tokio::spawn(accept_loop(listener, TlsAcceptor::from(config), tx));
        Ok(Self {
            incoming: rx,
            local_addr,
        })
    }
}

impl axum::serve::Listener for TlsListener {
    type Io = TlsStream<TcpStream>;
    type Addr = SocketAddr;

    async fn accept(&mut self) -> (Self::Io, Self::Addr) {
        match self.incoming.recv().await {
            Some(conn) => conn,
            // accept loop only exits once this receiver is gone
            None => std::future::pending().await,
        }
    }

    fn local_addr(&self) -> io::Result<Self::Addr> {
        Ok(self.local_addr)
    }
}

async fn accept_loop(
    listener: TcpListener,
    acceptor: TlsAcceptor,
    tx: mpsc::Sender<(TlsStream<TcpStream>, SocketAddr)>,
) {
    loop {
        let (stream, peer) = tokio::select! {
            _ = tx.closed() => return,
            res = listener.accept() => match res {
                Ok(conn) => conn,
                Err(e) => {
                    warn!(error = %e, "failed to accept connection");
                    tokio::time::sleep(ACCEPT_BACKOFF).await;
                    continue;
                }
            },
        };

        let acceptor = acceptor.clone();
        let tx = tx.clone();
        tokio::spawn(async move {
            match timeout(HANDSHAKE_TIMEOUT, acceptor.accept(stream)).await {
                Ok(Ok(tls)) => {
                    if tx.send((tls, peer)).await.is_err() {
                        debug!(%peer, "listener closed before connection was served");
                    }
                }
                Ok(Err(e)) => warn!(%peer, error = %e, "TLS handshake error"),
                Err(_) => warn!(%peer, "TLS handshake timed out"),
            }
        });
    }
}

/// Process-wide default provider for code paths that do not pick one explicitly.
pub fn install_crypto_provider() {
    // Err only means another provider was installed first.
    let _ = CryptoProvider::install_default(ring::default_provider());
}
