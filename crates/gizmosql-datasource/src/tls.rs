//! TLS for the Flight SQL channel.
//!
//! The handshake happens inside a custom connector, so the channel itself is
//! configured with a plain `http://` URI and tonic never sees TLS settings.
use std::{fmt, sync::Arc};

use hyper_util::rt::TokioIo;
use tokio::net::TcpStream;
use tokio_rustls::{
    rustls::{
        self,
        client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier},
        crypto::{self, CryptoProvider},
        pki_types::{CertificateDer, ServerName, UnixTime},
        ClientConfig, DigitallySignedStruct, RootCertStore, SignatureScheme,
    },
    TlsConnector,
};
use tonic::transport::{Channel, Endpoint, Uri};
use tower::service_fn;

use crate::error::FlightSqlError;

/// Build a rustls client configuration.
///
/// Server certificates are checked against the bundled Mozilla roots unless
/// `skip_verify` is set, in which case any certificate is accepted.
pub fn client_config(skip_verify: bool) -> Result<ClientConfig, FlightSqlError> {
    let provider = Arc::new(crypto::ring::default_provider());
    let builder = ClientConfig::builder_with_provider(Arc::clone(&provider))
        .with_safe_default_protocol_versions()?;
    let mut config = if skip_verify {
        builder
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(NoVerification(provider)))
            .with_no_client_auth()
    } else {
        let mut roots = RootCertStore::empty();
        roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
        builder.with_root_certificates(roots).with_no_client_auth()
    };
    config.alpn_protocols = vec![b"h2".to_vec()];
    Ok(config)
}

/// Open `endpoint` over TLS.
///
/// The TCP connection goes to `host:port` and the certificate is checked
/// against `host`; the URI tonic hands to the connector is ignored.
pub async fn connect(
    endpoint: &Endpoint,
    host: &str,
    port: u16,
    skip_verify: bool,
) -> Result<Channel, FlightSqlError> {
    let server_name =
        ServerName::try_from(host.to_string()).map_err(|source| FlightSqlError::ServerName {
            host: host.to_string(),
            source,
        })?;
    let tls = TlsConnector::from(Arc::new(client_config(skip_verify)?));
    let addr = host.to_string();
    let connector = service_fn(move |_: Uri| {
        let tls = tls.clone();
        let server_name = server_name.clone();
        let addr = addr.clone();
        async move {
            let tcp = TcpStream::connect((addr.as_str(), port)).await?;
            let stream = tls.connect(server_name, tcp).await?;
            Ok::<_, std::io::Error>(TokioIo::new(stream))
        }
    });
    endpoint
        .connect_with_connector(connector)
        .await
        .map_err(|source| FlightSqlError::Connect {
            endpoint: endpoint.uri().to_string(),
            source,
        })
}

/// Accepts any server certificate while still checking handshake signatures.
struct NoVerification(Arc<CryptoProvider>);

impl fmt::Debug for NoVerification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NoVerification").finish_non_exhaustive()
    }
}

impl ServerCertVerifier for NoVerification {
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
        crypto::verify_tls12_signature(message, cert, dss, &self.0.signature_verification_algorithms)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        crypto::verify_tls13_signature(message, cert, dss, &self.0.signature_verification_algorithms)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.0.signature_verification_algorithms.supported_schemes()
    }
}
