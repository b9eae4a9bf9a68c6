//! TLS peer selection.
//!
//! [`TlsPolicy::configure`] decides, before a connection is secured,
//! whether TLS is used at all, which host name the certificate must match,
//! whether SNI is sent and how strictly the chain is checked. The decision
//! is a pure function of the requested URI, the resolved server, the
//! current routing table and the driver's [`SslConfiguration`].
//!
//! [`TlsParameters::client_config`] turns the decision into a rustls
//! client configuration.

use std::net::IpAddr;
use std::sync::Arc;

use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::client::WebPkiServerVerifier;
use rustls::crypto::{self, CryptoProvider};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{CertificateError, ClientConfig, DigitallySignedStruct, RootCertStore, SignatureScheme};
use url::Url;

use super::error::{DriverError, DriverResult};
use super::routing::RoutingTable;

// ============================================================================
// SslConfiguration
// ============================================================================

/// How the TLS mode is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SslMode {
    /// Use the scheme suffix of the URI (`bolt+s`, `neo4j+ssc`, ...).
    #[default]
    FromUrl,
    /// TLS with full certificate validation.
    Enable,
    /// TLS accepting self-signed certificates.
    EnableWithSelfSigned,
    /// Plain text.
    Disable,
}

/// TLS settings of a driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SslConfiguration {
    pub mode: SslMode,
    pub verify_peer: bool,
}

impl SslConfiguration {
    pub fn new(mode: SslMode, verify_peer: bool) -> Self {
        Self { mode, verify_peer }
    }

    pub fn with_mode(mut self, mode: SslMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_verify_peer(mut self, verify_peer: bool) -> Self {
        self.verify_peer = verify_peer;
        self
    }
}

impl Default for SslConfiguration {
    fn default() -> Self {
        Self::new(SslMode::FromUrl, true)
    }
}

// ============================================================================
// TlsParameters
// ============================================================================

/// Outcome of the peer-selection policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsParameters {
    pub enabled: bool,
    pub verify_peer: bool,
    /// Host name the certificate must be issued for
    pub peer_name: String,
    /// Send the peer name as SNI
    pub sni: bool,
    pub allow_self_signed: bool,
    /// Only set for the plain `s` suffix
    pub strict: bool,
}

impl TlsParameters {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            verify_peer: false,
            peer_name: String::new(),
            sni: false,
            allow_self_signed: false,
            strict: false,
        }
    }

    /// Name used for the handshake and hostname verification.
    pub fn server_name(&self) -> DriverResult<ServerName<'static>> {
        ServerName::try_from(strip_brackets(&self.peer_name).to_string())
            .map_err(|e| DriverError::tls(format!("Invalid peer name {}: {}", self.peer_name, e)))
    }

    /// Build a rustls client configuration honoring these parameters.
    pub fn client_config(&self) -> DriverResult<ClientConfig> {
        if !self.enabled {
            return Err(DriverError::configuration("TLS is disabled for this connection"));
        }

        let provider = Arc::new(crypto::ring::default_provider());
        let builder = ClientConfig::builder_with_provider(provider.clone())
            .with_safe_default_protocol_versions()?;

        let mut config = if !self.verify_peer {
            tracing::warn!(
                peer = %self.peer_name,
                "peer verification is disabled, the server certificate will not be checked"
            );
            builder
                .dangerous()
                .with_custom_certificate_verifier(Arc::new(AcceptAnyCertificate { provider }))
                .with_no_client_auth()
        } else if self.allow_self_signed {
            let verifier = SelfSignedVerifier::new(provider)?;
            builder
                .dangerous()
                .with_custom_certificate_verifier(Arc::new(verifier))
                .with_no_client_auth()
        } else {
            builder
                .with_root_certificates(webpki_root_store())
                .with_no_client_auth()
        };

        config.enable_sni = self.sni;
        Ok(config)
    }
}

// ============================================================================
// TlsPolicy
// ============================================================================

/// Peer-selection policy applied when a connection is secured.
pub struct TlsPolicy;

impl TlsPolicy {
    /// Decide the TLS parameters for a connection to `server`, reached while
    /// serving a request for `uri`.
    ///
    /// When the routing table knows more than one distinct server the
    /// certificate must match the resolved server; otherwise it must match
    /// the host the user asked for. This never fails: any suffix other than
    /// `s` or `ssc` disables TLS.
    pub fn configure(
        uri: &Url,
        server: &Url,
        table: Option<&RoutingTable>,
        ssl: &SslConfiguration,
    ) -> TlsParameters {
        let suffix = match ssl.mode {
            SslMode::FromUrl => uri
                .scheme()
                .split_once('+')
                .map(|(_, suffix)| suffix)
                .unwrap_or(""),
            SslMode::Enable => "s",
            SslMode::EnableWithSelfSigned => "ssc",
            SslMode::Disable => "",
        };

        if !matches!(suffix, "s" | "ssc") {
            return TlsParameters::disabled();
        }

        let clustered = table.is_some_and(|t| t.distinct_servers(None) > 1);
        let host = if clustered {
            server.host_str()
        } else {
            uri.host_str()
        };
        let Some(host) = host.filter(|h| !h.is_empty()) else {
            tracing::warn!(%uri, %server, "no host to verify TLS against, TLS disabled");
            return TlsParameters::disabled();
        };

        let params = TlsParameters {
            enabled: true,
            verify_peer: ssl.verify_peer,
            peer_name: host.to_string(),
            sni: !is_ip_literal(host),
            allow_self_signed: suffix == "ssc",
            strict: suffix == "s",
        };
        tracing::debug!(
            peer = %params.peer_name,
            sni = params.sni,
            self_signed = params.allow_self_signed,
            clustered,
            "TLS parameters selected"
        );
        params
    }
}

fn strip_brackets(host: &str) -> &str {
    host.strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(host)
}

fn is_ip_literal(host: &str) -> bool {
    strip_brackets(host).parse::<IpAddr>().is_ok()
}

fn webpki_root_store() -> RootCertStore {
    RootCertStore {
        roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
    }
}

// ============================================================================
// Certificate verifiers
// ============================================================================

/// Verifier used for `ssc`: a chain that does not lead to a known root is
/// accepted, but the certificate must still be issued for the peer name.
#[derive(Debug)]
struct SelfSignedVerifier {
    inner: Arc<WebPkiServerVerifier>,
}

impl SelfSignedVerifier {
    fn new(provider: Arc<CryptoProvider>) -> DriverResult<Self> {
        let inner =
            WebPkiServerVerifier::builder_with_provider(Arc::new(webpki_root_store()), provider)
                .build()
                .map_err(|e| DriverError::tls(e.to_string()))?;
        Ok(Self { inner })
    }
}

impl ServerCertVerifier for SelfSignedVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        server_name: &ServerName<'_>,
        ocsp_response: &[u8],
        now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        match self.inner.verify_server_cert(
            end_entity,
            intermediates,
            server_name,
            ocsp_response,
            now,
        ) {
            Err(rustls::Error::InvalidCertificate(CertificateError::UnknownIssuer)) => {
                let cert = rustls::server::ParsedCertificate::try_from(end_entity)?;
                rustls::client::verify_server_name(&cert, server_name)?;
                Ok(ServerCertVerified::assertion())
            }
            other => other,
        }
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        self.inner.verify_tls12_signature(message, cert, dss)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        self.inner.verify_tls13_signature(message, cert, dss)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.inner.supported_verify_schemes()
    }
}

/// Verifier used when peer verification is turned off.
///
/// Handshake signatures are still checked so the session keys belong to
/// whoever holds the presented certificate.
#[derive(Debug)]
struct AcceptAnyCertificate {
    provider: Arc<CryptoProvider>,
}

impl ServerCertVerifier for AcceptAnyCertificate {
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
        crypto::verify_tls12_signature(
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
        crypto::verify_tls13_signature(
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

// ============================================================================
// Tests
// ============================================================================
