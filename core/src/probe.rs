//! First-phase latency probe: TCP connect plus TLS handshake against one
//! candidate address, both under a single deadline.
//!
//! Only reachability and handshake completion matter here, so certificate
//! validation is skipped on purpose: the probed address almost never carries
//! a certificate for the hostname we present as SNI.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use edgescan_common::network::outcome::ProbeResult;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_rustls::TlsConnector;
use tokio_rustls::rustls;
use tokio_rustls::rustls::pki_types::ServerName;

const PROBE_PORT: u16 = 443;

/// Reusable prober; one instance is shared by every pool worker.
pub struct LatencyProber {
    connector: TlsConnector,
    sni: ServerName<'static>,
    timeout: Duration,
    ceiling_ms: u64,
}

impl LatencyProber {
    pub fn new(sni_host: &str, probe_timeout: Duration, ceiling_ms: u64) -> anyhow::Result<Self> {
        // Install ring as the process-wide CryptoProvider. Safe to call more
        // than once; needed because reqwest's rustls build can pull in a
        // second provider and leave the default ambiguous.
        let _ = rustls::crypto::ring::default_provider().install_default();

        let config = rustls::ClientConfig::builder()
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(SkipServerVerification))
            .with_no_client_auth();

        let sni = ServerName::try_from(sni_host.to_string())
            .with_context(|| format!("'{sni_host}' is not usable as an SNI value"))?;

        Ok(Self {
            connector: TlsConnector::from(Arc::new(config)),
            sni,
            timeout: probe_timeout,
            ceiling_ms,
        })
    }

    /// Connects and handshakes with `addr`, returning the elapsed latency.
    ///
    /// Connect failure, handshake failure, the deadline, or a latency above
    /// the ceiling all yield `None`; there are no retries.
    pub async fn probe(&self, addr: IpAddr) -> Option<ProbeResult> {
        let start = Instant::now();
        let socket_addr = SocketAddr::new(addr, PROBE_PORT);

        let stream = match timeout(self.timeout, TcpStream::connect(socket_addr)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(_)) | Err(_) => return None,
        };

        let remaining = self.timeout.saturating_sub(start.elapsed());
        match timeout(remaining, self.connector.connect(self.sni.clone(), stream)).await {
            Ok(Ok(_tls)) => {}
            Ok(Err(_)) | Err(_) => return None,
        }

        let latency_ms = start.elapsed().as_millis() as u64;
        (latency_ms <= self.ceiling_ms).then_some(ProbeResult { addr, latency_ms })
    }
}

/// Accepts every server certificate.
#[derive(Debug)]
struct SkipServerVerification;

impl rustls::client::danger::ServerCertVerifier for SkipServerVerification {
    fn verify_server_cert(
        &self,
        _end_entity: &rustls::pki_types::CertificateDer<'_>,
        _intermediates: &[rustls::pki_types::CertificateDer<'_>],
        _server_name: &rustls::pki_types::ServerName<'_>,
        _ocsp_response: &[u8],
        _now: rustls::pki_types::UnixTime,
    ) -> Result<rustls::client::danger::ServerCertVerified, rustls::Error> {
        Ok(rustls::client::danger::ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &rustls::pki_types::CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &rustls::pki_types::CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<rustls::SignatureScheme> {
        vec![
            rustls::SignatureScheme::ECDSA_NISTP256_SHA256,
            rustls::SignatureScheme::ECDSA_NISTP384_SHA384,
            rustls::SignatureScheme::ED25519,
            rustls::SignatureScheme::RSA_PSS_SHA256,
            rustls::SignatureScheme::RSA_PSS_SHA384,
            rustls::SignatureScheme::RSA_PSS_SHA512,
            rustls::SignatureScheme::RSA_PKCS1_SHA256,
            rustls::SignatureScheme::RSA_PKCS1_SHA384,
            rustls::SignatureScheme::RSA_PKCS1_SHA512,
        ]
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn prober(ceiling_ms: u64) -> LatencyProber {
        LatencyProber::new("speed.cloudflare.com", Duration::from_secs(2), ceiling_ms).unwrap()
    }

    #[test]
    fn rejects_hostname_unusable_as_sni() {
        let result = LatencyProber::new("bad host!", Duration::from_secs(2), 200);
        assert!(result.is_err());
    }

    #[tokio::test]
    #[ignore]
    async fn probe_should_succeed_against_known_endpoint() {
        let ip: IpAddr = IpAddr::V4(Ipv4Addr::new(1, 1, 1, 1));
        let result = prober(2_000).probe(ip).await;
        assert!(result.is_some());
    }

    #[tokio::test]
    #[ignore]
    async fn probe_should_fail_on_unreachable_ip() {
        // TEST-NET-3, guaranteed unrouted.
        let ip: IpAddr = IpAddr::V4(Ipv4Addr::new(203, 0, 113, 1));
        let result = prober(2_000).probe(ip).await;
        assert!(result.is_none());
    }

    #[tokio::test]
    #[ignore]
    async fn probe_over_ceiling_is_dropped() {
        let ip: IpAddr = IpAddr::V4(Ipv4Addr::new(1, 1, 1, 1));
        let result = prober(0).probe(ip).await;
        assert!(result.is_none());
    }
}
