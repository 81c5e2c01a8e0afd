//! rustls client configuration from [`TlsSettings`].

use std::{fs::File, io::BufReader, sync::Arc};

use quill_common::{
    config::{TlsSettings, TlsVersion, TrustRoots},
    tracing,
};
use tokio_rustls::{
    TlsConnector,
    rustls::{
        ClientConfig, DigitallySignedStruct, RootCertStore, SignatureScheme,
        SupportedProtocolVersion,
        client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier},
        pki_types::{CertificateDer, ServerName, UnixTime},
        version::{TLS12, TLS13},
    },
};

use super::error::{ClientError, Result};

fn root_store(roots: &TrustRoots) -> Result<RootCertStore> {
    let mut store = RootCertStore::empty();

    match roots {
        TrustRoots::Native => {
            let certs = rustls_native_certs::load_native_certs();
            if !certs.errors.is_empty() {
                tracing::warn!(?certs.errors, "Some certificates could not be loaded");
            }

            let (added, ignored) = store.add_parsable_certificates(certs.certs);
            tracing::trace!(added, ignored, "Loaded native root certificates");
        }
        TrustRoots::PemFile(path) => {
            let file = File::open(path).map_err(|e| {
                ClientError::TlsError(format!("Unable to open {}: {e}", path.display()))
            })?;

            for cert in rustls_pemfile::certs(&mut BufReader::new(file)) {
                let cert = cert.map_err(|e| {
                    ClientError::TlsError(format!("Invalid certificate in {}: {e}", path.display()))
                })?;
                store
                    .add(cert)
                    .map_err(|e| ClientError::TlsError(format!("Failed to add certificate: {e}")))?;
            }
        }
        TrustRoots::Der(certs) => {
            for der in certs {
                store
                    .add(CertificateDer::from(der.clone()))
                    .map_err(|e| ClientError::TlsError(format!("Failed to add certificate: {e}")))?;
            }
        }
    }

    Ok(store)
}

/// Build a fresh client configuration for one connection.
///
/// # Errors
///
/// Fails if the configured trust roots cannot be loaded.
pub fn client_config(settings: &TlsSettings) -> Result<ClientConfig> {
    let versions: &[&'static SupportedProtocolVersion] = match settings.min_version {
        TlsVersion::Tls12 => &[&TLS13, &TLS12],
        TlsVersion::Tls13 => &[&TLS13],
    };

    let mut config = ClientConfig::builder_with_protocol_versions(versions)
        .with_root_certificates(root_store(&settings.roots)?)
        .with_no_client_auth();

    if settings.accepts_invalid_certs() {
        tracing::warn!("Certificate validation is disabled for this connection");
        config
            .dangerous()
            .set_certificate_verifier(Arc::new(NoVerifier));
    }

    Ok(config)
}

/// A connector and the name the server certificate must match.
///
/// # Errors
///
/// Fails if the trust roots cannot be loaded or the name is not a valid
/// DNS name or IP address.
pub fn connector_for(settings: &TlsSettings, host: &str) -> Result<(TlsConnector, ServerName<'static>)> {
    let config = client_config(settings)?;
    let name = settings.server_name_for(host).to_string();
    let server_name = ServerName::try_from(name)
        .map_err(|e| ClientError::TlsError(format!("Invalid server name: {e}")))?;

    Ok((TlsConnector::from(Arc::new(config)), server_name))
}

/// A certificate verifier that accepts all certificates (for testing only).
#[derive(Debug)]
struct NoVerifier;

impl ServerCertVerifier for NoVerifier {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> std::result::Result<ServerCertVerified, tokio_rustls::rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, tokio_rustls::rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, tokio_rustls::rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        vec![
            SignatureScheme::RSA_PKCS1_SHA256,
            SignatureScheme::RSA_PSS_SHA256,
            SignatureScheme::ECDSA_NISTP256_SHA256,
            SignatureScheme::ECDSA_NISTP384_SHA384,
            SignatureScheme::ED25519,
        ]
    }
}
