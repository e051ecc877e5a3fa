//! TLS termination for the HTTPS front door
//!
//! Certificate acquisition and renewal are an outside concern; this module
//! only loads the PEM material it is pointed at and hands rustls a
//! certificate resolver, with TLS 1.2 as the floor.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::server::{ClientHello, ResolvesServerCert};
use rustls::sign::CertifiedKey;
use rustls::ServerConfig;
use tokio_rustls::TlsAcceptor;

use crate::IngressError;

/// Serves one certificate chain for every SNI name.
#[derive(Debug)]
struct StaticCertResolver {
    cert: Arc<CertifiedKey>,
}

impl ResolvesServerCert for StaticCertResolver {
    fn resolve(&self, _client_hello: ClientHello) -> Option<Arc<CertifiedKey>> {
        Some(self.cert.clone())
    }
}

/// Load TLS certificates from a PEM file.
fn load_certs(path: &Path) -> Result<Vec<CertificateDer<'static>>, IngressError> {
    let file = File::open(path)
        .map_err(|e| IngressError::Tls(format!("failed to open cert file: {e}")))?;
    let mut reader = BufReader::new(file);

    rustls_pemfile::certs(&mut reader)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| IngressError::Tls(format!("failed to parse certs: {e}")))
}

/// Load the private key from a PEM file.
fn load_private_key(path: &Path) -> Result<PrivateKeyDer<'static>, IngressError> {
    let file = File::open(path)
        .map_err(|e| IngressError::Tls(format!("failed to open key file: {e}")))?;
    let mut reader = BufReader::new(file);

    rustls_pemfile::private_key(&mut reader)
        .map_err(|e| IngressError::Tls(format!("failed to parse key: {e}")))?
        .ok_or_else(|| IngressError::Tls("no private key found".to_string()))
}

/// Build the acceptor for the HTTPS listener from on-disk PEM material.
pub fn build_acceptor(cert_path: &Path, key_path: &Path) -> Result<TlsAcceptor, IngressError> {
    let certs = load_certs(cert_path)?;
    let key = load_private_key(key_path)?;

    let signing_key = rustls::crypto::ring::sign::any_supported_type(&key)
        .map_err(|e| IngressError::Tls(format!("invalid key: {e}")))?;

    let resolver = Arc::new(StaticCertResolver {
        cert: Arc::new(CertifiedKey::new(certs, signing_key)),
    });

    let config =
        ServerConfig::builder_with_protocol_versions(&[&rustls::version::TLS13, &rustls::version::TLS12])
            .with_no_client_auth()
            .with_cert_resolver(resolver);

    Ok(TlsAcceptor::from(Arc::new(config)))
}
