//! Storage account connection strings.

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use url::Url;

use crate::error::{ConfigError, Result};

/// Account name of the local storage emulator.
pub const DEV_ACCOUNT_NAME: &str = "devstoreaccount1";
/// Well-known account key of the local storage emulator.
pub const DEV_ACCOUNT_KEY: &str =
    "Eby8vdM02xNOcqFlqUwJPLlmEtlCDXJ1OUzFT50uSRZ6IFsuFq2UVErCz4I6tq/K1SZFPTOtr/KBHBeksoGMGw==";
/// Blob endpoint of the local storage emulator.
pub const DEV_BLOB_ENDPOINT: &str = "http://127.0.0.1:10000/devstoreaccount1";

const DEFAULT_PROTOCOL: &str = "https";
const DEFAULT_ENDPOINT_SUFFIX: &str = "core.windows.net";

/// How requests to the account are authorized.
#[derive(Clone, PartialEq, Eq)]
pub enum StorageCredential {
    /// Shared Key signing with the decoded account key.
    SharedKey {
        /// Storage account name.
        account_name: String,
        /// Decoded account key bytes.
        key: Vec<u8>,
    },
    /// Shared access signature query string, without the leading `?`.
    Sas(String),
}

impl fmt::Debug for StorageCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SharedKey { account_name, .. } => f
                .debug_struct("SharedKey")
                .field("account_name", account_name)
                .finish_non_exhaustive(),
            Self::Sas(_) => f.write_str("Sas(<redacted>)"),
        }
    }
}

/// A parsed storage connection string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionString {
    /// Storage account name, if given.
    pub account_name: Option<String>,
    /// Blob service endpoint.
    pub blob_endpoint: Url,
    /// Request authorization.
    pub credential: StorageCredential,
}

impl ConnectionString {
    /// Parses `Key=Value;Key=Value` connection strings.
    ///
    /// Values may themselves contain `=` (base64 keys, SAS tokens).
    pub fn parse(input: &str) -> Result<Self> {
        let mut account_name = None;
        let mut account_key = None;
        let mut protocol = None;
        let mut suffix = None;
        let mut blob_endpoint = None;
        let mut sas = None;
        let mut dev_storage = false;

        for pair in input.split(';').map(str::trim).filter(|p| !p.is_empty()) {
            let (key, value) = pair.split_once('=').ok_or_else(|| {
                ConfigError::invalid("malformed connection string segment (missing `=`)")
            })?;
            let value = value.trim().to_owned();
            match key.trim().to_ascii_lowercase().as_str() {
                "accountname" => account_name = Some(value),
                "accountkey" => account_key = Some(value),
                "defaultendpointsprotocol" => protocol = Some(value),
                "endpointsuffix" => suffix = Some(value),
                "blobendpoint" => blob_endpoint = Some(value),
                "sharedaccesssignature" => sas = Some(value),
                "usedevelopmentstorage" => dev_storage = value.eq_ignore_ascii_case("true"),
                _ => {}
            }
        }

        if dev_storage {
            account_name.get_or_insert_with(|| DEV_ACCOUNT_NAME.to_owned());
            account_key.get_or_insert_with(|| DEV_ACCOUNT_KEY.to_owned());
            blob_endpoint.get_or_insert_with(|| DEV_BLOB_ENDPOINT.to_owned());
        }

        let endpoint = match (blob_endpoint, &account_name) {
            (Some(endpoint), _) => endpoint,
            (None, Some(account)) => format!(
                "{}://{account}.blob.{}",
                protocol.as_deref().unwrap_or(DEFAULT_PROTOCOL),
                suffix.as_deref().unwrap_or(DEFAULT_ENDPOINT_SUFFIX)
            ),
            (None, None) => {
                return Err(ConfigError::invalid(
                    "connection string needs `AccountName` or `BlobEndpoint`",
                )
                .into());
            }
        };
        let blob_endpoint = Url::parse(&endpoint)
            .map_err(|e| ConfigError::invalid(format!("blob endpoint `{endpoint}`: {e}")))?;

        let credential = match (account_key, &account_name, sas) {
            (Some(key), Some(account), _) => StorageCredential::SharedKey {
                account_name: account.clone(),
                key: STANDARD
                    .decode(key.as_bytes())
                    .map_err(|e| ConfigError::invalid(format!("`AccountKey` is not base64: {e}")))?,
            },
            (_, _, Some(sas)) => StorageCredential::Sas(sas.trim_start_matches('?').to_owned()),
            (Some(_), None, None) => {
                return Err(ConfigError::invalid("`AccountKey` requires `AccountName`").into());
            }
            (None, _, None) => {
                return Err(ConfigError::invalid(
                    "connection string needs `AccountKey` or `SharedAccessSignature`",
                )
                .into());
            }
        };

        Ok(Self {
            account_name,
            blob_endpoint,
            credential,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    const KEY: &str = "c2VjcmV0LWtleS1ieXRlcw==";

    #[test]
    fn parses_account_key_string() {
        let cs = ConnectionString::parse(&format!(
            "DefaultEndpointsProtocol=https;AccountName=acct;AccountKey={KEY};EndpointSuffix=core.windows.net"
        ))
        .unwrap();

        assert_eq!(cs.account_name.as_deref(), Some("acct"));
        assert_eq!(cs.blob_endpoint.as_str(), "https://acct.blob.core.windows.net/");
        match cs.credential {
            StorageCredential::SharedKey { account_name, key } => {
                assert_eq!(account_name, "acct");
                assert_eq!(key, b"secret-key-bytes");
            }
            StorageCredential::Sas(_) => panic!("expected shared key"),
        }
    }

    #[test]
    fn defaults_protocol_and_suffix() {
        let cs = ConnectionString::parse(&format!("AccountName=acct;AccountKey={KEY}")).unwrap();
        assert_eq!(cs.blob_endpoint.host_str(), Some("acct.blob.core.windows.net"));
        assert_eq!(cs.blob_endpoint.scheme(), "https");
    }

    #[test]
    fn keeps_padding_in_key_values() {
        let cs = ConnectionString::parse(&format!("AccountKey={KEY};AccountName=acct;")).unwrap();
        assert!(matches!(cs.credential, StorageCredential::SharedKey { .. }));
    }

    #[test]
    fn explicit_blob_endpoint_with_sas() {
        let cs = ConnectionString::parse(
            "BlobEndpoint=https://custom.example.net/;SharedAccessSignature=?sv=2022-11-02&sig=abc%3D",
        )
        .unwrap();

        assert_eq!(cs.account_name, None);
        assert_eq!(cs.blob_endpoint.host_str(), Some("custom.example.net"));
        assert_eq!(
            cs.credential,
            StorageCredential::Sas("sv=2022-11-02&sig=abc%3D".to_owned())
        );
    }

    #[test]
    fn development_storage_defaults() {
        let cs = ConnectionString::parse("UseDevelopmentStorage=true").unwrap();
        assert_eq!(cs.account_name.as_deref(), Some(DEV_ACCOUNT_NAME));
        assert_eq!(cs.blob_endpoint.as_str(), DEV_BLOB_ENDPOINT);
        assert!(matches!(cs.credential, StorageCredential::SharedKey { .. }));
    }

    #[test]
    fn rejects_missing_credentials() {
        let err = ConnectionString::parse("AccountName=acct").unwrap_err();
        assert!(err.to_string().contains("AccountKey"));
    }

    #[test]
    fn rejects_missing_account() {
        let err = ConnectionString::parse(&format!("AccountKey={KEY}")).unwrap_err();
        assert!(err.to_string().contains("AccountName"));
    }

    #[test]
    fn rejects_invalid_key() {
        let err = ConnectionString::parse("AccountName=acct;AccountKey=not base64!").unwrap_err();
        assert!(err.to_string().contains("base64"));
    }

    #[test]
    fn rejects_segment_without_equals() {
        assert!(ConnectionString::parse("AccountName").is_err());
    }

    #[test]
    fn debug_hides_secrets() {
        let cs = ConnectionString::parse(&format!("AccountName=acct;AccountKey={KEY}")).unwrap();
        let debug = format!("{cs:?}");
        assert!(debug.contains("SharedKey"));
        assert!(!debug.contains("key: ["));
    }
}
