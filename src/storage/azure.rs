//! Azure Table storage backend.
//!
//! Talks to the table service REST API directly over reqwest: one idempotent
//! table create, point reads by partition/row key, and unconditional
//! insert-or-replace writes. Requests are signed with the SharedKeyLite
//! scheme (HMAC-SHA256 over the request date and canonicalized resource).
//!
//! The client is built per request from the connection string in the
//! process environment; a missing or malformed value surfaces as
//! [`StorageError::Configuration`].

use std::collections::HashMap;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, ETAG};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use url::Url;

use crate::config::StorageConfig;
use crate::storage::{StorageError, StorageResult, TableStore, VisitorRecord};

const API_VERSION: &str = "2019-02-02";
const ODATA_JSON: &str = "application/json;odata=nometadata";

/// Well-known local emulator account (Azurite / Storage Emulator).
const DEV_STORE_ACCOUNT: &str = "devstoreaccount1";
const DEV_STORE_KEY: &str =
    "Eby8vdM02xNOcqFlqUwJPLlmEtlCDXJ1OUzFT50uSRZ6IFsuFq2UVErCz4I6tq/K1SZFPTOtr/KBHBeksoGMGw==";

/// Parsed account half of a connection string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TableAccount {
    pub name: String,
    /// Decoded account key bytes.
    pub key: Vec<u8>,
    /// Table endpoint, no trailing slash.
    pub endpoint: String,
}

/// Azure Table storage client for a single table.
pub struct AzureTableStore {
    client: reqwest::Client,
    account: TableAccount,
    table: String,
}

impl AzureTableStore {
    /// Build a client from the connection string named by the config.
    pub fn from_env(config: &StorageConfig) -> StorageResult<Self> {
        let raw = std::env::var(&config.connection_string_env).map_err(|_| {
            StorageError::Configuration(format!(
                "environment variable {} is not set",
                config.connection_string_env
            ))
        })?;
        let account = parse_connection_string(&raw)?;
        Ok(Self {
            client: reqwest::Client::new(),
            account,
            table: config.table.clone(),
        })
    }

    fn tables_url(&self) -> StorageResult<Url> {
        parse_url(&format!("{}/Tables", self.account.endpoint))
    }

    fn entity_url(&self, partition_key: &str, row_key: &str) -> StorageResult<Url> {
        parse_url(&format!(
            "{}/{}(PartitionKey='{}',RowKey='{}')",
            self.account.endpoint,
            self.table,
            odata_escape(partition_key),
            odata_escape(row_key),
        ))
    }

    /// Headers shared by every table service request, including the
    /// SharedKeyLite authorization for `url`.
    fn signed_headers(&self, url: &Url) -> StorageResult<HeaderMap> {
        let date = Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string();
        let canonical = format!("/{}{}", self.account.name, url.path());
        let signature = sign(&self.account.key, &format!("{date}\n{canonical}"))?;
        let authorization = format!("SharedKeyLite {}:{}", self.account.name, signature);

        let mut headers = HeaderMap::new();
        headers.insert("x-ms-date", header_value(&date)?);
        headers.insert("x-ms-version", HeaderValue::from_static(API_VERSION));
        // header names must be lowercase for the from_static insert path
        headers.insert("dataserviceversion", HeaderValue::from_static("3.0;NetFx"));
        headers.insert(ACCEPT, HeaderValue::from_static(ODATA_JSON));
        headers.insert(AUTHORIZATION, header_value(&authorization)?);
        Ok(headers)
    }

    async fn service_error(status: u16, response: reqwest::Response) -> StorageError {
        let body = response.text().await.unwrap_or_default();
        StorageError::Service { status, body }
    }
}

#[async_trait::async_trait]
impl TableStore for AzureTableStore {
    async fn ensure_table(&self) -> StorageResult<()> {
        let url = self.tables_url()?;
        let headers = self.signed_headers(&url)?;
        let response = self
            .client
            .post(url)
            .headers(headers)
            .header("Prefer", "return-no-content")
            .json(&serde_json::json!({ "TableName": self.table }))
            .send()
            .await?;

        match response.status().as_u16() {
            201 | 204 => Ok(()),
            // Idempotent create: the table surviving a previous request is
            // the common case, not a failure.
            409 => Ok(()),
            status => Err(Self::service_error(status, response).await),
        }
    }

    async fn get(
        &self,
        partition_key: &str,
        row_key: &str,
    ) -> StorageResult<Option<VisitorRecord>> {
        let url = self.entity_url(partition_key, row_key)?;
        let headers = self.signed_headers(&url)?;
        let response = self.client.get(url).headers(headers).send().await?;

        match response.status().as_u16() {
            200 => {
                let etag = response
                    .headers()
                    .get(ETAG)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string);
                let body = response.text().await?;
                let doc: EntityDocument = serde_json::from_str(&body)?;
                Ok(Some(VisitorRecord {
                    partition_key: doc.partition_key,
                    row_key: doc.row_key,
                    count: doc.count,
                    etag,
                }))
            }
            404 => Ok(None),
            status => Err(Self::service_error(status, response).await),
        }
    }

    async fn upsert(&self, record: &VisitorRecord) -> StorageResult<()> {
        let url = self.entity_url(&record.partition_key, &record.row_key)?;
        let headers = self.signed_headers(&url)?;
        // PUT without If-Match is insert-or-replace; last writer wins.
        let response = self
            .client
            .put(url)
            .headers(headers)
            .json(&EntityDocument::from(record))
            .send()
            .await?;

        match response.status().as_u16() {
            204 => Ok(()),
            status => Err(Self::service_error(status, response).await),
        }
    }
}

/// Entity wire form (odata=nometadata). The etag travels in the `ETag`
/// response header, not the body.
#[derive(Debug, Serialize, Deserialize)]
struct EntityDocument {
    #[serde(rename = "PartitionKey")]
    partition_key: String,
    #[serde(rename = "RowKey")]
    row_key: String,
    #[serde(rename = "Count")]
    count: u64,
}

impl From<&VisitorRecord> for EntityDocument {
    fn from(record: &VisitorRecord) -> Self {
        Self {
            partition_key: record.partition_key.clone(),
            row_key: record.row_key.clone(),
            count: record.count,
        }
    }
}

/// Parse a table storage connection string.
///
/// Accepts the standard `Key=Value;...` form with `AccountName`/`AccountKey`
/// (plus optional `DefaultEndpointsProtocol`, `EndpointSuffix`,
/// `TableEndpoint`) and the `UseDevelopmentStorage=true` shorthand.
pub(crate) fn parse_connection_string(raw: &str) -> StorageResult<TableAccount> {
    let mut fields: HashMap<&str, &str> = HashMap::new();
    for segment in raw.split(';') {
        let segment = segment.trim();
        if segment.is_empty() {
            continue;
        }
        let (key, value) = segment.split_once('=').ok_or_else(|| {
            StorageError::Configuration(format!(
                "malformed connection string segment {segment:?}"
            ))
        })?;
        fields.insert(key, value);
    }

    if fields
        .get("UseDevelopmentStorage")
        .is_some_and(|v| v.eq_ignore_ascii_case("true"))
    {
        return Ok(TableAccount {
            name: DEV_STORE_ACCOUNT.to_string(),
            key: decode_account_key(DEV_STORE_KEY)?,
            endpoint: format!("http://127.0.0.1:10002/{DEV_STORE_ACCOUNT}"),
        });
    }

    let name = fields.get("AccountName").copied().ok_or_else(|| {
        StorageError::Configuration("connection string is missing AccountName".to_string())
    })?;
    let key_b64 = fields.get("AccountKey").copied().ok_or_else(|| {
        StorageError::Configuration("connection string is missing AccountKey".to_string())
    })?;

    let endpoint = match fields.get("TableEndpoint") {
        Some(endpoint) => endpoint.trim_end_matches('/').to_string(),
        None => {
            let protocol = fields
                .get("DefaultEndpointsProtocol")
                .copied()
                .unwrap_or("https");
            let suffix = fields.get("EndpointSuffix").copied().unwrap_or("core.windows.net");
            format!("{protocol}://{name}.table.{suffix}")
        }
    };

    Ok(TableAccount {
        name: name.to_string(),
        key: decode_account_key(key_b64)?,
        endpoint,
    })
}

fn decode_account_key(key_b64: &str) -> StorageResult<Vec<u8>> {
    BASE64
        .decode(key_b64)
        .map_err(|_| StorageError::Configuration("AccountKey is not valid base64".to_string()))
}

/// SharedKeyLite signature: base64(HMAC-SHA256(key, string_to_sign)).
fn sign(key: &[u8], string_to_sign: &str) -> StorageResult<String> {
    let mut mac = Hmac::<Sha256>::new_from_slice(key)
        .map_err(|_| StorageError::Configuration("account key rejected by HMAC".to_string()))?;
    mac.update(string_to_sign.as_bytes());
    Ok(BASE64.encode(mac.finalize().into_bytes()))
}

/// OData string literals escape a single quote by doubling it.
fn odata_escape(key: &str) -> String {
    key.replace('\'', "''")
}

fn parse_url(raw: &str) -> StorageResult<Url> {
    Url::parse(raw)
        .map_err(|e| StorageError::Configuration(format!("invalid table endpoint URL: {e}")))
}

fn header_value(value: &str) -> StorageResult<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|e| StorageError::Configuration(format!("invalid header value: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StorageConfig;

    const TEST_KEY_B64: &str = "MDEyMzQ1Njc4OWFiY2RlZg==";

    #[test]
    fn parses_a_full_account_connection_string() {
        let account = parse_connection_string(&format!(
            "DefaultEndpointsProtocol=https;AccountName=myaccount;AccountKey={TEST_KEY_B64};EndpointSuffix=core.windows.net"
        ))
        .unwrap();
        assert_eq!(account.name, "myaccount");
        assert_eq!(account.key, b"0123456789abcdef");
        assert_eq!(account.endpoint, "https://myaccount.table.core.windows.net");
    }

    #[test]
    fn explicit_table_endpoint_wins_and_loses_its_trailing_slash() {
        let account = parse_connection_string(&format!(
            "AccountName=myaccount;AccountKey={TEST_KEY_B64};TableEndpoint=https://tables.example.com/myaccount/"
        ))
        .unwrap();
        assert_eq!(account.endpoint, "https://tables.example.com/myaccount");
    }

    #[test]
    fn development_storage_shorthand() {
        let account = parse_connection_string("UseDevelopmentStorage=true").unwrap();
        assert_eq!(account.name, "devstoreaccount1");
        assert_eq!(
            account.endpoint,
            "http://127.0.0.1:10002/devstoreaccount1"
        );
    }

    #[test]
    fn malformed_strings_are_configuration_errors() {
        for raw in [
            "AccountName=only-a-name",
            "AccountKey=MDEyMw==",
            "not a connection string",
            "AccountName=a;AccountKey=not-base64!!;EndpointSuffix=x",
        ] {
            assert!(
                matches!(
                    parse_connection_string(raw),
                    Err(StorageError::Configuration(_))
                ),
                "expected configuration error for {raw:?}"
            );
        }
    }

    #[test]
    fn signature_matches_known_answer() {
        // HMAC-SHA256 of "Mon, 27 Jul 2009 12:28:27 GMT\n/myaccount/Tables"
        // with key b"0123456789abcdef".
        let key = decode_account_key(TEST_KEY_B64).unwrap();
        let signature =
            sign(&key, "Mon, 27 Jul 2009 12:28:27 GMT\n/myaccount/Tables").unwrap();
        assert_eq!(signature, "62i9sRTVL/tBTaKDyHlkD/7gFRbFUpzCkn5WAYLHH+4=");
    }

    #[test]
    fn signing_is_deterministic_and_date_sensitive() {
        let key = decode_account_key(TEST_KEY_B64).unwrap();
        let a = sign(&key, "Mon, 27 Jul 2009 12:28:27 GMT\n/a/Tables").unwrap();
        let b = sign(&key, "Mon, 27 Jul 2009 12:28:27 GMT\n/a/Tables").unwrap();
        let c = sign(&key, "Tue, 28 Jul 2009 12:28:27 GMT\n/a/Tables").unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn entity_urls_address_by_partition_and_row_key() {
        let store = test_store();
        let url = store.entity_url("visitor", "visitorcount").unwrap();
        assert_eq!(
            url.as_str(),
            "https://myaccount.table.core.windows.net/VisitorCount(PartitionKey='visitor',RowKey='visitorcount')"
        );
    }

    #[test]
    fn single_quotes_in_keys_are_doubled() {
        let store = test_store();
        let url = store.entity_url("o'brien", "visitorcount").unwrap();
        assert!(url.path().contains("PartitionKey='o''brien'"));
    }

    #[test]
    fn missing_environment_variable_is_a_configuration_error() {
        let config = StorageConfig {
            connection_string_env: "AZURE_TABLE_TEST_NEVER_SET".to_string(),
            ..StorageConfig::default()
        };
        assert!(matches!(
            AzureTableStore::from_env(&config),
            Err(StorageError::Configuration(_))
        ));
    }

    #[test]
    fn malformed_environment_variable_is_a_configuration_error() {
        let var = "AZURE_TABLE_TEST_MALFORMED";
        std::env::set_var(var, "complete nonsense");
        let config = StorageConfig {
            connection_string_env: var.to_string(),
            ..StorageConfig::default()
        };
        assert!(matches!(
            AzureTableStore::from_env(&config),
            Err(StorageError::Configuration(_))
        ));
    }

    fn test_store() -> AzureTableStore {
        AzureTableStore {
            client: reqwest::Client::new(),
            account: TableAccount {
                name: "myaccount".to_string(),
                key: b"0123456789abcdef".to_vec(),
                endpoint: "https://myaccount.table.core.windows.net".to_string(),
            },
            table: "VisitorCount".to_string(),
        }
    }
}
