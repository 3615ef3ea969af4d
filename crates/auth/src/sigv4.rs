use chrono::{DateTime, Utc};
use ring::{digest, hmac};
use std::collections::BTreeMap;

use crate::credentials::AwsCredentials;

const ALGORITHM: &str = "AWS4-HMAC-SHA256";
const RDS_SERVICE: &str = "rds-db";

/// Lifetime of a generated token. RDS rejects anything above 15 minutes.
pub const TOKEN_TTL_SECONDS: u64 = 900;

/// Builds RDS IAM authentication tokens: a SigV4 presigned `connect` request
/// for the `rds-db` service, used verbatim as the PostgreSQL password.
#[derive(Debug, Clone)]
pub struct RdsTokenGenerator {
    region: String,
}

impl RdsTokenGenerator {
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
        }
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn generate(
        &self,
        credentials: &AwsCredentials,
        host: &str,
        port: u16,
        username: &str,
        timestamp: DateTime<Utc>,
    ) -> String {
        let endpoint = format!("{}:{}", host, port);
        let credential_scope = format!(
            "{}/{}/{}/aws4_request",
            timestamp.format("%Y%m%d"),
            self.region,
            RDS_SERVICE
        );

        let mut query_params = BTreeMap::new();
        query_params.insert("Action", "connect".to_string());
        query_params.insert("DBUser", username.to_string());
        query_params.insert("X-Amz-Algorithm", ALGORITHM.to_string());
        query_params.insert(
            "X-Amz-Credential",
            format!("{}/{}", credentials.access_key_id, credential_scope),
        );
        query_params.insert("X-Amz-Date", timestamp.format("%Y%m%dT%H%M%SZ").to_string());
        query_params.insert("X-Amz-Expires", TOKEN_TTL_SECONDS.to_string());
        if let Some(session_token) = &credentials.session_token {
            query_params.insert("X-Amz-Security-Token", session_token.clone());
        }
        query_params.insert("X-Amz-SignedHeaders", "host".to_string());

        let query_string = build_query_string(&query_params);

        let canonical_request = format!(
            "GET\n/\n{}\nhost:{}\n\nhost\n{}",
            query_string,
            endpoint,
            hash_payload(b"")
        );

        let string_to_sign = format!(
            "{}\n{}\n{}\n{}",
            ALGORITHM,
            timestamp.format("%Y%m%dT%H%M%SZ"),
            credential_scope,
            hash_payload(canonical_request.as_bytes())
        );

        let signing_key = signing_key(
            &credentials.secret_access_key,
            timestamp,
            &self.region,
            RDS_SERVICE,
        );
        let signature = hex::encode(hmac::sign(&signing_key, string_to_sign.as_bytes()).as_ref());

        format!("{}/?{}&X-Amz-Signature={}", endpoint, query_string, signature)
    }
}

fn signing_key(secret_key: &str, timestamp: DateTime<Utc>, region: &str, service: &str) -> hmac::Key {
    let k_secret = format!("AWS4{}", secret_key);
    let k_date = hmac::sign(
        &hmac::Key::new(hmac::HMAC_SHA256, k_secret.as_bytes()),
        timestamp.format("%Y%m%d").to_string().as_bytes(),
    );

    let k_region = hmac::sign(
        &hmac::Key::new(hmac::HMAC_SHA256, k_date.as_ref()),
        region.as_bytes(),
    );

    let k_service = hmac::sign(
        &hmac::Key::new(hmac::HMAC_SHA256, k_region.as_ref()),
        service.as_bytes(),
    );

    let k_signing = hmac::sign(
        &hmac::Key::new(hmac::HMAC_SHA256, k_service.as_ref()),
        b"aws4_request",
    );

    hmac::Key::new(hmac::HMAC_SHA256, k_signing.as_ref())
}

// BTreeMap iteration is already in canonical (byte-wise) key order.
fn build_query_string(params: &BTreeMap<&str, String>) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

pub fn hash_payload(payload: &[u8]) -> String {
    let digest = digest::digest(&digest::SHA256, payload);
    hex::encode(digest.as_ref())
}
