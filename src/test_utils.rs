//! Test utilities: a fake Atlas digest challenge for wiremock servers.

use crate::atlas::AtlasCredentials;
use crate::digest::{parse_params, Algorithm, Challenge};
use wiremock::{Match, Mock, MockServer, Request, ResponseTemplate};

pub const TEST_REALM: &str = "MMS Public API";
pub const TEST_NONCE: &str = "Xl5mF0fX3Fh9uE7yq0n2c3kQ8wZ1aTb4";

pub fn test_credentials() -> AtlasCredentials {
    AtlasCredentials::new("test-public-key", "test-private-key")
}

/// Answer any unauthenticated request with a digest challenge.
///
/// Mounted with a low priority so that mocks guarded by [`ValidDigest`] win
/// once the client resends with credentials.
pub async fn mount_digest_challenge(server: &MockServer) {
    Mock::given(wiremock::matchers::any())
        .respond_with(ResponseTemplate::new(401).insert_header(
            "WWW-Authenticate",
            format!(
                "Digest realm=\"{}\", domain=\"\", nonce=\"{}\", algorithm=MD5, qop=\"auth\", stale=false",
                TEST_REALM, TEST_NONCE
            ),
        ))
        .with_priority(u8::MAX)
        .mount(server)
        .await;
}

/// Matches requests carrying a correct digest `Authorization` header
pub struct ValidDigest {
    credentials: AtlasCredentials,
}

impl ValidDigest {
    pub fn new(credentials: AtlasCredentials) -> Self {
        Self { credentials }
    }
}

impl Match for ValidDigest {
    fn matches(&self, request: &Request) -> bool {
        let Some(value) = request
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
        else {
            return false;
        };
        let Some(params) = value.strip_prefix("Digest ") else {
            return false;
        };

        let params = parse_params(params);
        let field = |name: &str| {
            params
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.as_str())
                .unwrap_or_default()
        };

        let expected_uri = match request.url.query() {
            Some(q) => format!("{}?{}", request.url.path(), q),
            None => request.url.path().to_string(),
        };
        if field("username") != self.credentials.public_key
            || field("realm") != TEST_REALM
            || field("nonce") != TEST_NONCE
            || field("uri") != expected_uri
            || field("qop") != "auth"
        {
            return false;
        }
        let Ok(nc) = u32::from_str_radix(field("nc"), 16) else {
            return false;
        };

        let challenge = Challenge {
            realm: TEST_REALM.to_string(),
            nonce: TEST_NONCE.to_string(),
            opaque: None,
            algorithm: Algorithm::Md5,
            qop_auth: true,
        };
        let expected = challenge.response(
            &self.credentials.public_key,
            &self.credentials.private_key,
            request.method.as_str(),
            &expected_uri,
            field("cnonce"),
            nc,
        );

        field("response") == expected
    }
}
