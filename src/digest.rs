//! HTTP Digest Authentication
//!
//! Atlas API keys are checked with RFC 2617 / RFC 7616 digest auth: the first
//! request is answered with a `401` carrying a `WWW-Authenticate: Digest ...`
//! challenge, and the request is resent with a signed `Authorization` header.
//! Only `qop=auth` (or the legacy no-qop form) is supported.

use crate::error::{ProvisionError, Result};
use md5::{Digest, Md5};
use sha2::Sha256;

/// Hash algorithm named by the challenge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Algorithm {
    #[default]
    Md5,
    Md5Sess,
    Sha256,
    Sha256Sess,
}

impl Algorithm {
    fn parse(value: &str) -> Result<Self> {
        match value.to_ascii_uppercase().as_str() {
            "MD5" => Ok(Algorithm::Md5),
            "MD5-SESS" => Ok(Algorithm::Md5Sess),
            "SHA-256" => Ok(Algorithm::Sha256),
            "SHA-256-SESS" => Ok(Algorithm::Sha256Sess),
            other => Err(ProvisionError::Authentication(format!(
                "unsupported digest algorithm: {}",
                other
            ))),
        }
    }

    fn is_session(self) -> bool {
        matches!(self, Algorithm::Md5Sess | Algorithm::Sha256Sess)
    }

    fn hash(self, data: &str) -> String {
        match self {
            Algorithm::Md5 | Algorithm::Md5Sess => hex::encode(Md5::digest(data.as_bytes())),
            Algorithm::Sha256 | Algorithm::Sha256Sess => {
                hex::encode(Sha256::digest(data.as_bytes()))
            }
        }
    }
}

impl std::fmt::Display for Algorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Algorithm::Md5 => write!(f, "MD5"),
            Algorithm::Md5Sess => write!(f, "MD5-sess"),
            Algorithm::Sha256 => write!(f, "SHA-256"),
            Algorithm::Sha256Sess => write!(f, "SHA-256-sess"),
        }
    }
}

/// A parsed `WWW-Authenticate: Digest` challenge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Challenge {
    pub realm: String,
    pub nonce: String,
    pub opaque: Option<String>,
    pub algorithm: Algorithm,
    /// Whether the server offered `qop=auth`
    pub qop_auth: bool,
}

impl Challenge {
    /// Parse the value of a `WWW-Authenticate` header
    pub fn parse(header: &str) -> Result<Self> {
        let header = header.trim();
        let params = match header.split_once(char::is_whitespace) {
            Some((scheme, rest)) if scheme.eq_ignore_ascii_case("digest") => rest,
            _ => {
                return Err(ProvisionError::Authentication(format!(
                    "not a digest challenge: {}",
                    header
                )))
            }
        };

        let mut realm = None;
        let mut nonce = None;
        let mut opaque = None;
        let mut algorithm = Algorithm::default();
        let mut qop = None;

        for (key, value) in parse_params(params) {
            match key.to_ascii_lowercase().as_str() {
                "realm" => realm = Some(value),
                "nonce" => nonce = Some(value),
                "opaque" => opaque = Some(value),
                "algorithm" => algorithm = Algorithm::parse(&value)?,
                "qop" => qop = Some(value),
                _ => {}
            }
        }

        let qop_auth = match qop {
            None => false,
            Some(offered) => {
                if offered.split(',').any(|q| q.trim().eq_ignore_ascii_case("auth")) {
                    true
                } else {
                    return Err(ProvisionError::Authentication(format!(
                        "unsupported qop: {}",
                        offered
                    )));
                }
            }
        };

        Ok(Self {
            realm: realm
                .ok_or_else(|| ProvisionError::Authentication("challenge has no realm".into()))?,
            nonce: nonce
                .ok_or_else(|| ProvisionError::Authentication("challenge has no nonce".into()))?,
            opaque,
            algorithm,
            qop_auth,
        })
    }

    /// Compute the `response` value for a request.
    ///
    /// `nc` is the nonce count; it only matters when `qop=auth` is in use.
    pub fn response(
        &self,
        username: &str,
        password: &str,
        method: &str,
        uri: &str,
        cnonce: &str,
        nc: u32,
    ) -> String {
        let alg = self.algorithm;
        let mut ha1 = alg.hash(&format!("{}:{}:{}", username, self.realm, password));
        if alg.is_session() {
            ha1 = alg.hash(&format!("{}:{}:{}", ha1, self.nonce, cnonce));
        }
        let ha2 = alg.hash(&format!("{}:{}", method, uri));

        if self.qop_auth {
            alg.hash(&format!(
                "{}:{}:{:08x}:{}:auth:{}",
                ha1, self.nonce, nc, cnonce, ha2
            ))
        } else {
            alg.hash(&format!("{}:{}:{}", ha1, self.nonce, ha2))
        }
    }

    /// Build the full `Authorization` header value
    pub fn authorization(
        &self,
        username: &str,
        password: &str,
        method: &str,
        uri: &str,
        cnonce: &str,
        nc: u32,
    ) -> String {
        let response = self.response(username, password, method, uri, cnonce, nc);

        let mut header = format!(
            "Digest username={}, realm={}, nonce={}, uri={}, algorithm={}, response={}",
            quote(username),
            quote(&self.realm),
            quote(&self.nonce),
            quote(uri),
            self.algorithm,
            quote(&response),
        );
        if self.qop_auth {
            header.push_str(&format!(", qop=auth, nc={:08x}, cnonce={}", nc, quote(cnonce)));
        } else if self.algorithm.is_session() {
            header.push_str(&format!(", cnonce={}", quote(cnonce)));
        }
        if let Some(opaque) = &self.opaque {
            header.push_str(&format!(", opaque={}", quote(opaque)));
        }
        header
    }
}

/// Random client nonce
pub fn generate_cnonce() -> String {
    hex::encode(rand::random::<[u8; 16]>())
}

fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Split `key=value, key="quoted, value"` pairs
pub(crate) fn parse_params(input: &str) -> Vec<(String, String)> {
    let mut params = Vec::new();
    let mut chars = input.chars().peekable();

    loop {
        while matches!(chars.peek(), Some(c) if c.is_whitespace() || *c == ',') {
            chars.next();
        }
        if chars.peek().is_none() {
            break;
        }

        let mut key = String::new();
        while let Some(&c) = chars.peek() {
            if c == '=' || c == ',' {
                break;
            }
            key.push(c);
            chars.next();
        }

        let mut value = String::new();
        if chars.peek() == Some(&'=') {
            chars.next();
            while matches!(chars.peek(), Some(c) if c.is_whitespace()) {
                chars.next();
            }
            if chars.peek() == Some(&'"') {
                chars.next();
                while let Some(c) = chars.next() {
                    match c {
                        '\\' => {
                            if let Some(escaped) = chars.next() {
                                value.push(escaped);
                            }
                        }
                        '"' => break,
                        _ => value.push(c),
                    }
                }
            } else {
                while let Some(&c) = chars.peek() {
                    if c == ',' {
                        break;
                    }
                    value.push(c);
                    chars.next();
                }
                value = value.trim().to_string();
            }
        }

        let key = key.trim();
        if !key.is_empty() {
            params.push((key.to_string(), value));
        }
    }

    params
}
