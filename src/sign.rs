//! AWS SigV4 request signer.

use std::fmt::Write;

use http::header;
use http::HeaderMap;
use http::HeaderValue;
use http::Method;
use log::debug;
use percent_encoding::utf8_percent_encode;
use sha2::Digest;
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::constants::AWS_URI_ENCODE_SET;
use crate::constants::X_AMZ_CONTENT_SHA_256;
use crate::constants::X_AMZ_DATE;
use crate::constants::X_AMZ_SECURITY_TOKEN;
use crate::hash::hex_hmac_sha256;
use crate::hash::hex_sha256;
use crate::hash::hmac_sha256;
use crate::stream::Body;
use crate::stream::InputStream;
use crate::tee::TeeStream;
use crate::time::format_date;
use crate::time::format_iso8601;
use crate::time::DateTime;
use crate::Credential;
use crate::Error;
use crate::Result;

/// How repeated header names are rendered in the canonical headers block.
///
/// SigV4 folds all values of a repeated header into a single line, with
/// the folded values comma-joined in input order. Some deployed signers
/// instead emit one line per occurrence; [`SeparateLines`][Self::SeparateLines]
/// reproduces that behavior for interoperability with services that
/// verify against it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RepeatedHeaderMode {
    /// One `name:v1,v2` line per header name. This is the SigV4 rule.
    #[default]
    CommaJoin,
    /// One `name:value` line per occurrence, input order preserved.
    SeparateLines,
}

/// Signer that implements AWS SigV4.
///
/// - [Signature Version 4 signing process](https://docs.aws.amazon.com/general/latest/gr/signature-version-4.html)
#[derive(Debug, Clone)]
pub struct RequestSigner {
    service: String,
    region: String,

    repeated_header_mode: RepeatedHeaderMode,
}

impl RequestSigner {
    /// Create a new signer for the given service and region.
    pub fn new(service: &str, region: &str) -> Self {
        Self {
            service: service.to_string(),
            region: region.to_string(),

            repeated_header_mode: RepeatedHeaderMode::default(),
        }
    }

    /// Choose how repeated header names are canonicalized.
    pub fn with_repeated_header_mode(mut self, mode: RepeatedHeaderMode) -> Self {
        self.repeated_header_mode = mode;
        self
    }

    /// Sign a request, appending `Authorization`, `X-Amz-Date`, and,
    /// when the credential carries a session token,
    /// `X-Amz-Security-Token`.
    ///
    /// The signing instant is supplied by the caller; this function
    /// never reads the system clock. On error the request keeps its
    /// input headers, with one caveat: a body that had to be wrapped in
    /// a tee for hashing stays wrapped.
    ///
    /// Callers must not pre-populate any of the emitted headers; the
    /// signer appends without deduplicating.
    pub fn sign_request(
        &self,
        req: &mut http::Request<Body>,
        cred: &Credential,
        when: DateTime,
    ) -> Result<()> {
        if self.region.is_empty() {
            return Err(Error::invalid_argument("region must not be empty"));
        }
        if self.service.is_empty() {
            return Err(Error::invalid_argument("service must not be empty"));
        }
        if cred.access_key_id.is_empty() || cred.secret_access_key.is_empty() {
            return Err(Error::invalid_argument(
                "credentials must carry an access key id and a secret key",
            ));
        }
        if !cred.access_key_id.is_ascii() {
            return Err(Error::invalid_argument("access key id must be ASCII"));
        }

        // Every emitted header value is materialized before signing so
        // that emission cannot fail once the signature exists.
        let token_value = match cred.session_token.as_deref() {
            Some(token) if !token.is_empty() => {
                let mut value = HeaderValue::from_str(token)?;
                value.set_sensitive(true);
                Some(value)
            }
            _ => None,
        };
        let amz_date = format_iso8601(when);
        let date_value = HeaderValue::from_str(&amz_date)?;

        // Canonicalization works on a copy of the headers; the request
        // itself is only touched by the emitter below.
        let mut headers = req.headers().clone();
        for (name, value) in headers.iter() {
            validate_header_value(name.as_str(), value)?;
        }

        let payload_hash = payload_hash(&headers, req.body_mut())?;

        // The emitted x-amz-date participates in the signature. The
        // security token does not, unless the caller added it as a
        // request header themselves.
        headers.insert(X_AMZ_DATE, date_value.clone());

        let signed_headers = {
            let mut names: Vec<&str> = headers.keys().map(|k| k.as_str()).collect();
            names.sort_unstable();
            names.join(";")
        };

        let creq = canonical_request_string(
            req.method(),
            req.uri().path(),
            req.uri().query(),
            &headers,
            &signed_headers,
            &payload_hash,
            self.repeated_header_mode,
        )?;
        debug!("calculated canonical request: {creq}");

        // Scope: "20150830/<region>/<service>/aws4_request"
        let scope = format!(
            "{}/{}/{}/aws4_request",
            format_date(when),
            self.region,
            self.service
        );
        debug!("calculated scope: {scope}");

        // StringToSign:
        //
        // AWS4-HMAC-SHA256
        // 20150830T123600Z
        // 20150830/<region>/<service>/aws4_request
        // <hashed_canonical_request>
        let string_to_sign = {
            let mut f = String::new();
            writeln!(f, "AWS4-HMAC-SHA256")?;
            writeln!(f, "{amz_date}")?;
            writeln!(f, "{scope}")?;
            write!(f, "{}", hex_sha256(creq.as_bytes()))?;
            f
        };
        debug!("calculated string to sign: {string_to_sign}");

        let signing_key =
            generate_signing_key(&cred.secret_access_key, when, &self.region, &self.service)?;
        let signature = hex_hmac_sha256(&signing_key, string_to_sign.as_bytes())?;

        let mut authorization = HeaderValue::from_str(&format!(
            "AWS4-HMAC-SHA256 Credential={}/{}, SignedHeaders={}, Signature={}",
            cred.access_key_id, scope, signed_headers, signature
        ))?;
        authorization.set_sensitive(true);

        let out = req.headers_mut();
        out.append(header::AUTHORIZATION, authorization);
        out.append(X_AMZ_DATE, date_value);
        if let Some(token) = token_value {
            out.append(X_AMZ_SECURITY_TOKEN, token);
        }

        Ok(())
    }
}

/// SigV4 is only defined for header values made of horizontal tab and
/// visible ASCII plus space.
fn validate_header_value(name: &str, value: &HeaderValue) -> Result<()> {
    let valid = value
        .as_bytes()
        .iter()
        .all(|&b| b == b'\t' || (0x20..=0x7e).contains(&b));
    if !valid {
        return Err(Error::encoding_error(format!(
            "header {name} contains bytes outside the signable range"
        )));
    }
    Ok(())
}

/// Hex SHA-256 of the request body.
///
/// A well-formed `x-amz-content-sha256` header short-circuits hashing
/// and leaves the body untouched. Otherwise the body is wrapped in a tee
/// (unless it already is one) so the transport can replay the exact
/// bytes that were hashed.
fn payload_hash(headers: &HeaderMap, body: &mut Body) -> Result<String> {
    if let Some(value) = headers.get(X_AMZ_CONTENT_SHA_256) {
        let digest = value.to_str()?;
        let well_formed = digest.len() == 64
            && digest
                .bytes()
                .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'));
        if !well_formed {
            return Err(Error::invalid_argument(
                "x-amz-content-sha256 must be a 64 character lowercase hex digest",
            ));
        }
        return Ok(digest.to_string());
    }

    let Some(stream) = body.take() else {
        return Ok(hex_sha256(&[]));
    };

    let tee: Box<dyn InputStream> = if stream.is_tee() {
        stream
    } else {
        Box::new(TeeStream::wrap(stream))
    };
    let branch = tee.new_branch();
    // The tee is installed before hashing starts; if a read below fails
    // it stays installed and the request owns it.
    *body = Some(tee);
    let mut branch =
        branch.ok_or_else(|| Error::unexpected("tee stream refused to open a branch"))?;

    let mut hasher = Sha256::new();
    let mut buf = [0u8; 4096];
    loop {
        let n = branch.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    Ok(hex::encode(hasher.finalize()))
}

fn canonical_request_string(
    method: &Method,
    path: &str,
    query: Option<&str>,
    headers: &HeaderMap,
    signed_headers: &str,
    payload_hash: &str,
    mode: RepeatedHeaderMode,
) -> Result<String> {
    // 256 is specially chosen to avoid reallocation for most requests.
    let mut f = String::with_capacity(256);

    writeln!(f, "{method}")?;
    writeln!(f, "{}", canonical_path(path))?;
    writeln!(f, "{}", canonical_query(query))?;

    let mut names: Vec<&str> = headers.keys().map(|k| k.as_str()).collect();
    names.sort_unstable();
    for name in names {
        let folded: Vec<String> = headers
            .get_all(name)
            .iter()
            .map(|v| fold_header_value(v.as_bytes()))
            .collect();
        match mode {
            RepeatedHeaderMode::CommaJoin => writeln!(f, "{name}:{}", folded.join(","))?,
            RepeatedHeaderMode::SeparateLines => {
                for value in folded {
                    writeln!(f, "{name}:{value}")?;
                }
            }
        }
    }
    writeln!(f)?;
    writeln!(f, "{signed_headers}")?;
    write!(f, "{payload_hash}")?;

    Ok(f)
}

/// Normalize and encode the path portion of the request target.
///
/// Empty and `.` segments are dropped, `..` pops the last retained
/// segment, and each surviving segment is percent-encoded as literal
/// bytes, so a `%` already present in the input is encoded again.
fn canonical_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }

    let mut out = String::with_capacity(path.len());
    for segment in &segments {
        out.push('/');
        out.extend(utf8_percent_encode(segment, &AWS_URI_ENCODE_SET));
    }
    if out.is_empty() {
        out.push('/');
    }
    out
}

/// Encode and sort the raw query string.
///
/// Pairs are sorted by encoded key, ties broken by encoded value. A key
/// without `=` is rendered as `key=`.
fn canonical_query(query: Option<&str>) -> String {
    let Some(query) = query else {
        return String::new();
    };

    let mut pairs: Vec<(String, String)> = query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            (
                utf8_percent_encode(key, &AWS_URI_ENCODE_SET).to_string(),
                utf8_percent_encode(value, &AWS_URI_ENCODE_SET).to_string(),
            )
        })
        .collect();
    pairs.sort();

    let mut out = String::with_capacity(query.len());
    for (i, (key, value)) in pairs.iter().enumerate() {
        if i > 0 {
            out.push('&');
        }
        out.push_str(key);
        out.push('=');
        out.push_str(value);
    }
    out
}

/// Trim surrounding whitespace and collapse internal runs to one space.
fn fold_header_value(value: &[u8]) -> String {
    let mut out = String::with_capacity(value.len());
    let mut pending_space = false;
    for &b in value {
        if b == b' ' || b == b'\t' {
            pending_space = !out.is_empty();
        } else {
            if pending_space {
                out.push(' ');
                pending_space = false;
            }
            out.push(b as char);
        }
    }
    out
}

fn generate_signing_key(
    secret: &str,
    when: DateTime,
    region: &str,
    service: &str,
) -> Result<Zeroizing<Vec<u8>>> {
    // Sign secret
    let mut secret_key = Zeroizing::new(Vec::with_capacity(secret.len() + 4));
    secret_key.extend_from_slice(b"AWS4");
    secret_key.extend_from_slice(secret.as_bytes());
    // Sign date
    let sign_date = Zeroizing::new(hmac_sha256(&secret_key, format_date(when).as_bytes())?);
    // Sign region
    let sign_region = Zeroizing::new(hmac_sha256(&sign_date, region.as_bytes())?);
    // Sign service
    let sign_service = Zeroizing::new(hmac_sha256(&sign_region, service.as_bytes())?);
    // Sign request
    let sign_request = hmac_sha256(&sign_service, b"aws4_request")?;

    Ok(Zeroizing::new(sign_request))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::CursorStream;
    use crate::time::parse_iso8601;

    #[test]
    fn test_canonical_path_normalization() {
        assert_eq!(canonical_path("/foo/./bar/../baz//qux"), "/foo/baz/qux");
        assert_eq!(canonical_path("/%E4%B8%AD"), "/%25E4%25B8%25AD");
        assert_eq!(canonical_path(""), "/");
        assert_eq!(canonical_path("/"), "/");
        assert_eq!(canonical_path("/a/b/"), "/a/b");
        assert_eq!(canonical_path("/../a"), "/a");
        assert_eq!(canonical_path("/a b/c"), "/a%20b/c");
    }

    #[test]
    fn test_canonical_path_identity_and_idempotence() {
        // Clean paths pass through unchanged.
        assert_eq!(canonical_path("/foo/bar-baz_1.2~3"), "/foo/bar-baz_1.2~3");
        // Normalizing a normalized plain path is the identity.
        for path in ["/foo/./bar/../baz//qux", "/a/b/c", "/"] {
            let once = canonical_path(path);
            // The encoding step only matters for paths that need it, so
            // idempotence holds on encoding-free inputs.
            assert_eq!(canonical_path(&once), once);
        }
    }

    #[test]
    fn test_canonical_query() {
        assert_eq!(canonical_query(None), "");
        assert_eq!(canonical_query(Some("b=2&a=1")), "a=1&b=2");
        assert_eq!(canonical_query(Some("flag&a=1")), "a=1&flag=");
        assert_eq!(canonical_query(Some("k=a b")), "k=a%20b");
        // Ties on the key are broken by value.
        assert_eq!(canonical_query(Some("a=2&a=1")), "a=1&a=2");
        // Literal bytes are encoded exactly once.
        assert_eq!(canonical_query(Some("a=%2F")), "a=%252F");
        assert_eq!(
            canonical_query(Some("prefix=CI/&list-type=2")),
            "list-type=2&prefix=CI%2F"
        );
    }

    #[test]
    fn test_fold_header_value() {
        assert_eq!(fold_header_value(b"  a   b\tc  "), "a b c");
        assert_eq!(fold_header_value(b"plain"), "plain");
        assert_eq!(fold_header_value(b"\t \t"), "");
    }

    #[test]
    fn test_generate_signing_key_matches_published_example() {
        // The worked example from the AWS signature documentation:
        // 20150830 / us-east-1 / iam.
        let when = parse_iso8601("20150830T123600Z").unwrap();
        let key = generate_signing_key(
            "wJalrXUtnFEMI/K7MDENG/bPxRfiCYEXAMPLEKEY",
            when,
            "us-east-1",
            "iam",
        )
        .unwrap();
        assert_eq!(
            hex::encode(key.as_slice()),
            "c4afb1cc5771d871763a393e44b703571b55cc28424d1a5e86da6ed3c154a4b9"
        );
    }

    #[test]
    fn test_payload_hash_empty_body() {
        let headers = HeaderMap::new();
        let mut body: Body = None;
        assert_eq!(
            payload_hash(&headers, &mut body).unwrap(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert!(body.is_none());
    }

    #[test]
    fn test_payload_hash_wraps_body_in_tee() {
        let headers = HeaderMap::new();
        let mut body: Body = Some(Box::new(CursorStream::new("Test request body")));

        let digest = payload_hash(&headers, &mut body).unwrap();
        assert_eq!(digest, hex_sha256(b"Test request body"));

        let stream = body.as_mut().expect("body must stay installed");
        assert!(stream.is_tee());

        let mut replay = Vec::new();
        let mut buf = [0u8; 8];
        loop {
            let n = stream.read(&mut buf).unwrap();
            if n == 0 {
                break;
            }
            replay.extend_from_slice(&buf[..n]);
        }
        assert_eq!(replay, b"Test request body");
    }

    #[test]
    fn test_payload_hash_does_not_rewrap_tee() {
        let headers = HeaderMap::new();
        let tee = TeeStream::wrap(Box::new(CursorStream::new("abc")));
        let mut body: Body = Some(Box::new(tee));

        payload_hash(&headers, &mut body).unwrap();

        // Still a tee, and reading it must replay from offset zero.
        let stream = body.as_mut().unwrap();
        assert!(stream.is_tee());
        let mut buf = [0u8; 8];
        assert_eq!(stream.read(&mut buf).unwrap(), 3);
        assert_eq!(&buf[..3], b"abc");
    }

    #[test]
    fn test_payload_hash_accepts_presupplied_digest() {
        let mut headers = HeaderMap::new();
        let digest = "9b7a28bdd098b4b42887609d12a9a0a776a8f73839c40c5c9f5a202e3f5dc03a";
        headers.insert(X_AMZ_CONTENT_SHA_256, digest.parse().unwrap());

        let mut body: Body = Some(Box::new(CursorStream::new("Test request body")));
        assert_eq!(payload_hash(&headers, &mut body).unwrap(), digest);
        // The body stream was not touched or replaced.
        assert!(!body.as_ref().unwrap().is_tee());
    }

    #[test]
    fn test_payload_hash_rejects_malformed_digest() {
        for bad in ["tooshort", "9B7A28BDD098B4B42887609D12A9A0A776A8F73839C40C5C9F5A202E3F5DC03A"]
        {
            let mut headers = HeaderMap::new();
            headers.insert(X_AMZ_CONTENT_SHA_256, bad.parse().unwrap());
            let mut body: Body = None;
            let err = payload_hash(&headers, &mut body).unwrap_err();
            assert_eq!(err.kind(), crate::ErrorKind::InvalidArgument);
        }
    }

    #[test]
    fn test_validate_header_value() {
        let ok = HeaderValue::from_static("plain ascii\tvalue");
        assert!(validate_header_value("x-test", &ok).is_ok());

        let bad = HeaderValue::from_bytes(&[0x80, 0x81]).unwrap();
        let err = validate_header_value("x-test", &bad).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::EncodingError);
    }
}
