use std::fmt::Debug;
use std::fmt::Formatter;

/// Credential that holds the access key and secret key.
///
/// The signer borrows credentials for the duration of one
/// [`sign_request`][crate::RequestSigner::sign_request] call and never
/// retains them. The secret key feeds the key derivation chain only; no
/// output byte ever contains it.
#[derive(Default, Clone)]
pub struct Credential {
    /// Access key id, copied verbatim into the `Authorization` header.
    pub access_key_id: String,
    /// Secret access key.
    pub secret_access_key: String,
    /// Session token, emitted as `X-Amz-Security-Token` when present.
    pub session_token: Option<String>,
}

impl Debug for Credential {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field(
                "session_token",
                &self.session_token.as_deref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_secrets() {
        let cred = Credential {
            access_key_id: "AKIDEXAMPLE".to_string(),
            secret_access_key: "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY".to_string(),
            session_token: Some("FQoDYXdzEPP//////////wEaDO".to_string()),
        };

        let out = format!("{cred:?}");
        assert!(out.contains("AKIDEXAMPLE"));
        assert!(!out.contains("wJalrXUtnFEMI"));
        assert!(!out.contains("FQoDYXdz"));
    }
}
