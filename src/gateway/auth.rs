use serde::Deserialize;
use subtle::ConstantTimeEq;

/// First frame a client sends when the gateway has token auth enabled.
#[derive(Deserialize)]
struct ConnectFrame {
    token: Option<String>,
}

/// Check the initial connect frame against the configured token.
///
/// No configured token (loopback mode) admits everyone. With a token,
/// the frame must be JSON carrying an exactly-matching `token` field;
/// the comparison is constant-time.
pub fn verify_connect(frame: &str, expected: &Option<String>) -> bool {
    let Some(expected) = expected else {
        return true;
    };

    let presented = match serde_json::from_str::<ConnectFrame>(frame) {
        Ok(ConnectFrame {
            token: Some(token),
        }) => token,
        _ => return false,
    };

    presented.len() == expected.len()
        && bool::from(presented.as_bytes().ct_eq(expected.as_bytes()))
}
