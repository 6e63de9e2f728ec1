//! ID generation
//!
//! nanoid-backed identifiers for client order ids, plus random key material
//! for the WebSocket handshake and frame masks.

use nanoid::nanoid;

/// Alphabet accepted by Binance for `newClientOrderId` (`^[.A-Z:/a-z0-9_-]{1,36}$`)
const CLIENT_ID_ALPHABET: [char; 64] = [
    '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', 'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i',
    'j', 'k', 'l', 'm', 'n', 'o', 'p', 'q', 'r', 's', 't', 'u', 'v', 'w', 'x', 'y', 'z', 'A', 'B',
    'C', 'D', 'E', 'F', 'G', 'H', 'I', 'J', 'K', 'L', 'M', 'N', 'O', 'P', 'Q', 'R', 'S', 'T', 'U',
    'V', 'W', 'X', 'Y', 'Z', '_', '-',
];

/// Maximum length Binance accepts for client order ids
pub const MAX_CLIENT_ID_LEN: usize = 36;

/// Generate an id of the form `<PREFIX>_<random>`, capped at 36 characters
pub fn generate_id_with_prefix(prefix: &str) -> String {
    let mut id = format!("{}_{}", prefix, nanoid!(21, &CLIENT_ID_ALPHABET));
    id.truncate(MAX_CLIENT_ID_LEN);
    id
}

/// `N` random bytes drawn from nanoid's secure generator
pub fn random_bytes<const N: usize>() -> [u8; N] {
    let mut out = [0u8; N];
    let bytes = nanoid::rngs::default(N);
    out.copy_from_slice(&bytes);
    out
}
