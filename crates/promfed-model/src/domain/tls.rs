use serde::{Deserialize, Serialize};

/// PEM-encoded certificate chain and private key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TlsPem {
    #[serde(default)]
    pub cert_chain: String,
    #[serde(default)]
    pub private_key: String,
}

impl TlsPem {
    /// Both halves are blank; treated as "not configured".
    pub fn is_empty(&self) -> bool {
        self.cert_chain.trim().is_empty() && self.private_key.trim().is_empty()
    }

    /// Chain and key concatenated into a single PEM buffer.
    pub fn to_bundle(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.cert_chain.len() + self.private_key.len() + 1);
        out.extend_from_slice(self.cert_chain.as_bytes());
        if !self.cert_chain.ends_with('\n') {
            out.push(b'\n');
        }
        out.extend_from_slice(self.private_key.as_bytes());
        out
    }
}
