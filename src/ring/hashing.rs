use md5::{Digest, Md5};

/// Stable 32-bit ring position: the first four bytes of the MD5 digest of
/// `input`, read big-endian.
///
/// Every node must agree on this function, otherwise rings built from the
/// same membership would disagree on ownership.
pub fn hash32(input: &str) -> u32 {
    let digest = Md5::digest(input.as_bytes());
    u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]])
}

/// Label hashed to place virtual node `index` of the node at `address`.
pub fn virtual_node_label(address: &str, index: usize) -> String {
    format!("{}-VN{}", address, index)
}
