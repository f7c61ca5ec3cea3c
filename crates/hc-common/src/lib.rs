//! HC Common - BER-TLV helpers and tag constants shared by the health card crates

/// TLV (Tag-Length-Value) lookup for BER encoded card data
///
/// Searches the top level of `data` for a specific tag and returns its value.
/// Handles single-byte and two-byte tags (CV certificate tags like 7F21 or
/// 5F20) as well as extended length encoding.
///
/// # Arguments
/// * `data` - The BER encoded data to search
/// * `tag` - The tag bytes to search for (1 or 2 bytes)
///
/// # Returns
/// * `Some(&[u8])` - The value bytes if tag is found
/// * `None` - If tag is not found or data is malformed
pub fn find_tag<'a>(data: &'a [u8], tag: &[u8]) -> Option<&'a [u8]> {
    let mut i = 0;
    while i < data.len() {
        let current_tag_len = if data[i] & 0x1F == 0x1F && i + 1 < data.len() {
            2 // Two-byte tag (like 7F4E)
        } else {
            1 // One-byte tag (like 42, 8A)
        };

        if i + current_tag_len > data.len() {
            break;
        }

        let current_tag = &data[i..i + current_tag_len];
        i += current_tag_len;

        if i >= data.len() {
            break;
        }

        let len = data[i] as usize;
        i += 1;

        // Extended length (bit 8 set)
        let actual_len = if len & 0x80 != 0 {
            let num_len_bytes = len & 0x7F;
            if i + num_len_bytes > data.len() {
                break;
            }

            let mut actual = 0usize;
            for j in 0..num_len_bytes {
                actual = (actual << 8) | (data[i + j] as usize);
            }
            i += num_len_bytes;
            actual
        } else {
            len
        };

        if current_tag == tag {
            if i + actual_len <= data.len() {
                return Some(&data[i..i + actual_len]);
            }
            return None;
        }

        i += actual_len;
    }
    None
}

/// Encode a single TLV object, choosing the shortest length form.
pub fn encode_tlv(tag: &[u8], value: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(tag.len() + 3 + value.len());
    out.extend_from_slice(tag);
    let len = value.len();
    if len < 0x80 {
        out.push(len as u8);
    } else if len <= 0xFF {
        out.push(0x81);
        out.push(len as u8);
    } else {
        out.push(0x82);
        out.push((len >> 8) as u8);
        out.push(len as u8);
    }
    out.extend_from_slice(value);
    out
}

/// Tag identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Tag(pub &'static [u8]);

impl Tag {
    pub fn bytes(&self) -> &'static [u8] {
        self.0
    }
}

/// Tags used by health card objects
pub mod tags {
    use super::Tag;

    // Card verifiable certificates
    pub const CV_CERTIFICATE: Tag = Tag(&[0x7F, 0x21]);
    pub const CERTIFICATE_BODY: Tag = Tag(&[0x7F, 0x4E]);
    pub const CERTIFICATE_PROFILE_IDENTIFIER: Tag = Tag(&[0x5F, 0x29]);
    pub const CERTIFICATION_AUTHORITY_REFERENCE: Tag = Tag(&[0x42]);
    pub const PUBLIC_KEY: Tag = Tag(&[0x7F, 0x49]);
    pub const CERTIFICATE_HOLDER_REFERENCE: Tag = Tag(&[0x5F, 0x20]);
    pub const CERTIFICATE_HOLDER_AUTHORIZATION: Tag = Tag(&[0x7F, 0x4C]);
    pub const CERTIFICATE_EFFECTIVE_DATE: Tag = Tag(&[0x5F, 0x25]);
    pub const CERTIFICATE_EXPIRATION_DATE: Tag = Tag(&[0x5F, 0x24]);
    pub const SIGNATURE: Tag = Tag(&[0x5F, 0x37]);

    // File control parameters
    pub const FCP_TEMPLATE: Tag = Tag(&[0x62]);
    pub const FILE_DESCRIPTOR: Tag = Tag(&[0x82]);
    pub const FILE_IDENTIFIER: Tag = Tag(&[0x83]);
    pub const DF_NAME: Tag = Tag(&[0x84]);
    pub const SHORT_FILE_IDENTIFIER: Tag = Tag(&[0x88]);
    pub const LIFE_CYCLE_STATUS: Tag = Tag(&[0x8A]);

    // Security environment data objects
    pub const CONTROL_REFERENCE_PUBLIC_KEY: Tag = Tag(&[0x83]);
    pub const CONTROL_REFERENCE_PRIVATE_KEY: Tag = Tag(&[0x84]);
    pub const ALGORITHM_IDENTIFIER: Tag = Tag(&[0x80]);

    // EF.Version2
    pub const VERSION2_TEMPLATE: Tag = Tag(&[0xEF]);
    pub const OBJECT_SYSTEM_VERSION: Tag = Tag(&[0xC0]);
}
