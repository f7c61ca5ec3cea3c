//! Card verifiable (CV) certificates
//!
//! Only the fields needed to drive on-card verification are extracted. The
//! signature itself is checked by the card during PSO VERIFY CERTIFICATE.

use hc_common::{find_tag, tags};

use crate::error::{CardError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CvCertificate {
    /// Value of the 7F21 object: certificate body followed by the signature
    content: Vec<u8>,
    authority_reference: Vec<u8>,
    holder_reference: Vec<u8>,
}

impl CvCertificate {
    /// Parse a certificate as read from a certificate EF. Trailing padding
    /// after the 7F21 object is ignored.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let content = find_tag(data, tags::CV_CERTIFICATE.bytes())
            .ok_or_else(|| CardError::malformed("CV certificate", "missing 7F21 object"))?;
        let body = find_tag(content, tags::CERTIFICATE_BODY.bytes())
            .ok_or_else(|| CardError::malformed("CV certificate", "missing certificate body"))?;
        let authority_reference = find_tag(body, tags::CERTIFICATION_AUTHORITY_REFERENCE.bytes())
            .ok_or_else(|| CardError::malformed("CV certificate", "missing CAR"))?;
        let holder_reference = find_tag(body, tags::CERTIFICATE_HOLDER_REFERENCE.bytes())
            .ok_or_else(|| CardError::malformed("CV certificate", "missing CHR"))?;

        Ok(Self {
            content: content.to_vec(),
            authority_reference: authority_reference.to_vec(),
            holder_reference: holder_reference.to_vec(),
        })
    }

    /// Body and signature, the data field of PSO VERIFY CERTIFICATE
    pub fn content(&self) -> &[u8] {
        &self.content
    }

    /// CAR: names the key that signed this certificate
    pub fn authority_reference(&self) -> &[u8] {
        &self.authority_reference
    }

    /// CHR: names the public key this certificate carries
    pub fn holder_reference(&self) -> &[u8] {
        &self.holder_reference
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::cv_certificate;
    use hc_common::encode_tlv;

    #[test]
    fn test_parse_references() {
        let car = b"DEGXX820214";
        let chr = [0x00, 0x09, 0x80, 0x27, 0x68, 0x83, 0x11, 0x00, 0x00, 0x01, 0x72, 0x22];
        let mut raw = cv_certificate(car, &chr);
        raw.extend_from_slice(&[0x00; 16]);

        let cert = CvCertificate::parse(&raw).unwrap();
        assert_eq!(cert.authority_reference(), car);
        assert_eq!(cert.holder_reference(), &chr);
        assert_eq!(cert.content()[..2], [0x7F, 0x4E]);
    }

    #[test]
    fn test_parse_rejects_missing_holder() {
        let body = encode_tlv(tags::CERTIFICATION_AUTHORITY_REFERENCE.bytes(), b"DEGXX820214");
        let raw = encode_tlv(tags::CV_CERTIFICATE.bytes(), &encode_tlv(tags::CERTIFICATE_BODY.bytes(), &body));
        assert!(matches!(CvCertificate::parse(&raw), Err(CardError::Malformed { .. })));
    }

    #[test]
    fn test_parse_rejects_empty_file() {
        assert!(CvCertificate::parse(&[0x00; 32]).is_err());
    }
}
