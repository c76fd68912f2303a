//! Captured biometric sample.

use base64::Engine;

use crate::VerifierError;

/// A validated camera capture, ready to send to a verifier backend.
///
/// Only image containers the matching service accepts pass validation;
/// everything else is rejected before a network round-trip is spent on it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BiometricSample {
    bytes: Vec<u8>,
}

impl BiometricSample {
    /// Wrap raw image bytes, validating the container format.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, VerifierError> {
        if bytes.is_empty() {
            return Err(VerifierError::InvalidSample("empty capture".into()));
        }
        if !is_supported_image(&bytes) {
            return Err(VerifierError::InvalidSample(
                "capture is not a JPEG, PNG, or WebP image".into(),
            ));
        }
        Ok(Self { bytes })
    }

    /// Decode a base64 payload as produced by a browser camera capture.
    ///
    /// Accepts both a bare base64 string and a `data:image/...;base64,`
    /// data URL (everything up to the first comma is discarded).
    pub fn from_base64(data: &str) -> Result<Self, VerifierError> {
        let encoded = match data.split_once(',') {
            Some((_prefix, rest)) => rest,
            None => data,
        };
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(encoded.trim())
            .map_err(|e| VerifierError::InvalidSample(format!("invalid base64: {e}")))?;
        Self::from_bytes(bytes)
    }

    /// The raw image bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Base64 encoding for the wire.
    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.bytes)
    }
}

/// JPEG, PNG, or WebP magic bytes.
fn is_supported_image(bytes: &[u8]) -> bool {
    bytes.starts_with(&[0xFF, 0xD8, 0xFF])
        || bytes.starts_with(&[0x89, b'P', b'N', b'G'])
        || (bytes.len() >= 12 && bytes.starts_with(b"RIFF") && &bytes[8..12] == b"WEBP")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jpeg_fixture() -> Vec<u8> {
        let mut bytes = vec![0xFF, 0xD8, 0xFF, 0xE0];
        bytes.extend_from_slice(&[0u8; 32]);
        bytes
    }

    #[test]
    fn rejects_empty_capture() {
        let err = BiometricSample::from_bytes(Vec::new()).unwrap_err();
        assert!(matches!(err, VerifierError::InvalidSample(_)));
    }

    #[test]
    fn rejects_non_image_payload() {
        let err = BiometricSample::from_bytes(b"not an image".to_vec()).unwrap_err();
        assert!(matches!(err, VerifierError::InvalidSample(_)));
    }

    #[test]
    fn accepts_jpeg_and_png() {
        assert!(BiometricSample::from_bytes(jpeg_fixture()).is_ok());
        let mut png = vec![0x89, b'P', b'N', b'G'];
        png.extend_from_slice(&[0u8; 16]);
        assert!(BiometricSample::from_bytes(png).is_ok());
    }

    #[test]
    fn base64_roundtrip_with_data_url_prefix() {
        let sample = BiometricSample::from_bytes(jpeg_fixture()).unwrap();
        let url = format!("data:image/jpeg;base64,{}", sample.to_base64());
        let decoded = BiometricSample::from_base64(&url).unwrap();
        assert_eq!(decoded, sample);
    }

    #[test]
    fn rejects_garbage_base64() {
        let err = BiometricSample::from_base64("!!not-base64!!").unwrap_err();
        assert!(matches!(err, VerifierError::InvalidSample(_)));
    }
}
