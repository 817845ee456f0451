use contracts::ImageData;

use super::{Encoded, Fragment};
use crate::error::EncodeError;

/// Dense row-major pixels, written verbatim
pub(super) fn encode(image: &ImageData) -> Result<Encoded, EncodeError> {
    let expected =
        image.width as usize * image.height as usize * image.format.bytes_per_pixel();
    if image.data.len() != expected {
        return Err(EncodeError::ImageSize {
            width: image.width,
            height: image.height,
            format: image.format.as_str(),
            expected,
            actual: image.data.len(),
        });
    }

    Ok(Encoded::with_file(
        Fragment::Camera {
            width: image.width,
            height: image.height,
            format: image.format.as_str(),
        },
        image.data.clone(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use contracts::ImageFormat;

    fn image(width: u32, height: u32, len: usize) -> ImageData {
        ImageData {
            width,
            height,
            format: ImageFormat::Bgra8,
            data: Bytes::from((0..len).map(|i| (i % 251) as u8).collect::<Vec<_>>()),
        }
    }

    #[test]
    fn bgra_buffer_is_kept_verbatim() {
        let input = image(64, 48, 64 * 48 * 4);
        let encoded = encode(&input).unwrap();

        assert_eq!(
            encoded.fragment,
            Fragment::Camera {
                width: 64,
                height: 48,
                format: "bgra8"
            }
        );
        let payload = encoded.payload.unwrap();
        assert_eq!(payload.len(), 12288);
        assert_eq!(payload, input.data);
    }

    #[test]
    fn short_buffer_is_rejected() {
        let err = encode(&image(64, 48, 100)).unwrap_err();
        assert!(matches!(
            err,
            EncodeError::ImageSize {
                expected: 12288,
                actual: 100,
                ..
            }
        ));
    }
}
