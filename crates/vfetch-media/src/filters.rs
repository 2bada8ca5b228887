//! FFmpeg video filter definitions.

/// Fit the input inside `width`x`height` keeping its aspect ratio, then pad the
/// remaining area so the output is exactly `width`x`height`.
pub fn scale_and_pad(width: u32, height: u32) -> String {
    format!(
        "scale={w}:{h}:force_original_aspect_ratio=decrease,pad={w}:{h}:(ow-iw)/2:(oh-ih)/2,setsar=1",
        w = width,
        h = height
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale_and_pad() {
        assert_eq!(
            scale_and_pad(1280, 720),
            "scale=1280:720:force_original_aspect_ratio=decrease,pad=1280:720:(ow-iw)/2:(oh-ih)/2,setsar=1"
        );
    }

    #[test]
    fn test_scale_and_pad_480p() {
        assert!(scale_and_pad(854, 480).contains("pad=854:480:"));
    }
}
