//! Test helpers shared by unit, integration and server tests.

mod mock_asset_store;

pub use mock_asset_store::{AssetOp, MockAssetStore, RecordedAssetCall};

use std::io::Cursor;

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};

/// A small valid PNG, for upload paths that decode cover images.
pub fn sample_png() -> Vec<u8> {
    let img = RgbImage::from_fn(8, 6, |x, y| Rgb([(x * 30) as u8, (y * 40) as u8, 128]));
    let mut out = Cursor::new(Vec::new());
    // Encoding an in-memory RGB buffer to PNG does not fail
    let _ = DynamicImage::ImageRgb8(img).write_to(&mut out, ImageFormat::Png);
    out.into_inner()
}

/// Test fixtures.
pub mod fixtures {
    use crate::catalog::{ContentType, Difficulty, NewItem};

    /// A minimal valid item. Books get author 1, everything else none.
    pub fn new_item(content_type: ContentType, title: &str) -> NewItem {
        NewItem {
            content_type,
            title: title.to_string(),
            direction_id: 1,
            sub_direction: None,
            difficulty: Difficulty::Junior,
            author_id: content_type.requires_author().then_some(1),
            edition_date: None,
            description: String::new(),
            language: "en".to_string(),
            web_url: None,
            tags: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_png_decodes() {
        let bytes = sample_png();
        let img = image::load_from_memory(&bytes).unwrap();
        assert_eq!(img.width(), 8);
        assert_eq!(img.height(), 6);
    }
}
