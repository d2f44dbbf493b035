use std::io::Cursor;
use std::path::Path;

use image::{ColorType, DynamicImage, ImageFormat};
use log::{debug, warn};
use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, Stream, dictionary};

use super::error::AssemblyError;
use super::fetch::LocalImageCopy;

/// Pixel data ready to be placed as a PDF image XObject.
struct PageImage {
    width: u32,
    height: u32,
    color_space: &'static str,
    jpeg: Vec<u8>,
}

impl PageImage {
    fn load(path: &Path) -> Result<Self, AssemblyError> {
        let bytes = std::fs::read(path)?;
        let decoded = image::load_from_memory(&bytes)?;
        let (width, height) = (decoded.width(), decoded.height());

        // JPEGs go in untouched; everything else is flattened to RGB first.
        if image::guess_format(&bytes).ok() == Some(ImageFormat::Jpeg) {
            match decoded.color() {
                ColorType::Rgb8 => return Ok(Self::jpeg(width, height, "DeviceRGB", bytes)),
                ColorType::L8 => return Ok(Self::jpeg(width, height, "DeviceGray", bytes)),
                _ => {}
            }
        }

        let mut jpeg = Vec::new();
        DynamicImage::ImageRgb8(decoded.to_rgb8())
            .write_to(&mut Cursor::new(&mut jpeg), ImageFormat::Jpeg)?;
        Ok(Self::jpeg(width, height, "DeviceRGB", jpeg))
    }

    fn jpeg(width: u32, height: u32, color_space: &'static str, jpeg: Vec<u8>) -> Self {
        Self {
            width,
            height,
            color_space,
            jpeg,
        }
    }
}

/// Writes one page per image, in the given order, sized to the image.
/// Images that fail to decode are logged and left out. Returns the number
/// of pages written.
pub fn assemble_pdf(images: &[LocalImageCopy], output: &Path) -> Result<usize, AssemblyError> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let mut kids: Vec<Object> = Vec::with_capacity(images.len());

    for copy in images {
        let page = match PageImage::load(&copy.path) {
            Ok(page) => page,
            Err(err) => {
                warn!("skipping image {} ({}): {err}", copy.index, copy.source);
                continue;
            }
        };

        let (width, height) = (i64::from(page.width), i64::from(page.height));
        let image_id = doc.add_object(
            Stream::new(
                dictionary! {
                    "Type" => "XObject",
                    "Subtype" => "Image",
                    "Width" => width,
                    "Height" => height,
                    "ColorSpace" => page.color_space,
                    "BitsPerComponent" => 8,
                    "Filter" => "DCTDecode",
                },
                page.jpeg,
            )
            .with_compression(false),
        );

        let content = Content {
            operations: vec![
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    vec![
                        width.into(),
                        0.into(),
                        0.into(),
                        height.into(),
                        0.into(),
                        0.into(),
                    ],
                ),
                Operation::new("Do", vec!["Im0".into()]),
                Operation::new("Q", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), width.into(), height.into()],
            "Contents" => content_id,
            "Resources" => dictionary! {
                "XObject" => dictionary! { "Im0" => image_id },
            },
        });
        kids.push(page_id.into());
    }

    if kids.is_empty() {
        return Err(AssemblyError::NoPages);
    }

    let page_count = kids.len();
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_count as i64,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut file = std::fs::File::create(output)?;
    doc.save_to(&mut file)?;
    debug!("wrote {page_count} pages to {}", output.display());

    Ok(page_count)
}
