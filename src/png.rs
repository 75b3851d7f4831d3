use ::png::{BitDepth, ColorType, Encoder, EncodingError};

use crate::{ByteWriter, Image, PixelFormat};

type Result<T> = std::result::Result<T, EncodingError>;

/// Copy of an opaque `Rgba32` image as `Rgb24`, or `None` if the image has
/// another format or any translucent pixel.
pub fn drop_opaque_alpha(image: &Image) -> Option<Image> {
    if image.format() != PixelFormat::Rgba32 {
        return None;
    }
    let opaque = (0..image.height()).all(|y| match image.row(y) {
        Ok(row) => row.chunks(4).all(|pixel| pixel[3] == 255),
        Err(_) => false,
    });
    if !opaque {
        return None;
    }

    let mut rgb = Image::packed(image.height(), image.width(), PixelFormat::Rgb24).ok()?;
    for y in 0..image.height() {
        let source = image.row(y).ok()?;
        let target = rgb.row_mut(y).ok()?;
        for (to, from) in target.chunks_mut(3).zip(source.chunks(4)) {
            to.copy_from_slice(&from[..3]);
        }
    }
    Some(rgb)
}

/// Encode as PNG, downgrading fully opaque RGBA to RGB first.
pub fn encode(image: &Image) -> Result<Vec<u8>> {
    match drop_opaque_alpha(image) {
        Some(rgb) => encode_exact(&rgb),
        None => encode_exact(image),
    }
}

/// Encode as PNG in the image's own format. Indexed images keep their palette.
pub fn encode_exact(image: &Image) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    {
        let mut encoder = Encoder::new(&mut bytes, image.width() as u32, image.height() as u32);
        encoder.set_color(color_type(image.format()));
        encoder.set_depth(BitDepth::Eight);
        if let Some(palette) = image.palette() {
            encoder.set_palette(palette.to_vec());
        }
        let mut writer = encoder.write_header()?;
        writer.write_image_data(&packed_rows(image))?;
    }
    Ok(bytes)
}

fn color_type(format: PixelFormat) -> ColorType {
    match format {
        PixelFormat::Indexed8 => ColorType::Indexed,
        PixelFormat::Gray8 => ColorType::Grayscale,
        PixelFormat::Rgb24 => ColorType::Rgb,
        PixelFormat::Rgba32 => ColorType::Rgba,
    }
}

// Scanlines without stride padding, top to bottom.
fn packed_rows(image: &Image) -> Vec<u8> {
    let row_size = image.width() * image.bytes_per_pixel();
    if image.stride() == row_size {
        return image.pixels().to_vec();
    }
    let mut data = vec![0; row_size * image.height()];
    let mut writer = ByteWriter::new(&mut data);
    for row in image.pixels().chunks(image.stride()) {
        if writer.write_bytes(&row[..row_size]).is_err() {
            break;
        }
    }
    data
}

#[cfg(test)]
mod test {
    use super::*;
    use ::png::{Decoder, Transformations};

    fn decode(bytes: &[u8]) -> (::png::OutputInfo, Vec<u8>, Option<Vec<u8>>) {
        let mut decoder = Decoder::new(bytes);
        decoder.set_transformations(Transformations::IDENTITY);
        let mut reader = decoder.read_info().unwrap();
        let palette = reader.info().palette.as_ref().map(|p| p.to_vec());
        let mut buffer = vec![0; reader.output_buffer_size()];
        let info = reader.next_frame(&mut buffer).unwrap();
        buffer.truncate(info.buffer_size());
        (info, buffer, palette)
    }

    fn rgba(alpha: u8) -> Image {
        let mut image = Image::packed(1, 2, PixelFormat::Rgba32).unwrap();
        for x in 0..2 {
            let mut pixel = image.rgba_mut(x, 0).unwrap();
            pixel.set_red(10 * x as u8 + 1);
            pixel.set_green(2);
            pixel.set_blue(3);
            pixel.set_alpha(255);
        }
        image.rgba_mut(1, 0).unwrap().set_alpha(alpha);
        image
    }

    #[test]
    fn opaque_alpha_is_dropped() {
        let rgb = drop_opaque_alpha(&rgba(255)).unwrap();
        assert_eq!(PixelFormat::Rgb24, rgb.format());
        assert_eq!(&[1, 2, 3, 11, 2, 3], rgb.row(0).unwrap());
        assert!(drop_opaque_alpha(&rgba(254)).is_none());

        let (info, data, _) = decode(&encode(&rgba(255)).unwrap());
        assert_eq!(ColorType::Rgb, info.color_type);
        assert_eq!(vec![1, 2, 3, 11, 2, 3], data);
    }

    #[test]
    fn translucent_image_keeps_alpha() {
        let (info, data, _) = decode(&encode(&rgba(7)).unwrap());
        assert_eq!(ColorType::Rgba, info.color_type);
        assert_eq!(vec![1, 2, 3, 255, 11, 2, 3, 7], data);

        let (info, _, _) = decode(&encode_exact(&rgba(255)).unwrap());
        assert_eq!(ColorType::Rgba, info.color_type);
    }

    #[test]
    fn indexed_keeps_palette() {
        let mut image = Image::packed(2, 2, PixelFormat::Indexed8).unwrap();
        image.row_mut(1).unwrap().copy_from_slice(&[1, 2]);
        image.color_mut(2).unwrap().set_red(200);
        let (info, data, palette) = decode(&encode(&image).unwrap());
        assert_eq!(ColorType::Indexed, info.color_type);
        assert_eq!(vec![0, 0, 1, 2], data);
        assert_eq!(Some(200), palette.map(|p| p[6]));
    }

    #[test]
    fn stride_padding_is_removed() {
        let mut image = Image::new(2, 1, 4, PixelFormat::Gray8).unwrap();
        image.gray_mut(0, 0).unwrap().set_gray(5);
        image.gray_mut(0, 1).unwrap().set_gray(6);
        let (info, data, _) = decode(&encode(&image).unwrap());
        assert_eq!(ColorType::Grayscale, info.color_type);
        assert_eq!((1, 2), (info.width, info.height));
        assert_eq!(vec![5, 6], data);
    }
}
