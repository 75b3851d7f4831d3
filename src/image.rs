use crate::ImageError;

type Result<T> = std::result::Result<T, ImageError>;

pub const PALETTE_SIZE: usize = 256 * 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    Indexed8,
    Gray8,
    Rgb24,
    Rgba32,
}

impl PixelFormat {
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            PixelFormat::Indexed8 => 1,
            PixelFormat::Gray8 => 1,
            PixelFormat::Rgb24 => 3,
            PixelFormat::Rgba32 => 4,
        }
    }
}

/// A decoded raster. Owns its pixels and, for indexed images, its palette.
///
/// Rows are `stride` bytes apart; the buffer is zeroed on creation and never
/// resized afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    width: usize,
    height: usize,
    stride: usize,
    format: PixelFormat,
    palette: Option<Box<[u8; PALETTE_SIZE]>>,
    pixels: Vec<u8>,
}

pub struct IndexedPixel<B>(B);
pub struct GrayPixel<B>(B);
pub struct RgbPixel<B>(B);
pub struct RgbaPixel<B>(B);

impl<B: AsRef<[u8]>> IndexedPixel<B> {
    pub fn value(&self) -> u8 {
        self.0.as_ref()[0]
    }
}

impl<B: AsMut<[u8]>> IndexedPixel<B> {
    pub fn set_value(&mut self, value: u8) {
        self.0.as_mut()[0] = value;
    }
}

impl<B: AsRef<[u8]>> GrayPixel<B> {
    pub fn gray(&self) -> u8 {
        self.0.as_ref()[0]
    }
}

impl<B: AsMut<[u8]>> GrayPixel<B> {
    pub fn set_gray(&mut self, value: u8) {
        self.0.as_mut()[0] = value;
    }
}

impl<B: AsRef<[u8]>> RgbPixel<B> {
    pub fn red(&self) -> u8 {
        self.0.as_ref()[0]
    }

    pub fn green(&self) -> u8 {
        self.0.as_ref()[1]
    }

    pub fn blue(&self) -> u8 {
        self.0.as_ref()[2]
    }
}

impl<B: AsMut<[u8]>> RgbPixel<B> {
    pub fn set_red(&mut self, value: u8) {
        self.0.as_mut()[0] = value;
    }

    pub fn set_green(&mut self, value: u8) {
        self.0.as_mut()[1] = value;
    }

    pub fn set_blue(&mut self, value: u8) {
        self.0.as_mut()[2] = value;
    }
}

impl<B: AsRef<[u8]>> RgbaPixel<B> {
    pub fn red(&self) -> u8 {
        self.0.as_ref()[0]
    }

    pub fn green(&self) -> u8 {
        self.0.as_ref()[1]
    }

    pub fn blue(&self) -> u8 {
        self.0.as_ref()[2]
    }

    pub fn alpha(&self) -> u8 {
        self.0.as_ref()[3]
    }
}

impl<B: AsMut<[u8]>> RgbaPixel<B> {
    pub fn set_red(&mut self, value: u8) {
        self.0.as_mut()[0] = value;
    }

    pub fn set_green(&mut self, value: u8) {
        self.0.as_mut()[1] = value;
    }

    pub fn set_blue(&mut self, value: u8) {
        self.0.as_mut()[2] = value;
    }

    pub fn set_alpha(&mut self, value: u8) {
        self.0.as_mut()[3] = value;
    }
}

impl Image {
    pub fn new(height: usize, width: usize, stride: usize, format: PixelFormat) -> Result<Self> {
        let geometry = ImageError::InvalidGeometry {
            width,
            height,
            stride,
        };
        let row_size = width.checked_mul(format.bytes_per_pixel());
        let size = stride.checked_mul(height);
        let (row_size, size) = match (row_size, size) {
            (Some(row_size), Some(size)) => (row_size, size),
            _ => return Err(geometry),
        };
        if width == 0 || height == 0 || stride == 0 || stride < row_size {
            return Err(geometry);
        }
        let palette = match format {
            PixelFormat::Indexed8 => Some(Box::new([0; PALETTE_SIZE])),
            _ => None,
        };
        Ok(Image {
            width,
            height,
            stride,
            format,
            palette,
            pixels: vec![0; size],
        })
    }

    /// Tightly packed image, `stride == width * bytes_per_pixel`.
    pub fn packed(height: usize, width: usize, format: PixelFormat) -> Result<Self> {
        let stride = width
            .checked_mul(format.bytes_per_pixel())
            .ok_or(ImageError::InvalidGeometry {
                width,
                height,
                stride: usize::MAX,
            })?;
        Image::new(height, width, stride, format)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn bytes_per_pixel(&self) -> usize {
        self.format.bytes_per_pixel()
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn palette(&self) -> Option<&[u8]> {
        self.palette.as_ref().map(|p| &p[..])
    }

    pub fn set_palette(&mut self, palette: &[u8; PALETTE_SIZE]) -> Result<()> {
        match self.palette.as_mut() {
            Some(target) => {
                target.copy_from_slice(palette);
                Ok(())
            }
            None => Err(ImageError::NoPalette),
        }
    }

    fn check_format(&self, expected: PixelFormat) -> Result<()> {
        if self.format != expected {
            Err(ImageError::FormatMismatch {
                expected,
                actual: self.format,
            })
        } else {
            Ok(())
        }
    }

    fn offset(&self, col: usize, row: usize) -> Result<usize> {
        if col >= self.width || row >= self.height {
            return Err(ImageError::PixelOutOfBounds(
                col,
                row,
                self.width,
                self.height,
            ));
        }
        Ok(self.stride * row + self.bytes_per_pixel() * col)
    }

    fn pixel(&self, expected: PixelFormat, col: usize, row: usize) -> Result<&[u8]> {
        self.check_format(expected)?;
        let offset = self.offset(col, row)?;
        Ok(&self.pixels[offset..offset + self.bytes_per_pixel()])
    }

    fn pixel_mut(&mut self, expected: PixelFormat, col: usize, row: usize) -> Result<&mut [u8]> {
        self.check_format(expected)?;
        let offset = self.offset(col, row)?;
        let bpp = self.bytes_per_pixel();
        Ok(&mut self.pixels[offset..offset + bpp])
    }

    pub fn indexed(&self, col: usize, row: usize) -> Result<IndexedPixel<&[u8]>> {
        self.pixel(PixelFormat::Indexed8, col, row).map(IndexedPixel)
    }

    pub fn indexed_mut(&mut self, col: usize, row: usize) -> Result<IndexedPixel<&mut [u8]>> {
        self.pixel_mut(PixelFormat::Indexed8, col, row)
            .map(IndexedPixel)
    }

    pub fn gray(&self, col: usize, row: usize) -> Result<GrayPixel<&[u8]>> {
        self.pixel(PixelFormat::Gray8, col, row).map(GrayPixel)
    }

    pub fn gray_mut(&mut self, col: usize, row: usize) -> Result<GrayPixel<&mut [u8]>> {
        self.pixel_mut(PixelFormat::Gray8, col, row).map(GrayPixel)
    }

    pub fn rgb(&self, col: usize, row: usize) -> Result<RgbPixel<&[u8]>> {
        self.pixel(PixelFormat::Rgb24, col, row).map(RgbPixel)
    }

    pub fn rgb_mut(&mut self, col: usize, row: usize) -> Result<RgbPixel<&mut [u8]>> {
        self.pixel_mut(PixelFormat::Rgb24, col, row).map(RgbPixel)
    }

    pub fn rgba(&self, col: usize, row: usize) -> Result<RgbaPixel<&[u8]>> {
        self.pixel(PixelFormat::Rgba32, col, row).map(RgbaPixel)
    }

    pub fn rgba_mut(&mut self, col: usize, row: usize) -> Result<RgbaPixel<&mut [u8]>> {
        self.pixel_mut(PixelFormat::Rgba32, col, row).map(RgbaPixel)
    }

    pub fn color(&self, index: usize) -> Result<RgbPixel<&[u8]>> {
        if index >= 256 {
            return Err(ImageError::PaletteIndexOutOfBounds(index));
        }
        match self.palette.as_ref() {
            Some(palette) => Ok(RgbPixel(&palette[index * 3..index * 3 + 3])),
            None => Err(ImageError::NoPalette),
        }
    }

    pub fn color_mut(&mut self, index: usize) -> Result<RgbPixel<&mut [u8]>> {
        if index >= 256 {
            return Err(ImageError::PaletteIndexOutOfBounds(index));
        }
        match self.palette.as_mut() {
            Some(palette) => Ok(RgbPixel(&mut palette[index * 3..index * 3 + 3])),
            None => Err(ImageError::NoPalette),
        }
    }

    /// Bytes of `count` pixels starting at `(col, row)`, all within one row.
    pub fn span_mut(&mut self, col: usize, row: usize, count: usize) -> Result<&mut [u8]> {
        if count == 0 || count > self.width || col > self.width - count {
            return Err(ImageError::PixelOutOfBounds(
                col.saturating_add(count.max(1) - 1),
                row,
                self.width,
                self.height,
            ));
        }
        let offset = self.offset(col, row)?;
        let end = offset + count * self.bytes_per_pixel();
        Ok(&mut self.pixels[offset..end])
    }

    /// The `width * bytes_per_pixel` meaningful bytes of a row, without padding.
    pub fn row(&self, row: usize) -> Result<&[u8]> {
        let offset = self.offset(0, row)?;
        Ok(&self.pixels[offset..offset + self.width * self.bytes_per_pixel()])
    }

    pub fn row_mut(&mut self, row: usize) -> Result<&mut [u8]> {
        let offset = self.offset(0, row)?;
        let end = offset + self.width * self.bytes_per_pixel();
        Ok(&mut self.pixels[offset..end])
    }
}

/// Reorder pixels stored blue first (BGR or BGRA) into red first, in place.
pub fn swap_red_blue(pixels: &mut [u8], format: PixelFormat) {
    match format {
        PixelFormat::Rgb24 | PixelFormat::Rgba32 => {
            for pixel in pixels.chunks_exact_mut(format.bytes_per_pixel()) {
                pixel.swap(0, 2);
            }
        }
        PixelFormat::Indexed8 | PixelFormat::Gray8 => {}
    }
}
