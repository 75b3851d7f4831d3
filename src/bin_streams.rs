use byteorder::{ByteOrder, LittleEndian};

use crate::MemoryFileError;

type Result<T> = std::result::Result<T, MemoryFileError>;

/// Little endian reader over a borrowed byte range.
///
/// The position never leaves `[0, len]`. Every read checks that the
/// requested bytes lie inside the range before touching them.
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    position: usize,
}

/// Writer counterpart of [`ByteReader`] over a mutable byte range.
#[derive(Debug)]
pub struct ByteWriter<'a> {
    data: &'a mut [u8],
    position: usize,
}

fn check_range(position: usize, count: usize, size: usize) -> Result<()> {
    match position.checked_add(count) {
        Some(end) if end <= size => Ok(()),
        _ => Err(MemoryFileError::OutOfBounds {
            position,
            count,
            size,
        }),
    }
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        ByteReader { data, position: 0 }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn tell(&self) -> usize {
        self.position
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.position
    }

    pub fn is_eof(&self) -> bool {
        self.position == self.data.len()
    }

    pub fn seek(&mut self, position: usize) -> Result<()> {
        if position > self.data.len() {
            return Err(MemoryFileError::BadPosition(position, self.data.len()));
        }
        self.position = position;
        Ok(())
    }

    pub fn skip(&mut self, amount: usize) -> Result<()> {
        check_range(self.position, amount, self.data.len())?;
        self.position += amount;
        Ok(())
    }

    pub fn rewind(&mut self, amount: usize) -> Result<()> {
        match self.position.checked_sub(amount) {
            Some(position) => self.seek(position),
            None => Err(MemoryFileError::BadPosition(0, self.data.len())),
        }
    }

    /// Borrow the next `count` bytes and advance past them.
    pub fn read_bytes(&mut self, count: usize) -> Result<&'a [u8]> {
        check_range(self.position, count, self.data.len())?;
        let data: &'a [u8] = self.data;
        let bytes = &data[self.position..self.position + count];
        self.position += count;
        Ok(bytes)
    }

    pub fn read_into(&mut self, target: &mut [u8]) -> Result<()> {
        let bytes = self.read_bytes(target.len())?;
        target.copy_from_slice(bytes);
        Ok(())
    }

    /// Carve a view of the next `count` bytes without copying.
    pub fn sub_reader(&mut self, count: usize) -> Result<ByteReader<'a>> {
        Ok(ByteReader::new(self.read_bytes(count)?))
    }

    pub fn peek_u32(&self) -> Result<u32> {
        check_range(self.position, 4, self.data.len())?;
        Ok(LittleEndian::read_u32(&self.data[self.position..]))
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_bytes(1)?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(LittleEndian::read_u16(self.read_bytes(2)?))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(LittleEndian::read_u32(self.read_bytes(4)?))
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(self.read_u32()? as i32)
    }

    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut array = [0; N];
        self.read_into(&mut array)?;
        Ok(array)
    }

    /// Everything from the current position to the end of the range.
    pub fn remaining_bytes(&self) -> &'a [u8] {
        let data: &'a [u8] = self.data;
        &data[self.position..]
    }
}

impl<'a> ByteWriter<'a> {
    pub fn new(data: &'a mut [u8]) -> Self {
        ByteWriter { data, position: 0 }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn tell(&self) -> usize {
        self.position
    }

    pub fn seek(&mut self, position: usize) -> Result<()> {
        if position > self.data.len() {
            return Err(MemoryFileError::BadPosition(position, self.data.len()));
        }
        self.position = position;
        Ok(())
    }

    pub fn skip(&mut self, amount: usize) -> Result<()> {
        check_range(self.position, amount, self.data.len())?;
        self.position += amount;
        Ok(())
    }

    pub fn write_bytes(&mut self, value: &[u8]) -> Result<()> {
        check_range(self.position, value.len(), self.data.len())?;
        self.data[self.position..self.position + value.len()].copy_from_slice(value);
        self.position += value.len();
        Ok(())
    }

    pub fn write_u8(&mut self, value: u8) -> Result<()> {
        self.write_bytes(&[value])
    }

    pub fn write_u16(&mut self, value: u16) -> Result<()> {
        self.write_bytes(&value.to_le_bytes())
    }

    pub fn write_u32(&mut self, value: u32) -> Result<()> {
        self.write_bytes(&value.to_le_bytes())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn read_little_endian() {
        let data = vec![0x14, 0xFE, 0x15, 0x14, 0x13, 0xFE, 0x7F];
        let mut reader = ByteReader::new(&data);
        assert_eq!(0xFE14, reader.read_u16().unwrap());
        assert_eq!(0xFE131415, reader.read_u32().unwrap());
        assert_eq!(0x7F, reader.read_u8().unwrap());
        assert!(reader.is_eof());
    }

    #[test]
    fn read_past_end_fails() {
        let data = vec![1, 2, 3];
        let mut reader = ByteReader::new(&data);
        reader.skip(2).unwrap();
        assert_eq!(
            Err(MemoryFileError::OutOfBounds {
                position: 2,
                count: 2,
                size: 3
            }),
            reader.read_u16()
        );
        // A failed read leaves the position untouched.
        assert_eq!(2, reader.tell());
    }

    #[test]
    fn seek_and_rewind() {
        let data = vec![0; 8];
        let mut reader = ByteReader::new(&data);
        assert!(reader.seek(8).is_ok());
        assert!(reader.seek(9).is_err());
        assert!(reader.rewind(3).is_ok());
        assert_eq!(5, reader.tell());
        assert!(reader.rewind(6).is_err());
        assert!(reader.skip(4).is_err());
    }

    #[test]
    fn sub_reader_borrows_range() {
        let data = vec![1, 2, 3, 4, 5, 6];
        let mut reader = ByteReader::new(&data);
        reader.skip(1).unwrap();
        let mut view = reader.sub_reader(3).unwrap();
        assert_eq!(4, reader.tell());
        assert_eq!(3, view.len());
        assert_eq!(&[2, 3, 4], view.read_bytes(3).unwrap());
        assert!(view.read_u8().is_err());
    }

    #[test]
    fn peek_does_not_advance() {
        let data = b"D32F".to_vec();
        let reader = ByteReader::new(&data);
        assert_eq!(0x46323344, reader.peek_u32().unwrap());
        assert_eq!(0, reader.tell());
    }

    #[test]
    fn write_within_bounds() {
        let mut data = vec![0; 7];
        let mut writer = ByteWriter::new(&mut data);
        writer.write_u16(0xFE14).unwrap();
        writer.write_u32(0x11121314).unwrap();
        writer.write_u8(9).unwrap();
        assert!(writer.write_u8(1).is_err());
        assert_eq!(vec![0x14, 0xFE, 0x14, 0x13, 0x12, 0x11, 9], data);
    }
}
