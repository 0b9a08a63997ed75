use crate::common::cursor::{ReadCursor, WriteCursor};
use crate::common::traits::Serialize;
use crate::error::RequestError;
use crate::types::{coil_from_u16, coil_to_u16, AddressRange, Indexed, WriteMultiple};

pub(crate) trait Parse: Sized {
    fn parse(cursor: &mut ReadCursor) -> Result<Self, RequestError>;
}

impl Serialize for AddressRange {
    fn serialize(&self, cursor: &mut WriteCursor) -> Result<(), RequestError> {
        cursor.write_u16_be(self.start)?;
        cursor.write_u16_be(self.count)?;
        Ok(())
    }
}

impl Parse for AddressRange {
    fn parse(cursor: &mut ReadCursor) -> Result<Self, RequestError> {
        let start = cursor.read_u16_be()?;
        let count = cursor.read_u16_be()?;
        Ok(AddressRange::try_from(start, count)?)
    }
}

impl Serialize for Indexed<u16> {
    fn serialize(&self, cursor: &mut WriteCursor) -> Result<(), RequestError> {
        cursor.write_u16_be(self.index)?;
        cursor.write_u16_be(self.value)?;
        Ok(())
    }
}

impl Parse for Indexed<u16> {
    fn parse(cursor: &mut ReadCursor) -> Result<Self, RequestError> {
        Ok(Indexed::new(cursor.read_u16_be()?, cursor.read_u16_be()?))
    }
}

impl Serialize for Indexed<bool> {
    fn serialize(&self, cursor: &mut WriteCursor) -> Result<(), RequestError> {
        cursor.write_u16_be(self.index)?;
        cursor.write_u16_be(coil_to_u16(self.value))?;
        Ok(())
    }
}

impl Parse for Indexed<bool> {
    fn parse(cursor: &mut ReadCursor) -> Result<Self, RequestError> {
        let index = cursor.read_u16_be()?;
        let value = coil_from_u16(cursor.read_u16_be()?)?;
        Ok(Indexed::new(index, value))
    }
}

impl Serialize for WriteMultiple {
    fn serialize(&self, cursor: &mut WriteCursor) -> Result<(), RequestError> {
        self.range.serialize(cursor)?;

        let byte_count = self.values.len() * 2;
        if byte_count > u8::MAX as usize {
            return Err(crate::error::InternalError::BadByteCount(byte_count).into());
        }

        cursor.write_u8(byte_count as u8)?;
        for value in &self.values {
            cursor.write_u16_be(*value)?;
        }
        Ok(())
    }
}
