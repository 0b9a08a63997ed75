use crate::common::phys::PhysLayer;
use crate::decode::PhysDecodeLevel;
use crate::error::RequestError;

pub(crate) struct ReadBuffer {
    buffer: Vec<u8>,
    begin: usize,
    end: usize,
}

impl ReadBuffer {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            buffer: vec![0; capacity],
            begin: 0,
            end: 0,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.end - self.begin
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.begin == self.end
    }

    /// Discard any accumulated bytes. Called when the underlying connection
    /// is replaced so that data from a dead connection never prefixes the
    /// stream of the next one.
    pub(crate) fn clear(&mut self) {
        self.begin = 0;
        self.end = 0;
    }

    pub(crate) fn read(&mut self, count: usize) -> Result<&[u8], RequestError> {
        if self.len() < count {
            return Err(
                crate::error::InternalError::InsufficientBytesForRead(count, self.len()).into(),
            );
        }

        match self.buffer.get(self.begin..(self.begin + count)) {
            Some(ret) => {
                self.begin += count;
                Ok(ret)
            }
            None => Err(
                crate::error::InternalError::InsufficientBytesForRead(count, self.len()).into(),
            ),
        }
    }

    pub(crate) fn read_u8(&mut self) -> Result<u8, RequestError> {
        if self.is_empty() {
            return Err(crate::error::InternalError::InsufficientBytesForRead(1, 0).into());
        }
        match self.buffer.get(self.begin) {
            Some(ret) => {
                self.begin += 1;
                Ok(*ret)
            }
            None => Err(crate::error::InternalError::InsufficientBytesForRead(1, 0).into()),
        }
    }

    pub(crate) fn read_u16_be(&mut self) -> Result<u16, RequestError> {
        let high = self.read_u8()?;
        let low = self.read_u8()?;
        Ok(((high as u16) << 8) | (low as u16))
    }

    pub(crate) async fn read_some(
        &mut self,
        io: &mut PhysLayer,
        level: PhysDecodeLevel,
    ) -> Result<usize, RequestError> {
        // before we read any data, check to see if the buffer is empty and adjust the indices
        // this allows use to make the biggest read possible, and avoids subsequent buffer shifting later
        if self.is_empty() {
            self.begin = 0;
            self.end = 0;
        }

        // if we've reached capacity, but still need more data we have to shift
        if self.end == self.buffer.len() {
            let length = self.len();
            self.buffer.copy_within(self.begin..self.end, 0);
            self.begin = 0;
            self.end = length;
        }

        let dest = match self.buffer.get_mut(self.end..) {
            Some(x) => x,
            None => {
                return Err(crate::error::InternalError::InsufficientBytesForRead(0, 0).into());
            }
        };

        let count = io.read(dest, level).await?;
        if count == 0 {
            return Err(std::io::Error::from(std::io::ErrorKind::UnexpectedEof).into());
        }

        self.end += count;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::InternalError;

    #[test]
    fn errors_when_insufficient_bytes_for_read() {
        let mut buffer = ReadBuffer::new(16);
        assert_eq!(
            buffer.read(1),
            Err(InternalError::InsufficientBytesForRead(1, 0).into())
        );
    }

    #[tokio::test]
    async fn clear_discards_accumulated_bytes() {
        let (io, mut handle) = tokio_test::io::Builder::new().build_with_handle();
        let mut phys = PhysLayer::new_mock(io);
        let mut buffer = ReadBuffer::new(16);

        handle.read(&[0x00, 0x01, 0x02]);
        buffer
            .read_some(&mut phys, PhysDecodeLevel::Nothing)
            .await
            .unwrap();
        assert_eq!(buffer.len(), 3);

        buffer.clear();
        assert!(buffer.is_empty());
    }

    #[tokio::test]
    async fn reads_data_into_buffer() {
        let (io, mut handle) = tokio_test::io::Builder::new().build_with_handle();
        let mut phys = PhysLayer::new_mock(io);
        let mut buffer = ReadBuffer::new(16);

        handle.read(&[0xCA, 0xFE]);

        let count = buffer
            .read_some(&mut phys, PhysDecodeLevel::Nothing)
            .await
            .unwrap();
        assert_eq!(count, 2);
        assert_eq!(buffer.read_u16_be().unwrap(), 0xCAFE);
        assert!(buffer.is_empty());
    }
}
