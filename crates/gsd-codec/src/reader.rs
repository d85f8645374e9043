use gsd_core::error::GsdError;

/// Fixed-offset reader over instruction argument bytes (discriminator
/// already stripped). All integers are little-endian.
///
/// Every read is bounds-checked and reports the offset it failed at.
#[derive(Debug, Clone, Copy)]
pub struct FieldReader<'a> {
    data: &'a [u8],
}

impl<'a> FieldReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    fn slice(&self, offset: usize, needed: usize) -> Result<&'a [u8], GsdError> {
        offset
            .checked_add(needed)
            .and_then(|end| self.data.get(offset..end))
            .ok_or(GsdError::Truncated { offset, needed, len: self.data.len() })
    }

    pub fn bytes<const N: usize>(&self, offset: usize) -> Result<[u8; N], GsdError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.slice(offset, N)?);
        Ok(out)
    }

    pub fn u8(&self, offset: usize) -> Result<u8, GsdError> {
        Ok(self.slice(offset, 1)?[0])
    }

    pub fn bool(&self, offset: usize) -> Result<bool, GsdError> {
        Ok(self.u8(offset)? != 0)
    }

    pub fn u16(&self, offset: usize) -> Result<u16, GsdError> {
        Ok(u16::from_le_bytes(self.bytes(offset)?))
    }

    pub fn u32(&self, offset: usize) -> Result<u32, GsdError> {
        Ok(u32::from_le_bytes(self.bytes(offset)?))
    }

    pub fn u64(&self, offset: usize) -> Result<u64, GsdError> {
        Ok(u64::from_le_bytes(self.bytes(offset)?))
    }

    pub fn i64(&self, offset: usize) -> Result<i64, GsdError> {
        Ok(i64::from_le_bytes(self.bytes(offset)?))
    }

    pub fn hash32(&self, offset: usize) -> Result<[u8; 32], GsdError> {
        self.bytes(offset)
    }

    /// Borsh string: u32 byte length followed by UTF-8. Returns the string
    /// and the offset just past it. Empty strings and lengths above `max`
    /// are rejected.
    pub fn string(&self, offset: usize, max: usize) -> Result<(String, usize), GsdError> {
        let len = self.u32(offset)? as usize;
        if len == 0 || len > max {
            return Err(GsdError::StringLength { len, max });
        }
        let start = offset + 4;
        let raw = self.slice(start, len)?;
        let s = std::str::from_utf8(raw).map_err(|_| GsdError::InvalidUtf8)?;
        Ok((s.to_string(), start + len))
    }
}
