use crate::TransferError;

/// A contiguous byte range `[start, end)` of the file, uploaded as one part.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartRange {
    /// 1-based part number.
    pub part_number: u32,
    pub start: u64,
    pub end: u64,
}

impl PartRange {
    /// Size of this part in bytes.
    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    /// Returns `true` for a zero-length range.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// `ceil(total_size / part_size)`.
pub fn total_parts(total_size: u64, part_size: u64) -> Result<u32, TransferError> {
    if part_size == 0 {
        return Err(TransferError::ZeroPartSize);
    }
    Ok(total_size.div_ceil(part_size) as u32)
}

/// Splits `[0, total_size)` into `part_size` slices; the last one holds the
/// remainder. Part numbers start at 1 and have no gaps.
pub fn plan_parts(total_size: u64, part_size: u64) -> Result<Vec<PartRange>, TransferError> {
    let count = total_parts(total_size, part_size)?;
    let mut parts = Vec::with_capacity(count as usize);
    let mut offset = 0u64;
    let mut part_number = 1u32;
    while offset < total_size {
        let end = offset.saturating_add(part_size).min(total_size);
        parts.push(PartRange {
            part_number,
            start: offset,
            end,
        });
        offset = end;
        part_number += 1;
    }
    Ok(parts)
}
