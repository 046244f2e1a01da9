//! Audio file helpers that need no I/O.

/// Duration in seconds of a RIFF/WAVE file held in `bytes`.
///
/// Synthesizers that stream to stdout leave the data chunk size unset
/// (`0` or `0xFFFFFFFF`); the bytes actually present are used instead.
pub fn wav_duration(bytes: &[u8]) -> Option<f64> {
    if bytes.len() < 12 || &bytes[0..4] != b"RIFF" || &bytes[8..12] != b"WAVE" {
        return None;
    }

    let mut byte_rate: Option<u32> = None;
    let mut offset = 12;

    while offset + 8 <= bytes.len() {
        let id = &bytes[offset..offset + 4];
        let size = u32::from_le_bytes(bytes[offset + 4..offset + 8].try_into().ok()?);
        let body = offset + 8;

        match id {
            b"fmt " => {
                let rate = bytes.get(body + 8..body + 12)?;
                byte_rate = Some(u32::from_le_bytes(rate.try_into().ok()?));
            }
            b"data" => {
                let rate = byte_rate.filter(|r| *r > 0)?;
                let available = (bytes.len() - body) as u64;
                let declared = u64::from(size);
                let data_len = if declared == 0 || size == u32::MAX {
                    available
                } else {
                    declared.min(available)
                };
                return Some(data_len as f64 / f64::from(rate));
            }
            _ => {}
        }

        // Chunks are padded to an even length.
        offset = body + size as usize + (size as usize & 1);
    }

    None
}
