use crate::consts::FRAME_HEADER_LEN;

/// Folds one byte into a running CRC-8 (Dallas/Maxim, reflected polynomial
/// 0x8C), bit-serial. No lookup table, so it is cheap enough to run from
/// the tick interrupt.
pub(crate) fn crc8_update(crc: u8, byte: u8) -> u8 {
    let mut crc = crc;
    let mut b = byte;
    for _ in 0..8 {
        let mix = (crc ^ b) & 0x01;
        crc >>= 1;
        if mix != 0 {
            crc ^= 0x8C;
        }
        b >>= 1;
    }
    crc
}

/// Checksum over a frame's header bytes followed by its payload bytes.
pub(crate) fn compute(header: &[u8; FRAME_HEADER_LEN], payload: &[u8]) -> u8 {
    let mut crc = 0;
    for &b in header {
        crc = crc8_update(crc, b);
    }
    for &b in payload {
        crc = crc8_update(crc, b);
    }
    crc
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crc_is_deterministic() {
        let header = [1, 2, 1, 4];
        let payload = [0x00, 0xFF, 0x42];
        assert_eq!(compute(&header, &payload), compute(&header, &payload));
    }

    #[test]
    fn test_crc_oracle_values() {
        // Known Dallas/Maxim CRC-8 vectors.
        let mut crc = 0;
        for b in [0x02, 0x1C, 0xB8, 0x01, 0x00, 0x00, 0x00, 0xA2] {
            crc = crc8_update(crc, b);
        }
        assert_eq!(crc, 0x00); // last byte is the stored CRC of the rest
        assert_eq!(compute(&[0, 0, 0, 0], &[]), 0x00);
    }

    #[test]
    fn test_single_bit_flip_always_changes_crc() {
        let header = [7, 3, 4, 9];
        let payload = [0xDE, 0xAD, 0xBE, 0xEF, 0x01];
        let reference = compute(&header, &payload);

        for byte_idx in 0..(header.len() + payload.len()) {
            for bit in 0..8 {
                let mut h = header;
                let mut p = payload;
                if byte_idx < header.len() {
                    h[byte_idx] ^= 1 << bit;
                } else {
                    p[byte_idx - header.len()] ^= 1 << bit;
                }
                assert_ne!(
                    compute(&h, &p),
                    reference,
                    "flip of byte {byte_idx} bit {bit} went undetected"
                );
            }
        }
    }
}
