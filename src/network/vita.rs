//! VITA-49 packet decoder
//!
//! SmartSDR radios stream audio, meters and spectrum data as VITA-49.0
//! Extension Data packets with a Stream ID and a Class ID. The header is
//! a fixed 28 bytes, big-endian:
//!
//! ```text
//! word 0   type(4) C T rsv(2) TSI(2) TSF(2) count(4) size_words(16)
//! word 1   stream id
//! word 2   rsv(8) OUI(24)
//! word 3   information class(16) packet class(16)
//! word 4   integer timestamp
//! word 5-6 fractional timestamp
//! ```
//!
//! Decoding is pure: the returned [`VitaPacket`] borrows its payload from
//! the input buffer.

use crate::error::PacketError;

/// VITA-49 header size in bytes
pub const HEADER_SIZE: usize = 28;

/// Trailer size in bytes when the T bit is set
pub const TRAILER_SIZE: usize = 4;

/// FlexRadio OUI carried in the Class ID
pub const FLEXRADIO_OUI: u32 = 0x001C2D;

/// Packet class code, identifying payload encoding and purpose
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClassCode {
    /// DAX audio, interleaved stereo f32 -- 0x03E3
    DaxAudio,
    /// DAX reduced-bandwidth audio, mono i16 -- 0x0123
    DaxReducedBw,
    /// Opus compressed remote audio -- 0x8005
    Opus,
    /// Meter values -- 0x8002
    Meter,
    /// Panadapter bins -- 0x8003
    Panadapter,
    /// Waterfall tiles -- 0x8004
    Waterfall,
    /// DAX IQ at 24/48/96/192 ksps -- 0x02E3..=0x02E6
    DaxIq(u16),
    /// Discovery broadcast -- 0xFFFF
    Discovery,
    /// Unrecognized class code
    Unknown(u16),
}

impl ClassCode {
    /// Map a raw packet class code
    pub fn from_raw(code: u16) -> Self {
        match code {
            0x03E3 => ClassCode::DaxAudio,
            0x0123 => ClassCode::DaxReducedBw,
            0x8005 => ClassCode::Opus,
            0x8002 => ClassCode::Meter,
            0x8003 => ClassCode::Panadapter,
            0x8004 => ClassCode::Waterfall,
            0x02E3..=0x02E6 => ClassCode::DaxIq(code),
            0xFFFF => ClassCode::Discovery,
            other => ClassCode::Unknown(other),
        }
    }

    /// Raw 16-bit value as it appears on the wire
    pub fn raw(self) -> u16 {
        match self {
            ClassCode::DaxAudio => 0x03E3,
            ClassCode::DaxReducedBw => 0x0123,
            ClassCode::Opus => 0x8005,
            ClassCode::Meter => 0x8002,
            ClassCode::Panadapter => 0x8003,
            ClassCode::Waterfall => 0x8004,
            ClassCode::DaxIq(code) | ClassCode::Unknown(code) => code,
            ClassCode::Discovery => 0xFFFF,
        }
    }

    /// Whether this core reconstructs audio for the class
    pub fn is_audio(self) -> bool {
        matches!(
            self,
            ClassCode::DaxAudio | ClassCode::DaxReducedBw | ClassCode::Opus
        )
    }
}

/// Decoded header fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VitaHeader {
    pub packet_type: u8,
    pub class_id_present: bool,
    pub trailer_present: bool,
    /// 4-bit rolling packet count
    pub sequence: u8,
    pub packet_size_words: u16,
    pub stream_id: u32,
    pub oui: u32,
    pub information_class: u16,
    pub class_code: ClassCode,
    pub timestamp_int: u32,
    pub timestamp_frac: u64,
}

/// One decoded datagram
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VitaPacket<'a> {
    pub header: VitaHeader,
    /// Payload bytes; empty marks a lost frame on Opus streams
    pub payload: &'a [u8],
}

impl<'a> VitaPacket<'a> {
    pub fn stream_id(&self) -> u32 {
        self.header.stream_id
    }

    pub fn class_code(&self) -> ClassCode {
        self.header.class_code
    }

    pub fn sequence(&self) -> u8 {
        self.header.sequence
    }

    /// Byte range of the payload inside the source datagram
    pub fn payload_range(&self) -> std::ops::Range<usize> {
        HEADER_SIZE..HEADER_SIZE + self.payload.len()
    }
}

fn be_u32(data: &[u8], offset: usize) -> u32 {
    u32::from_be_bytes([
        data[offset],
        data[offset + 1],
        data[offset + 2],
        data[offset + 3],
    ])
}

/// Decode a raw datagram.
///
/// Fails with [`PacketError`] when the buffer is shorter than the header or
/// the declared packet size disagrees with the buffer. Bytes past the
/// declared size are ignored.
pub fn decode(data: &[u8]) -> Result<VitaPacket<'_>, PacketError> {
    if data.len() < HEADER_SIZE {
        return Err(PacketError::TooShort {
            len: data.len(),
            needed: HEADER_SIZE,
        });
    }

    let word0 = be_u32(data, 0);
    let packet_type = ((word0 >> 28) & 0x0F) as u8;
    let class_id_present = (word0 >> 27) & 1 == 1;
    let trailer_present = (word0 >> 26) & 1 == 1;
    let sequence = ((word0 >> 16) & 0x0F) as u8;
    let packet_size_words = (word0 & 0xFFFF) as u16;

    let declared = packet_size_words as usize * 4;
    if declared > data.len() {
        return Err(PacketError::SizeExceedsBuffer {
            declared,
            len: data.len(),
        });
    }

    let minimum = HEADER_SIZE + if trailer_present { TRAILER_SIZE } else { 0 };
    if declared < minimum {
        return Err(PacketError::SizeBelowHeader { declared, minimum });
    }

    let stream_id = be_u32(data, 4);
    let oui = be_u32(data, 8) & 0x00FF_FFFF;
    let class_word = be_u32(data, 12);
    let information_class = (class_word >> 16) as u16;
    let class_code = ClassCode::from_raw((class_word & 0xFFFF) as u16);
    let timestamp_int = be_u32(data, 16);
    let timestamp_frac = ((be_u32(data, 20) as u64) << 32) | be_u32(data, 24) as u64;

    if oui != FLEXRADIO_OUI {
        tracing::trace!(oui, stream_id, "VITA packet with foreign OUI");
    }

    let payload_end = declared - if trailer_present { TRAILER_SIZE } else { 0 };

    Ok(VitaPacket {
        header: VitaHeader {
            packet_type,
            class_id_present,
            trailer_present,
            sequence,
            packet_size_words,
            stream_id,
            oui,
            information_class,
            class_code,
            timestamp_int,
            timestamp_frac,
        },
        payload: &data[HEADER_SIZE..payload_end],
    })
}

/// Build a datagram around `payload`, zero-padded to a word boundary.
///
/// Used by tests, benches and loopback tooling.
pub fn encode(stream_id: u32, class: ClassCode, sequence: u8, payload: &[u8]) -> Vec<u8> {
    let padded = (payload.len() + 3) & !3;
    let total = HEADER_SIZE + padded;

    let mut word0: u32 = 0x3 << 28; // extension data with stream id
    word0 |= 1 << 27;
    word0 |= 0x1 << 22; // TSI: UTC
    word0 |= 0x1 << 20; // TSF: sample count
    word0 |= ((sequence & 0x0F) as u32) << 16;
    word0 |= (total / 4) as u32 & 0xFFFF;

    let mut buf = Vec::with_capacity(total);
    buf.extend_from_slice(&word0.to_be_bytes());
    buf.extend_from_slice(&stream_id.to_be_bytes());
    buf.extend_from_slice(&FLEXRADIO_OUI.to_be_bytes());
    buf.extend_from_slice(&((0x534C_u32 << 16) | class.raw() as u32).to_be_bytes());
    buf.extend_from_slice(&[0u8; 12]);
    buf.extend_from_slice(payload);
    buf.resize(total, 0);
    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_code_mapping() {
        assert_eq!(ClassCode::from_raw(0x03E3), ClassCode::DaxAudio);
        assert_eq!(ClassCode::from_raw(0x0123), ClassCode::DaxReducedBw);
        assert_eq!(ClassCode::from_raw(0x8005), ClassCode::Opus);
        assert_eq!(ClassCode::from_raw(0x8003), ClassCode::Panadapter);
        assert_eq!(ClassCode::from_raw(0x02E5), ClassCode::DaxIq(0x02E5));
        assert_eq!(ClassCode::from_raw(0x1234), ClassCode::Unknown(0x1234));

        for raw in [0x03E3, 0x0123, 0x8005, 0x8002, 0x02E4, 0xFFFF, 0x4242] {
            assert_eq!(ClassCode::from_raw(raw).raw(), raw);
        }
    }

    #[test]
    fn test_audio_classes() {
        assert!(ClassCode::DaxAudio.is_audio());
        assert!(ClassCode::DaxReducedBw.is_audio());
        assert!(ClassCode::Opus.is_audio());
        assert!(!ClassCode::Meter.is_audio());
        assert!(!ClassCode::DaxIq(0x02E3).is_audio());
    }

    #[test]
    fn test_decode_header_fields() {
        let pkt = encode(0x0400_0008, ClassCode::Opus, 11, &[1, 2, 3, 4, 5, 6, 7, 8]);
        let parsed = decode(&pkt).unwrap();

        assert_eq!(parsed.header.packet_type, 0x3);
        assert!(parsed.header.class_id_present);
        assert!(!parsed.header.trailer_present);
        assert_eq!(parsed.sequence(), 11);
        assert_eq!(parsed.stream_id(), 0x0400_0008);
        assert_eq!(parsed.header.oui, FLEXRADIO_OUI);
        assert_eq!(parsed.header.information_class, 0x534C);
        assert_eq!(parsed.class_code(), ClassCode::Opus);
        assert_eq!(parsed.payload, &[1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(parsed.payload_range(), 28..36);
    }

    #[test]
    fn test_decode_header_only() {
        let pkt = encode(1, ClassCode::Opus, 0, &[]);
        let parsed = decode(&pkt).unwrap();
        assert!(parsed.payload.is_empty());
        assert_eq!(parsed.header.packet_size_words, 7);
    }

    #[test]
    fn test_reject_short_buffer() {
        assert_eq!(
            decode(&[0u8; 27]),
            Err(PacketError::TooShort { len: 27, needed: 28 })
        );
        assert!(decode(&[]).is_err());
    }

    #[test]
    fn test_reject_size_exceeding_buffer() {
        let mut pkt = encode(1, ClassCode::DaxAudio, 0, &[0u8; 8]);
        pkt.truncate(32);
        assert_eq!(
            decode(&pkt),
            Err(PacketError::SizeExceedsBuffer { declared: 36, len: 32 })
        );
    }

    #[test]
    fn test_reject_size_below_header() {
        let mut pkt = encode(1, ClassCode::DaxAudio, 0, &[]);
        // declare 6 words
        pkt[2] = 0;
        pkt[3] = 6;
        assert_eq!(
            decode(&pkt),
            Err(PacketError::SizeBelowHeader { declared: 24, minimum: 28 })
        );
    }

    #[test]
    fn test_trailing_bytes_ignored() {
        let mut pkt = encode(7, ClassCode::DaxAudio, 0, &[0xAA; 8]);
        pkt.extend_from_slice(&[0xFF; 16]);
        let parsed = decode(&pkt).unwrap();
        assert_eq!(parsed.payload, &[0xAA; 8]);
    }

    #[test]
    fn test_trailer_excluded_from_payload() {
        let mut pkt = encode(7, ClassCode::DaxAudio, 0, &[0x11; 12]);
        pkt[0] |= 0x04; // T bit
        let parsed = decode(&pkt).unwrap();
        assert!(parsed.header.trailer_present);
        assert_eq!(parsed.payload, &[0x11; 8]);
    }

    #[test]
    fn test_sequence_wraps_at_four_bits() {
        for seq in 0..32u8 {
            let pkt = encode(1, ClassCode::Opus, seq, &[]);
            assert_eq!(decode(&pkt).unwrap().sequence(), seq & 0x0F);
        }
    }

    #[test]
    fn test_fractional_timestamp_is_big_endian() {
        let mut pkt = encode(1, ClassCode::Meter, 0, &[]);
        pkt[16..20].copy_from_slice(&1_700_000_000u32.to_be_bytes());
        pkt[20..28].copy_from_slice(&0x0102_0304_0506_0708u64.to_be_bytes());
        let parsed = decode(&pkt).unwrap();
        assert_eq!(parsed.header.timestamp_int, 1_700_000_000);
        assert_eq!(parsed.header.timestamp_frac, 0x0102_0304_0506_0708);
    }
}
