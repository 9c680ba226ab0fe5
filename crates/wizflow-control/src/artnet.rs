//! Art-Net protocol implementation (receive side)
//!
//! Art-Net is a UDP-based protocol for transmitting DMX512 over Ethernet.
//! The bridge only consumes `ArtDmx` packets; everything else arriving on
//! the socket (ArtPoll, malformed floods, stray traffic) is dropped without
//! comment. Consoles stream frames continuously at 30-44 Hz, so per-packet
//! logging would be noise.

/// Packet header magic: "Art-Net" plus a terminating NUL.
pub const ARTNET_MAGIC: &[u8; 8] = b"Art-Net\0";

/// OpCode for a DMX data packet (little-endian on the wire).
pub const OP_DMX: u16 = 0x5000;

/// Lowest protocol revision we accept.
pub const MIN_PROTOCOL_VERSION: u16 = 14;

/// Byte length of the ArtDmx header preceding the slot data.
pub const HEADER_LEN: usize = 18;

/// A decoded ArtDmx packet, borrowing the slot data from the datagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DmxFrame<'a> {
    /// Advisory sequence number. Consoles send monotonic floods; no
    /// reordering is performed.
    pub sequence: u8,
    /// Physical input port, informational only.
    pub physical: u8,
    /// 15-bit net/subnet/universe value.
    pub universe: u16,
    /// DMX slot bytes (up to 512).
    pub data: &'a [u8],
}

/// Parse an ArtDmx packet.
///
/// Returns `None` for anything that is not a well-formed ArtDmx datagram:
/// short packets, wrong magic, other opcodes, pre-14 protocol revisions.
pub fn parse_art_dmx(packet: &[u8]) -> Option<DmxFrame<'_>> {
    if packet.len() < HEADER_LEN {
        return None;
    }
    if &packet[0..8] != ARTNET_MAGIC {
        return None;
    }

    let opcode = u16::from_le_bytes([packet[8], packet[9]]);
    if opcode != OP_DMX {
        return None;
    }

    let version = u16::from_be_bytes([packet[10], packet[11]]);
    if version < MIN_PROTOCOL_VERSION {
        return None;
    }

    let universe = u16::from_le_bytes([packet[14], packet[15]]) & 0x7fff;
    let length = u16::from_be_bytes([packet[16], packet[17]]) as usize;

    // Trust the shorter of the declared length and what actually arrived.
    let available = packet.len() - HEADER_LEN;
    let data = &packet[HEADER_LEN..HEADER_LEN + length.min(available)];

    Some(DmxFrame {
        sequence: packet[12],
        physical: packet[13],
        universe,
        data,
    })
}

/// Build an ArtDmx packet.
///
/// Used by the test tooling to play the role of a lighting console; the
/// bridge itself never transmits Art-Net.
pub fn build_art_dmx(universe: u16, sequence: u8, data: &[u8]) -> Vec<u8> {
    let len = data.len().min(512);
    let mut packet = Vec::with_capacity(HEADER_LEN + len);

    packet.extend_from_slice(ARTNET_MAGIC);
    packet.extend_from_slice(&OP_DMX.to_le_bytes());
    packet.extend_from_slice(&MIN_PROTOCOL_VERSION.to_be_bytes());
    packet.push(sequence);
    packet.push(0); // physical
    packet.extend_from_slice(&universe.to_le_bytes());
    packet.extend_from_slice(&(len as u16).to_be_bytes());
    packet.extend_from_slice(&data[..len]);

    packet
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip() {
        let slots = [7u8, 8, 9, 10];
        let packet = build_art_dmx(3, 42, &slots);
        let frame = parse_art_dmx(&packet).unwrap();

        assert_eq!(frame.universe, 3);
        assert_eq!(frame.sequence, 42);
        assert_eq!(frame.data, &slots);
    }

    #[test]
    fn test_header_layout() {
        let packet = build_art_dmx(0, 0, &[0u8; 512]);

        assert_eq!(&packet[0..8], b"Art-Net\0");
        // OpCode, little-endian
        assert_eq!(packet[8], 0x00);
        assert_eq!(packet[9], 0x50);
        // Protocol version, big-endian
        assert_eq!(packet[10], 0);
        assert_eq!(packet[11], 14);
        // Length, big-endian
        assert_eq!(packet[16], 0x02);
        assert_eq!(packet[17], 0x00);
        assert_eq!(packet.len(), 18 + 512);
    }

    #[test]
    fn test_rejects_short_packet() {
        assert!(parse_art_dmx(b"Art-Net\0").is_none());
        assert!(parse_art_dmx(&[]).is_none());
    }

    #[test]
    fn test_rejects_wrong_magic() {
        let mut packet = build_art_dmx(0, 0, &[1, 2, 3]);
        packet[0] = b'X';
        assert!(parse_art_dmx(&packet).is_none());
    }

    #[test]
    fn test_rejects_other_opcodes() {
        let mut packet = build_art_dmx(0, 0, &[1, 2, 3]);
        // ArtPoll is 0x2000
        packet[8] = 0x00;
        packet[9] = 0x20;
        assert!(parse_art_dmx(&packet).is_none());
    }

    #[test]
    fn test_rejects_old_protocol() {
        let mut packet = build_art_dmx(0, 0, &[1, 2, 3]);
        packet[11] = 13;
        assert!(parse_art_dmx(&packet).is_none());
    }

    #[test]
    fn test_universe_masks_to_15_bits() {
        let mut packet = build_art_dmx(0, 0, &[1, 2, 3]);
        packet[14] = 0xff;
        packet[15] = 0xff;
        let frame = parse_art_dmx(&packet).unwrap();
        assert_eq!(frame.universe, 0x7fff);
    }

    #[test]
    fn test_declared_length_clipped_to_datagram() {
        let mut packet = build_art_dmx(0, 0, &[1, 2, 3, 4]);
        // Claim 512 slots while only carrying 4.
        packet[16] = 0x02;
        packet[17] = 0x00;
        let frame = parse_art_dmx(&packet).unwrap();
        assert_eq!(frame.data, &[1, 2, 3, 4]);
    }

    #[test]
    fn test_short_declared_length_wins() {
        let packet = build_art_dmx(0, 0, &[1, 2, 3, 4]);
        let mut clipped = packet.clone();
        clipped[17] = 0x02;
        let frame = parse_art_dmx(&clipped).unwrap();
        assert_eq!(frame.data, &[1, 2]);
    }
}
