//! Frame type and wire codec for the link layer.
//!
//! A [`Frame`] is the unit of exchange between nodes: a four byte header
//! (receptor, sender, type, length), up to 29 payload bytes of packed typed
//! values, and a trailing CRC-8. On the wire a frame is preceded by a
//! training preamble and a sync byte and is shifted out MSB-first with no
//! bit stuffing; the frame boundary is length-driven.
//!
//! Structural validation (type tag, length bounds, checksum) happens once,
//! in [`Frame::decode`], at the receive boundary. Everything downstream may
//! assume a decoded frame is well-formed.
//!
//! Payload packing and extraction live in [`crate::value`].

use crate::consts::{FRAME_DATA_CAPACITY, FRAME_HEADER_LEN};
use crate::crc;
use crate::error::LinkError;
use heapless::Vec;

/// What a frame carries, as encoded in its `type` header byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
#[repr(u8)]
pub enum FrameType {
    /// A node reporting a reading.
    State = 1,
    /// A command from the master; the first payload byte is a [`Command`].
    Cmd = 2,
    /// Acknowledgment of a previously received frame. Carries no payload.
    Ack = 3,
    /// A reading that requests an acknowledgment from its receptor.
    StateAck = 4,
}

impl FrameType {
    /// Whether a frame of this type asks its receptor to reply with an ACK.
    pub fn wants_ack(self) -> bool {
        matches!(self, FrameType::StateAck | FrameType::Cmd)
    }
}

impl TryFrom<u8> for FrameType {
    type Error = LinkError;

    fn try_from(value: u8) -> Result<Self, LinkError> {
        match value {
            1 => Ok(FrameType::State),
            2 => Ok(FrameType::Cmd),
            3 => Ok(FrameType::Ack),
            4 => Ok(FrameType::StateAck),
            _ => Err(LinkError::InvalidFrame),
        }
    }
}

/// Commands carried in the first payload byte of a [`FrameType::Cmd`] frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
#[repr(u8)]
pub enum Command {
    /// Link this node to the sending master.
    Link = 0,
    /// Drive an output on.
    On = 1,
    /// Drive an output off.
    Off = 2,
    /// Clear the node's identity and return it to the unlinked state.
    Reset = 3,
    /// Set a value on the node.
    Set = 4,
    /// Ask the node to report a value.
    Get = 5,
}

impl TryFrom<u8> for Command {
    type Error = LinkError;

    fn try_from(value: u8) -> Result<Self, LinkError> {
        match value {
            0 => Ok(Command::Link),
            1 => Ok(Command::On),
            2 => Ok(Command::Off),
            3 => Ok(Command::Reset),
            4 => Ok(Command::Set),
            5 => Ok(Command::Get),
            _ => Err(LinkError::InvalidFrame),
        }
    }
}

/// The unit of exchange on the shared channel.
///
/// `length` counts the used payload bytes plus the trailing CRC byte, so a
/// frame with no payload (an ACK) has `length == 1` and `length` never
/// exceeds [`FRAME_DATA_CAPACITY`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct Frame {
    /// Id of the intended recipient; [`crate::consts::BROADCAST_ID`]
    /// addresses every node.
    pub receptor: u8,
    /// Id of the originating node.
    pub sender: u8,
    /// What the frame carries.
    pub frame_type: FrameType,
    /// Used payload bytes plus the CRC byte.
    pub length: u8,
    /// Packed typed values; only `data[..length - 1]` is meaningful.
    pub data: [u8; FRAME_DATA_CAPACITY],
    /// Checksum over header and payload, stamped by [`Frame::seal`].
    pub crc: u8,
}

impl Frame {
    /// Creates an empty frame addressed from `sender` to `receptor`.
    pub fn new(receptor: u8, sender: u8, frame_type: FrameType) -> Self {
        Self {
            receptor,
            sender,
            frame_type,
            length: 1,
            data: [0; FRAME_DATA_CAPACITY],
            crc: 0,
        }
    }

    /// The used payload bytes, excluding the CRC.
    pub fn payload(&self) -> &[u8] {
        &self.data[..self.length as usize - 1]
    }

    fn header_bytes(&self) -> [u8; FRAME_HEADER_LEN] {
        [
            self.receptor,
            self.sender,
            self.frame_type as u8,
            self.length,
        ]
    }

    /// Checksum over `receptor ‖ sender ‖ type ‖ length ‖ payload`.
    pub fn compute_crc(&self) -> u8 {
        crc::compute(&self.header_bytes(), self.payload())
    }

    /// Stamps the frame's CRC from its current fields. Must be called after
    /// the last value is packed and before the frame is transmitted.
    pub fn seal(&mut self) {
        self.crc = self.compute_crc();
    }

    /// Total bytes this frame occupies on the wire after the sync byte.
    pub fn wire_len(&self) -> usize {
        FRAME_HEADER_LEN + self.length as usize
    }

    /// Appends the frame's wire image (header, payload, CRC) to `out`.
    ///
    /// Fails with [`LinkError::CapacityExceeded`] if `out` cannot hold it.
    pub fn encode<const N: usize>(&self, out: &mut Vec<u8, N>) -> Result<(), LinkError> {
        if out.len() + self.wire_len() > N {
            return Err(LinkError::CapacityExceeded);
        }
        for b in self.header_bytes() {
            let _ = out.push(b);
        }
        for &b in self.payload() {
            let _ = out.push(b);
        }
        let _ = out.push(self.crc);
        Ok(())
    }

    /// Rebuilds a frame from a received wire image and validates it.
    ///
    /// Checks the type tag, the length bounds (`bytes` must hold exactly
    /// header + payload + CRC), and the checksum. This is the only place
    /// the CRC is verified; a decoded frame is well-formed by construction.
    pub fn decode(bytes: &[u8]) -> Result<Self, LinkError> {
        if bytes.len() < FRAME_HEADER_LEN + 1 {
            return Err(LinkError::InvalidFrame);
        }
        let length = bytes[3];
        if length == 0 || length as usize > FRAME_DATA_CAPACITY {
            return Err(LinkError::InvalidFrame);
        }
        if bytes.len() != FRAME_HEADER_LEN + length as usize {
            return Err(LinkError::InvalidFrame);
        }

        let mut frame = Frame {
            receptor: bytes[0],
            sender: bytes[1],
            frame_type: FrameType::try_from(bytes[2])?,
            length,
            data: [0; FRAME_DATA_CAPACITY],
            crc: bytes[bytes.len() - 1],
        };
        frame.data[..length as usize - 1]
            .copy_from_slice(&bytes[FRAME_HEADER_LEN..bytes.len() - 1]);

        if frame.crc != frame.compute_crc() {
            return Err(LinkError::InvalidFrame);
        }
        Ok(frame)
    }

    /// Writes `cmd` as the leading payload byte of a command frame.
    ///
    /// Must be called before any values are packed.
    pub fn push_command(&mut self, cmd: Command) -> Result<(), LinkError> {
        if self.length as usize >= FRAME_DATA_CAPACITY {
            return Err(LinkError::CapacityExceeded);
        }
        self.data[self.length as usize - 1] = cmd as u8;
        self.length += 1;
        Ok(())
    }

    /// The command carried by a [`FrameType::Cmd`] frame, if any.
    pub fn command(&self) -> Option<Command> {
        if self.frame_type != FrameType::Cmd || self.length < 2 {
            return None;
        }
        Command::try_from(self.data[0]).ok()
    }

    /// Whether this frame is a LINK command, the one frame an unlinked node
    /// will still process.
    pub fn is_link_request(&self) -> bool {
        self.command() == Some(Command::Link)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::WIRE_MAX_LEN;

    #[test]
    fn test_round_trip_preserves_fields() {
        let mut frame = Frame::new(1, 2, FrameType::State);
        frame.data[0] = 0x42;
        frame.data[1] = 0x07;
        frame.length = 3;
        frame.seal();

        let mut wire: Vec<u8, WIRE_MAX_LEN> = Vec::new();
        frame.encode(&mut wire).unwrap();
        assert_eq!(wire.len(), frame.wire_len());

        let decoded = Frame::decode(&wire).unwrap();
        assert_eq!(decoded, frame);
    }

    #[test]
    fn test_ack_frame_has_no_payload() {
        let mut ack = Frame::new(2, 1, FrameType::Ack);
        ack.seal();
        assert_eq!(ack.length, 1);
        assert!(ack.payload().is_empty());

        let mut wire: Vec<u8, WIRE_MAX_LEN> = Vec::new();
        ack.encode(&mut wire).unwrap();
        assert_eq!(wire.len(), FRAME_HEADER_LEN + 1);
    }

    #[test]
    fn test_decode_rejects_corruption_anywhere() {
        let mut frame = Frame::new(1, 2, FrameType::StateAck);
        let _ = frame.push_command(Command::On);
        frame.seal();
        let mut wire: Vec<u8, WIRE_MAX_LEN> = Vec::new();
        frame.encode(&mut wire).unwrap();

        for i in 0..wire.len() {
            let mut corrupt = wire.clone();
            corrupt[i] ^= 0x10;
            assert!(
                Frame::decode(&corrupt).is_err(),
                "corruption of byte {i} went undetected"
            );
        }
    }

    #[test]
    fn test_decode_bounds_length_before_use() {
        // length = 0 and length > capacity must both be rejected up front
        assert_eq!(
            Frame::decode(&[1, 2, 1, 0, 0]),
            Err(LinkError::InvalidFrame)
        );
        let oversized = [1, 2, 1, 31, 0];
        assert_eq!(Frame::decode(&oversized), Err(LinkError::InvalidFrame));
        // truncated body
        assert_eq!(
            Frame::decode(&[1, 2, 1, 5, 0]),
            Err(LinkError::InvalidFrame)
        );
    }

    #[test]
    fn test_command_extraction() {
        let mut frame = Frame::new(3, 0, FrameType::Cmd);
        frame.push_command(Command::Link).unwrap();
        frame.seal();
        assert_eq!(frame.command(), Some(Command::Link));
        assert!(frame.is_link_request());

        let plain = Frame::new(3, 0, FrameType::State);
        assert_eq!(plain.command(), None);
        assert!(!plain.is_link_request());
    }
}
