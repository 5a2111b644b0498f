//! Modbus TCP framing (MBAP header + PDU)
//!
//! ```text
//! | transaction id (2) | protocol id (2) = 0 | length (2) | unit id (1) | PDU |
//! ```
//!
//! `length` counts the unit id plus the PDU. All fields are big-endian.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use thiserror::Error;

pub const MBAP_HEADER_LEN: usize = 7;
/// Largest PDU allowed on Modbus TCP
pub const MAX_PDU_LEN: usize = 253;

pub const READ_HOLDING_REGISTERS: u8 = 0x03;
pub const READ_INPUT_REGISTERS: u8 = 0x04;

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("unsupported protocol id {0}")]
    InvalidProtocol(u16),

    #[error("invalid MBAP length {0}")]
    InvalidLength(u16),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MbapHeader {
    pub transaction_id: u16,
    pub protocol_id: u16,
    pub length: u16,
    pub unit_id: u8,
}

impl MbapHeader {
    pub fn decode(mut buf: &[u8]) -> Result<Self, FrameError> {
        if buf.len() < MBAP_HEADER_LEN {
            return Err(FrameError::InvalidLength(buf.len() as u16));
        }
        let header = Self {
            transaction_id: buf.get_u16(),
            protocol_id: buf.get_u16(),
            length: buf.get_u16(),
            unit_id: buf.get_u8(),
        };

        if header.protocol_id != 0 {
            return Err(FrameError::InvalidProtocol(header.protocol_id));
        }
        // unit id + at least a function code, at most a full PDU
        if header.length < 2 || header.length as usize > MAX_PDU_LEN + 1 {
            return Err(FrameError::InvalidLength(header.length));
        }
        Ok(header)
    }

    /// Bytes following the header
    pub fn pdu_len(&self) -> usize {
        self.length as usize - 1
    }
}

/// Decoded request PDU
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub header: MbapHeader,
    pub function: u8,
    pub data: Bytes,
}

impl Request {
    pub fn from_parts(header: MbapHeader, mut pdu: Bytes) -> Result<Self, FrameError> {
        if pdu.is_empty() {
            return Err(FrameError::InvalidLength(header.length));
        }
        let function = pdu.get_u8();
        Ok(Self {
            header,
            function,
            data: pdu,
        })
    }

    /// Start address and quantity of a register read
    pub fn read_span(&self) -> Option<(u16, u16)> {
        if self.data.len() != 4 {
            return None;
        }
        let mut data = self.data.clone();
        Some((data.get_u16(), data.get_u16()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExceptionCode {
    IllegalFunction = 0x01,
    IllegalDataAddress = 0x02,
    IllegalDataValue = 0x03,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Registers { function: u8, values: Vec<u16> },
    Exception { function: u8, code: ExceptionCode },
}

impl Response {
    pub fn encode(&self, request: &MbapHeader) -> Bytes {
        let mut pdu = BytesMut::with_capacity(MAX_PDU_LEN);
        match self {
            Response::Registers { function, values } => {
                pdu.put_u8(*function);
                pdu.put_u8((values.len() * 2) as u8);
                for value in values {
                    pdu.put_u16(*value);
                }
            }
            Response::Exception { function, code } => {
                pdu.put_u8(function | 0x80);
                pdu.put_u8(*code as u8);
            }
        }

        let mut frame = BytesMut::with_capacity(MBAP_HEADER_LEN + pdu.len());
        frame.put_u16(request.transaction_id);
        frame.put_u16(0);
        frame.put_u16((pdu.len() + 1) as u16);
        frame.put_u8(request.unit_id);
        frame.extend_from_slice(&pdu);
        frame.freeze()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header_bytes(tid: u16, protocol: u16, length: u16, unit: u8) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&tid.to_be_bytes());
        buf.extend_from_slice(&protocol.to_be_bytes());
        buf.extend_from_slice(&length.to_be_bytes());
        buf.push(unit);
        buf
    }

    #[test]
    fn test_decode_header() {
        let header = MbapHeader::decode(&header_bytes(0x1234, 0, 6, 9)).unwrap();
        assert_eq!(header.transaction_id, 0x1234);
        assert_eq!(header.unit_id, 9);
        assert_eq!(header.pdu_len(), 5);
    }

    #[test]
    fn test_decode_rejects_foreign_protocol() {
        assert!(matches!(
            MbapHeader::decode(&header_bytes(1, 7, 6, 1)),
            Err(FrameError::InvalidProtocol(7))
        ));
        assert!(matches!(
            MbapHeader::decode(&header_bytes(1, 0, 1, 1)),
            Err(FrameError::InvalidLength(1))
        ));
        assert!(matches!(
            MbapHeader::decode(&header_bytes(1, 0, 300, 1)),
            Err(FrameError::InvalidLength(300))
        ));
    }

    #[test]
    fn test_request_read_span() {
        let header = MbapHeader::decode(&header_bytes(1, 0, 6, 1)).unwrap();
        let pdu = Bytes::from_static(&[0x03, 0x03, 0xE8, 0x00, 0x18]);
        let request = Request::from_parts(header, pdu).unwrap();

        assert_eq!(request.function, READ_HOLDING_REGISTERS);
        assert_eq!(request.read_span(), Some((1000, 24)));
    }

    #[test]
    fn test_encode_registers_response() {
        let header = MbapHeader::decode(&header_bytes(0x0102, 0, 6, 0x11)).unwrap();
        let response = Response::Registers {
            function: READ_INPUT_REGISTERS,
            values: vec![85, 0xFFFF],
        };

        assert_eq!(
            response.encode(&header).as_ref(),
            &[0x01, 0x02, 0x00, 0x00, 0x00, 0x07, 0x11, 0x04, 0x04, 0x00, 0x55, 0xFF, 0xFF]
        );
    }

    #[test]
    fn test_encode_exception_response() {
        let header = MbapHeader::decode(&header_bytes(7, 0, 6, 1)).unwrap();
        let response = Response::Exception {
            function: 0x06,
            code: ExceptionCode::IllegalFunction,
        };

        assert_eq!(
            response.encode(&header).as_ref(),
            &[0x00, 0x07, 0x00, 0x00, 0x00, 0x03, 0x01, 0x86, 0x01]
        );
    }
}
