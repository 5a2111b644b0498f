//! Modbus TCP adapter
//!
//! Serves function codes 0x03 (read holding registers) and 0x04 (read input
//! registers) from the exporter's current table. PDU address N is register
//! address N; there is no 1-based offset. Every other function code gets an
//! illegal-function exception, since the table is read-only.

mod frame;
mod server;

pub use frame::{
    ExceptionCode, FrameError, MBAP_HEADER_LEN, MbapHeader, READ_HOLDING_REGISTERS,
    READ_INPUT_REGISTERS, Request, Response,
};
pub use server::{MAX_READ_QUANTITY, ModbusServer, process};
