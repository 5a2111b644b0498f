use std::net::SocketAddr;
use std::sync::Arc;

use bytes::BytesMut;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use super::frame::{
    ExceptionCode, FrameError, MBAP_HEADER_LEN, MbapHeader, READ_HOLDING_REGISTERS,
    READ_INPUT_REGISTERS, Request, Response,
};
use crate::export::{ExportTable, Exporter};
use crate::observability::Metrics;
use crate::registers::AddressRange;

/// Largest register count a single read may ask for
pub const MAX_READ_QUANTITY: u16 = 125;

/// Answer one request from a table snapshot
///
/// Holding and input registers are the same address space. Register values
/// go out as their low 16 bits, so negative values arrive two's-complement.
pub fn process(request: &Request, table: &ExportTable, range: AddressRange) -> Response {
    let function = request.function;
    let exception = |code| Response::Exception { function, code };

    match function {
        READ_HOLDING_REGISTERS | READ_INPUT_REGISTERS => {
            let Some((start, quantity)) = request.read_span() else {
                return exception(ExceptionCode::IllegalDataValue);
            };
            if quantity == 0 || quantity > MAX_READ_QUANTITY {
                return exception(ExceptionCode::IllegalDataValue);
            }
            if !range.contains_span(start, quantity) {
                return exception(ExceptionCode::IllegalDataAddress);
            }

            let values = table
                .read_span(start, quantity)
                .into_iter()
                .map(|value| value as u16)
                .collect();
            Response::Registers { function, values }
        }
        _ => exception(ExceptionCode::IllegalFunction),
    }
}

/// Read-only Modbus TCP view of the current export table
pub struct ModbusServer {
    exporter: Arc<Exporter>,
    metrics: Arc<Metrics>,
}

impl ModbusServer {
    pub fn new(exporter: Arc<Exporter>, metrics: Arc<Metrics>) -> Self {
        Self { exporter, metrics }
    }

    /// Accept connections until shutdown is signalled
    pub async fn serve(
        self,
        listener: TcpListener,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<(), FrameError> {
        let local_addr = listener.local_addr()?;
        info!(address = %local_addr, "Modbus TCP listening");
        let server = Arc::new(self);

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("Modbus listener shutting down");
                        return Ok(());
                    }
                }
                result = listener.accept() => {
                    match result {
                        Ok((stream, peer)) => {
                            let server = Arc::clone(&server);
                            tokio::spawn(async move {
                                if let Err(e) = server.handle_connection(stream, peer).await {
                                    warn!(%peer, error = %e, "Modbus connection dropped");
                                }
                            });
                        }
                        Err(e) => {
                            error!(error = %e, "Modbus accept failed");
                        }
                    }
                }
            }
        }
    }

    async fn handle_connection(
        &self,
        mut stream: TcpStream,
        peer: SocketAddr,
    ) -> Result<(), FrameError> {
        debug!(%peer, "Modbus client connected");
        let mut header_buf = [0u8; MBAP_HEADER_LEN];

        loop {
            match stream.read_exact(&mut header_buf).await {
                Ok(_) => {}
                Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                    debug!(%peer, "Modbus client disconnected");
                    return Ok(());
                }
                Err(e) => return Err(e.into()),
            }

            let header = MbapHeader::decode(&header_buf)?;
            let mut pdu = BytesMut::zeroed(header.pdu_len());
            stream.read_exact(&mut pdu).await?;
            let request = Request::from_parts(header, pdu.freeze())?;

            self.metrics.modbus_request();
            let table = self.exporter.current_table();
            let response = process(&request, &table, self.exporter.map().range());
            if let Response::Exception { code, .. } = &response {
                self.metrics.modbus_exception();
                debug!(
                    %peer,
                    function = request.function,
                    code = *code as u8,
                    "Modbus exception"
                );
            }

            stream.write_all(&response.encode(&header)).await?;
        }
    }
}
