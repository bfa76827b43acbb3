//! Minimal SNTP client: one request, one transmit timestamp.

use std::time::Duration;

use tokio::net::UdpSocket;

use crate::error::TransportError;

/// SNTP port (UDP 123).
const SNTP_PORT: u16 = 123;

/// Seconds between the NTP epoch (1900) and the Unix epoch (1970).
const NTP_UNIX_OFFSET: i64 = 2_208_988_800;

/// Length of an SNTP packet without extensions.
const PACKET_LEN: usize = 48;

/// LI = 0, VN = 3, Mode = 3 (client).
const CLIENT_HEADER: u8 = 0b00_011_011;

const MODE_SERVER: u8 = 4;

/// Ask `server` for the current time, returned as Unix seconds.
pub async fn query(server: &str, timeout: Duration) -> Result<i64, TransportError> {
    tokio::time::timeout(timeout, exchange(server))
        .await
        .map_err(|_| TransportError::Timeout)?
}

async fn exchange(server: &str) -> Result<i64, TransportError> {
    let socket = UdpSocket::bind("0.0.0.0:0").await?;
    socket.connect((server, SNTP_PORT)).await?;

    let mut request = [0u8; PACKET_LEN];
    request[0] = CLIENT_HEADER;
    socket.send(&request).await?;

    let mut buf = [0u8; PACKET_LEN];
    let n = socket.recv(&mut buf).await?;
    parse_response(&buf[..n])
}

/// Extract the transmit timestamp from a server reply.
pub fn parse_response(buf: &[u8]) -> Result<i64, TransportError> {
    if buf.len() < PACKET_LEN {
        return Err(TransportError::InvalidResponse("short SNTP packet"));
    }
    if buf[0] & 0b111 != MODE_SERVER {
        return Err(TransportError::InvalidResponse("not an SNTP server reply"));
    }
    // Stratum 0 is a kiss-of-death, 16+ means unsynchronised.
    if !(1..=15).contains(&buf[1]) {
        return Err(TransportError::InvalidResponse("server is not synchronised"));
    }

    let secs = u32::from_be_bytes([buf[40], buf[41], buf[42], buf[43]]);
    if secs == 0 {
        return Err(TransportError::InvalidResponse("empty transmit timestamp"));
    }

    // Timestamps before 1970 can only come from NTP era 1 (after 2036).
    let mut ntp_secs = i64::from(secs);
    if ntp_secs < NTP_UNIX_OFFSET {
        ntp_secs += 1 << 32;
    }
    Ok(ntp_secs - NTP_UNIX_OFFSET)
}

// ===========================================================================
// Tests
// ===========================================================================
