// UDP display transmitter
//
// One datagram per frame, payload is the wire encoding with no header.
//
// The socket is a plain non-blocking std socket. A tokio socket only sends
// once the reactor has seen it writable, so the first frame after bind
// would be lost, and `test-pattern` sends exactly one.

use super::Transmitter;
use crate::frame::Frame;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket};
use tracing::debug;

pub struct UdpTransmitter {
    socket: UdpSocket,
    target: SocketAddr,
}

impl UdpTransmitter {
    /// Bind an ephemeral local socket for sending to `target`
    pub async fn bind(target: SocketAddr) -> std::io::Result<Self> {
        let local: SocketAddr = if target.is_ipv4() {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (Ipv6Addr::UNSPECIFIED, 0).into()
        };

        let socket = UdpSocket::bind(local)?;
        socket.set_nonblocking(true)?;
        Ok(Self { socket, target })
    }

    pub fn target(&self) -> SocketAddr {
        self.target
    }
}

impl Transmitter for UdpTransmitter {
    fn send(&self, frame: &Frame) {
        let payload = frame.encode();
        if let Err(e) = self.socket.send_to(&payload, self.target) {
            debug!(target = %self.target, "Dropped display datagram: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{DISPLAY_HEIGHT, DISPLAY_WIDTH, WIRE_FRAME_LEN};
    use std::time::Duration;

    #[tokio::test]
    async fn test_sends_one_datagram_per_frame() {
        let panel = tokio::net::UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let transmitter = UdpTransmitter::bind(panel.local_addr().unwrap()).await.unwrap();

        let frame = Frame::from_fn(DISPLAY_WIDTH, DISPLAY_HEIGHT, |x, y| x == y).unwrap();
        transmitter.send(&frame);

        let mut buf = [0u8; 1024];
        let len = tokio::time::timeout(Duration::from_secs(2), panel.recv(&mut buf))
            .await
            .expect("datagram should arrive")
            .unwrap();

        assert_eq!(len, WIRE_FRAME_LEN);
        assert_eq!(&buf[..len], frame.encode().as_slice());
    }

    #[tokio::test]
    async fn test_first_frame_after_bind_arrives() {
        let panel = tokio::net::UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let transmitter = UdpTransmitter::bind(panel.local_addr().unwrap()).await.unwrap();

        // No pause between bind and send, and frames arrive in send order
        let first = Frame::from_fn(DISPLAY_WIDTH, DISPLAY_HEIGHT, |x, _| x == 0).unwrap();
        let second = Frame::blank(DISPLAY_WIDTH, DISPLAY_HEIGHT).unwrap();
        transmitter.send(&first);
        transmitter.send(&second);

        let mut buf = [0u8; 1024];
        for expected in [&first, &second] {
            let len = tokio::time::timeout(Duration::from_secs(2), panel.recv(&mut buf))
                .await
                .expect("every datagram should arrive")
                .unwrap();
            assert_eq!(&buf[..len], expected.encode().as_slice());
        }
    }

    #[tokio::test]
    async fn test_unreachable_target_does_not_error() {
        // Nothing listens on the discard port; the send must still be silent
        let transmitter = UdpTransmitter::bind("127.0.0.1:9".parse().unwrap()).await.unwrap();
        let frame = Frame::blank(DISPLAY_WIDTH, DISPLAY_HEIGHT).unwrap();
        transmitter.send(&frame);
        transmitter.send(&frame);
    }
}
