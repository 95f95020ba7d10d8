//! Abstraction over the UDP socket a [`crate::sender::PacketSender`] emits
//! onto, so the sender logic can be exercised without a real socket.

use async_trait::async_trait;

#[async_trait]
pub trait DatagramSink: Send + Sync {
    async fn send(&self, datagram: &[u8]) -> std::io::Result<()>;
}

#[async_trait]
impl DatagramSink for tokio::net::UdpSocket {
    async fn send(&self, datagram: &[u8]) -> std::io::Result<()> {
        tokio::net::UdpSocket::send(self, datagram).await.map(|_| ())
    }
}
