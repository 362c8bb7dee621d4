// RTMP simple handshake (version 3)

use std::time::Duration;

use byteorder::{BigEndian, ByteOrder};
use rand::{rngs::StdRng, RngCore, SeedableRng};
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt},
    time::timeout,
};

use super::{HandshakeError, RTMP_HANDSHAKE_SIZE, RTMP_READ_TIMEOUT_SECONDS, RTMP_VERSION};

/// Generates the S1 block: zeroed time and version fields
/// followed by random filler
fn generate_s1() -> Vec<u8> {
    let mut s1 = vec![0; RTMP_HANDSHAKE_SIZE];

    let mut rng = StdRng::from_os_rng();

    rng.fill_bytes(&mut s1[8..]);

    s1
}

/// Performs the server side of the RTMP simple handshake
///
/// Reads C0 and C1, validates the version fields, writes S0 + S1 + S2
/// (S2 echoes C1) and verifies that C2 echoes S1.
///
/// # Arguments
///
/// * `read_stream` - IO stream to read bytes from the peer
/// * `write_stream` - IO stream to write bytes to the peer
pub async fn rtmp_handshake_server<
    TR: AsyncRead + AsyncReadExt + Send + Sync + Unpin,
    TW: AsyncWrite + AsyncWriteExt + Send + Sync + Unpin,
>(
    read_stream: &mut TR,
    write_stream: &mut TW,
) -> Result<(), HandshakeError> {
    let read_timeout = Duration::from_secs(RTMP_READ_TIMEOUT_SECONDS);

    // Read C0, which carries the protocol version

    let c0 = timeout(read_timeout, read_stream.read_u8())
        .await
        .map_err(|_| HandshakeError::Timeout)??;

    if c0 != RTMP_VERSION {
        return Err(HandshakeError::UnsupportedVersion { version: c0 });
    }

    // Read C1

    let mut c1 = vec![0; RTMP_HANDSHAKE_SIZE];

    timeout(read_timeout, read_stream.read_exact(&mut c1))
        .await
        .map_err(|_| HandshakeError::Timeout)??;

    // Bytes 4..8 of C1 carry the client version. A nonzero value
    // means the client expects the HMAC (complex) handshake
    let client_version = BigEndian::read_u32(&c1[4..8]);

    if client_version != 0 {
        return Err(HandshakeError::ComplexHandshakeUnsupported);
    }

    // Write S0 + S1 + S2

    let s1 = generate_s1();

    let mut s0_s1_s2 = Vec::with_capacity(1 + 2 * RTMP_HANDSHAKE_SIZE);

    s0_s1_s2.push(RTMP_VERSION);
    s0_s1_s2.extend(&s1);
    s0_s1_s2.extend(&c1);

    write_stream.write_all(&s0_s1_s2).await?;
    write_stream.flush().await?;

    // Read C2, which must echo S1

    let mut c2 = vec![0; RTMP_HANDSHAKE_SIZE];

    timeout(read_timeout, read_stream.read_exact(&mut c2))
        .await
        .map_err(|_| HandshakeError::Timeout)??;

    if c2 != s1 {
        return Err(HandshakeError::HandshakeVerifyFailed);
    }

    Ok(())
}

/// Performs the client side of the RTMP simple handshake
///
/// Used when dialing outbound destinations: writes C0 + C1, reads
/// S0 + S1 + S2 and answers with C2 echoing S1.
///
/// # Arguments
///
/// * `read_stream` - IO stream to read bytes from the remote server
/// * `write_stream` - IO stream to write bytes to the remote server
pub async fn rtmp_handshake_client<
    TR: AsyncRead + AsyncReadExt + Send + Sync + Unpin,
    TW: AsyncWrite + AsyncWriteExt + Send + Sync + Unpin,
>(
    read_stream: &mut TR,
    write_stream: &mut TW,
) -> Result<(), HandshakeError> {
    let read_timeout = Duration::from_secs(RTMP_READ_TIMEOUT_SECONDS);

    // Write C0 + C1 (same layout as S1: zeroed version, random filler)

    let c1 = generate_s1();

    let mut c0_c1 = Vec::with_capacity(1 + RTMP_HANDSHAKE_SIZE);

    c0_c1.push(RTMP_VERSION);
    c0_c1.extend(&c1);

    write_stream.write_all(&c0_c1).await?;
    write_stream.flush().await?;

    // Read S0 + S1 + S2

    let mut s0_s1_s2 = vec![0; 1 + 2 * RTMP_HANDSHAKE_SIZE];

    timeout(read_timeout, read_stream.read_exact(&mut s0_s1_s2))
        .await
        .map_err(|_| HandshakeError::Timeout)??;

    if s0_s1_s2[0] != RTMP_VERSION {
        return Err(HandshakeError::UnsupportedVersion {
            version: s0_s1_s2[0],
        });
    }

    // Write C2 echoing S1

    write_stream
        .write_all(&s0_s1_s2[1..1 + RTMP_HANDSHAKE_SIZE])
        .await?;
    write_stream.flush().await?;

    Ok(())
}

// Tests

#[cfg(test)]
mod tests {
    use super::*;

    /// Runs the server handshake against a scripted client
    async fn run_server_handshake(c0: u8, c1_version: u32) -> Result<Vec<u8>, HandshakeError> {
        let (mut client, server) = tokio::io::duplex(16384);
        let (mut server_read, mut server_write) = tokio::io::split(server);

        let mut c0_c1 = vec![0; 1 + RTMP_HANDSHAKE_SIZE];
        c0_c1[0] = c0;
        BigEndian::write_u32(&mut c0_c1[5..9], c1_version);

        client.write_all(&c0_c1).await.unwrap();

        let handshake =
            tokio::spawn(
                async move { rtmp_handshake_server(&mut server_read, &mut server_write).await },
            );

        // Give the server a chance to respond, then collect whatever it wrote
        let mut response = Vec::new();
        let mut buf = vec![0; 1 + 2 * RTMP_HANDSHAKE_SIZE];

        if c0 == RTMP_VERSION && c1_version == 0 {
            client.read_exact(&mut buf).await.unwrap();
            response.extend(&buf);

            // Echo S1 back as C2
            client
                .write_all(&buf[1..1 + RTMP_HANDSHAKE_SIZE])
                .await
                .unwrap();
        } else {
            drop(client);
        }

        handshake.await.unwrap()?;

        Ok(response)
    }

    #[tokio::test]
    async fn test_handshake_success() {
        let response = run_server_handshake(0x03, 0).await.unwrap();

        assert_eq!(response[0], RTMP_VERSION);
        // S1 time and version fields are zero
        assert_eq!(&response[1..9], &[0; 8]);
    }

    #[tokio::test]
    async fn test_handshake_rejects_bad_version() {
        match run_server_handshake(0x06, 0).await {
            Err(HandshakeError::UnsupportedVersion { version }) => assert_eq!(version, 0x06),
            other => panic!("expected UnsupportedVersion, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn test_handshake_rejects_complex_request() {
        match run_server_handshake(0x03, 1).await {
            Err(HandshakeError::ComplexHandshakeUnsupported) => {}
            other => panic!(
                "expected ComplexHandshakeUnsupported, got {:?}",
                other.map(|_| ())
            ),
        }
    }

    #[tokio::test]
    async fn test_handshake_rejects_bad_c2() {
        let (mut client, server) = tokio::io::duplex(16384);
        let (mut server_read, mut server_write) = tokio::io::split(server);

        let c0_c1 = {
            let mut b = vec![0; 1 + RTMP_HANDSHAKE_SIZE];
            b[0] = RTMP_VERSION;
            b
        };

        client.write_all(&c0_c1).await.unwrap();

        let handshake =
            tokio::spawn(
                async move { rtmp_handshake_server(&mut server_read, &mut server_write).await },
            );

        let mut response = vec![0; 1 + 2 * RTMP_HANDSHAKE_SIZE];
        client.read_exact(&mut response).await.unwrap();

        // Send garbage instead of the S1 echo
        client.write_all(&vec![0xAA; RTMP_HANDSHAKE_SIZE]).await.unwrap();

        match handshake.await.unwrap() {
            Err(HandshakeError::HandshakeVerifyFailed) => {}
            other => panic!("expected HandshakeVerifyFailed, got {:?}", other.map(|_| ())),
        }
    }
}
