#[cfg(test)]
mod tests {
    use nexilis::Socket;
    use std::io::{Read, Write};
    use std::net::{TcpListener, TcpStream};
    use std::thread;

    #[test]
    fn test_listen_accept_read_write() {
        let listener = Socket::listen(0).expect("Failed to bind listener");
        let addr = listener.local_addr().expect("Failed to get local address");

        let handle = thread::spawn(move || {
            let mut peer = TcpStream::connect(addr).expect("Failed to connect peer");
            peer.write_all(b"hello").expect("Failed to write from peer");
            let mut buffer = [0; 5];
            peer.read_exact(&mut buffer).expect("Failed to read reply");
            assert_eq!(&buffer, b"world");
        });

        let (socket, _) = listener.accept().expect("Failed to accept connection");
        assert!(socket.is_connected());

        let mut buffer = [0; 5];
        let count = socket.read(&mut buffer).expect("Failed to read");
        assert_eq!(&buffer[..count], b"hello");

        socket.write(b"world").expect("Failed to write");

        handle.join().expect("Thread panicked");
        socket.close();
    }

    #[test]
    fn test_connect_to_std_listener() {
        let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind listener");
        let addr = listener.local_addr().expect("Failed to get local address");

        let handle = thread::spawn(move || {
            let (mut peer, _) = listener.accept().expect("Failed to accept connection");
            let mut buffer = [0; 4];
            peer.read_exact(&mut buffer).expect("Failed to read from peer");
            assert_eq!(&buffer, b"ping");
            peer.write_all(b"pong").expect("Failed to write to peer");
        });

        let socket = Socket::connect("127.0.0.1", addr.port()).expect("Failed to connect");
        assert!(socket.is_connected());

        socket.write(b"ping").expect("Failed to write");

        let mut buffer = [0; 4];
        let count = socket.read(&mut buffer).expect("Failed to read");
        assert_eq!(&buffer[..count], b"pong");

        handle.join().expect("Thread panicked");
        socket.close();
    }

    #[test]
    fn test_connect_resolves_names() {
        let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind listener");
        let addr = listener.local_addr().expect("Failed to get local address");

        let socket = Socket::connect("localhost", addr.port()).expect("Failed to connect by name");
        assert!(socket.is_connected());

        socket.close();
    }

    #[test]
    fn test_read_returns_zero_on_peer_shutdown() {
        let listener = Socket::listen(0).expect("Failed to bind listener");
        let addr = listener.local_addr().expect("Failed to get local address");

        let peer = TcpStream::connect(addr).expect("Failed to connect peer");
        let (socket, _) = listener.accept().expect("Failed to accept connection");

        drop(peer);

        let mut buffer = [0; 16];
        let count = socket.read(&mut buffer).expect("Failed to read");
        assert_eq!(count, 0);

        socket.close();
    }

    #[test]
    fn test_close_is_idempotent_and_shared() {
        let listener = Socket::listen(0).expect("Failed to bind listener");
        let addr = listener.local_addr().expect("Failed to get local address");

        let _peer = TcpStream::connect(addr).expect("Failed to connect peer");
        let (socket, _) = listener.accept().expect("Failed to accept connection");

        let alias = socket.clone();

        socket.close();
        socket.close();

        // Every handle observes the closed state.
        assert!(!alias.is_connected());

        let mut buffer = [0; 4];
        assert!(alias.read(&mut buffer).is_err());
        assert!(alias.write(b"x").is_err());
        assert!(alias.local_addr().is_err());
    }

    #[test]
    fn test_connect_to_dead_port_fails() {
        // Bind and immediately drop a listener to get a port that is
        // very likely closed.
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind listener");
            listener
                .local_addr()
                .expect("Failed to get local address")
                .port()
        };

        assert!(Socket::connect("127.0.0.1", port).is_err());
    }

    #[test]
    fn test_peer_addr_matches_listener() {
        let listener = Socket::listen(0).expect("Failed to bind listener");
        let addr = listener.local_addr().expect("Failed to get local address");

        let socket = Socket::connect("127.0.0.1", addr.port()).expect("Failed to connect");
        let peer = socket.peer_addr().expect("Failed to get peer address");
        assert_eq!(peer.port(), addr.port());

        socket.close();
    }
}
