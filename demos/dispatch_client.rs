//! Client that prints dispatched replies from an echo server.
//!
//! Start `echo_server` first, then run with:
//! `cargo run --example dispatch_client`

use nexilis::{Socket, shutdown_all};
use std::thread;
use std::time::Duration;

fn main() -> std::io::Result<()> {
    let socket = Socket::connect("127.0.0.1", 4000)?;

    socket
        .set_read_callback(|data| {
            println!("received {} bytes: {}", data.len(), String::from_utf8_lossy(data));
        })
        .expect("Failed to register read callback");

    socket.write(b"ping")?;

    // Give the poller a moment to deliver the reply.
    thread::sleep(Duration::from_millis(200));

    socket.close();
    shutdown_all();

    Ok(())
}
