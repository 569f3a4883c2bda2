//! Echo server built on the dispatch engine.
//!
//! Accepted connections are served by read callbacks on the shared
//! poller thread; the accept loop is the only thing this main thread
//! does.
//!
//! Run with: `cargo run --example echo_server`

use nexilis::Socket;

fn main() -> std::io::Result<()> {
    let listener = Socket::listen(4000)?;
    println!("listening on {}", listener.local_addr()?);

    loop {
        let (client, peer) = listener.accept()?;
        println!("accepted {peer}");

        let writer = client.clone();
        client
            .set_read_callback(move |data| {
                let _ = writer.write(data);
            })
            .expect("Failed to register echo callback");
    }
}
