//! Two connections over a socket pair calling each other from several
//! threads at once. The peer answers calls one at a time on its dispatch
//! thread; replies are matched to callers by id, so each caller gets its own
//! answer while the other side keeps calling back.
//!
//! Run with:
//!   cargo run --example concurrent-calls

use std::os::unix::net::UnixStream;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use entityipc::rpc::Connection;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize)]
struct Square {
    n: u64,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (left_stream, right_stream) = UnixStream::pair()?;

    let left = Arc::new(Connection::new());
    let right = Arc::new(Connection::new());

    // Slow enough that several calls are in flight while right calls back.
    right.register_handler(|req: Square| {
        thread::sleep(Duration::from_millis(10));
        Ok::<_, String>(req.n * req.n)
    });
    left.register_handler(|text: String| Ok::<_, String>(text.chars().rev().collect::<String>()));

    let left_loop = left.spawn(left_stream)?;
    let right_loop = right.spawn(right_stream)?;

    let callers: Vec<_> = (0..8u64)
        .map(|n| {
            let left = Arc::clone(&left);
            thread::spawn(move || left.call::<_, u64>(&Square { n }).map(|sq| (n, sq)))
        })
        .collect();

    let reversed: String = right.call(&"entityipc")?;
    println!("right -> left: {reversed}");

    for caller in callers {
        match caller.join() {
            Ok(Ok((n, sq))) => println!("left -> right: {n}^2 = {sq}"),
            Ok(Err(e)) => eprintln!("call failed: {e}"),
            Err(_) => eprintln!("caller panicked"),
        }
    }

    left.close();
    let _ = left_loop.join();
    let _ = right_loop.join();
    Ok(())
}
