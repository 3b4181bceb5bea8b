//! Simulated long-poll and streaming clients sharing one broadcaster.
//!
//! Run with: `cargo run --example long_poll`

use std::io;
use std::sync::Arc;

use pushwire::broadcast::Broadcaster;
use pushwire::http::{Request, ResponseSink};
use pushwire::interceptor::{Action, InterceptorOptions, InterceptorStack, LifecycleInterceptor};
use pushwire::resource::Resource;

/// Sink that prints what a real container would send down the socket.
struct StdoutSink {
    label: &'static str,
}

impl ResponseSink for StdoutSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<()> {
        println!("[{}] write: {}", self.label, String::from_utf8_lossy(buf));
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        println!("[{}] flush", self.label);
        Ok(())
    }
}

fn connect(
    stack: &InterceptorStack,
    broadcaster: &Broadcaster,
    label: &'static str,
    raw: &[u8],
) -> Arc<Resource> {
    let request = Request::parse(raw).expect("well-formed demo request");
    let resource = Arc::new(Resource::new(request, Box::new(StdoutSink { label })));
    if stack.inspect(&resource) == Action::Continue {
        // the application handler would write an initial body here
        stack.post_inspect(&resource);
        broadcaster.register(&resource);
    }
    println!(
        "[{label}] connected: transport={} state={:?}",
        resource.transport(),
        resource.state()
    );
    resource
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")),
        )
        .init();

    let mut stack = InterceptorStack::new();
    stack.install(
        Box::new(LifecycleInterceptor::new()),
        &InterceptorOptions::new(),
    );
    let broadcaster = Broadcaster::new();

    let poller = connect(
        &stack,
        &broadcaster,
        "poller",
        b"GET /events HTTP/1.1\r\nX-Push-Transport: long-polling\r\n\r\n",
    );
    let streamer = connect(
        &stack,
        &broadcaster,
        "streamer",
        b"GET /events HTTP/1.1\r\nX-Push-Transport: streaming\r\n\r\n",
    );

    println!("--- first broadcast ---");
    let delivered = broadcaster.broadcast("data: tick 1\n\n").await;
    println!(
        "delivered to {delivered}; poller={:?} streamer={:?}",
        poller.state(),
        streamer.state()
    );

    // the poller cycled out after one message; only the streamer remains
    println!("--- second broadcast ---");
    let delivered = broadcaster.broadcast("data: tick 2\n\n").await;
    println!("delivered to {delivered}; streamer={:?}", streamer.state());

    streamer.close();
}
