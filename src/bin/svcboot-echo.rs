//! Echo service built on svcboot
//!
//! Listens on TCP (default port 4242) and writes every byte it receives back
//! to the sender. Serves one thread per connection by default, or one child
//! process per connection with `--fork`.

use anyhow::Result;
use serde_json::json;
use std::env;
use std::io::{self, Read, Write};
use std::process;
use svcboot::error::EXIT_HELP;
use svcboot::server::{self, ClientConnection, ServeMode};
use svcboot::{logging, OptionSchema, OptionSpec, ProcessState};

const DEFAULT_PORT: u16 = 4242;

fn main() {
    let args: Vec<String> = env::args().collect();
    let state = ProcessState::new();

    let mut schema = OptionSchema::new("svcboot-echo", env!("CARGO_PKG_VERSION"));
    let mut caps = json!({
        "name": "echo",
        "desc": "Writes every received byte back to the sender",
    });
    schema.add_connector_options(DEFAULT_PORT, &mut caps);
    schema.add_option(
        "forked",
        OptionSpec::new("Serve each connection from its own child process.")
            .with_long("fork")
            .with_short('F')
            .with_long_off("thread")
            .with_short_off('T')
            .with_value(0),
    );

    if !schema.parse_args(&args, &state) {
        print!("{}", schema.help_text());
        process::exit(EXIT_HELP);
    }

    if schema.get_bool("json") {
        match serde_json::to_string_pretty(&caps) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                eprintln!("Error: {}", e);
                process::exit(1);
            }
        }
        return;
    }

    logging::init(state.debug_level());

    let mode = if schema.get_bool("forked") {
        ServeMode::Forked
    } else {
        ServeMode::Threaded
    };

    process::exit(server::serve(&mut schema, &state, mode, echo));
}

fn echo(conn: &mut ClientConnection) -> Result<i32> {
    let mut buf = [0u8; 4096];
    loop {
        let n = match conn.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };
        conn.write_all(&buf[..n])?;
    }
    conn.flush()?;
    Ok(0)
}
