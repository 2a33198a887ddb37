//! Standard option sets for network services ("connectors")
//!
//! Besides registering options, each helper records the option in a
//! capability document (`caps["optional"][...]`) that a service can print
//! with `--json` so a controller can discover how to launch it.

use super::{OptionSchema, OptionSpec, OptionValue};
use serde_json::{json, Value};

/// Default interface: every IPv4 address
pub const DEFAULT_INTERFACE: &str = "0.0.0.0";

/// Username meaning "keep the current privileges"
pub const ROOT_USER: &str = "root";

impl OptionSchema {
    /// Register `listen_port` and `listen_interface`, then the basic connector options
    pub fn add_connector_options(&mut self, port: u16, caps: &mut Value) {
        self.add_option(
            "listen_port",
            OptionSpec::new("TCP port to listen on")
                .with_long("port")
                .with_short('p')
                .with_arg("integer")
                .with_value(i64::from(port)),
        );
        caps["optional"]["port"] = json!({
            "name": "TCP port",
            "help": format!("TCP port to listen on - default if unprovided is {}", port),
            "type": "uint",
            "option": "--port",
            "default": port,
        });

        self.add_option(
            "listen_interface",
            OptionSpec::new("Interface address to listen on, or 0.0.0.0 for all available interfaces.")
                .with_long("interface")
                .with_short('i')
                .with_arg("string")
                .with_value(DEFAULT_INTERFACE),
        );
        caps["optional"]["interface"] = json!({
            "name": "Interface",
            "help": "Address of the interface to listen on - default if unprovided is all interfaces",
            "option": "--interface",
            "type": "str",
        });

        self.add_basic_connector_options(caps);
    }

    /// Register `username`, `socket` (when `caps` advertises one), `daemonize` and `json`
    pub fn add_basic_connector_options(&mut self, caps: &mut Value) {
        self.add_option(
            "username",
            OptionSpec::new("Username to drop privileges to, or root to not drop privileges.")
                .with_long("username")
                .with_short('u')
                .with_arg("string")
                .with_value(ROOT_USER),
        );
        caps["optional"]["username"] = json!({
            "name": "Username",
            "help": "Username to drop privileges to - default if unprovided means do not drop privileges",
            "option": "--username",
            "type": "str",
        });

        if let Some(socket) = caps.get("socket").and_then(socket_value) {
            self.add_option(
                "socket",
                OptionSpec::new("Socket name that can be connected to for this connector.")
                    .with_arg("string")
                    .with_value(socket),
            );
        }

        self.add_option(
            "daemonize",
            OptionSpec::new("Whether or not to daemonize the process after starting.")
                .with_long("daemon")
                .with_short('d')
                .with_long_off("nodaemon")
                .with_short_off('n')
                .with_value(0),
        );

        self.add_option(
            "json",
            OptionSpec::new("Output connector info in JSON format, then exit.")
                .with_long("json")
                .with_short('j')
                .with_value(0),
        );
    }
}

fn socket_value(value: &Value) -> Option<OptionValue> {
    match value {
        Value::String(s) => Some(OptionValue::Str(s.clone())),
        Value::Number(n) => n.as_i64().map(OptionValue::Int),
        _ => None,
    }
}
