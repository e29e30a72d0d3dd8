//! Pre-initialization buffering: a stand-in object host pages install
//! before the engine loads, replayed once the engine exists.

use serde_json::Value;

use crate::engine::DataLayer;
use crate::error::Error;
use crate::events::ListenOptions;
use crate::registry::Handler;

/// Records `trigger` and `listen` calls made before the engine
/// initializes. [`DataLayer::adopt`] replays registrations first, then
/// triggers, each in original call order, so no event is lost across the
/// load boundary. The events-only stand-in is the same type with no
/// buffered registrations.
#[derive(Default)]
pub struct StartupBuffer {
    listens: Vec<BufferedListen>,
    triggers: Vec<BufferedTrigger>,
}

struct BufferedListen {
    names: Vec<String>,
    handler: Handler,
    options: ListenOptions,
}

struct BufferedTrigger {
    name: String,
    payload: Option<Value>,
}

impl StartupBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&mut self, name: &str, payload: Option<Value>) {
        self.triggers.push(BufferedTrigger {
            name: name.to_string(),
            payload,
        });
    }

    pub fn listen(&mut self, names: &[&str], handler: Handler, options: ListenOptions) {
        self.listens.push(BufferedListen {
            names: names.iter().map(|n| n.to_string()).collect(),
            handler,
            options,
        });
    }

    pub fn is_empty(&self) -> bool {
        self.listens.is_empty() && self.triggers.is_empty()
    }
}

impl DataLayer {
    /// Replay a pre-initialization buffer: buffered registrations in
    /// their original call order, then buffered triggers in original
    /// order.
    pub fn adopt(&mut self, buffer: StartupBuffer) -> Result<(), Error> {
        for entry in buffer.listens {
            let names: Vec<&str> = entry.names.iter().map(String::as_str).collect();
            self.listen(&names, entry.handler, entry.options)?;
        }
        for entry in buffer.triggers {
            self.trigger(&entry.name, entry.payload)?;
        }
        Ok(())
    }
}
