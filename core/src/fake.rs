//! Scripted in-memory connector for unit tests.
//!
//! Every transport built by a `ScriptedConnector` shares one script: posts are
//! recorded in order and replies are popped from a queue. An empty queue
//! answers `NetworkUnavailable`.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use serde_json::Value;

use crate::error::TransportError;
use crate::http::FormFields;
use crate::transport::{Connector, Transport};

#[derive(Debug, Clone)]
pub(crate) struct Posted {
    pub url: String,
    pub fields: FormFields,
}

impl Posted {
    pub fn method(&self) -> &str {
        self.fields.get("method").unwrap_or_default()
    }

    pub fn rest_data(&self) -> Value {
        serde_json::from_str(self.fields.get("rest_data").unwrap_or("null")).unwrap()
    }
}

#[derive(Debug, Default)]
struct Script {
    replies: VecDeque<Result<Value, TransportError>>,
    posts: Vec<Posted>,
    connects: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct ScriptedConnector {
    script: Rc<RefCell<Script>>,
}

impl ScriptedConnector {
    pub fn reply(&self, reply: Result<Value, TransportError>) -> &Self {
        self.script.borrow_mut().replies.push_back(reply);
        self
    }

    pub fn reply_json(&self, value: Value) -> &Self {
        self.reply(Ok(value))
    }

    pub fn posts(&self) -> Vec<Posted> {
        self.script.borrow().posts.clone()
    }

    pub fn post_count(&self) -> usize {
        self.script.borrow().posts.len()
    }

    pub fn connects(&self) -> Vec<String> {
        self.script.borrow().connects.clone()
    }
}

#[derive(Debug)]
pub(crate) struct ScriptedTransport {
    url: String,
    script: Rc<RefCell<Script>>,
}

impl Connector for ScriptedConnector {
    type Transport = ScriptedTransport;

    fn connect(&self, entry_point: &str) -> ScriptedTransport {
        self.script.borrow_mut().connects.push(entry_point.to_string());
        ScriptedTransport {
            url: entry_point.to_string(),
            script: Rc::clone(&self.script),
        }
    }
}

impl Transport for ScriptedTransport {
    fn entry_point(&self) -> &str {
        &self.url
    }

    fn post(&self, fields: &FormFields) -> Result<Value, TransportError> {
        let mut script = self.script.borrow_mut();
        script.posts.push(Posted {
            url: self.url.clone(),
            fields: fields.clone(),
        });
        script.replies.pop_front().unwrap_or_else(|| {
            Err(TransportError::NetworkUnavailable(
                "no scripted reply".to_string(),
            ))
        })
    }
}
