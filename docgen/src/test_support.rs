use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use serde_json::Value;
use shared::api::ClientTransport;
use shared::ErrorKind;
use thiserror::Error;

#[derive(Debug, Clone)]
pub(crate) enum Reply {
    Ok(Value),
    Status(Value),
    Unreachable,
    Hang,
    Delayed(Duration, Box<Reply>),
}

#[derive(Error, Debug)]
pub(crate) enum ScriptedError {
    #[error("connection refused")]
    Unreachable,
    #[error("no scripted reply left for {0}")]
    Exhausted(String),
}

/// In-memory transport that answers each route from a queue of replies.
#[derive(Default)]
pub(crate) struct ScriptedTransport {
    replies: RefCell<HashMap<String, VecDeque<Reply>>>,
    calls: RefCell<HashMap<String, usize>>,
    bodies: RefCell<Vec<(String, Option<Value>)>>,
}

impl ScriptedTransport {
    pub(crate) fn reply(self, route: &str, reply: Reply) -> Self {
        self.replies
            .borrow_mut()
            .entry(route.to_owned())
            .or_default()
            .push_back(reply);
        self
    }

    pub(crate) fn calls(&self, route: &str) -> usize {
        self.calls.borrow().get(route).copied().unwrap_or(0)
    }

    pub(crate) fn total_calls(&self) -> usize {
        self.calls.borrow().values().sum()
    }

    pub(crate) fn last_body(&self, route: &str) -> Option<Value> {
        self.bodies
            .borrow()
            .iter()
            .rev()
            .find(|(r, _)| r == route)
            .and_then(|(_, body)| body.clone())
    }
}

impl ClientTransport for ScriptedTransport {
    type Error = ScriptedError;

    async fn send_request(
        &self,
        _method: &str,
        route: &str,
        body: Option<Value>,
    ) -> Result<Result<Value, Value>, Self::Error> {
        *self.calls.borrow_mut().entry(route.to_owned()).or_default() += 1;
        self.bodies.borrow_mut().push((route.to_owned(), body));

        let next = self
            .replies
            .borrow_mut()
            .get_mut(route)
            .and_then(VecDeque::pop_front);
        let mut reply = next.ok_or_else(|| ScriptedError::Exhausted(route.to_owned()))?;

        loop {
            match reply {
                Reply::Ok(value) => return Ok(Ok(value)),
                Reply::Status(value) => return Ok(Err(value)),
                Reply::Unreachable => return Err(ScriptedError::Unreachable),
                Reply::Hang => return futures::future::pending().await,
                Reply::Delayed(delay, inner) => {
                    tokio::time::sleep(delay).await;
                    reply = *inner;
                }
            }
        }
    }

    fn classify(error: &Self::Error) -> ErrorKind {
        match error {
            ScriptedError::Unreachable => ErrorKind::NetworkUnreachable,
            ScriptedError::Exhausted(_) => ErrorKind::Unknown,
        }
    }
}
