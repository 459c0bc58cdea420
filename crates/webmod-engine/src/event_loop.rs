//! Event loop
//!
//! Serializes host events onto one task and wakes at dispatcher deadlines.
//! A pending double-press timer is raced against the next event, so a
//! second press cancels it by arriving first.

use std::time::Instant;

use smol::channel::{Receiver, Sender};
use smol::Timer;

use crate::engine::{Engine, Event};
use crate::executor::ActionExecutor;

enum Wake {
    Event(Event),
    Closed,
    Deadline,
}

/// Single-task driver for an [`Engine`]
pub struct EventLoop<E> {
    engine: Engine,
    exec: E,
    events: Receiver<Event>,
}

impl<E: ActionExecutor> EventLoop<E> {
    /// Loop plus the sender the host delivers events on
    pub fn new(engine: Engine, exec: E) -> (Self, Sender<Event>) {
        let (tx, events) = smol::channel::unbounded();
        (Self { engine, exec, events }, tx)
    }

    /// Run until [`Event::Shutdown`] or every sender is dropped
    ///
    /// Event errors are logged and the loop keeps going.
    pub async fn run(mut self) -> (Engine, E) {
        loop {
            let deadline = self.engine.next_deadline();
            let events = &self.events;
            let next = async move {
                match events.recv().await {
                    Ok(event) => Wake::Event(event),
                    Err(_) => Wake::Closed,
                }
            };
            let wake = match deadline {
                Some(deadline) => {
                    let timer = async {
                        Timer::at(deadline).await;
                        Wake::Deadline
                    };
                    smol::future::or(next, timer).await
                }
                None => next.await,
            };

            match wake {
                Wake::Deadline => self.engine.poll(&mut self.exec, Instant::now()),
                Wake::Closed => {
                    tracing::debug!("event channel closed");
                    break;
                }
                Wake::Event(Event::Shutdown) => {
                    tracing::debug!("shutdown requested");
                    break;
                }
                Wake::Event(event) => {
                    if let Err(e) = self.engine.handle(event, &mut self.exec, Instant::now()) {
                        tracing::warn!(error = %e, "event failed");
                    }
                }
            }
        }
        (self.engine, self.exec)
    }
}
