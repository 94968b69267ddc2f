//! Owns every long-lived actor of a process so teardown can signal them
//! all and wait for each to finish.
use anyhow::Result;
use tokio::sync::broadcast;
use tokio::task::JoinSet;

use crate::actor::{spawn_actor_with_shutdown, Actor, Addr};

pub struct ActorSystem {
    tasks: JoinSet<Result<()>>,
    shutdown: broadcast::Sender<()>,
}

impl Default for ActorSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl ActorSystem {
    pub fn new() -> Self {
        let (shutdown, _) = broadcast::channel(1);
        Self {
            tasks: JoinSet::new(),
            shutdown,
        }
    }

    /// Spawn an actor that stops on shutdown and is awaited on teardown.
    pub fn spawn<A: Actor>(&mut self, actor: A, mailbox: usize) -> Addr<A> {
        let handle = spawn_actor_with_shutdown(actor, mailbox, Some(self.shutdown.subscribe()));
        self.tasks.spawn(async move { handle.task.await? });
        handle.addr
    }

    /// Signal every actor, then wait for all of them. The first actor
    /// failure is returned after the rest have finished.
    pub async fn graceful_shutdown(mut self) -> Result<()> {
        let _ = self.shutdown.send(());
        let mut first_error = None;
        while let Some(joined) = self.tasks.join_next().await {
            let outcome = joined.map_err(anyhow::Error::from).and_then(|r| r);
            if let Err(e) = outcome {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}
