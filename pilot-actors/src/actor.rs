use std::future::Future;

use anyhow::Result;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

/// A task that owns its state and handles messages one at a time, in the
/// order they arrive.
#[async_trait::async_trait]
pub trait Actor: Send + Sized + 'static {
    type Msg: Send + 'static;

    /// Handle a single message. Return `Err` to stop the actor.
    async fn handle(&mut self, msg: Self::Msg, ctx: &mut Context<Self>) -> Result<()>;

    /// Runs once after the mailbox loop ends, however it ended.
    async fn stopped(&mut self) {}
}

pub struct Context<A: Actor> {
    stop: bool,
    _actor: std::marker::PhantomData<fn() -> A>,
}

impl<A: Actor> Context<A> {
    /// Stop after the current message.
    ///
    /// ```
    /// # use anyhow::Result;
    /// # use async_trait::async_trait;
    /// # use pilot_actors::actor::{self, Actor, Context};
    /// struct Countdown(u8);
    ///
    /// #[async_trait]
    /// impl Actor for Countdown {
    ///     type Msg = ();
    ///     async fn handle(&mut self, _: (), ctx: &mut Context<Self>) -> Result<()> {
    ///         self.0 -= 1;
    ///         if self.0 == 0 {
    ///             ctx.stop();
    ///         }
    ///         Ok(())
    ///     }
    /// }
    ///
    /// let rt = tokio::runtime::Runtime::new().unwrap();
    /// rt.block_on(async {
    ///     let handle = actor::spawn_actor(Countdown(2), 4);
    ///     handle.addr.send(()).await.unwrap();
    ///     handle.addr.send(()).await.unwrap();
    ///     handle.task.await.unwrap().unwrap();
    ///     assert!(handle.addr.send(()).await.is_err());
    /// });
    /// ```
    pub fn stop(&mut self) {
        self.stop = true;
    }
}

/// Sending side of an actor's mailbox.
pub struct Addr<A: Actor>(mpsc::Sender<A::Msg>);

impl<A: Actor> Clone for Addr<A> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<A: Actor> Addr<A> {
    /// Waits for mailbox room. Hands the message back if the actor is gone.
    pub async fn send(&self, msg: A::Msg) -> std::result::Result<(), A::Msg> {
        self.0.send(msg).await.map_err(|e| e.0)
    }
}

pub struct ActorHandle<A: Actor> {
    pub addr: Addr<A>,
    pub task: JoinHandle<Result<()>>,
}

/// Spawn `actor` with a bounded mailbox. It runs until `handle` fails,
/// `ctx.stop()` is called, or every `Addr` is dropped.
pub fn spawn_actor<A: Actor>(actor: A, capacity: usize) -> ActorHandle<A> {
    spawn_actor_with_shutdown(actor, capacity, None)
}

/// Like [`spawn_actor`], but also stops when `shutdown` fires.
pub fn spawn_actor_with_shutdown<A: Actor>(
    actor: A,
    capacity: usize,
    shutdown: Option<broadcast::Receiver<()>>,
) -> ActorHandle<A> {
    let (tx, rx) = mpsc::channel::<A::Msg>(capacity);
    let task = tokio::spawn(run_mailbox(actor, rx, shutdown));
    ActorHandle { addr: Addr(tx), task }
}

fn shutdown_signal(shutdown: Option<broadcast::Receiver<()>>) -> impl Future<Output = ()> {
    async move {
        match shutdown {
            Some(mut rx) => {
                let _ = rx.recv().await;
            }
            None => std::future::pending::<()>().await,
        }
    }
}

async fn run_mailbox<A: Actor>(
    mut actor: A,
    mut rx: mpsc::Receiver<A::Msg>,
    shutdown: Option<broadcast::Receiver<()>>,
) -> Result<()> {
    let mut ctx = Context {
        stop: false,
        _actor: std::marker::PhantomData,
    };
    let shutdown = shutdown_signal(shutdown);
    tokio::pin!(shutdown);
    let result = loop {
        let msg = tokio::select! {
            _ = &mut shutdown => break Ok(()),
            msg = rx.recv() => msg,
        };
        let Some(msg) = msg else { break Ok(()) };
        if let Err(e) = actor.handle(msg, &mut ctx).await {
            tracing::error!(target: "pilot.actors", error = ?e, "actor.failed");
            break Err(e);
        }
        if ctx.stop {
            break Ok(());
        }
    };
    actor.stopped().await;
    result
}
