use std::collections::VecDeque;

use futures::{FutureExt, StreamExt, future::LocalBoxFuture, stream::FuturesUnordered};
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

use crate::{
    lifecycle::{Action, ChildCommand, ChildFlow, DeleteOutcome, Effect, Reducer, State},
    network::service::AccountApi,
    storage::{CacheStore, CredentialStore, SessionFlags},
};

/// Runs the reducer on a single sequencing path.
///
/// Actions arrive through a [`StoreHandle`] and are applied one at a time.
/// Follow-up actions are applied before the next incoming action, and the
/// results of network calls come back as ordinary actions. Every new state is
/// published to the handles.
pub struct Store<TSession, TCache, TApi> {
    reducer: Reducer<TSession, TCache>,
    api: TApi,
    state: State,
    action_receiver: mpsc::Receiver<Action>,
    state_sender: watch::Sender<State>,
    child_sender: Option<mpsc::UnboundedSender<(ChildFlow, ChildCommand)>>,
}

/// The view side of a store: sends actions and observes state.
#[derive(Clone)]
pub struct StoreHandle {
    action_sender: mpsc::Sender<Action>,
    state_receiver: watch::Receiver<State>,
}

#[derive(thiserror::Error, Debug)]
#[error("Store is no longer running")]
pub struct StoreClosed;

impl StoreHandle {
    pub async fn send(&self, action: Action) -> Result<(), StoreClosed> {
        self.action_sender.send(action).await.map_err(|_| StoreClosed)
    }

    /// The most recently published state.
    pub fn state(&self) -> State {
        self.state_receiver.borrow().clone()
    }

    /// Wait until the published state satisfies `predicate`.
    pub async fn wait_for(
        &self,
        predicate: impl FnMut(&State) -> bool,
    ) -> Result<State, StoreClosed> {
        let mut receiver = self.state_receiver.clone();
        let state = receiver.wait_for(predicate).await.map_err(|_| StoreClosed)?;
        Ok(state.clone())
    }
}

impl<TSession, TCache, TApi> Store<TSession, TCache, TApi>
where
    TSession: CredentialStore + SessionFlags,
    TCache: CacheStore,
    TApi: AccountApi,
{
    const ACTION_BUFFER: usize = 32;

    pub fn new(reducer: Reducer<TSession, TCache>, api: TApi, state: State) -> (Self, StoreHandle) {
        let (action_sender, action_receiver) = mpsc::channel(Self::ACTION_BUFFER);
        let (state_sender, state_receiver) = watch::channel(state.clone());
        let store = Self {
            reducer,
            api,
            state,
            action_receiver,
            state_sender,
            child_sender: None,
        };
        let handle = StoreHandle {
            action_sender,
            state_receiver,
        };
        (store, handle)
    }

    /// Forward notifications meant for nested flows to `sender`.
    pub fn with_child_sender(
        mut self,
        sender: mpsc::UnboundedSender<(ChildFlow, ChildCommand)>,
    ) -> Self {
        self.child_sender = Some(sender);
        self
    }

    /// Process actions until cancelled or until every handle is dropped.
    ///
    /// Requests still in flight at that point are dropped, which aborts them.
    /// Returns the last state.
    pub async fn run(self, cancellation_token: CancellationToken) -> State {
        let Self {
            reducer,
            api,
            mut state,
            mut action_receiver,
            state_sender,
            child_sender,
        } = self;
        let api = &api;
        let mut in_flight: FuturesUnordered<LocalBoxFuture<'_, Action>> = FuturesUnordered::new();

        loop {
            let action = tokio::select! {
                _ = cancellation_token.cancelled() => {
                    log::info!("Cancellation requested, stopping store.");
                    break;
                }
                Some(action) = in_flight.next(), if !in_flight.is_empty() => action,
                received = action_receiver.recv() => match received {
                    Some(action) => action,
                    None => {
                        log::info!("All store handles dropped, stopping store.");
                        break;
                    }
                },
            };

            let mut pending = VecDeque::from([action]);
            while let Some(action) = pending.pop_front() {
                log::debug!("Applying {:?}", action);
                for effect in reducer.reduce(&mut state, action) {
                    match effect {
                        Effect::Send(follow_up) => pending.push_back(follow_up),
                        Effect::DeleteAccount => {
                            let token = cancellation_token.child_token();
                            in_flight.push(
                                async move {
                                    let result = api.delete_user(token).await;
                                    Action::DeleteUserResponse(DeleteOutcome::from(result))
                                }
                                .boxed_local(),
                            );
                        }
                        Effect::Notify(flow, command) => match &child_sender {
                            Some(sender) => {
                                if sender.send((flow, command)).is_err() {
                                    log::debug!("{:?} flow is gone, dropping {:?}", flow, command);
                                }
                            }
                            None => log::trace!("No child flows attached, dropping {:?}", command),
                        },
                    }
                }
                state_sender.send_replace(state.clone());
            }
        }

        if !in_flight.is_empty() {
            log::info!("Aborting {} request(s) still in flight.", in_flight.len());
        }
        state
    }
}
