//! Loading/error/success bookkeeping around one gateway call.
//!
//! A [`RequestLifecycle`] owns the state of exactly one stage's request. Calls are split into
//! [`RequestLifecycle::begin`] and [`RequestLifecycle::complete`] so a driver may run the network
//! call without holding the lifecycle; every call carries a request id and only the response to
//! the most recently issued id is applied.

use crate::error::{ServiceError, ValidationError};
use crate::gateway::Gateway;
use serde::Serialize;
use std::fmt;

#[async_trait::async_trait]
pub trait Operation: Send + Sync {
    type Input: Clone + fmt::Debug + Send + Sync;
    type Output: fmt::Debug + Send;

    fn name(&self) -> &'static str;

    /// Message shown when the failure carries no structured detail.
    fn fallback_message(&self) -> &'static str;

    /// Local pre-validation. A failure short-circuits to `Failed` without a gateway call.
    fn validate(&self, _input: &Self::Input) -> Result<(), ValidationError> {
        Ok(())
    }

    async fn call(&self, gateway: &dyn Gateway, input: &Self::Input)
        -> anyhow::Result<Self::Output>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum RequestState<T> {
    Idle,
    Loading,
    Success(T),
    Failed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Idle,
    Loading,
    Success,
    Failed,
}

impl<T> RequestState<T> {
    pub fn status(&self) -> RequestStatus {
        match self {
            RequestState::Idle => RequestStatus::Idle,
            RequestState::Loading => RequestStatus::Loading,
            RequestState::Success(_) => RequestStatus::Success,
            RequestState::Failed(_) => RequestStatus::Failed,
        }
    }
}

/// An issued call: the id that must come back with the outcome, and the input to send.
#[derive(Debug, Clone, PartialEq)]
pub struct Ticket<I> {
    pub id: u64,
    pub input: I,
}

#[derive(Debug)]
pub struct RequestLifecycle<O: Operation> {
    op: O,
    state: RequestState<O::Output>,
    last_input: Option<O::Input>,
    latest_id: u64,
}

impl<O: Operation> RequestLifecycle<O> {
    pub fn new(op: O) -> Self {
        Self {
            op,
            state: RequestState::Idle,
            last_input: None,
            latest_id: 0,
        }
    }

    pub fn state(&self) -> &RequestState<O::Output> {
        &self.state
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.state, RequestState::Loading)
    }

    pub fn result(&self) -> Option<&O::Output> {
        match &self.state {
            RequestState::Success(out) => Some(out),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.state {
            RequestState::Failed(msg) => Some(msg),
            _ => None,
        }
    }

    pub fn last_input(&self) -> Option<&O::Input> {
        self.last_input.as_ref()
    }

    /// Records `input` as the latest request and validates it.
    ///
    /// Returns `None` when validation fails (state becomes `Failed`), otherwise moves to
    /// `Loading` and returns the ticket to execute. Any earlier ticket becomes stale.
    pub fn begin(&mut self, input: O::Input) -> Option<Ticket<O::Input>> {
        self.latest_id += 1;
        self.last_input = Some(input.clone());

        if let Err(err) = self.op.validate(&input) {
            tracing::warn!(operation = self.op.name(), error = %err, "request rejected locally");
            self.state = RequestState::Failed(err.message);
            return None;
        }

        self.state = RequestState::Loading;
        Some(Ticket {
            id: self.latest_id,
            input,
        })
    }

    /// Applies the outcome of ticket `id`. Returns `false` (and changes nothing) when a newer
    /// request has been issued since.
    pub fn complete(&mut self, id: u64, outcome: anyhow::Result<O::Output>) -> bool {
        if id != self.latest_id {
            tracing::debug!(
                operation = self.op.name(),
                id,
                latest_id = self.latest_id,
                "discarding stale response"
            );
            return false;
        }

        self.state = match outcome {
            Ok(out) => RequestState::Success(out),
            Err(err) => {
                let message = user_message(&err, self.op.fallback_message());
                let cause = format!("{err:#}");
                let timed_out = err
                    .downcast_ref::<ServiceError>()
                    .is_some_and(ServiceError::is_timeout);
                tracing::warn!(
                    operation = self.op.name(),
                    timed_out,
                    error = %cause,
                    "request failed"
                );
                RequestState::Failed(message)
            }
        };
        true
    }

    /// Ticket re-issuing the last input. Only available from `Failed`.
    pub fn retry_ticket(&mut self) -> Option<Ticket<O::Input>> {
        if !matches!(self.state, RequestState::Failed(_)) {
            return None;
        }
        let input = self.last_input.clone()?;
        self.begin(input)
    }

    pub async fn trigger(
        &mut self,
        gateway: &dyn Gateway,
        input: O::Input,
    ) -> &RequestState<O::Output> {
        let ticket = self.begin(input);
        self.execute(gateway, ticket).await
    }

    pub async fn retry(&mut self, gateway: &dyn Gateway) -> &RequestState<O::Output> {
        let ticket = self.retry_ticket();
        self.execute(gateway, ticket).await
    }

    /// Back to `Idle`; anything in flight becomes stale.
    pub fn reset(&mut self) {
        self.latest_id += 1;
        self.last_input = None;
        self.state = RequestState::Idle;
    }

    async fn execute(
        &mut self,
        gateway: &dyn Gateway,
        ticket: Option<Ticket<O::Input>>,
    ) -> &RequestState<O::Output> {
        if let Some(ticket) = ticket {
            let outcome = self.op.call(gateway, &ticket.input).await;
            self.complete(ticket.id, outcome);
        }
        &self.state
    }
}

/// Picks the message shown to the user for a failed call: the service's structured detail when
/// present, a local validation message, or `fallback`.
pub fn user_message(err: &anyhow::Error, fallback: &str) -> String {
    if let Some(detail) = err.downcast_ref::<ServiceError>().and_then(ServiceError::detail) {
        return detail.to_string();
    }
    if let Some(validation) = err.downcast_ref::<ValidationError>() {
        return validation.message.clone();
    }
    fallback.to_string()
}
