//! Optimistic local state: snapshot, speculate, then reconcile or roll back.
//!
//! A speculative change is applied to local state immediately and a
//! [`Pending`] ticket is handed back. Once the server answers, the ticket is
//! either confirmed (reconciling local state with the server's result) or
//! failed (restoring the snapshot). Tickets carry the store generation they
//! were issued under; navigation bumps the generation so answers that arrive
//! afterwards are ignored.
//!
//! Snapshots stay in the store while their mutation is in flight. A refetch
//! that lands meanwhile keeps the speculative entities and moves their
//! snapshots onto the fresh server data.

use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;

use larder_shared::dto::{CommentDto, PostDetailDto, PostSummaryDto};
use uuid::Uuid;

use crate::api::ClientError;

/// Anything held in an [`OptimisticStore`].
pub trait Entity: Clone + Send {
    fn id(&self) -> Uuid;
}

impl Entity for PostSummaryDto {
    fn id(&self) -> Uuid {
        self.id
    }
}

impl Entity for PostDetailDto {
    fn id(&self) -> Uuid {
        self.id
    }
}

impl Entity for CommentDto {
    fn id(&self) -> Uuid {
        self.id
    }
}

/// Identifies a mutation for the in-flight guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutationKey {
    /// Like or unlike of a post.
    Like(Uuid),
    DeletePost(Uuid),
    /// Keyed by the client-generated comment id.
    AddComment(Uuid),
    DeleteComment(Uuid),
}

impl fmt::Display for MutationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Like(id) => write!(f, "like {id}"),
            Self::DeletePost(id) => write!(f, "delete post {id}"),
            Self::AddComment(id) => write!(f, "add comment {id}"),
            Self::DeleteComment(id) => write!(f, "delete comment {id}"),
        }
    }
}

#[derive(Debug, Clone)]
enum Snapshot<E> {
    Updated(E),
    Removed { index: usize, previous: E },
    Inserted,
}

#[derive(Debug)]
struct InFlight<E> {
    target: Uuid,
    snapshot: Snapshot<E>,
}

/// A speculative change awaiting the server's answer.
#[must_use = "a pending change must be confirmed or failed"]
#[derive(Debug)]
pub struct Pending<E> {
    key: MutationKey,
    target: Uuid,
    generation: u64,
    entity: PhantomData<fn() -> E>,
}

impl<E> Pending<E> {
    pub fn key(&self) -> MutationKey {
        self.key
    }

    pub fn target(&self) -> Uuid {
        self.target
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Outcome of settling a ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settled {
    Applied,
    /// Issued before the last navigation; local state was left alone.
    Stale,
}

#[derive(Debug)]
pub struct OptimisticStore<E> {
    items: Vec<E>,
    generation: u64,
    in_flight: HashMap<MutationKey, InFlight<E>>,
}

impl<E: Entity> Default for OptimisticStore<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Entity> OptimisticStore<E> {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            generation: 0,
            in_flight: HashMap::new(),
        }
    }

    pub fn items(&self) -> &[E] {
        &self.items
    }

    pub fn get(&self, id: Uuid) -> Option<&E> {
        self.items.iter().find(|item| item.id() == id)
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_in_flight(&self, key: MutationKey) -> bool {
        self.in_flight.contains_key(&key)
    }

    /// Start a new view. Outstanding tickets become stale.
    pub fn navigate(&mut self) -> u64 {
        self.generation += 1;
        self.in_flight.clear();
        self.generation
    }

    /// Replace the contents with server data fetched under `generation`.
    /// Returns `false` and keeps the current contents when the store has
    /// navigated since.
    ///
    /// Entities with a mutation in flight keep their speculative state; the
    /// server copy becomes what a later failure rolls back to.
    pub fn replace(&mut self, generation: u64, mut items: Vec<E>) -> bool {
        if generation != self.generation {
            return false;
        }

        for flight in self.in_flight.values_mut() {
            let target = flight.target;
            let fresh = items.iter().position(|item| item.id() == target);
            let local = self.items.iter().find(|item| item.id() == target);

            match &mut flight.snapshot {
                Snapshot::Updated(previous) => {
                    if let (Some(index), Some(local)) = (fresh, local) {
                        *previous = std::mem::replace(&mut items[index], local.clone());
                    }
                }
                Snapshot::Removed { index, previous } => {
                    if let Some(fresh) = fresh {
                        *previous = items.remove(fresh);
                        *index = fresh;
                    }
                }
                Snapshot::Inserted => {
                    if let (None, Some(local)) = (fresh, local) {
                        items.push(local.clone());
                    }
                }
            }
        }

        self.items = items;
        true
    }

    /// Apply `apply` to the entity `id` speculatively.
    pub fn speculate_update(
        &mut self,
        key: MutationKey,
        id: Uuid,
        apply: impl FnOnce(&mut E),
    ) -> Result<Pending<E>, ClientError> {
        self.guard(key)?;
        let index = self.position(id).ok_or(ClientError::NotLoaded)?;
        let previous = self.items[index].clone();
        apply(&mut self.items[index]);

        Ok(self.issue(key, id, Snapshot::Updated(previous)))
    }

    /// Remove the entity `id` speculatively.
    pub fn speculate_remove(
        &mut self,
        key: MutationKey,
        id: Uuid,
    ) -> Result<Pending<E>, ClientError> {
        self.guard(key)?;
        let index = self.position(id).ok_or(ClientError::NotLoaded)?;
        let previous = self.items.remove(index);

        Ok(self.issue(key, id, Snapshot::Removed { index, previous }))
    }

    /// Append a provisional entity speculatively.
    pub fn speculate_insert(&mut self, key: MutationKey, entity: E) -> Result<Pending<E>, ClientError> {
        self.guard(key)?;
        let id = entity.id();
        self.items.push(entity);

        Ok(self.issue(key, id, Snapshot::Inserted))
    }

    /// Settle a ticket with the server's answer. `reconcile` runs against
    /// the targeted entity when it is still present.
    pub fn confirm(&mut self, ticket: Pending<E>, reconcile: impl FnOnce(&mut E)) -> Settled {
        if ticket.generation != self.generation {
            return Settled::Stale;
        }
        self.in_flight.remove(&ticket.key);

        if let Some(index) = self.position(ticket.target) {
            reconcile(&mut self.items[index]);
        }
        Settled::Applied
    }

    /// Roll back a ticket whose mutation failed.
    pub fn fail(&mut self, ticket: Pending<E>) -> Settled {
        if ticket.generation != self.generation {
            return Settled::Stale;
        }
        let Some(flight) = self.in_flight.remove(&ticket.key) else {
            return Settled::Stale;
        };

        match flight.snapshot {
            Snapshot::Updated(previous) => {
                if let Some(index) = self.position(ticket.target) {
                    self.items[index] = previous;
                }
            }
            Snapshot::Removed { index, previous } => {
                if self.position(ticket.target).is_none() {
                    let index = index.min(self.items.len());
                    self.items.insert(index, previous);
                }
            }
            Snapshot::Inserted => {
                self.items.retain(|item| item.id() != ticket.target);
            }
        }
        Settled::Applied
    }

    fn guard(&self, key: MutationKey) -> Result<(), ClientError> {
        if self.in_flight.contains_key(&key) {
            return Err(ClientError::MutationInFlight(key));
        }
        Ok(())
    }

    fn issue(&mut self, key: MutationKey, target: Uuid, snapshot: Snapshot<E>) -> Pending<E> {
        self.in_flight.insert(key, InFlight { target, snapshot });
        Pending {
            key,
            target,
            generation: self.generation,
            entity: PhantomData,
        }
    }

    fn position(&self, id: Uuid) -> Option<usize> {
        self.items.iter().position(|item| item.id() == id)
    }
}
