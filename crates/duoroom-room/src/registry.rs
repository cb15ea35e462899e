//! Session registry: creates, tracks, and routes participants to rooms.
//!
//! The registry keeps its own seat count per room, so picking a room never
//! needs a round-trip to a room actor. Its bookkeeping sits behind one lock
//! that is never held while a room is awaited: a room with a backed-up
//! command queue delays only the participants talking to that room.

use std::collections::{BTreeMap, HashMap};

use duoroom_protocol::{ParticipantId, RoomId};
use tokio::sync::Mutex;

use crate::room::spawn_room;
use crate::{
    ParticipantSender, Participant, RoomConfig, RoomError, RoomHandle,
    RoomInfo, SEATS,
};

/// Attempts at seating a participant before giving up. Each failed
/// attempt retires the dead room it hit.
const MAX_ASSIGN_ATTEMPTS: usize = 3;

/// Where a participant was seated.
#[derive(Debug, Clone)]
pub struct Assignment {
    /// Handle to the participant's room. Callers keep it and talk to the
    /// room directly for moves and resets.
    pub room: RoomHandle,
    pub participant: Participant,
}

#[derive(Debug)]
struct RoomEntry {
    handle: RoomHandle,
    /// Seats held or reserved. A seat is reserved before the room's
    /// `join` and released only after its `leave`, so the room itself
    /// never sees more than [`SEATS`] participants.
    seated: usize,
}

#[derive(Debug, Default)]
struct Rooms {
    /// Ordered by id, so the oldest room with a free seat comes first.
    entries: BTreeMap<RoomId, RoomEntry>,
    participant_rooms: HashMap<ParticipantId, RoomId>,
    next_room_id: u64,
}

impl Rooms {
    fn spawn(&mut self, config: &RoomConfig) -> RoomId {
        self.next_room_id += 1;
        let room_id = RoomId(self.next_room_id);
        let handle = spawn_room(room_id, config.clone());
        self.entries.insert(room_id, RoomEntry { handle, seated: 0 });
        tracing::info!(%room_id, "room created");
        room_id
    }

    /// Releases one seat. Returns the room's handle if that emptied it;
    /// the room is then already gone from the registry.
    fn free_seat(&mut self, room_id: RoomId) -> Option<RoomHandle> {
        let entry = self.entries.get_mut(&room_id)?;
        entry.seated = entry.seated.saturating_sub(1);
        if entry.seated > 0 {
            return None;
        }
        self.entries.remove(&room_id).map(|e| e.handle)
    }

    /// Forgets a room and everyone mapped to it.
    fn retire(&mut self, room_id: RoomId) -> Option<RoomHandle> {
        self.participant_rooms.retain(|_, rid| *rid != room_id);
        self.entries.remove(&room_id).map(|e| e.handle)
    }
}

/// Owns every live room and knows which room each participant is in.
///
/// A participant is in at most one room at a time. A room lives from the
/// first `assign` that creates it until its last participant departs.
/// All methods take `&self`; share the registry behind an `Arc`.
#[derive(Debug)]
pub struct SessionRegistry {
    rooms: Mutex<Rooms>,
    config: RoomConfig,
}

impl SessionRegistry {
    /// Creates an empty registry whose rooms use `config`.
    pub fn new(config: RoomConfig) -> Self {
        Self {
            rooms: Mutex::new(Rooms::default()),
            config,
        }
    }

    /// Spawns a new, empty room and returns its ID.
    pub async fn create_room(&self) -> RoomId {
        self.rooms.lock().await.spawn(&self.config)
    }

    /// Seats a participant in the oldest room with a free seat, creating
    /// a room if none has one.
    ///
    /// A room whose actor turns out to be gone is retired and the next
    /// candidate tried.
    ///
    /// # Errors
    /// - [`RoomError::AlreadyInRoom`] if the participant is seated somewhere.
    /// - [`RoomError::Unavailable`] if no live room could take them.
    pub async fn assign(
        &self,
        participant_id: ParticipantId,
        requested_name: Option<String>,
        outbox: ParticipantSender,
    ) -> Result<Assignment, RoomError> {
        let mut last_err = None;

        for _ in 0..MAX_ASSIGN_ATTEMPTS {
            let handle = self.reserve(&participant_id).await?;
            let room_id = handle.room_id();

            match handle
                .join(
                    participant_id.clone(),
                    requested_name.clone(),
                    outbox.clone(),
                )
                .await
            {
                Ok(participant) => {
                    tracing::info!(
                        %room_id,
                        %participant_id,
                        "participant assigned"
                    );
                    return Ok(Assignment {
                        room: handle,
                        participant,
                    });
                }
                Err(RoomError::Unavailable(_)) => {
                    tracing::warn!(%room_id, "room actor gone, retiring room");
                    self.rooms.lock().await.retire(room_id);
                    last_err = Some(RoomError::Unavailable(room_id));
                }
                Err(e) => {
                    let emptied = {
                        let mut rooms = self.rooms.lock().await;
                        rooms.participant_rooms.remove(&participant_id);
                        rooms.free_seat(room_id)
                    };
                    if let Some(handle) = emptied {
                        let _ = handle.shutdown().await;
                    }
                    return Err(e);
                }
            }
        }

        Err(last_err.unwrap_or(RoomError::Unavailable(RoomId(0))))
    }

    /// Picks a room and reserves a seat in it for `participant_id`.
    async fn reserve(
        &self,
        participant_id: &ParticipantId,
    ) -> Result<RoomHandle, RoomError> {
        let mut rooms = self.rooms.lock().await;
        if let Some(existing) = rooms.participant_rooms.get(participant_id) {
            return Err(RoomError::AlreadyInRoom(
                participant_id.clone(),
                *existing,
            ));
        }

        let free = rooms
            .entries
            .iter()
            .find(|(_, entry)| entry.seated < SEATS)
            .map(|(id, _)| *id);
        let room_id = match free {
            Some(id) => id,
            None => rooms.spawn(&self.config),
        };

        let entry = rooms
            .entries
            .get_mut(&room_id)
            .ok_or(RoomError::NotFound(room_id))?;
        entry.seated += 1;
        let handle = entry.handle.clone();
        rooms
            .participant_rooms
            .insert(participant_id.clone(), room_id);
        Ok(handle)
    }

    /// Removes a participant from their room, destroying the room if it
    /// is now empty. A participant in no room is a no-op.
    pub async fn depart(
        &self,
        participant_id: &ParticipantId,
    ) -> Result<(), RoomError> {
        let (room_id, handle) = {
            let mut rooms = self.rooms.lock().await;
            let Some(room_id) = rooms.participant_rooms.remove(participant_id)
            else {
                tracing::debug!(%participant_id, "departure for unseated participant");
                return Ok(());
            };
            match rooms.entries.get(&room_id) {
                Some(entry) => (room_id, entry.handle.clone()),
                None => return Ok(()),
            }
        };

        match handle.leave(participant_id.clone()).await {
            Ok(_) => {}
            // Actor already gone: nothing left to unseat.
            Err(RoomError::Unavailable(_)) => {}
            Err(e) => return Err(e),
        }

        // Free the seat only now, so a newcomer's `join` queues behind
        // this `leave`.
        let emptied = self.rooms.lock().await.free_seat(room_id);
        if let Some(handle) = emptied {
            let _ = handle.shutdown().await;
            tracing::info!(%room_id, "room destroyed");
        }
        Ok(())
    }

    /// Shuts a room down and forgets everyone seated in it.
    pub async fn destroy_room(&self, room_id: RoomId) -> Result<(), RoomError> {
        let handle = self
            .rooms
            .lock()
            .await
            .retire(room_id)
            .ok_or(RoomError::NotFound(room_id))?;

        let _ = handle.shutdown().await;
        tracing::info!(%room_id, "room destroyed");
        Ok(())
    }

    /// The room a participant is seated in, if any.
    pub async fn room_of(&self, participant_id: &ParticipantId) -> Option<RoomId> {
        self.rooms
            .lock()
            .await
            .participant_rooms
            .get(participant_id)
            .copied()
    }

    /// Info for every live room, ordered by room ID. Rooms that fail to
    /// answer (e.g. shutting down) are skipped.
    pub async fn list_rooms(&self) -> Vec<RoomInfo> {
        let handles: Vec<RoomHandle> = self
            .rooms
            .lock()
            .await
            .entries
            .values()
            .map(|e| e.handle.clone())
            .collect();

        let mut infos = Vec::with_capacity(handles.len());
        for handle in handles {
            if let Ok(info) = handle.info().await {
                infos.push(info);
            }
        }
        infos
    }

    /// Number of live rooms.
    pub async fn room_count(&self) -> usize {
        self.rooms.lock().await.entries.len()
    }

    /// IDs of all live rooms, ascending.
    pub async fn room_ids(&self) -> Vec<RoomId> {
        self.rooms.lock().await.entries.keys().copied().collect()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new(RoomConfig::default())
    }
}
