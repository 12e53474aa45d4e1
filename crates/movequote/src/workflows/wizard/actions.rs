use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::domain::{AdditionalService, HeavyItem, HomeType, MoveDetails, MoveSide, MoveTime};

/// A single field edit sent by a step form.
///
/// Serialized adjacently tagged, e.g. `{"action": "set_origin", "value": "123 Main St"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", content = "value", rename_all = "snake_case")]
pub enum MoveAction {
    SetOrigin(String),
    SetDestination(String),
    SetMoveDate(Option<NaiveDate>),
    SetMoveTime(Option<MoveTime>),
    SetHomeType {
        side: MoveSide,
        home_type: HomeType,
    },
    SetRooms {
        side: MoveSide,
        rooms: Option<u8>,
    },
    SetSqft {
        side: MoveSide,
        sqft: Option<u32>,
    },
    SetStairs {
        side: MoveSide,
        stairs: Option<u8>,
    },
    SetFloor {
        side: MoveSide,
        floor: Option<u8>,
    },
    SetElevator {
        side: MoveSide,
        enabled: bool,
    },
    SetLoadingDock {
        side: MoveSide,
        enabled: bool,
    },
    SetHeavyItem {
        side: MoveSide,
        item: HeavyItem,
        included: bool,
    },
    SetService {
        side: MoveSide,
        service: AdditionalService,
        included: bool,
    },
    SetFirstName(String),
    SetLastName(String),
    SetEmail(String),
    SetPhone(String),
}

impl MoveAction {
    /// Whether the edit changes anything the pricing backend quoted against.
    pub fn affects_pricing(&self) -> bool {
        !matches!(
            self,
            Self::SetFirstName(_) | Self::SetLastName(_) | Self::SetEmail(_) | Self::SetPhone(_)
        )
    }
}

impl MoveDetails {
    /// Returns the store with `action` applied.
    pub fn reduce(mut self, action: &MoveAction) -> Self {
        match action {
            MoveAction::SetOrigin(value) => self.origin = value.clone(),
            MoveAction::SetDestination(value) => self.destination = value.clone(),
            MoveAction::SetMoveDate(date) => self.move_date = *date,
            MoveAction::SetMoveTime(time) => self.move_time = *time,
            MoveAction::SetHomeType { side, home_type } => {
                self.home_mut(*side).home_type = Some(*home_type);
            }
            MoveAction::SetRooms { side, rooms } => self.home_mut(*side).rooms = *rooms,
            MoveAction::SetSqft { side, sqft } => self.home_mut(*side).sqft = *sqft,
            MoveAction::SetStairs { side, stairs } => self.home_mut(*side).stairs = *stairs,
            MoveAction::SetFloor { side, floor } => self.home_mut(*side).floor = *floor,
            MoveAction::SetElevator { side, enabled } => {
                self.home_mut(*side).elevator = *enabled;
            }
            MoveAction::SetLoadingDock { side, enabled } => {
                self.home_mut(*side).loading_dock = *enabled;
            }
            MoveAction::SetHeavyItem {
                side,
                item,
                included,
            } => {
                let items = &mut self.home_mut(*side).heavy_items;
                if *included {
                    items.insert(*item);
                } else {
                    items.remove(item);
                }
            }
            MoveAction::SetService {
                side,
                service,
                included,
            } => {
                let services = &mut self.home_mut(*side).services;
                if *included {
                    services.insert(*service);
                } else {
                    services.remove(service);
                }
            }
            MoveAction::SetFirstName(value) => self.contact.first_name = value.clone(),
            MoveAction::SetLastName(value) => self.contact.last_name = value.clone(),
            MoveAction::SetEmail(value) => self.contact.email = value.clone(),
            MoveAction::SetPhone(value) => self.contact.phone = value.clone(),
        }
        self
    }

    pub fn reduce_all<'a, I>(self, actions: I) -> Self
    where
        I: IntoIterator<Item = &'a MoveAction>,
    {
        actions
            .into_iter()
            .fold(self, |details, action| details.reduce(action))
    }
}
