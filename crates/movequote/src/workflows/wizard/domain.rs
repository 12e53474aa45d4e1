use std::collections::BTreeSet;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Opaque key identifying one in-progress quote session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MoveTime {
    Morning,
    Afternoon,
}

impl MoveTime {
    pub const fn ordered() -> [Self; 2] {
        [Self::Morning, Self::Afternoon]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Morning => "Morning (8am - 12pm)",
            Self::Afternoon => "Afternoon (12pm - 5pm)",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HomeType {
    House,
    Condo,
    Apartment,
    Townhouse,
    Commercial,
}

impl HomeType {
    pub const fn label(self) -> &'static str {
        match self {
            Self::House => "House",
            Self::Condo => "Condo",
            Self::Apartment => "Apartment",
            Self::Townhouse => "Townhouse",
            Self::Commercial => "Commercial",
        }
    }

    /// Fields the home details form shows for this type.
    pub fn fields(self) -> Vec<HomeField> {
        let mut fields = Vec::new();
        match self {
            Self::House | Self::Townhouse => {
                fields.push(HomeField::Rooms);
                fields.push(HomeField::Stairs);
            }
            Self::Condo | Self::Apartment => {
                fields.push(HomeField::Rooms);
                fields.push(HomeField::Floor);
                fields.push(HomeField::Elevator);
            }
            Self::Commercial => {
                fields.push(HomeField::Sqft);
                fields.push(HomeField::Floor);
                fields.push(HomeField::Elevator);
                fields.push(HomeField::LoadingDock);
            }
        }
        fields.push(HomeField::HeavyItems);
        fields.push(HomeField::Services);
        fields
    }
}

/// Individual inputs on a home details form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HomeField {
    Rooms,
    Sqft,
    Stairs,
    Floor,
    Elevator,
    LoadingDock,
    HeavyItems,
    Services,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeavyItem {
    Piano,
    Safe,
    PoolTable,
    HotTub,
    GymEquipment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdditionalService {
    Packing,
    Unpacking,
    Disassembly,
    Storage,
}

/// Which end of the move a home details edit targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveSide {
    Origin,
    Destination,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HomeDetails {
    pub home_type: Option<HomeType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rooms: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sqft: Option<u32>,
    /// Flights of stairs at the property.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stairs: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub floor: Option<u8>,
    #[serde(default)]
    pub elevator: bool,
    #[serde(default)]
    pub loading_dock: bool,
    #[serde(default)]
    pub heavy_items: BTreeSet<HeavyItem>,
    #[serde(default)]
    pub services: BTreeSet<AdditionalService>,
}

impl Default for HomeDetails {
    fn default() -> Self {
        Self {
            home_type: Some(HomeType::House),
            rooms: None,
            sqft: None,
            stairs: None,
            floor: None,
            elevator: false,
            loading_dock: false,
            heavy_items: BTreeSet::new(),
            services: BTreeSet::new(),
        }
    }
}

impl HomeDetails {
    pub fn visible_fields(&self) -> Vec<HomeField> {
        self.home_type.map(HomeType::fields).unwrap_or_default()
    }

    /// Copy with every field that does not belong to the selected home type cleared.
    pub fn scoped(&self) -> Self {
        let visible = self.visible_fields();
        let keep = |field: HomeField| visible.contains(&field);

        Self {
            home_type: self.home_type,
            rooms: self.rooms.filter(|_| keep(HomeField::Rooms)),
            sqft: self.sqft.filter(|_| keep(HomeField::Sqft)),
            stairs: self.stairs.filter(|_| keep(HomeField::Stairs)),
            floor: self.floor.filter(|_| keep(HomeField::Floor)),
            elevator: self.elevator && keep(HomeField::Elevator),
            loading_dock: self.loading_dock && keep(HomeField::LoadingDock),
            heavy_items: self.heavy_items.clone(),
            services: self.services.clone(),
        }
    }
}

/// Priced offer returned by the pricing backend. Unknown fields are kept verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VendorQuote {
    pub vendor_id: String,
    pub vendor_name: String,
    pub total_price: f64,
    pub crew_size: u8,
    pub truck_count: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hourly_rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_hours: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub travel_minutes: Option<u32>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInfo {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
}

impl ContactInfo {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name.trim(), self.last_name.trim())
            .trim()
            .to_string()
    }
}

/// Identifiers recorded once the payment provider confirms the deposit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub booking_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checkout_session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lead_id: Option<String>,
    pub completed: bool,
}

/// Everything collected across the wizard steps for one quote session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MoveDetails {
    pub origin: String,
    pub destination: String,
    pub move_date: Option<NaiveDate>,
    pub move_time: Option<MoveTime>,
    pub origin_details: HomeDetails,
    pub destination_details: HomeDetails,
    pub selected_quote: Option<VendorQuote>,
    pub contact: ContactInfo,
    pub payment: PaymentState,
}

impl MoveDetails {
    pub fn home(&self, side: MoveSide) -> &HomeDetails {
        match side {
            MoveSide::Origin => &self.origin_details,
            MoveSide::Destination => &self.destination_details,
        }
    }

    pub(crate) fn home_mut(&mut self, side: MoveSide) -> &mut HomeDetails {
        match side {
            MoveSide::Origin => &mut self.origin_details,
            MoveSide::Destination => &mut self.destination_details,
        }
    }

    pub fn with_selected_quote(mut self, quote: Option<VendorQuote>) -> Self {
        self.selected_quote = quote;
        self
    }

    pub fn with_payment(mut self, payment: PaymentState) -> Self {
        self.payment = payment;
        self
    }
}
