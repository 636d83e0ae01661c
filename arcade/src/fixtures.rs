//! Test-only records shared by the unit tests of this crate.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Storable, Table};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WidgetTable {
    Widget,
    Gadget,
}

impl Table for WidgetTable {
    fn name(&self) -> &str {
        match self {
            WidgetTable::Widget => "widget",
            WidgetTable::Gadget => "gadget",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Widget {
    pub uuid: Uuid,
    pub name: String,
    pub size: i64,
}

impl Widget {
    pub fn new(name: &str) -> Self {
        Self::sized(name, 1)
    }

    pub fn sized(name: &str, size: i64) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            name: name.to_string(),
            size,
        }
    }
}

impl Storable for Widget {
    fn uuid(&self) -> Uuid {
        self.uuid
    }

    fn table_name(&self) -> &str {
        "widget"
    }
}

/// Lives in the gadget table; used to exercise cross-table behaviour.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Gadget {
    pub uuid: Uuid,
    pub label: String,
}

impl Gadget {
    pub fn new(label: &str) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            label: label.to_string(),
        }
    }
}

impl Storable for Gadget {
    fn uuid(&self) -> Uuid {
        self.uuid
    }

    fn table_name(&self) -> &str {
        "gadget"
    }
}
