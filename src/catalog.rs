//! Board command catalog.
//!
//! Every configuration read-out the dashboard performs is described here as
//! data: the AT query to send, the reply marker to look for and how the reply
//! tokens map to named fields. Board families differ in command syntax and
//! value encodings, so each spec carries the set of families it applies to
//! and [`resolve`] filters by board type. The catalog is immutable static
//! data and is shared freely between concurrent sync runs.

use anyhow::{Result, ensure};
use serde::{Serialize, Serializer};
use std::{collections::HashSet, fmt, str::FromStr};
use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("unknown board type: {0}")]
    UnknownBoardType(String),
    #[error("unknown configuration category: {0}")]
    UnknownCategory(String),
}

/// Hardware/firmware family of a board, as reported by the device registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BoardType {
    Star10,
    Mesh10,
    Star20,
    Mesh20,
    M6680,
}

impl BoardType {
    pub const ALL: [BoardType; 5] = [
        BoardType::Star10,
        BoardType::Mesh10,
        BoardType::Star20,
        BoardType::Mesh20,
        BoardType::M6680,
    ];

    /// Registry wire form, e.g. `board_1.0_mesh`.
    pub fn as_str(self) -> &'static str {
        match self {
            BoardType::Star10 => "board_1.0_star",
            BoardType::Mesh10 => "board_1.0_mesh",
            BoardType::Star20 => "board_2.0_star",
            BoardType::Mesh20 => "board_2.0_mesh",
            BoardType::M6680 => "board_6680",
        }
    }
}

impl FromStr for BoardType {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "board_1.0_star" => Ok(BoardType::Star10),
            "board_1.0_mesh" => Ok(BoardType::Mesh10),
            "board_2.0_star" => Ok(BoardType::Star20),
            "board_2.0_mesh" => Ok(BoardType::Mesh20),
            "board_6680" => Ok(BoardType::M6680),
            other => Err(CatalogError::UnknownBoardType(other.to_string())),
        }
    }
}

impl fmt::Display for BoardType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for BoardType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Logical configuration category.
///
/// `resolve` treats a missing category as "all", chaining the per-category
/// lists in [`Category::ALL_ORDER`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Category {
    Network,
    Basic,
    Radio,
    Security,
    UpDown,
    Debug,
    System,
    Role,
}

impl Category {
    /// Stable order used when syncing all categories of a board.
    pub const ALL_ORDER: [Category; 8] = [
        Category::Network,
        Category::Basic,
        Category::Radio,
        Category::Security,
        Category::UpDown,
        Category::Debug,
        Category::System,
        Category::Role,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Network => "network",
            Category::Basic => "basic",
            Category::Radio => "radio",
            Category::Security => "security",
            Category::UpDown => "updown",
            Category::Debug => "debug",
            Category::System => "system",
            Category::Role => "role",
        }
    }
}

impl FromStr for Category {
    type Err = CatalogError;

    /// Accepts the canonical names plus the aliases the dashboard has
    /// historically used for the same categories.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "network" => Ok(Category::Network),
            "basic" | "net-setting" => Ok(Category::Basic),
            "radio" | "wireless" => Ok(Category::Radio),
            "security" | "encryption" => Ok(Category::Security),
            "updown" | "up-down" => Ok(Category::UpDown),
            "debug" => Ok(Category::Debug),
            "system" => Ok(Category::System),
            "role" | "device-role" => Ok(Category::Role),
            other => Err(CatalogError::UnknownCategory(other.to_string())),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Category {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Fixed enumeration applied to a captured value, code → human label.
///
/// Codes outside the table pass through unchanged; devices occasionally
/// report values newer than the table and the raw code is still useful.
#[derive(Debug)]
pub struct DecodeTable {
    pub entries: &'static [(&'static str, &'static str)],
}

impl DecodeTable {
    pub fn decode(&self, code: &str) -> Option<&'static str> {
        self.entries
            .iter()
            .find(|(c, _)| *c == code)
            .map(|(_, label)| *label)
    }
}

pub static BANDWIDTH: DecodeTable = DecodeTable {
    entries: &[
        ("0", "1.4M"),
        ("1", "3M"),
        ("2", "5M"),
        ("3", "10M"),
        ("5", "20M"),
    ],
};

pub static ENCRYPT_ALG: DecodeTable = DecodeTable {
    entries: &[("0", "None"), ("1", "SNOW3G"), ("2", "AES"), ("3", "ZUC")],
};

pub static ON_OFF: DecodeTable = DecodeTable {
    entries: &[("0", "off"), ("1", "on")],
};

/// Uplink/downlink subframe ratio.
pub static UD_RATIO: DecodeTable = DecodeTable {
    entries: &[("0", "1:3"), ("1", "2:2"), ("2", "3:1")],
};

pub static MESH_ROLE: DecodeTable = DecodeTable {
    entries: &[("0", "auto"), ("1", "central"), ("2", "terminal")],
};

/// One positional capture of a command reply.
#[derive(Debug)]
pub struct FieldSpec {
    pub name: &'static str,
    pub decode: Option<&'static DecodeTable>,
}

const fn field(name: &'static str) -> FieldSpec {
    FieldSpec { name, decode: None }
}

const fn coded(name: &'static str, decode: &'static DecodeTable) -> FieldSpec {
    FieldSpec {
        name,
        decode: Some(decode),
    }
}

/// One logical configuration read-out.
#[derive(Debug)]
pub struct CommandSpec {
    /// Unique key, e.g. `get_radio_params`.
    pub name: &'static str,
    /// Complete AT query string sent to the device.
    pub template: &'static str,
    /// Token that identifies the reply line, e.g. `^DRPC:`.
    pub marker: &'static str,
    pub category: Category,
    pub boards: &'static [BoardType],
    pub fields: &'static [FieldSpec],
}

impl CommandSpec {
    pub fn applies_to(&self, board: BoardType) -> bool {
        self.boards.contains(&board)
    }
}

const V1: &[BoardType] = &[BoardType::Star10, BoardType::Mesh10];
const V1_MESH: &[BoardType] = &[BoardType::Mesh10];
const V2: &[BoardType] = &[BoardType::Star20, BoardType::Mesh20];
const V2_MESH: &[BoardType] = &[BoardType::Mesh20];
const B6680: &[BoardType] = &[BoardType::M6680];

/// The full catalog. Order within a category is execution order.
pub static CATALOG: &[CommandSpec] = &[
    // ---- 1.0 star / 1.0 mesh (AT^ syntax) ----
    CommandSpec {
        name: "get_net_if",
        template: "AT^NETIFCFG?",
        marker: "^NETIFCFG:",
        category: Category::Network,
        boards: V1,
        fields: &[field("ip"), field("netmask"), field("gateway")],
    },
    CommandSpec {
        name: "get_net_id",
        template: "AT^DAPI?",
        marker: "^DAPI:",
        category: Category::Network,
        boards: V1,
        fields: &[field("net_id")],
    },
    CommandSpec {
        name: "get_radio_switch",
        template: "AT^DRPS?",
        marker: "^DRPS:",
        category: Category::Basic,
        boards: V1,
        fields: &[coded("radio_switch", &ON_OFF)],
    },
    CommandSpec {
        name: "get_node_name",
        template: "AT^DSNN?",
        marker: "^DSNN:",
        category: Category::Basic,
        boards: V1,
        fields: &[field("node_name")],
    },
    CommandSpec {
        name: "get_radio_params",
        template: "AT^DRPC?",
        marker: "^DRPC:",
        category: Category::Radio,
        boards: V1,
        fields: &[
            field("freq_khz"),
            coded("bandwidth", &BANDWIDTH),
            field("tx_power_dbm"),
        ],
    },
    CommandSpec {
        name: "get_encrypt_cfg",
        template: "AT^DCIAC?",
        marker: "^DCIAC:",
        category: Category::Security,
        boards: V1,
        fields: &[coded("encrypt_alg", &ENCRYPT_ALG), field("key_state")],
    },
    CommandSpec {
        name: "get_ud_ratio",
        template: "AT^DUBF?",
        marker: "^DUBF:",
        category: Category::UpDown,
        boards: V1,
        fields: &[coded("ud_ratio", &UD_RATIO)],
    },
    CommandSpec {
        name: "get_debug_switch",
        template: "AT^ELFUN?",
        marker: "^ELFUN:",
        category: Category::Debug,
        boards: V1,
        fields: &[field("debug_switch")],
    },
    CommandSpec {
        name: "get_drpr_status",
        template: "AT^DRPR?",
        marker: "^DRPR:",
        category: Category::Debug,
        boards: V1,
        fields: &[
            coded("drpr_switch", &ON_OFF),
            field("report_period_ms"),
            // DRPR status echoes the RF bandwidth currently in effect, which
            // is fresher than the configured value from get_radio_params
            coded("bandwidth", &BANDWIDTH),
        ],
    },
    CommandSpec {
        name: "get_sw_version",
        template: "AT^SWVER?",
        marker: "^SWVER:",
        category: Category::System,
        boards: V1,
        fields: &[field("sw_version")],
    },
    CommandSpec {
        name: "get_mesh_role",
        template: "AT^DDTC?",
        marker: "^DDTC:",
        category: Category::Role,
        boards: V1_MESH,
        fields: &[coded("mesh_role", &MESH_ROLE)],
    },
    CommandSpec {
        name: "get_central_state",
        template: "AT^DCMR?",
        marker: "^DCMR:",
        category: Category::Role,
        boards: V1_MESH,
        fields: &[coded("central_elected", &ON_OFF)],
    },
    // ---- 2.0 star / 2.0 mesh (AT+ syntax) ----
    CommandSpec {
        name: "get_net_cfg",
        template: "AT+NETCFG?",
        marker: "+NETCFG:",
        category: Category::Network,
        boards: V2,
        fields: &[field("ip"), field("netmask"), field("gateway")],
    },
    CommandSpec {
        name: "get_cell_id",
        template: "AT+CELLID?",
        marker: "+CELLID:",
        category: Category::Network,
        boards: V2,
        fields: &[field("cell_id")],
    },
    CommandSpec {
        name: "get_rf_switch",
        template: "AT+RFSW?",
        marker: "+RFSW:",
        category: Category::Basic,
        boards: V2,
        fields: &[coded("radio_switch", &ON_OFF)],
    },
    CommandSpec {
        name: "get_dev_name",
        template: "AT+DEVNAME?",
        marker: "+DEVNAME:",
        category: Category::Basic,
        boards: V2,
        fields: &[field("node_name")],
    },
    CommandSpec {
        name: "get_rf_params",
        template: "AT+RFPARA?",
        marker: "+RFPARA:",
        category: Category::Radio,
        boards: V2,
        fields: &[
            field("freq_khz"),
            coded("bandwidth", &BANDWIDTH),
            field("tx_power_dbm"),
            field("ant_mode"),
        ],
    },
    CommandSpec {
        name: "get_cipher_cfg",
        template: "AT+CIPHER?",
        marker: "+CIPHER:",
        category: Category::Security,
        boards: V2,
        fields: &[coded("encrypt_alg", &ENCRYPT_ALG), field("key_state")],
    },
    CommandSpec {
        name: "get_subframe_cfg",
        template: "AT+SFCFG?",
        marker: "+SFCFG:",
        category: Category::UpDown,
        boards: V2,
        fields: &[coded("ud_ratio", &UD_RATIO), field("special_subframe")],
    },
    CommandSpec {
        name: "get_log_switch",
        template: "AT+LOGSW?",
        marker: "+LOGSW:",
        category: Category::Debug,
        boards: V2,
        fields: &[field("debug_switch")],
    },
    CommandSpec {
        name: "get_sys_info",
        template: "AT+SYSINFO?",
        marker: "+SYSINFO:",
        category: Category::System,
        boards: V2,
        fields: &[field("sw_version"), field("hw_version")],
    },
    CommandSpec {
        name: "get_node_role",
        template: "AT+NODEROLE?",
        marker: "+NODEROLE:",
        category: Category::Role,
        boards: V2_MESH,
        fields: &[coded("mesh_role", &MESH_ROLE)],
    },
    // ---- 6680 (AT^ syntax, reduced capability set) ----
    CommandSpec {
        name: "get_attach_state",
        template: "AT^DATTCH?",
        marker: "^DATTCH:",
        category: Category::Network,
        boards: B6680,
        fields: &[coded("attach_state", &ON_OFF), field("net_id")],
    },
    CommandSpec {
        name: "get_band_cfg",
        template: "AT^DBAND?",
        marker: "^DBAND:",
        category: Category::Radio,
        boards: B6680,
        fields: &[field("band"), coded("bandwidth", &BANDWIDTH), field("earfcn")],
    },
    CommandSpec {
        name: "get_power_cfg",
        template: "AT^DPWR?",
        marker: "^DPWR:",
        category: Category::Radio,
        boards: B6680,
        fields: &[field("tx_power_dbm"), coded("power_ctrl", &ON_OFF)],
    },
    CommandSpec {
        name: "get_debug_mode",
        template: "AT^DBGMD?",
        marker: "^DBGMD:",
        category: Category::Debug,
        boards: B6680,
        fields: &[field("debug_mode")],
    },
    CommandSpec {
        name: "get_fw_version",
        template: "AT^DVER?",
        marker: "^DVER:",
        category: Category::System,
        boards: B6680,
        fields: &[field("sw_version"), field("build_date")],
    },
];

// Telemetry report queries live outside the category catalog; they are
// fetched by the poller, not by sync runs.
static DRPR_V1: CommandSpec = CommandSpec {
    name: "drpr_report_v1",
    template: "AT^DRPR=1",
    marker: "^DRPR:",
    category: Category::Debug,
    boards: V1,
    fields: &[
        field("report_index"),
        field("rsrp_dbm"),
        field("snr_db"),
        field("tx_power_dbm"),
        field("distance_m"),
    ],
};

static RF_REPORT_V2: CommandSpec = CommandSpec {
    name: "rf_report_v2",
    template: "AT+RFRPT?",
    marker: "+RFRPT:",
    category: Category::Debug,
    boards: V2,
    fields: &[
        field("rsrp_dbm"),
        field("snr_db"),
        field("tx_power_dbm"),
        field("distance_m"),
    ],
};

static DRPR_6680: CommandSpec = CommandSpec {
    name: "drpr_report_6680",
    template: "AT^DRPR=1",
    marker: "^DRPR:",
    category: Category::Debug,
    boards: B6680,
    fields: &[
        field("report_index"),
        field("rsrp_dbm"),
        field("snr_db"),
        field("earfcn"),
        field("distance_m"),
    ],
};

/// Radio parameter report query for the given board family.
pub fn telemetry_spec(board: BoardType) -> &'static CommandSpec {
    match board {
        BoardType::Star10 | BoardType::Mesh10 => &DRPR_V1,
        BoardType::Star20 | BoardType::Mesh20 => &RF_REPORT_V2,
        BoardType::M6680 => &DRPR_6680,
    }
}

/// Ordered command list for one board and category.
///
/// `None` means all categories, chained in [`Category::ALL_ORDER`]. A board
/// that does not support a category contributes no specs; the result may be
/// empty and that is not an error.
pub fn resolve(board: BoardType, category: Option<Category>) -> Vec<&'static CommandSpec> {
    match category {
        Some(category) => in_category(board, category),
        None => Category::ALL_ORDER
            .iter()
            .flat_map(|category| in_category(board, *category))
            .collect(),
    }
}

fn in_category(board: BoardType, category: Category) -> Vec<&'static CommandSpec> {
    CATALOG
        .iter()
        .filter(|spec| spec.category == category && spec.applies_to(board))
        .collect()
}

/// Startup sanity check over the static catalog.
///
/// After this passes, an unknown category *name* is the only catalog failure
/// mode left at runtime.
pub fn validate() -> Result<()> {
    let mut names = HashSet::new();

    let telemetry = [&DRPR_V1, &RF_REPORT_V2, &DRPR_6680];
    for spec in CATALOG.iter().chain(telemetry.into_iter()) {
        ensure!(names.insert(spec.name), "duplicate command name {}", spec.name);
        ensure!(!spec.template.is_empty(), "{}: empty template", spec.name);
        ensure!(!spec.marker.is_empty(), "{}: empty marker", spec.name);
        ensure!(!spec.boards.is_empty(), "{}: no board types", spec.name);
        ensure!(!spec.fields.is_empty(), "{}: no fields", spec.name);
    }

    for board in BoardType::ALL {
        ensure!(
            !resolve(board, None).is_empty(),
            "board {board} has no commands at all"
        );
    }

    Ok(())
}
