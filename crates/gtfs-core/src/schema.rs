//! Schema registry for GTFS static feed files
//!
//! The registry is built once and never mutated. Field rules are keyed by
//! field name rather than by file, since a field such as `route_id` means the
//! same thing wherever it appears.

use crate::rules::Rule;
use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Suffix shared by every table file in a feed
pub const TABLE_SUFFIX: &str = ".txt";

/// Declared shape of one feed file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    pub name: &'static str,
    pub required_fields: &'static [&'static str],
    pub optional_fields: &'static [&'static str],
    /// Single-field key, `None` for composite or keyless tables
    pub key_field: Option<&'static str>,
}

impl TableSchema {
    /// Required fields followed by optional fields
    pub fn all_fields(&self) -> impl Iterator<Item = &'static str> {
        let required: &'static [&'static str] = self.required_fields;
        let optional: &'static [&'static str] = self.optional_fields;
        required.iter().chain(optional.iter()).copied()
    }

    pub fn is_required_field(&self, field: &str) -> bool {
        self.required_fields.contains(&field)
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.all_fields().any(|f| f == field)
    }
}

const fn schema(
    name: &'static str,
    required_fields: &'static [&'static str],
    optional_fields: &'static [&'static str],
    key_field: Option<&'static str>,
) -> TableSchema {
    TableSchema {
        name,
        required_fields,
        optional_fields,
        key_field,
    }
}

const SCHEMAS: &[TableSchema] = &[
    schema(
        "agency.txt",
        &["agency_name", "agency_url", "agency_timezone"],
        &["agency_id", "agency_lang", "agency_phone", "agency_fare_url", "agency_email"],
        Some("agency_id"),
    ),
    schema(
        "stops.txt",
        &["stop_id", "stop_name", "stop_lat", "stop_lon"],
        &[
            "stop_code",
            "tts_stop_name",
            "stop_desc",
            "zone_id",
            "stop_url",
            "location_type",
            "parent_station",
            "stop_timezone",
            "wheelchair_boarding",
            "level_id",
            "platform_code",
        ],
        Some("stop_id"),
    ),
    schema(
        "routes.txt",
        &["route_id", "route_type"],
        &[
            "agency_id",
            "route_short_name",
            "route_long_name",
            "route_desc",
            "route_url",
            "route_color",
            "route_text_color",
            "route_sort_order",
            "continuous_pickup",
            "continuous_drop_off",
            "network_id",
        ],
        Some("route_id"),
    ),
    schema(
        "trips.txt",
        &["route_id", "service_id", "trip_id"],
        &[
            "trip_headsign",
            "trip_short_name",
            "direction_id",
            "block_id",
            "shape_id",
            "wheelchair_accessible",
            "bikes_allowed",
        ],
        Some("trip_id"),
    ),
    schema(
        "stop_times.txt",
        &["trip_id", "arrival_time", "departure_time", "stop_id", "stop_sequence"],
        &[
            "location_group_id",
            "location_id",
            "stop_headsign",
            "start_pickup_drop_off_window",
            "end_pickup_drop_off_window",
            "pickup_type",
            "drop_off_type",
            "continuous_pickup",
            "continuous_drop_off",
            "shape_dist_traveled",
            "timepoint",
            "pickup_booking_rule_id",
            "drop_off_booking_rule_id",
        ],
        None,
    ),
    schema(
        "calendar.txt",
        &[
            "service_id",
            "monday",
            "tuesday",
            "wednesday",
            "thursday",
            "friday",
            "saturday",
            "sunday",
            "start_date",
            "end_date",
        ],
        &[],
        Some("service_id"),
    ),
    schema(
        "calendar_dates.txt",
        &["service_id", "date", "exception_type"],
        &[],
        None,
    ),
    schema(
        "fare_attributes.txt",
        &["fare_id", "price", "currency_type", "payment_method", "transfers"],
        &["agency_id", "transfer_duration"],
        Some("fare_id"),
    ),
    schema(
        "fare_rules.txt",
        &["fare_id"],
        &["route_id", "origin_id", "destination_id", "contains_id"],
        None,
    ),
    schema(
        "timeframes.txt",
        &["timeframe_group_id", "service_id"],
        &["start_time", "end_time"],
        None,
    ),
    schema(
        "fare_media.txt",
        &["fare_media_id", "fare_media_type"],
        &["fare_media_name"],
        Some("fare_media_id"),
    ),
    schema(
        "fare_products.txt",
        &["fare_product_id", "amount", "currency"],
        &["fare_product_name", "fare_media_id"],
        None,
    ),
    schema(
        "fare_leg_rules.txt",
        &["fare_product_id"],
        &[
            "leg_group_id",
            "network_id",
            "from_area_id",
            "to_area_id",
            "from_timeframe_group_id",
            "to_timeframe_group_id",
            "rule_priority",
        ],
        None,
    ),
    schema(
        "fare_transfer_rules.txt",
        &["fare_transfer_type"],
        &[
            "from_leg_group_id",
            "to_leg_group_id",
            "transfer_count",
            "duration_limit",
            "duration_limit_type",
            "fare_product_id",
        ],
        None,
    ),
    schema("areas.txt", &["area_id"], &["area_name"], Some("area_id")),
    schema("stop_areas.txt", &["area_id", "stop_id"], &[], None),
    schema("networks.txt", &["network_id"], &["network_name"], Some("network_id")),
    schema("route_networks.txt", &["network_id", "route_id"], &[], None),
    schema(
        "shapes.txt",
        &["shape_id", "shape_pt_lat", "shape_pt_lon", "shape_pt_sequence"],
        &["shape_dist_traveled"],
        None,
    ),
    schema(
        "frequencies.txt",
        &["trip_id", "start_time", "end_time", "headway_secs"],
        &["exact_times"],
        None,
    ),
    schema(
        "transfers.txt",
        &["transfer_type"],
        &[
            "from_stop_id",
            "to_stop_id",
            "from_route_id",
            "to_route_id",
            "from_trip_id",
            "to_trip_id",
            "min_transfer_time",
        ],
        None,
    ),
    schema(
        "pathways.txt",
        &["pathway_id", "from_stop_id", "to_stop_id", "pathway_mode", "is_bidirectional"],
        &[
            "length",
            "traversal_time",
            "stair_count",
            "max_slope",
            "min_width",
            "signposted_as",
            "reversed_signposted_as",
        ],
        Some("pathway_id"),
    ),
    schema("levels.txt", &["level_id", "level_index"], &["level_name"], Some("level_id")),
    schema(
        "location_groups.txt",
        &["location_group_id"],
        &["location_group_name"],
        Some("location_group_id"),
    ),
    schema(
        "location_group_stops.txt",
        &["location_group_id", "stop_id"],
        &[],
        None,
    ),
    schema(
        "booking_rules.txt",
        &["booking_rule_id", "booking_type"],
        &[
            "prior_notice_duration_min",
            "prior_notice_duration_max",
            "prior_notice_last_day",
            "prior_notice_last_time",
            "prior_notice_start_day",
            "prior_notice_start_time",
            "prior_notice_service_id",
            "message",
            "pickup_message",
            "drop_off_message",
            "phone_number",
            "info_url",
            "booking_url",
        ],
        Some("booking_rule_id"),
    ),
    schema(
        "translations.txt",
        &["table_name", "field_name", "language", "translation"],
        &["record_id", "record_sub_id", "field_value"],
        None,
    ),
    schema(
        "feed_info.txt",
        &["feed_publisher_name", "feed_publisher_url", "feed_lang"],
        &[
            "default_lang",
            "feed_start_date",
            "feed_end_date",
            "feed_version",
            "feed_contact_email",
            "feed_contact_url",
        ],
        None,
    ),
    schema(
        "attributions.txt",
        &["organization_name"],
        &[
            "attribution_id",
            "agency_id",
            "route_id",
            "trip_id",
            "is_producer",
            "is_operator",
            "is_authority",
            "attribution_url",
            "attribution_email",
            "attribution_phone",
        ],
        Some("attribution_id"),
    ),
];

const REQUIRED_FILES: &[&str] = &[
    "agency.txt",
    "stops.txt",
    "routes.txt",
    "trips.txt",
    "stop_times.txt",
];

/// Optional files that get an empty table when a new feed is created
const AUTHORING_FILES: &[&str] = &[
    "calendar.txt",
    "calendar_dates.txt",
    "shapes.txt",
    "feed_info.txt",
];

const FIELD_VALIDATIONS: &[(&str, &[Rule])] = &[
    // identifiers
    ("agency_id", &[Rule::Required]),
    ("stop_id", &[Rule::Required]),
    ("route_id", &[Rule::Required]),
    ("trip_id", &[Rule::Required]),
    ("service_id", &[Rule::Required]),
    ("shape_id", &[Rule::Required]),
    ("fare_id", &[Rule::Required]),
    // coordinates
    ("stop_lat", &[Rule::Required, Rule::Latitude]),
    ("stop_lon", &[Rule::Required, Rule::Longitude]),
    ("shape_pt_lat", &[Rule::Required, Rule::Latitude]),
    ("shape_pt_lon", &[Rule::Required, Rule::Longitude]),
    // times and dates
    ("arrival_time", &[Rule::Time]),
    ("departure_time", &[Rule::Time]),
    ("start_time", &[Rule::Time]),
    ("end_time", &[Rule::Time]),
    ("start_date", &[Rule::Required, Rule::Date]),
    ("end_date", &[Rule::Required, Rule::Date]),
    ("date", &[Rule::Required, Rule::Date]),
    ("feed_start_date", &[Rule::Date]),
    ("feed_end_date", &[Rule::Date]),
    // links and contacts
    ("agency_url", &[Rule::Required, Rule::Url]),
    ("agency_fare_url", &[Rule::Url]),
    ("route_url", &[Rule::Url]),
    ("stop_url", &[Rule::Url]),
    ("feed_publisher_url", &[Rule::Required, Rule::Url]),
    ("feed_contact_url", &[Rule::Url]),
    ("attribution_url", &[Rule::Url]),
    ("info_url", &[Rule::Url]),
    ("booking_url", &[Rule::Url]),
    ("agency_email", &[Rule::Email]),
    ("feed_contact_email", &[Rule::Email]),
    ("attribution_email", &[Rule::Email]),
    // presentation
    ("route_color", &[Rule::Color]),
    ("route_text_color", &[Rule::Color]),
    // fares
    ("price", &[Rule::Required, Rule::Numeric]),
    ("amount", &[Rule::Required, Rule::Numeric]),
    ("currency_type", &[Rule::Required, Rule::Currency]),
    ("currency", &[Rule::Required, Rule::Currency]),
    // enumerations
    ("route_type", &[Rule::Required, Rule::RouteType]),
    ("location_type", &[Rule::LocationType]),
    ("monday", &[Rule::Required, Rule::Binary]),
    ("tuesday", &[Rule::Required, Rule::Binary]),
    ("wednesday", &[Rule::Required, Rule::Binary]),
    ("thursday", &[Rule::Required, Rule::Binary]),
    ("friday", &[Rule::Required, Rule::Binary]),
    ("saturday", &[Rule::Required, Rule::Binary]),
    ("sunday", &[Rule::Required, Rule::Binary]),
    ("direction_id", &[Rule::Binary]),
    ("exact_times", &[Rule::Binary]),
    ("is_bidirectional", &[Rule::Required, Rule::Binary]),
    ("is_producer", &[Rule::Binary]),
    ("is_operator", &[Rule::Binary]),
    ("is_authority", &[Rule::Binary]),
    // counts and sequences
    ("stop_sequence", &[Rule::Required, Rule::Integer]),
    ("shape_pt_sequence", &[Rule::Required, Rule::Integer]),
    ("exception_type", &[Rule::Required, Rule::Integer]),
    ("headway_secs", &[Rule::Required, Rule::Integer]),
    ("min_transfer_time", &[Rule::Integer]),
    ("transfer_duration", &[Rule::Integer]),
    ("level_index", &[Rule::Required, Rule::Numeric]),
    ("shape_dist_traveled", &[Rule::Numeric]),
    ("length", &[Rule::Numeric]),
    ("traversal_time", &[Rule::Integer]),
    ("stair_count", &[Rule::Integer]),
];

/// Process-wide schema registry
#[derive(Debug)]
pub struct SchemaRegistry {
    schemas: &'static [TableSchema],
    required_files: &'static [&'static str],
    authoring_files: &'static [&'static str],
    field_rules: HashMap<&'static str, &'static [Rule]>,
}

static GTFS_REGISTRY: Lazy<SchemaRegistry> = Lazy::new(|| SchemaRegistry {
    schemas: SCHEMAS,
    required_files: REQUIRED_FILES,
    authoring_files: AUTHORING_FILES,
    field_rules: FIELD_VALIDATIONS.iter().copied().collect(),
});

impl SchemaRegistry {
    /// The GTFS static registry, built on first use
    pub fn gtfs() -> &'static SchemaRegistry {
        &GTFS_REGISTRY
    }

    /// Look up a file's schema; `None` means the file is unknown
    pub fn schema(&self, file: &str) -> Option<&TableSchema> {
        self.schemas.iter().find(|s| s.name == file)
    }

    /// Files that must be present for a structurally valid feed
    pub fn required_files(&self) -> &[&'static str] {
        self.required_files
    }

    /// Recognized files that are not mandatory, in registry order
    pub fn optional_files(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.schemas
            .iter()
            .map(|s| s.name)
            .filter(|name| !self.required_files.contains(name))
    }

    /// Optional files pre-created for a new feed
    pub fn authoring_files(&self) -> &[&'static str] {
        self.authoring_files
    }

    pub fn is_required_file(&self, file: &str) -> bool {
        self.required_files.contains(&file)
    }

    pub fn is_known_file(&self, file: &str) -> bool {
        self.schema(file).is_some()
    }

    /// Rules attached to a field name, empty if the field has none
    pub fn rules_for(&self, field: &str) -> &[Rule] {
        self.field_rules.get(field).copied().unwrap_or(&[])
    }

    /// Every schema, in registry order
    pub fn schemas(&self) -> &[TableSchema] {
        self.schemas
    }
}
