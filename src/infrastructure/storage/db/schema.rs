diesel::table! {
    events (event_id) {
        event_id -> Text,
        source_device_id -> Text,
        timestamp -> Text,
        content_type -> Text,
        text -> Text,
        text_hash -> Text,
    }
}

diesel::table! {
    devices (device_id) {
        device_id -> Text,
        device_name -> Text,
        network_address -> Nullable<Text>,
        last_seen_utc -> Text,
        enabled -> Bool,
    }
}

diesel::allow_tables_to_appear_in_same_query!(
    events,
    devices,
);
